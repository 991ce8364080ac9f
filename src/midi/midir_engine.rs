use crate::midi::{MidiError, MidiSink, RawMessage, Result};
use crossbeam::channel::Sender;
use log::{debug, info, warn};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

/// Output port connection usable as a block sink.
///
/// midir has no notion of block offsets, so every message goes out
/// immediately, in write order.
pub struct MidirSink {
    connection: MidiOutputConnection,
}

impl MidiSink for MidirSink {
    fn write(&mut self, _offset: u32, bytes: &[u8]) -> Result<()> {
        self.connection.send(bytes)?;
        Ok(())
    }
}

/// Opens an output port whose name contains `device_name`.
pub fn connect_output(client_name: &str, device_name: &str) -> Result<MidirSink> {
    let midi_out = MidiOutput::new(&format!("{}-out", client_name))?;

    let out_ports = midi_out.ports();
    let out_port = out_ports
        .iter()
        .find(|p| {
            midi_out
                .port_name(p)
                .unwrap_or_default()
                .contains(device_name)
        })
        .ok_or_else(|| {
            MidiError::ConnectionError(format!("Output device not found: {}", device_name))
        })?;

    info!("Connecting output to {}", midi_out.port_name(out_port)?);
    let connection = midi_out.connect(out_port, &format!("{}-output", client_name))?;
    Ok(MidirSink { connection })
}

/// Opens an input port whose name contains `device_name` and forwards every
/// message into `tx`.
///
/// The callback never blocks. When the block loop falls behind and the
/// channel is full, the message is dropped.
pub fn connect_input(
    client_name: &str,
    device_name: &str,
    tx: Sender<RawMessage>,
) -> Result<MidiInputConnection<()>> {
    let mut midi_in = MidiInput::new(&format!("{}-in", client_name))?;
    midi_in.ignore(Ignore::All);

    let in_ports = midi_in.ports();
    let in_port = in_ports
        .iter()
        .find(|p| {
            midi_in
                .port_name(p)
                .unwrap_or_default()
                .contains(device_name)
        })
        .ok_or_else(|| {
            MidiError::ConnectionError(format!("Input device not found: {}", device_name))
        })?;

    info!("Connecting input to {}", midi_in.port_name(in_port)?);
    let connection = midi_in.connect(
        in_port,
        &format!("{}-input", client_name),
        move |_stamp, message, _| {
            if tx.try_send(RawMessage::new(message)).is_err() {
                warn!("Control input queue full, message dropped");
            }
        },
        (),
    )?;
    debug!("Input connection established");
    Ok(connection)
}

pub fn list_input_devices(client_name: &str) -> Result<Vec<String>> {
    let midi_in = MidiInput::new(&format!("{}-list", client_name))?;
    Ok(midi_in
        .ports()
        .iter()
        .filter_map(|port| midi_in.port_name(port).ok())
        .collect())
}

pub fn list_output_devices(client_name: &str) -> Result<Vec<String>> {
    let midi_out = MidiOutput::new(&format!("{}-list", client_name))?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|port| midi_out.port_name(port).ok())
        .collect())
}
