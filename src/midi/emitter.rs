use crate::config::LedTable;
use crate::led::LedFeedback;
use crate::midi::clock::ClockDriver;
use crate::midi::MidiSink;
use crate::surface::Control;

/// Writes the bytes decided during one block to the surface output.
#[derive(Debug, Default)]
pub struct RealtimeEmitter {
    write_failures: usize,
}

/// What one call to [`RealtimeEmitter::emit`] wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmitReport {
    pub clock_bytes: usize,
    pub led_messages: usize,
    pub failures: usize,
}

impl RealtimeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock bytes first, then the drained LED requests in FIFO order. All
    /// at offset 0.
    pub fn emit(
        &mut self,
        clock: &mut ClockDriver,
        leds: &LedFeedback,
        table: &LedTable,
        sink: &mut dyn MidiSink,
    ) -> EmitReport {
        let mut report = EmitReport::default();

        while let Some(byte) = clock.next_byte() {
            match sink.write(0, &[byte]) {
                Ok(()) => report.clock_bytes += 1,
                Err(_) => report.failures += 1,
            }
        }

        for request in leds.drain() {
            let Some(message) = Control::from_led_address(request.region, request.column)
                .and_then(|control| table.message(control, request.state))
            else {
                continue;
            };
            match sink.write(0, message) {
                Ok(()) => report.led_messages += 1,
                Err(_) => report.failures += 1,
            }
        }

        self.write_failures += report.failures;
        report
    }

    /// Failed writes since startup.
    pub fn write_failures(&self) -> usize {
        self.write_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::led::{LedState, Region};
    use crate::midi::{RecordingSink, MIDI_CLOCK, MIDI_START};
    use std::num::NonZeroU32;

    fn table() -> LedTable {
        let mut toml = String::new();
        for (i, control) in Control::ALL.iter().enumerate() {
            let note = 0x40 + i;
            toml.push_str(&format!(
                "[controls.{}]\ntrigger = [144, {note}]\nled_off = [128, {note}, 0]\nled_on = [144, {note}, 127]\nled_pending = [144, {note}, 64]\n\n",
                control.config_key()
            ));
        }
        Settings::from_toml_str(&toml).unwrap().led_table
    }

    #[test]
    fn test_clock_bytes_precede_leds() {
        let mut clock = ClockDriver::new();
        clock.on_tick(0, NonZeroU32::new(96).unwrap(), 960);
        let mut leds = LedFeedback::new(8);
        leds.request(Region::FileSelector, 0, 0, LedState::On);
        leds.request(Region::FunctionRow, 0, 3, LedState::Pending);
        let mut sink = RecordingSink::new();

        let report = RealtimeEmitter::new().emit(&mut clock, &leds, &table(), &mut sink);

        assert_eq!(
            sink.messages(),
            &[
                vec![MIDI_START],
                vec![MIDI_CLOCK],
                vec![0x90, 0x40, 127],
                vec![0x90, 0x4D, 64],
            ]
        );
        assert!(sink.offsets().iter().all(|&offset| offset == 0));
        assert_eq!(
            report,
            EmitReport {
                clock_bytes: 2,
                led_messages: 2,
                failures: 0
            }
        );
        assert!(leds.queue().is_empty());
    }

    #[test]
    fn test_idle_block_writes_nothing() {
        let mut sink = RecordingSink::new();
        let report = RealtimeEmitter::new().emit(
            &mut ClockDriver::new(),
            &LedFeedback::new(8),
            &table(),
            &mut sink,
        );
        assert_eq!(report, EmitReport::default());
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn test_failures_are_counted_and_queue_still_drained() {
        let mut clock = ClockDriver::new();
        clock.on_tick(0, NonZeroU32::new(96).unwrap(), 960);
        let mut leds = LedFeedback::new(8);
        leds.request(Region::FileSelector, 0, 1, LedState::Off);
        let mut emitter = RealtimeEmitter::new();

        let report = emitter.emit(&mut clock, &leds, &table(), &mut RecordingSink::failing());
        assert_eq!(report.failures, 3);
        assert_eq!(emitter.write_failures(), 3);
        assert!(leds.queue().is_empty());
    }
}
