//! Song playback
//!
//! [`Playback`] is what the control dispatcher needs from a playback engine.
//! [`SongPlayer`] implements it for Standard MIDI Files: it advances one
//! audio block at a time, reports every tick it passes and writes the song's
//! channel events to the synth output.

use crate::midi::{MidiMessage, MidiSink};
use midly::{MetaMessage, Smf, Timing, TrackEventKind};
use std::error::Error;
use std::fmt;
use std::fs;
use std::num::NonZeroU32;
use std::path::Path;

pub const DEFAULT_PPQ: NonZeroU32 = match NonZeroU32::new(480) {
    Some(ppq) => ppq,
    None => panic!("ppq must be positive"),
};
pub const DEFAULT_TEMPO: u32 = 120;
/// Upper bound on ticks processed in one block
pub const MAX_TICKS_PER_BLOCK: u64 = 4096;

const MIDI_CHANNELS: u8 = 16;
const CC_CHANNEL_VOLUME: u8 = 7;
const CC_ALL_NOTES_OFF: u8 = 123;

#[derive(Debug)]
pub enum SongError {
    Io(std::io::Error),
    Parse(String),
    /// Zero ppq, or SMPTE timecode instead of ticks per quarter note
    InvalidTiming,
}

impl fmt::Display for SongError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SongError::Io(e) => write!(f, "cannot read song: {}", e),
            SongError::Parse(msg) => write!(f, "cannot parse song: {}", msg),
            SongError::InvalidTiming => {
                write!(f, "song must use a positive ticks-per-quarter-note division")
            }
        }
    }
}

impl Error for SongError {}

impl From<std::io::Error> for SongError {
    fn from(e: std::io::Error) -> Self {
        SongError::Io(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Ready,
    Playing,
    Stopped,
}

/// Operations the dispatcher performs on the playback engine
pub trait Playback {
    fn ppq(&self) -> NonZeroU32;
    fn total_ticks(&self) -> u64;
    fn current_tempo(&self) -> u32;
    fn set_tempo(&mut self, bpm: u32);
    fn seek(&mut self, tick: u64);
    fn play(&mut self);
    fn stop(&mut self);
    fn status(&self) -> PlayerStatus;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SongEvent {
    pub tick: u64,
    pub message: MidiMessage,
}

#[derive(Debug, Clone)]
pub struct Song {
    pub name: String,
    pub ppq: NonZeroU32,
    pub total_ticks: u64,
    pub initial_tempo: u32,
    /// Channel events of all tracks, sorted by tick
    pub events: Vec<SongEvent>,
}

impl Song {
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            ppq: DEFAULT_PPQ,
            total_ticks: 0,
            initial_tempo: DEFAULT_TEMPO,
            events: Vec::new(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, SongError> {
        let data = fs::read(path)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        Self::from_bytes(name, &data)
    }

    pub fn from_bytes(name: String, data: &[u8]) -> Result<Self, SongError> {
        let smf = Smf::parse(data).map_err(|e| SongError::Parse(e.to_string()))?;

        let ppq = match smf.header.timing {
            Timing::Metrical(ppq) => NonZeroU32::new(u32::from(ppq.as_int())),
            Timing::Timecode(_, _) => None,
        }
        .ok_or(SongError::InvalidTiming)?;

        let mut events = Vec::new();
        let mut total_ticks = 0;
        let mut initial_tempo = None;

        for track in &smf.tracks {
            let mut tick: u64 = 0;
            for event in track {
                tick += u64::from(event.delta.as_int());
                match event.kind {
                    TrackEventKind::Midi { channel, message } => {
                        events.push(SongEvent {
                            tick,
                            message: convert_message(channel.as_int(), message),
                        });
                    }
                    TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter))
                        if initial_tempo.is_none() && us_per_quarter.as_int() > 0 =>
                    {
                        initial_tempo = Some(60_000_000 / us_per_quarter.as_int());
                    }
                    _ => {}
                }
            }
            total_ticks = total_ticks.max(tick);
        }

        events.sort_by_key(|e| e.tick);

        Ok(Song {
            name,
            ppq,
            total_ticks,
            initial_tempo: initial_tempo.unwrap_or(DEFAULT_TEMPO),
            events,
        })
    }
}

fn convert_message(channel: u8, message: midly::MidiMessage) -> MidiMessage {
    match message {
        midly::MidiMessage::NoteOn { key, vel } => MidiMessage::NoteOn {
            channel,
            note: key.as_int(),
            velocity: vel.as_int(),
        },
        midly::MidiMessage::NoteOff { key, vel } => MidiMessage::NoteOff {
            channel,
            note: key.as_int(),
            velocity: vel.as_int(),
        },
        midly::MidiMessage::Aftertouch { key, vel } => MidiMessage::Aftertouch {
            channel,
            note: key.as_int(),
            pressure: vel.as_int(),
        },
        midly::MidiMessage::Controller { controller, value } => MidiMessage::ControlChange {
            channel,
            controller: controller.as_int(),
            value: value.as_int(),
        },
        midly::MidiMessage::ProgramChange { program } => MidiMessage::ProgramChange {
            channel,
            program: program.as_int(),
        },
        midly::MidiMessage::ChannelAftertouch { vel } => MidiMessage::ChannelPressure {
            channel,
            pressure: vel.as_int(),
        },
        midly::MidiMessage::PitchBend { bend } => MidiMessage::PitchBend {
            channel,
            value: bend.0.as_int(),
        },
    }
}

/// Plays one song at a time, looping endlessly.
#[derive(Debug)]
pub struct SongPlayer {
    song: Song,
    position: u64,
    cursor: usize,
    tempo: u32,
    playing: bool,
    tick_fraction: f64,
    pending_silence: bool,
    pending_gain: Option<u8>,
}

impl Default for SongPlayer {
    fn default() -> Self {
        Self::new(Song::empty())
    }
}

impl SongPlayer {
    pub fn new(song: Song) -> Self {
        let tempo = song.initial_tempo;
        Self {
            song,
            position: 0,
            cursor: 0,
            tempo,
            playing: false,
            tick_fraction: 0.0,
            pending_silence: false,
            pending_gain: None,
        }
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Replaces the song, keeping the transport running if it was.
    pub fn load(&mut self, song: Song) {
        self.tempo = song.initial_tempo;
        self.song = song;
        self.seek(0);
    }

    /// Queues a Channel Volume change for volume in 0..=10.
    pub fn set_gain(&mut self, volume: u32) {
        self.pending_gain = Some((volume.min(10) * 127 / 10) as u8);
    }

    /// Plays one block worth of ticks.
    ///
    /// `on_tick` receives (tick, ppq, total ticks) for every tick passed.
    /// Returns the number of messages the synth sink refused.
    pub fn advance<F>(
        &mut self,
        frames: u32,
        sample_rate: u32,
        synth: &mut dyn MidiSink,
        mut on_tick: F,
    ) -> usize
    where
        F: FnMut(u64, NonZeroU32, u64),
    {
        let mut failed = 0;

        if self.pending_silence {
            self.pending_silence = false;
            failed += write_all_channels(synth, CC_ALL_NOTES_OFF, 0);
        }
        if let Some(value) = self.pending_gain.take() {
            failed += write_all_channels(synth, CC_CHANNEL_VOLUME, value);
        }

        if !self.playing || self.tempo == 0 || sample_rate == 0 {
            return failed;
        }

        let ppq = self.song.ppq;
        let ticks_per_second = f64::from(self.tempo) * f64::from(ppq.get()) / 60.0;
        self.tick_fraction += f64::from(frames) / f64::from(sample_rate) * ticks_per_second;
        let due = self.tick_fraction.floor();
        self.tick_fraction -= due;

        for _ in 0..(due as u64).min(MAX_TICKS_PER_BLOCK) {
            let tick = self.position;
            while let Some(event) = self.song.events.get(self.cursor) {
                if event.tick > tick {
                    break;
                }
                let (bytes, len) = event.message.encode();
                if synth.write(0, &bytes[..len]).is_err() {
                    failed += 1;
                }
                self.cursor += 1;
            }

            on_tick(tick, ppq, self.song.total_ticks);

            self.position += 1;
            if self.position > self.song.total_ticks {
                self.position = 0;
                self.cursor = 0;
            }
        }

        failed
    }
}

fn write_all_channels(synth: &mut dyn MidiSink, controller: u8, value: u8) -> usize {
    (0..MIDI_CHANNELS)
        .filter(|&channel| {
            let (bytes, len) = MidiMessage::ControlChange {
                channel,
                controller,
                value,
            }
            .encode();
            synth.write(0, &bytes[..len]).is_err()
        })
        .count()
}

impl Playback for SongPlayer {
    fn ppq(&self) -> NonZeroU32 {
        self.song.ppq
    }

    fn total_ticks(&self) -> u64 {
        self.song.total_ticks
    }

    fn current_tempo(&self) -> u32 {
        self.tempo
    }

    fn set_tempo(&mut self, bpm: u32) {
        self.tempo = bpm;
    }

    fn seek(&mut self, tick: u64) {
        self.position = tick.min(self.song.total_ticks);
        self.cursor = self
            .song
            .events
            .partition_point(|event| event.tick < self.position);
        self.tick_fraction = 0.0;
        self.pending_silence = true;
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn stop(&mut self) {
        self.playing = false;
        self.pending_silence = true;
    }

    fn status(&self) -> PlayerStatus {
        match (self.playing, self.position) {
            (true, _) => PlayerStatus::Playing,
            (false, 0) => PlayerStatus::Ready,
            (false, _) => PlayerStatus::Stopped,
        }
    }
}
