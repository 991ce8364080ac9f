#![allow(dead_code)]

use std::num::NonZeroU32;
use std::path::PathBuf;
use surfacesyncrs::player::{Playback, PlayerStatus};
use surfacesyncrs::surface::Control;

/// Controls bound to Note On 0x20.. in `Control::ALL` order. LED messages
/// echo the note with the state in the velocity byte (0 off, 1 on, 2
/// pending).
pub fn controls_toml() -> String {
    let mut toml = String::new();
    for control in Control::ALL {
        let note = note_of(control);
        toml.push_str(&format!(
            "[controls.{}]\ntrigger = [144, {}]\nled_off = [144, {}, 0]\nled_on = [144, {}, 1]\nled_pending = [144, {}, 2]\n\n",
            control.config_key(),
            note,
            note,
            note,
            note
        ));
    }
    toml
}

pub fn note_of(control: Control) -> u8 {
    let position = Control::ALL
        .iter()
        .position(|c| *c == control)
        .unwrap_or(0);
    0x20 + position as u8
}

/// Note On press for `control`.
pub fn press(control: Control) -> [u8; 3] {
    [0x90, note_of(control), 0x7F]
}

/// Note On with velocity 0 for `control`.
pub fn release(control: Control) -> [u8; 3] {
    [0x90, note_of(control), 0]
}

/// LED message configured by `controls_toml`.
pub fn led(control: Control, state: u8) -> Vec<u8> {
    vec![0x90, note_of(control), state]
}

pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "surfacesyncrs-test-{}-{}",
        std::process::id(),
        name
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Single-track file at `ppq` and 120 BPM holding one quarter-note note.
pub fn one_note_song(ppq: u16) -> Vec<u8> {
    let mut data = b"MThd".to_vec();
    data.extend_from_slice(&[0, 0, 0, 6, 0, 0, 0, 1]);
    data.extend_from_slice(&ppq.to_be_bytes());
    data.extend_from_slice(b"MTrk");
    let mut track = vec![0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20];
    track.extend_from_slice(&[0x00, 0x90, 0x3C, 0x64]);
    track.extend_from_slice(&variable_length(u32::from(ppq)));
    track.extend_from_slice(&[0x80, 0x3C, 0x40]);
    track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    data.extend_from_slice(&(track.len() as u32).to_be_bytes());
    data.extend_from_slice(&track);
    data
}

fn variable_length(mut value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.insert(0, (value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    bytes
}

/// Playback engine that records what it was asked to do.
#[derive(Debug)]
pub struct FakePlayer {
    pub ppq: NonZeroU32,
    pub total_ticks: u64,
    pub tempo: u32,
    pub position: u64,
    pub playing: bool,
    pub calls: Vec<String>,
}

impl FakePlayer {
    pub fn new(tempo: u32) -> Self {
        Self {
            ppq: NonZeroU32::new(480).unwrap(),
            total_ticks: 480 * 16,
            tempo,
            position: 1234,
            playing: false,
            calls: Vec::new(),
        }
    }
}

impl Playback for FakePlayer {
    fn ppq(&self) -> NonZeroU32 {
        self.ppq
    }

    fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    fn current_tempo(&self) -> u32 {
        self.tempo
    }

    fn set_tempo(&mut self, bpm: u32) {
        self.calls.push(format!("set_tempo {}", bpm));
        self.tempo = bpm;
    }

    fn seek(&mut self, tick: u64) {
        self.calls.push(format!("seek {}", tick));
        self.position = tick;
    }

    fn play(&mut self) {
        self.calls.push("play".to_string());
        self.playing = true;
    }

    fn stop(&mut self) {
        self.calls.push("stop".to_string());
        self.playing = false;
    }

    fn status(&self) -> PlayerStatus {
        if self.playing {
            PlayerStatus::Playing
        } else {
            PlayerStatus::Stopped
        }
    }
}
