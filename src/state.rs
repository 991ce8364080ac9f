//! Playback intent shared between the block loop and the housekeeping loop.
//!
//! Every field has a single writer:
//!
//! | field            | written by                                    |
//! |------------------|-----------------------------------------------|
//! | `is_playing`     | block loop                                    |
//! | `load_requested` | block loop sets, housekeeping clears          |
//! | `volume`         | block loop                                    |
//! | `volume_apply`   | block loop sets, housekeeping clears          |
//! | `tempo`          | block loop                                    |
//! | `initial_tempo`  | block loop                                    |
//! | `file_selector`  | block loop                                    |
//!
//! Readers on the other side tolerate values that are one poll stale.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

pub const VOLUME_MIN: u32 = 0;
pub const VOLUME_MAX: u32 = 10;
pub const DEFAULT_VOLUME: u32 = 2;

pub const TEMPO_MIN: u32 = 0;
pub const TEMPO_MAX: u32 = 60_000_000;
pub const TEMPO_STEP: u32 = 2;

const TEMPO_UNCAPTURED: i64 = -1;

pub type SharedState = Arc<PlaybackState>;

#[derive(Debug)]
pub struct PlaybackState {
    is_playing: AtomicBool,
    load_requested: AtomicBool,
    volume: AtomicU32,
    volume_apply: AtomicBool,
    tempo: AtomicU32,
    initial_tempo: AtomicI64,
    file_selector: AtomicU8,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME)
    }
}

impl PlaybackState {
    pub fn new(volume: u32) -> Self {
        Self {
            is_playing: AtomicBool::new(false),
            load_requested: AtomicBool::new(false),
            volume: AtomicU32::new(volume.min(VOLUME_MAX)),
            volume_apply: AtomicBool::new(false),
            tempo: AtomicU32::new(0),
            initial_tempo: AtomicI64::new(TEMPO_UNCAPTURED),
            file_selector: AtomicU8::new(0),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::SeqCst)
    }

    pub fn set_playing(&self, playing: bool) {
        self.is_playing.store(playing, Ordering::SeqCst);
    }

    pub fn load_requested(&self) -> bool {
        self.load_requested.load(Ordering::SeqCst)
    }

    pub fn request_load(&self) {
        self.load_requested.store(true, Ordering::SeqCst);
    }

    pub fn clear_load_request(&self) {
        self.load_requested.store(false, Ordering::SeqCst);
    }

    pub fn volume(&self) -> u32 {
        self.volume.load(Ordering::SeqCst)
    }

    /// Stores the volume and flags it for the housekeeping loop to apply.
    pub fn set_volume(&self, volume: u32) {
        self.volume
            .store(volume.clamp(VOLUME_MIN, VOLUME_MAX), Ordering::SeqCst);
        self.volume_apply.store(true, Ordering::SeqCst);
    }

    /// Returns whether a volume change is waiting and clears the flag.
    pub fn take_volume_apply(&self) -> bool {
        self.volume_apply.swap(false, Ordering::SeqCst)
    }

    pub fn tempo(&self) -> u32 {
        self.tempo.load(Ordering::SeqCst)
    }

    pub fn set_tempo(&self, bpm: u32) {
        self.tempo
            .store(bpm.clamp(TEMPO_MIN, TEMPO_MAX), Ordering::SeqCst);
    }

    /// Tempo captured on the first tempo change after a load.
    pub fn initial_tempo(&self) -> Option<u32> {
        match self.initial_tempo.load(Ordering::SeqCst) {
            TEMPO_UNCAPTURED => None,
            bpm => u32::try_from(bpm).ok(),
        }
    }

    pub fn capture_initial_tempo(&self, bpm: u32) {
        self.initial_tempo.store(i64::from(bpm), Ordering::SeqCst);
    }

    pub fn reset_initial_tempo(&self) {
        self.initial_tempo.store(TEMPO_UNCAPTURED, Ordering::SeqCst);
    }

    pub fn selector_bit(&self, bit: u8) -> bool {
        bit < 8 && self.file_index() & (1 << bit) != 0
    }

    /// Flips one file-selector bit and returns its new value.
    pub fn toggle_selector_bit(&self, bit: u8) -> bool {
        if bit >= 8 {
            return false;
        }
        let mask = 1u8 << bit;
        let previous = self.file_selector.fetch_xor(mask, Ordering::SeqCst);
        previous & mask == 0
    }

    /// Index composed from the selector bits, bit 7 most significant.
    pub fn file_index(&self) -> u8 {
        self.file_selector.load(Ordering::SeqCst)
    }
}

pub fn create_shared_state(volume: u32) -> SharedState {
    Arc::new(PlaybackState::new(volume))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_initialization() {
        let state = PlaybackState::default();
        assert!(!state.is_playing());
        assert!(!state.load_requested());
        assert_eq!(state.volume(), DEFAULT_VOLUME);
        assert_eq!(state.initial_tempo(), None);
        assert_eq!(state.file_index(), 0);
    }

    #[test]
    fn test_selector_bits_compose_index() {
        let state = PlaybackState::default();
        assert!(state.toggle_selector_bit(7));
        assert!(state.toggle_selector_bit(0));
        assert_eq!(state.file_index(), 0x81);
        assert!(!state.toggle_selector_bit(7));
        assert_eq!(state.file_index(), 0x01);
        assert!(state.selector_bit(0));
        assert!(!state.selector_bit(7));
    }

    #[test]
    fn test_volume_apply_flag_is_taken_once() {
        let state = PlaybackState::default();
        state.set_volume(5);
        assert!(state.take_volume_apply());
        assert!(!state.take_volume_apply());
        assert_eq!(state.volume(), 5);
    }

    #[test]
    fn test_volume_is_clamped() {
        let state = PlaybackState::new(42);
        assert_eq!(state.volume(), VOLUME_MAX);
    }

    #[test]
    fn test_initial_tempo_capture_and_reset() {
        let state = PlaybackState::default();
        state.capture_initial_tempo(120);
        assert_eq!(state.initial_tempo(), Some(120));
        state.reset_initial_tempo();
        assert_eq!(state.initial_tempo(), None);
    }
}
