//! Tick-to-MIDI-clock derivation
//!
//! The playback engine reports its position in ticks of the loaded file's
//! resolution (ppq ticks per quarter note). [`ClockDriver`] folds that stream
//! into the standard 24 pulses per quarter note and leaves at most one
//! pending [`ClockSignal`] for the block emitter to turn into bytes.

use std::num::NonZeroU32;

/// MIDI realtime clock pulse
pub const MIDI_CLOCK: u8 = 0xF8;
/// MIDI realtime transport start
pub const MIDI_START: u8 = 0xFA;
/// Clock pulses per quarter note
pub const CLOCKS_PER_QUARTER: u32 = 24;

/// Signal waiting to be written by the emitter.
///
/// Ordered by priority: a pending transport start is never downgraded to a
/// plain clock pulse before it has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ClockSignal {
    #[default]
    None,
    Clock,
    Play,
}

#[derive(Debug)]
pub struct ClockDriver {
    pending: ClockSignal,
    pulse_counter: u32,
    previous_pulse_index: u32,
    armed: bool,
}

impl Default for ClockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockDriver {
    pub fn new() -> Self {
        Self {
            pending: ClockSignal::None,
            pulse_counter: 1,
            previous_pulse_index: 0,
            armed: false,
        }
    }

    /// Requests a transport start on the next tick callback.
    pub fn arm_transport_start(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn pending(&self) -> ClockSignal {
        self.pending
    }

    pub fn pulse_counter(&self) -> u32 {
        self.pulse_counter
    }

    pub fn previous_pulse_index(&self) -> u32 {
        self.previous_pulse_index
    }

    /// Forgets everything about the previous song.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Processes one playback tick.
    pub fn on_tick(&mut self, tick: u64, ppq: NonZeroU32, total_ticks: u64) {
        let ppq_ticks = u64::from(ppq.get());
        let pulse_index = (tick % ppq_ticks) as u32;
        let pulses_per_clock = f64::from(ppq.get()) / f64::from(CLOCKS_PER_QUARTER);

        // Past the last complete beat the clock stays silent so a looping
        // song wraps on a beat boundary.
        let truncated_end = (total_ticks + 1) / ppq_ticks * ppq_ticks;
        if tick >= truncated_end {
            self.previous_pulse_index = pulse_index;
            return;
        }

        if tick == 0 || self.armed {
            self.armed = false;
            self.raise(ClockSignal::Play);
            self.pulse_counter = 1;
            // The pulse that follows the start counts as sent.
            self.previous_pulse_index = 0;
            return;
        }

        if self.previous_pulse_index > pulse_index {
            self.pulse_counter = 1;
            self.raise(ClockSignal::Clock);
        }

        let threshold = (f64::from(self.pulse_counter) * pulses_per_clock).floor() as u32;
        if pulse_index >= threshold {
            self.pulse_counter += 1;
            self.raise(ClockSignal::Clock);
        }

        self.previous_pulse_index = pulse_index;
    }

    /// Consumes the pending signal one byte at a time.
    ///
    /// A pending start yields `MIDI_START` and re-arms as a clock pulse, so
    /// the first pulse follows in the same drain.
    pub fn next_byte(&mut self) -> Option<u8> {
        match self.pending {
            ClockSignal::Play => {
                self.pending = ClockSignal::Clock;
                Some(MIDI_START)
            }
            ClockSignal::Clock => {
                self.pending = ClockSignal::None;
                Some(MIDI_CLOCK)
            }
            ClockSignal::None => None,
        }
    }

    fn raise(&mut self, signal: ClockSignal) {
        self.pending = self.pending.max(signal);
    }
}
