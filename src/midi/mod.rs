//! MIDI functionality for SurfaceSync
//!
//! This module provides:
//! - Core MIDI message types, error handling and the [`MidiSink`] trait
//! - Tick to MIDI clock derivation ([`ClockDriver`])
//! - The per-block byte emitter ([`RealtimeEmitter`])
//! - Real MIDI port connections via midir
//! - A recording sink for tests
//!
pub mod clock;
mod emitter;
mod engine;
pub mod midir_engine;
pub mod mock_engine;

pub use engine::{MidiError, MidiMessage, MidiSink, NullSink, RawMessage, Result};

pub use clock::{ClockDriver, ClockSignal, MIDI_CLOCK, MIDI_START};
pub use emitter::{EmitReport, RealtimeEmitter};

pub use midir_engine::{connect_input, connect_output, MidirSink};
pub use mock_engine::RecordingSink;
