// event_loop.rs

use crate::config::{AudioConfig, LedTable, Settings};
use crate::dispatch::ControlDispatcher;
use crate::led::LedFeedback;
use crate::midi::{ClockDriver, MidiSink, RawMessage, RealtimeEmitter};
use crate::player::{Playback, Song, SongPlayer};
use crate::state::SharedState;
use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Incoming control messages buffered between two blocks
pub const CONTROL_QUEUE_CAPACITY: usize = 256;
/// Commands from the housekeeping loop buffered between two blocks
pub const COMMAND_QUEUE_CAPACITY: usize = 8;

/// Work handed from the housekeeping loop to the block loop
#[derive(Debug)]
pub enum EngineCommand {
    LoadSong(Song),
    SetGain(u32),
    Shutdown,
}

pub fn control_channel() -> (Sender<RawMessage>, Receiver<RawMessage>) {
    bounded(CONTROL_QUEUE_CAPACITY)
}

pub fn command_channel() -> (Sender<EngineCommand>, Receiver<EngineCommand>) {
    bounded(COMMAND_QUEUE_CAPACITY)
}

/// Channels and sinks the block loop talks to.
pub struct EnginePorts {
    pub controls: Receiver<RawMessage>,
    pub commands: Receiver<EngineCommand>,
    /// LED and clock bytes
    pub surface: Box<dyn MidiSink + Send>,
    /// Song events
    pub synth: Box<dyn MidiSink + Send>,
}

/// Everything that runs once per audio block.
///
/// Nothing in here logs, blocks or touches the filesystem. Counters are
/// shared with the housekeeping loop, which reports them.
pub struct Engine {
    audio: AudioConfig,
    player: SongPlayer,
    clock: ClockDriver,
    dispatcher: ControlDispatcher,
    emitter: RealtimeEmitter,
    led_table: LedTable,
    ports: EnginePorts,
    write_failures: Arc<AtomicUsize>,
}

impl Engine {
    pub fn new(
        settings: &Settings,
        state: SharedState,
        player: SongPlayer,
        ports: EnginePorts,
    ) -> Self {
        let leds = LedFeedback::new(settings.leds.queue_capacity);
        let mut dispatcher = ControlDispatcher::new(settings.bindings.clone(), state, leds);
        dispatcher.initialize_leds();
        dispatcher.song_installed(player.current_tempo());

        Self {
            audio: settings.audio.clone(),
            player,
            clock: ClockDriver::new(),
            dispatcher,
            emitter: RealtimeEmitter::new(),
            led_table: settings.led_table.clone(),
            ports,
            write_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn player(&self) -> &SongPlayer {
        &self.player
    }

    pub fn clock(&self) -> &ClockDriver {
        &self.clock
    }

    pub fn dispatcher(&self) -> &ControlDispatcher {
        &self.dispatcher
    }

    /// Shared handle on the LED queue eviction count.
    pub fn eviction_counter(&self) -> Arc<AtomicUsize> {
        self.dispatcher.leds().queue().eviction_counter()
    }

    /// Shared handle on the count of refused sink writes.
    pub fn write_failure_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.write_failures)
    }

    /// Runs one block. Returns false once the engine was told to stop or
    /// the housekeeping side went away.
    pub fn process_block(&mut self) -> bool {
        if !self.apply_commands() {
            return false;
        }

        self.dispatcher.sync_feedback();

        while let Ok(raw) = self.ports.controls.try_recv() {
            self.dispatcher
                .on_control_event(raw.as_bytes(), &mut self.player, &mut self.clock);
        }

        let clock = &mut self.clock;
        let mut failures = self.player.advance(
            self.audio.block_frames,
            self.audio.sample_rate,
            self.ports.synth.as_mut(),
            |tick, ppq, total_ticks| clock.on_tick(tick, ppq, total_ticks),
        );

        failures += self
            .emitter
            .emit(
                &mut self.clock,
                self.dispatcher.leds(),
                &self.led_table,
                self.ports.surface.as_mut(),
            )
            .failures;

        if failures > 0 {
            self.write_failures.fetch_add(failures, Ordering::SeqCst);
        }
        true
    }

    fn apply_commands(&mut self) -> bool {
        loop {
            match self.ports.commands.try_recv() {
                Ok(EngineCommand::LoadSong(song)) => self.install(song),
                Ok(EngineCommand::SetGain(volume)) => self.player.set_gain(volume),
                Ok(EngineCommand::Shutdown) | Err(TryRecvError::Disconnected) => return false,
                Err(TryRecvError::Empty) => return true,
            }
        }
    }

    fn install(&mut self, song: Song) {
        let tempo = song.initial_tempo;
        let playing = self.dispatcher.state().is_playing();
        self.player.load(song);
        self.clock.reset();
        if playing {
            self.player.play();
        }
        self.dispatcher.song_installed(tempo);
    }

    /// Block period for the configured audio settings.
    pub fn block_period(&self) -> Duration {
        Duration::from_secs_f64(
            f64::from(self.audio.block_frames) / f64::from(self.audio.sample_rate),
        )
    }

    /// Processes blocks at the audio rate until told to stop, sleeping the
    /// remainder of every period.
    pub fn run(mut self) {
        let period = self.block_period();
        let mut next = Instant::now();
        while self.process_block() {
            next += period;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                // Fell behind; do not try to catch up with a burst.
                next = now;
            }
        }
    }
}
