//! The best-effort side of the application.
//!
//! Polls the shared flags, does the work the block loop must not do (file
//! lookups, parsing, logging) and hands results over as [`EngineCommand`]s.

use crate::event_loop::EngineCommand;
use crate::library;
use crate::player::{Song, SongError};
use crate::state::SharedState;
use crate::ui::{Status, StatusLine};
use chrono::{DateTime, Local};
use crossbeam::channel::Sender;
use log::{debug, error, info, warn};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// What one poll did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub loaded: Option<String>,
    pub load_failed: bool,
    pub gain: Option<u32>,
    pub evictions: usize,
    pub write_failures: usize,
}

pub struct Housekeeper {
    state: SharedState,
    songs_dir: PathBuf,
    commands: Sender<EngineCommand>,
    evictions: Arc<AtomicUsize>,
    write_failures: Arc<AtomicUsize>,
    reported_evictions: usize,
    reported_failures: usize,
    status_line: StatusLine,
    song: Option<String>,
    loaded_at: Option<DateTime<Local>>,
}

impl Housekeeper {
    pub fn new(
        state: SharedState,
        songs_dir: PathBuf,
        commands: Sender<EngineCommand>,
        evictions: Arc<AtomicUsize>,
        write_failures: Arc<AtomicUsize>,
        status_line: StatusLine,
    ) -> Self {
        Self {
            state,
            songs_dir,
            commands,
            evictions,
            write_failures,
            reported_evictions: 0,
            reported_failures: 0,
            status_line,
            song: None,
            loaded_at: None,
        }
    }

    /// Records the song installed before the loops started.
    pub fn set_current_song(&mut self, name: String) {
        self.song = Some(name);
        self.loaded_at = Some(Local::now());
    }

    pub fn status(&self) -> Status {
        Status {
            song: self.song.clone(),
            loaded_at: self.loaded_at,
            playing: self.state.is_playing(),
            tempo: self.state.tempo(),
            volume: self.state.volume(),
            file_index: self.state.file_index(),
        }
    }

    /// One pass over the shared flags. Fails only when the block loop is
    /// gone.
    pub fn poll(&mut self) -> Result<PollReport, EngineGone> {
        let mut report = PollReport::default();

        if self.state.load_requested() {
            let index = self.state.file_index();
            match self.load_song(index) {
                Ok(song) => {
                    let name = song.name.clone();
                    info!(
                        "Loaded song {:02x} '{}' ({} ticks at {} ppq, {} BPM)",
                        index, name, song.total_ticks, song.ppq, song.initial_tempo
                    );
                    self.send(EngineCommand::LoadSong(song))?;
                    self.song = Some(name.clone());
                    self.loaded_at = Some(Local::now());
                    report.loaded = Some(name);
                }
                Err(e) => {
                    warn!("Cannot load song {:02x}: {}", index, e);
                    report.load_failed = true;
                }
            }
            self.state.clear_load_request();
        }

        if self.state.take_volume_apply() {
            let volume = self.state.volume();
            debug!("Applying volume {}", volume);
            self.send(EngineCommand::SetGain(volume))?;
            report.gain = Some(volume);
        }

        let evicted = self.evictions.load(Ordering::SeqCst);
        report.evictions = evicted - self.reported_evictions;
        if report.evictions > 0 {
            warn!(
                "LED queue overflowed, {} oldest requests dropped",
                report.evictions
            );
            self.reported_evictions = evicted;
        }

        let failed = self.write_failures.load(Ordering::SeqCst);
        report.write_failures = failed - self.reported_failures;
        if report.write_failures > 0 {
            warn!("{} MIDI writes failed", report.write_failures);
            self.reported_failures = failed;
        }

        self.status_line.update(&self.status());
        Ok(report)
    }

    fn load_song(&self, index: u8) -> Result<Song, SongError> {
        let path = library::find_song(&self.songs_dir, index)?.ok_or_else(|| {
            SongError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no file for index {:02x} in {}", index, self.songs_dir.display()),
            ))
        })?;
        debug!("Reading {}", path.display());
        Song::from_file(&path)
    }

    fn send(&self, command: EngineCommand) -> Result<(), EngineGone> {
        self.commands.send(command).map_err(|_| EngineGone)
    }

    /// Polls every `interval` until the block loop goes away.
    pub fn run(mut self, interval: Duration) {
        info!("Housekeeping loop started, polling every {:?}", interval);
        loop {
            if let Err(e) = self.poll() {
                error!("{}", e);
                break;
            }
            thread::sleep(interval);
        }
        self.status_line.finish();
    }
}

/// The block loop stopped accepting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineGone;

impl std::fmt::Display for EngineGone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "block loop is no longer running")
    }
}

impl std::error::Error for EngineGone {}
