//! Console status line
//!
//! A single indicatif spinner refreshed by the housekeeping loop. It shows
//! the loaded song, transport, tempo, volume and the current file-selector
//! index.

mod progress;

use chrono::{DateTime, Local};
use indicatif::ProgressBar;

pub use progress::{create_hidden_spinner, create_status_spinner};

/// Snapshot rendered on the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub song: Option<String>,
    pub loaded_at: Option<DateTime<Local>>,
    pub playing: bool,
    pub tempo: u32,
    pub volume: u32,
    pub file_index: u8,
}

impl Status {
    pub fn render(&self) -> String {
        let song = match (&self.song, &self.loaded_at) {
            (Some(name), Some(at)) => format!("{} (loaded {})", name, at.format("%H:%M:%S")),
            (Some(name), None) => name.clone(),
            (None, _) => "no song".to_string(),
        };
        format!(
            "{} | {} | {} BPM | vol {} | file {:02x}",
            song,
            if self.playing { "Playing" } else { "Stopped" },
            self.tempo,
            self.volume,
            self.file_index
        )
    }
}

pub struct StatusLine {
    spinner: ProgressBar,
}

impl StatusLine {
    pub fn new() -> Self {
        Self {
            spinner: create_status_spinner(),
        }
    }

    pub fn hidden() -> Self {
        Self {
            spinner: create_hidden_spinner(),
        }
    }

    pub fn update(&self, status: &Status) {
        self.spinner.set_message(status.render());
    }

    pub fn message(&self) -> String {
        self.spinner.message()
    }

    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}
