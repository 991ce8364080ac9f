pub mod cli;
pub mod config;
pub mod dispatch;
pub mod event_loop;
pub mod housekeeping;
pub mod led;
pub mod library;
pub mod logging;
pub mod midi;
pub mod player;
pub mod scheduler;
pub mod state;
pub mod surface;
pub mod ui;

pub use scheduler::{Scheduler, ThreadScheduler};
pub use state::{create_shared_state, PlaybackState, SharedState};

pub fn create_scheduler() -> ThreadScheduler {
    ThreadScheduler::new()
}

/// Input and output port names visible to `client_name`.
pub fn handle_device_list(client_name: &str) -> (Vec<String>, Vec<String>) {
    let inputs = midi::midir_engine::list_input_devices(client_name).unwrap_or_else(|e| {
        log::warn!("Cannot list MIDI inputs: {}", e);
        Vec::new()
    });
    let outputs = midi::midir_engine::list_output_devices(client_name).unwrap_or_else(|e| {
        log::warn!("Cannot list MIDI outputs: {}", e);
        Vec::new()
    });
    (inputs, outputs)
}
