use crate::config::DEFAULT_CONFIG_PATH;
use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Select};
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// MIDI client name, overrides the configured one
    #[arg(long)]
    pub client_name: Option<String>,

    /// List available MIDI devices
    #[arg(long)]
    pub device_list: bool,

    /// Pick the surface input and output ports interactively
    #[arg(long)]
    pub choose_ports: bool,

    /// Directory holding the songs, overrides the configured one
    #[arg(long)]
    pub songs_dir: Option<PathBuf>,
}

pub fn validate_device(device_name: &str, devices: &[String]) -> Result<(), String> {
    if !devices.iter().any(|d| d.contains(device_name)) {
        let mut error_msg = format!(
            "Error: Device '{}' not found in available devices:\n",
            device_name
        );
        for device in devices {
            error_msg.push_str(&format!("  - {}\n", device));
        }
        return Err(error_msg);
    }
    Ok(())
}

/// Asks the user to pick one of `devices`. Returns `None` when there is
/// nothing to pick from or the prompt was dismissed.
pub fn choose_device(prompt: &str, devices: &[String]) -> io::Result<Option<String>> {
    if devices.is_empty() {
        return Ok(None);
    }
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(devices)
        .default(0)
        .interact_opt()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    Ok(selection.map(|i| devices[i].clone()))
}
