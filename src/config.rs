// config.rs

use crate::led::{LedState, DEFAULT_QUEUE_CAPACITY};
use crate::state::{DEFAULT_VOLUME, VOLUME_MAX};
use crate::surface::Control;
use config::{Environment, File, FileFormat};
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "./surfacesync.toml";
pub const ENV_PREFIX: &str = "SURFACESYNC";

/// Errors that stop the process before the block loop starts
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read or deserialized
    Load(String),
    MissingControl(String),
    UnknownControl(String),
    InvalidTrigger { control: String, len: usize },
    InvalidLedMessage {
        control: String,
        state: LedState,
        len: usize,
    },
    ByteOutOfRange { control: String, value: i64 },
    DuplicateTrigger { first: String, second: String },
    InvalidSetting(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "cannot load configuration: {}", msg),
            ConfigError::MissingControl(name) => {
                write!(f, "control '{}' has no binding", name)
            }
            ConfigError::UnknownControl(name) => write!(f, "unknown control '{}'", name),
            ConfigError::InvalidTrigger { control, len } => write!(
                f,
                "trigger of control '{}' must be 2 bytes, got {}",
                control, len
            ),
            ConfigError::InvalidLedMessage {
                control,
                state,
                len,
            } => write!(
                f,
                "{:?} LED message of control '{}' must be 3 bytes, got {}",
                state, control, len
            ),
            ConfigError::ByteOutOfRange { control, value } => write!(
                f,
                "control '{}' uses {} which is not a byte value",
                control, value
            ),
            ConfigError::DuplicateTrigger { first, second } => write!(
                f,
                "controls '{}' and '{}' share the same trigger",
                first, second
            ),
            ConfigError::InvalidSetting(msg) => write!(f, "invalid setting: {}", msg),
        }
    }
}

impl Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Load(e.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortsConfig {
    /// Substring of the surface's input port name
    pub input: Option<String>,
    /// Substring of the port receiving LED and clock bytes
    pub output: Option<String>,
    /// Substring of the port receiving song events
    pub synth: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub block_frames: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_frames: 256,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SongsConfig {
    pub directory: PathBuf,
    pub initial: Option<PathBuf>,
}

impl Default for SongsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./songs"),
            initial: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HousekeepingConfig {
    pub poll_interval_ms: u64,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedsConfig {
    pub queue_capacity: usize,
}

impl Default for LedsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub default_volume: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_volume: DEFAULT_VOLUME,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawControl {
    trigger: Vec<i64>,
    led_off: Vec<i64>,
    led_on: Vec<i64>,
    led_pending: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "default_client_name")]
    client_name: String,
    #[serde(default)]
    ports: PortsConfig,
    #[serde(default)]
    audio: AudioConfig,
    #[serde(default)]
    songs: SongsConfig,
    #[serde(default)]
    housekeeping: HousekeepingConfig,
    #[serde(default)]
    leds: LedsConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    controls: HashMap<String, RawControl>,
}

fn default_client_name() -> String {
    "surfacesyncrs".to_string()
}

/// Trigger message of every control, keyed by its two leading bytes.
#[derive(Debug, Clone)]
pub struct ControlBindings {
    by_trigger: HashMap<[u8; 2], Control>,
}

impl ControlBindings {
    /// Finds the control whose trigger equals the first two bytes of `message`.
    pub fn lookup(&self, message: &[u8]) -> Option<Control> {
        match message {
            [status, data, ..] => self.by_trigger.get(&[*status, *data]).copied(),
            _ => None,
        }
    }

    pub fn trigger(&self, control: Control) -> Option<[u8; 2]> {
        self.by_trigger
            .iter()
            .find(|(_, bound)| **bound == control)
            .map(|(trigger, _)| *trigger)
    }

    pub fn len(&self) -> usize {
        self.by_trigger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_trigger.is_empty()
    }
}

/// Outbound LED message for every (control, state) pair.
#[derive(Debug, Clone)]
pub struct LedTable {
    messages: HashMap<(Control, LedState), [u8; 3]>,
}

impl LedTable {
    pub fn message(&self, control: Control, state: LedState) -> Option<&[u8; 3]> {
        self.messages.get(&(control, state))
    }
}

/// Validated, immutable configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub name: String,
    pub client_name: String,
    pub ports: PortsConfig,
    pub audio: AudioConfig,
    pub songs: SongsConfig,
    pub housekeeping: HousekeepingConfig,
    pub leds: LedsConfig,
    pub playback: PlaybackConfig,
    pub bindings: ControlBindings,
    pub led_table: LedTable,
}

impl Settings {
    /// Reads `path` (TOML) with `SURFACESYNC_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Reading configuration from {}", path.display());
        let raw = config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<RawSettings>()?;
        Self::validate(raw)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw = config::Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize::<RawSettings>()?;
        Self::validate(raw)
    }

    fn validate(mut raw: RawSettings) -> Result<Self, ConfigError> {
        check_settings(&raw)?;

        if let Some(unknown) = raw
            .controls
            .keys()
            .find(|key| !Control::ALL.iter().any(|c| c.config_key() == **key))
        {
            return Err(ConfigError::UnknownControl(unknown.clone()));
        }

        let mut by_trigger: HashMap<[u8; 2], Control> = HashMap::new();
        let mut messages = HashMap::new();

        for control in Control::ALL {
            let key = control.config_key();
            let entry = raw
                .controls
                .remove(&key)
                .ok_or_else(|| ConfigError::MissingControl(key.clone()))?;

            let trigger: [u8; 2] = to_bytes(&key, &entry.trigger)?.try_into().map_err(
                |bytes: Vec<u8>| ConfigError::InvalidTrigger {
                    control: key.clone(),
                    len: bytes.len(),
                },
            )?;
            if let Some(first) = by_trigger.insert(trigger, control) {
                return Err(ConfigError::DuplicateTrigger {
                    first: first.config_key(),
                    second: key,
                });
            }

            for (state, bytes) in [
                (LedState::Off, &entry.led_off),
                (LedState::On, &entry.led_on),
                (LedState::Pending, &entry.led_pending),
            ] {
                let message: [u8; 3] = to_bytes(&key, bytes)?.try_into().map_err(
                    |bytes: Vec<u8>| ConfigError::InvalidLedMessage {
                        control: key.clone(),
                        state,
                        len: bytes.len(),
                    },
                )?;
                messages.insert((control, state), message);
            }
            debug!("Bound control {} to {:02X?}", key, trigger);
        }

        Ok(Settings {
            name: raw.name.unwrap_or_else(|| raw.client_name.clone()),
            client_name: raw.client_name,
            ports: raw.ports,
            audio: raw.audio,
            songs: raw.songs,
            housekeeping: raw.housekeeping,
            leds: raw.leds,
            playback: raw.playback,
            bindings: ControlBindings { by_trigger },
            led_table: LedTable { messages },
        })
    }
}

fn check_settings(raw: &RawSettings) -> Result<(), ConfigError> {
    let zero = |name: &str| ConfigError::InvalidSetting(format!("{} must be positive", name));
    if raw.audio.sample_rate == 0 {
        return Err(zero("audio.sample_rate"));
    }
    if raw.audio.block_frames == 0 {
        return Err(zero("audio.block_frames"));
    }
    if raw.housekeeping.poll_interval_ms == 0 {
        return Err(zero("housekeeping.poll_interval_ms"));
    }
    if raw.leds.queue_capacity == 0 {
        return Err(zero("leds.queue_capacity"));
    }
    if raw.playback.default_volume > VOLUME_MAX {
        return Err(ConfigError::InvalidSetting(format!(
            "playback.default_volume must be at most {}",
            VOLUME_MAX
        )));
    }
    Ok(())
}

fn to_bytes(control: &str, values: &[i64]) -> Result<Vec<u8>, ConfigError> {
    values
        .iter()
        .map(|&value| {
            u8::try_from(value).map_err(|_| ConfigError::ByteOutOfRange {
                control: control.to_string(),
                value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls_toml(skip: Option<&str>) -> String {
        let mut toml = String::new();
        for (i, control) in Control::ALL.iter().enumerate() {
            let key = control.config_key();
            if Some(key.as_str()) == skip {
                continue;
            }
            let note = 0x20 + i as u8;
            toml.push_str(&format!(
                "[controls.{key}]\ntrigger = [144, {note}]\nled_off = [144, {note}, 0]\nled_on = [144, {note}, 1]\nled_pending = [144, {note}, 2]\n\n"
            ));
        }
        toml
    }

    #[test]
    fn test_complete_configuration_loads() {
        let settings = Settings::from_toml_str(&controls_toml(None)).unwrap();
        assert_eq!(settings.bindings.len(), Control::ALL.len());
        assert_eq!(settings.client_name, "surfacesyncrs");
        assert_eq!(settings.audio.block_frames, 256);
        assert_eq!(settings.leds.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(settings.playback.default_volume, DEFAULT_VOLUME);
        assert_eq!(settings.bindings.lookup(&[144, 0x20, 127]), Some(Control::Play));
        assert_eq!(
            settings.led_table.message(Control::Load, LedState::Pending),
            Some(&[144, 0x21, 2])
        );
    }

    #[test]
    fn test_missing_control_is_fatal() {
        let err = Settings::from_toml_str(&controls_toml(Some("tempo_up"))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingControl(ref name) if name == "tempo_up"));
    }

    #[test]
    fn test_bad_trigger_length_is_fatal() {
        let toml = controls_toml(None).replace("trigger = [144, 32]", "trigger = [144]");
        let err = Settings::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTrigger { len: 1, .. }));
    }

    #[test]
    fn test_out_of_range_byte_is_fatal() {
        let toml = controls_toml(None).replace("led_on = [144, 33, 1]", "led_on = [144, 33, 300]");
        let err = Settings::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::ByteOutOfRange { value: 300, .. }));
    }

    #[test]
    fn test_zero_queue_capacity_is_fatal() {
        let toml = format!("[leds]\nqueue_capacity = 0\n\n{}", controls_toml(None));
        let err = Settings::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting(_)));
    }
}
