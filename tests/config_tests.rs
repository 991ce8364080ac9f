mod common;

use std::fs;
use std::path::PathBuf;
use surfacesyncrs::config::{ConfigError, Settings};
use surfacesyncrs::led::LedState;
use surfacesyncrs::surface::Control;

const HEADER: &str = r#"
name = "Stage rig"
client_name = "rig"

[ports]
input = "Launchpad"
output = "Launchpad"
synth = "FLUID"

[audio]
sample_rate = 48000
block_frames = 128

[songs]
directory = "/srv/songs"

[housekeeping]
poll_interval_ms = 250

[playback]
default_volume = 4
"#;

#[test]
fn test_load_full_file() {
    let dir = common::scratch_dir("config-full");
    let path = dir.join("surfacesync.toml");
    fs::write(&path, format!("{}\n{}", HEADER, common::controls_toml())).unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.name, "Stage rig");
    assert_eq!(settings.client_name, "rig");
    assert_eq!(settings.ports.input.as_deref(), Some("Launchpad"));
    assert_eq!(settings.ports.synth.as_deref(), Some("FLUID"));
    assert_eq!(settings.audio.sample_rate, 48_000);
    assert_eq!(settings.audio.block_frames, 128);
    assert_eq!(settings.songs.directory, PathBuf::from("/srv/songs"));
    assert_eq!(settings.songs.initial, None);
    assert_eq!(settings.leds.queue_capacity, 100);
    assert_eq!(settings.playback.default_volume, 4);

    assert_eq!(
        settings.bindings.lookup(&common::press(Control::TempoDown)),
        Some(Control::TempoDown)
    );
    assert_eq!(
        settings.led_table.message(Control::Bit(5), LedState::Pending),
        Some(&[0x90, common::note_of(Control::Bit(5)), 2])
    );
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_file_is_fatal() {
    let err = Settings::load(&PathBuf::from("/nonexistent/surfacesync.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_duplicate_trigger_is_fatal() {
    let toml = common::controls_toml().replace(
        &format!("trigger = [144, {}]", common::note_of(Control::Load)),
        &format!("trigger = [144, {}]", common::note_of(Control::Play)),
    );
    let err = Settings::from_toml_str(&toml).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateTrigger { .. }));
}

#[test]
fn test_bad_led_message_is_fatal() {
    let note = common::note_of(Control::VolumeUp);
    let toml = common::controls_toml().replace(
        &format!("led_pending = [144, {}, 2]", note),
        &format!("led_pending = [144, {}]", note),
    );
    match Settings::from_toml_str(&toml) {
        Err(ConfigError::InvalidLedMessage {
            control,
            state,
            len,
        }) => {
            assert_eq!(control, "volume_up");
            assert_eq!(state, LedState::Pending);
            assert_eq!(len, 2);
        }
        other => panic!("unexpected result: {:?}", other.map(|s| s.name)),
    }
}

#[test]
fn test_unknown_control_is_fatal() {
    let toml = format!(
        "{}[controls.rewind]\ntrigger = [144, 1]\nled_off = [144, 1, 0]\nled_on = [144, 1, 1]\nled_pending = [144, 1, 2]\n",
        common::controls_toml()
    );
    let err = Settings::from_toml_str(&toml).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownControl(ref name) if name == "rewind"));
}

#[test]
fn test_volume_above_range_is_fatal() {
    let toml = format!("[playback]\ndefault_volume = 11\n\n{}", common::controls_toml());
    assert!(matches!(
        Settings::from_toml_str(&toml),
        Err(ConfigError::InvalidSetting(_))
    ));
}

#[test]
fn test_environment_overrides_file() {
    let dir = common::scratch_dir("config-env");
    let path = dir.join("surfacesync.toml");
    fs::write(&path, format!("{}\n{}", HEADER, common::controls_toml())).unwrap();

    std::env::set_var("SURFACESYNC_HOUSEKEEPING__POLL_INTERVAL_MS", "500");
    let settings = Settings::load(&path);
    std::env::remove_var("SURFACESYNC_HOUSEKEEPING__POLL_INTERVAL_MS");

    assert_eq!(settings.unwrap().housekeeping.poll_interval_ms, 500);
    fs::remove_dir_all(&dir).unwrap();
}
