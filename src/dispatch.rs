//! Turns control-surface messages into playback state changes and LED
//! requests.

use crate::config::ControlBindings;
use crate::led::{LedFeedback, LedState};
use crate::midi::clock::ClockDriver;
use crate::midi::MidiMessage;
use crate::player::Playback;
use crate::state::{
    SharedState, DEFAULT_VOLUME, TEMPO_MAX, TEMPO_MIN, TEMPO_STEP, VOLUME_MAX, VOLUME_MIN,
};
use crate::surface::Control;

/// All LEDs of the surface live on the first row of their region.
pub const SURFACE_ROW: usize = 0;

const VOLUME_STEP: u32 = 1;

pub struct ControlDispatcher {
    bindings: ControlBindings,
    state: SharedState,
    leds: LedFeedback,
}

impl ControlDispatcher {
    pub fn new(bindings: ControlBindings, state: SharedState, leds: LedFeedback) -> Self {
        Self {
            bindings,
            state,
            leds,
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn leds(&self) -> &LedFeedback {
        &self.leds
    }

    /// Requests every LED off. The cache starts out unknown, so all of them
    /// are queued.
    pub fn initialize_leds(&mut self) {
        for control in Control::ALL {
            self.request(control, LedState::Off);
        }
    }

    /// Handles one incoming message. Returns the control it triggered, if
    /// any.
    pub fn on_control_event(
        &mut self,
        raw: &[u8],
        player: &mut dyn Playback,
        clock: &mut ClockDriver,
    ) -> Option<Control> {
        if MidiMessage::parse(raw).is_some_and(|msg| msg.is_release()) {
            return None;
        }
        let control = self.bindings.lookup(raw)?;

        match control {
            Control::Play => self.toggle_play(player, clock),
            Control::Load => {
                self.state.request_load();
                self.request(Control::Load, LedState::On);
            }
            Control::Bit(bit) => {
                let on = self.state.toggle_selector_bit(bit);
                self.request(control, LedState::from(on));
            }
            Control::VolumeDown | Control::VolumeUp => self.step_volume(control),
            Control::TempoDown | Control::TempoUp => self.step_tempo(control, player),
        }

        Some(control)
    }

    /// Mirrors flags changed by the housekeeping loop onto their LEDs.
    pub fn sync_feedback(&mut self) {
        let loading = self.state.load_requested();
        self.request(Control::Load, LedState::from(loading));
    }

    /// Publishes the tempo of a freshly installed song and forgets the
    /// captured initial tempo.
    pub fn song_installed(&mut self, tempo: u32) {
        self.state.reset_initial_tempo();
        self.state.set_tempo(tempo);
        let (down, up) = pair_leds(tempo, TEMPO_MIN, TEMPO_MAX, None);
        self.request(Control::TempoDown, down);
        self.request(Control::TempoUp, up);
    }

    fn toggle_play(&mut self, player: &mut dyn Playback, clock: &mut ClockDriver) {
        let playing = !self.state.is_playing();
        self.state.set_playing(playing);
        if playing {
            clock.arm_transport_start();
            player.seek(0);
            player.play();
        } else {
            player.stop();
        }
        self.request(Control::Play, LedState::from(playing));
    }

    fn step_volume(&mut self, control: Control) {
        let current = self.state.volume();
        let volume = match control {
            Control::VolumeDown => current.saturating_sub(VOLUME_STEP),
            _ => current.saturating_add(VOLUME_STEP),
        }
        .clamp(VOLUME_MIN, VOLUME_MAX);
        self.state.set_volume(volume);

        let (down, up) = pair_leds(volume, VOLUME_MIN, VOLUME_MAX, Some(DEFAULT_VOLUME));
        self.request(Control::VolumeDown, down);
        self.request(Control::VolumeUp, up);
    }

    fn step_tempo(&mut self, control: Control, player: &mut dyn Playback) {
        let current = player.current_tempo();
        if self.state.initial_tempo().is_none() {
            self.state.capture_initial_tempo(current);
        }

        let tempo = match control {
            Control::TempoDown => current.saturating_sub(TEMPO_STEP),
            _ => current.saturating_add(TEMPO_STEP),
        }
        .clamp(TEMPO_MIN, TEMPO_MAX);
        player.set_tempo(tempo);
        self.state.set_tempo(tempo);

        let (down, up) = pair_leds(tempo, TEMPO_MIN, TEMPO_MAX, self.state.initial_tempo());
        self.request(Control::TempoDown, down);
        self.request(Control::TempoUp, up);
    }

    fn request(&mut self, control: Control, state: LedState) {
        let (region, column) = control.led_address();
        self.leds.request(region, SURFACE_ROW, column, state);
    }
}

/// LED states of a down/up pair for a bounded value.
fn pair_leds(value: u32, low: u32, high: u32, home: Option<u32>) -> (LedState, LedState) {
    if value == low {
        (LedState::On, LedState::Off)
    } else if value == high {
        (LedState::Off, LedState::On)
    } else if Some(value) == home {
        (LedState::Pending, LedState::Pending)
    } else {
        (LedState::Off, LedState::Off)
    }
}
