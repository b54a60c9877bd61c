//! Session options: now-playing, post auto-stop behavior, audio session setup
//! and loop delay.

use serde::Deserialize;

/// What the session does when an "after current track" auto-stop fires.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AfterAutoStopAction {
    /// Pause at the end of the finished track.
    #[default]
    #[serde(alias = "pause")]
    PauseCurrentTrack,
    /// Pause and load (without playing) the next track, if there is one.
    #[serde(alias = "pause-and-advance")]
    PauseAndLoadNextTrack,
    /// Pause and reload the finished track from the start.
    #[serde(alias = "reset")]
    ResetCurrentTrack,
    /// Full stop.
    Stop,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionCategory {
    Ambient,
    SoloAmbient,
    #[default]
    Playback,
    PlayAndRecord,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    #[default]
    Default,
    SpokenAudio,
    MoviePlayback,
}

/// Routing flags applied together with the category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct SessionFlags {
    pub mix_with_others: bool,
    pub duck_others: bool,
    pub allow_bluetooth: bool,
}

/// Audio session configuration applied on every track load.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub category: SessionCategory,
    pub mode: SessionMode,
    pub flags: SessionFlags,
}

/// Options for a playback session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOptions {
    /// Publish now-playing info and accept transport commands from the desktop.
    pub display_now_playing: bool,
    pub after_auto_stop: AfterAutoStopAction,
    pub session: SessionConfig,
    loop_delay: f64,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            display_now_playing: false,
            after_auto_stop: AfterAutoStopAction::default(),
            session: SessionConfig::default(),
            loop_delay: 0.0,
        }
    }
}

impl PlaybackOptions {
    pub fn new(display_now_playing: bool) -> Self {
        Self {
            display_now_playing,
            ..Self::default()
        }
    }

    pub fn with_after_auto_stop(mut self, action: AfterAutoStopAction) -> Self {
        self.after_auto_stop = action;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Pause between two passes of a looping file. Stored as an absolute value.
    pub fn with_loop_delay(mut self, seconds: f64) -> Self {
        self.set_loop_delay(seconds);
        self
    }

    pub fn set_loop_delay(&mut self, seconds: f64) {
        self.loop_delay = if seconds.is_finite() { seconds.abs() } else { 0.0 };
    }

    pub fn loop_delay(&self) -> f64 {
        self.loop_delay
    }

    /// Loop delay expressed in whole one-second ticks, rounding partial seconds up.
    pub fn loop_delay_ticks(&self) -> u32 {
        self.loop_delay.ceil().min(u32::MAX as f64) as u32
    }
}
