//! Process-wide audio session: routing category and activation.

use crate::error::AudioSessionError;
use crate::options::{SessionCategory, SessionConfig};

pub trait AudioSession {
    fn configure(&mut self, config: &SessionConfig) -> Result<(), AudioSessionError>;
    fn set_active(&mut self, active: bool) -> Result<(), AudioSessionError>;
    /// Whether remote control events (media keys, desktop widgets) reach us.
    fn set_remote_control_events(&mut self, enabled: bool);
}

/// Session bookkeeping for desktops without a system-level audio session.
///
/// Linux and friends have nothing to negotiate with, so this only validates the
/// requested configuration and records what the platform would have been told.
#[derive(Debug, Default)]
pub struct LocalAudioSession {
    config: Option<SessionConfig>,
    active: bool,
    remote_events: bool,
}

impl LocalAudioSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn receives_remote_events(&self) -> bool {
        self.remote_events
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }
}

impl AudioSession for LocalAudioSession {
    fn configure(&mut self, config: &SessionConfig) -> Result<(), AudioSessionError> {
        // Ducking other apps requires mixing with them.
        if config.flags.duck_others && !config.flags.mix_with_others {
            return Err(AudioSessionError(
                "duck_others requires mix_with_others".into(),
            ));
        }
        if config.category == SessionCategory::Ambient && config.flags.allow_bluetooth {
            tracing::debug!("bluetooth routing has no effect for the ambient category");
        }
        tracing::debug!(?config, "audio session configured");
        self.config = Some(*config);
        Ok(())
    }

    fn set_active(&mut self, active: bool) -> Result<(), AudioSessionError> {
        if active && self.config.is_none() {
            return Err(AudioSessionError("session activated before configuration".into()));
        }
        if self.active != active {
            tracing::debug!(active, "audio session activation changed");
        }
        self.active = active;
        Ok(())
    }

    fn set_remote_control_events(&mut self, enabled: bool) {
        self.remote_events = enabled;
    }
}
