//! Error types reported by the session and its collaborators.
//!
//! None of these cross the public session API as `Err` values: the session
//! reports them through `PlayerEvent::Error` and stays usable.

use thiserror::Error;

/// Failure inside the media engine collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no audio output available: {0}")]
    Output(String),
    #[error("failed to read {locator}: {reason}")]
    Read { locator: String, reason: String },
    #[error("failed to decode {locator}: {reason}")]
    Decode { locator: String, reason: String },
    #[error("duration unavailable: {0}")]
    Duration(String),
}

/// Failure inside the audio session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AudioSessionError(pub String);

/// Errors surfaced to session subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("audio session activation failed: {0}")]
    AudioSessionActivationFailed(AudioSessionError),
    #[error("audio session deactivation failed: {0}")]
    AudioSessionDeactivationFailed(AudioSessionError),
    #[error("track {index} could not be loaded: {source}")]
    TrackLoadFailed { index: usize, source: EngineError },
    #[error("track {index} failed to play to the end: {source}")]
    TrackPlaybackFailed { index: usize, source: EngineError },
    #[error("duration of track {index} could not be resolved: {source}")]
    DurationResolutionFailed { index: usize, source: EngineError },
}
