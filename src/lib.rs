//! Playback-session coordinator.
//!
//! A `PlayerSession` owns a playlist and drives one track at a time through a
//! `MediaEngine`, with an auto-stop timer, an audio session and a now-playing
//! bridge to the desktop. Everything observable is reported as `PlayerEvent`s.

pub mod audio_session;
pub mod autostop;
pub mod config;
pub mod cover;
pub mod engine;
pub mod error;
pub mod events;
pub mod library;
pub mod media;
pub mod mpris;
pub mod nowplaying;
pub mod options;
pub mod session;
pub mod time;

pub use autostop::AutoStopPolicy;
pub use error::PlayerError;
pub use events::PlayerEvent;
pub use media::{Artwork, LoopPolicy, MediaFile};
pub use options::{AfterAutoStopAction, PlaybackOptions};
pub use session::{PlayerSession, SessionState};
pub use time::PlaybackTime;
