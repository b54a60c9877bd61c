//! Media engine seam.
//!
//! The session drives playback through these traits and never decodes audio
//! itself. Engines report back asynchronously through `TrackEvents` and
//! `DurationReply`; both may be used from any thread, and the session applies
//! what they carry on its own thread during `dispatch`.

use std::sync::mpsc::Sender;

use crate::error::EngineError;
use crate::media::MediaFile;
use crate::session::SessionMsg;

mod sink;

pub mod rodio;

/// Load status of the item behind a track handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ItemStatus {
    #[default]
    Unknown,
    ReadyToPlay,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StatusChanged(ItemStatus),
    PlayedToEnd,
    FailedToPlayToEnd(EngineError),
}

/// Completion for an asynchronous duration lookup, in seconds.
pub type DurationReply = Box<dyn FnOnce(Result<f64, EngineError>) + Send + 'static>;

/// Event channel handed to an engine for exactly one track load.
///
/// Events carry the load generation, so anything sent after the session moved
/// on to another track is dropped instead of being applied to the new one.
#[derive(Debug, Clone)]
pub struct TrackEvents {
    tx: Sender<SessionMsg>,
    generation: u64,
}

impl TrackEvents {
    pub(crate) fn new(tx: Sender<SessionMsg>, generation: u64) -> Self {
        Self { tx, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `false` once the session is gone.
    pub fn send(&self, event: EngineEvent) -> bool {
        self.tx
            .send(SessionMsg::Engine {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Creates one handle per track load.
pub trait MediaEngine {
    fn open(
        &mut self,
        file: &MediaFile,
        events: TrackEvents,
    ) -> Result<Box<dyn TrackHandle>, EngineError>;
}

/// A single loaded track. Dropping the handle releases the track and ends its
/// event subscriptions.
pub trait TrackHandle {
    fn play(&mut self);
    fn pause(&mut self);
    /// Seek to an absolute position in seconds.
    fn seek(&mut self, seconds: f64);
    fn set_rate(&mut self, rate: f32);
    fn is_playing(&self) -> bool;
    /// Current position in seconds. May be NaN while the engine does not know.
    fn position(&self) -> f64;
    fn resolve_duration(&mut self, reply: DurationReply);
}
