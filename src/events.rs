//! Session events and the subscriber list they are delivered through.
//!
//! Subscribers hold the receiving end of a channel. The session only keeps the
//! sending ends, so it never keeps a subscriber alive; dropping a receiver
//! unsubscribes it on the next emit.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::autostop::AutoStopPolicy;
use crate::engine::ItemStatus;
use crate::error::PlayerError;
use crate::time::PlaybackTime;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    StartedPlaying,
    Paused,
    Stopped,
    FinishedPlaying,
    TimeUpdated(PlaybackTime),
    /// Seconds left on an `After` auto-stop countdown.
    AutoStopTimeUpdated(f64),
    AutoStopPolicyUpdated(AutoStopPolicy),
    SwitchedToTrack(usize),
    StatusUpdated(ItemStatus),
    Error(PlayerError),
}

#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Vec<Sender<PlayerEvent>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<PlayerEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: PlayerEvent) {
        tracing::trace!(?event, "session event");
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
