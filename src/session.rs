//! Playback session coordinator.
//!
//! `PlayerSession` owns the playlist and the current track and is the only
//! place playback state changes. It is single-threaded: engines, cover
//! fetchers and remote controls post messages into its channel from whatever
//! thread they run on, and the owner applies them by calling
//! [`PlayerSession::dispatch`]. Time-based behavior (time updates, the auto-stop
//! countdown, loop delays) advances once per [`PlayerSession::tick`], which the
//! owner calls every second.
//!
//! Each track load gets a fresh generation number. Messages tagged with an
//! older generation belong to a track that has since been torn down and are
//! dropped.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::audio_session::AudioSession;
use crate::autostop::{AutoStopNotice, AutoStopPolicy, AutoStopService};
use crate::engine::{EngineEvent, MediaEngine, TrackHandle};
use crate::error::EngineError;
use crate::events::{EventHub, PlayerEvent};
use crate::media::{Artwork, MediaFile};
use crate::nowplaying::{
    CommandStatus, NowPlayingBridge, NowPlayingInfo, PlaybackQuery, RemoteCommand, RemoteControl,
};
use crate::options::PlaybackOptions;
use crate::time::{PlaybackTime, sanitize_seconds};

mod load;
mod transport;

pub const MIN_RATE: f32 = 0.5;
pub const MAX_RATE: f32 = 2.0;

/// Messages posted into the session from collaborators.
#[derive(Debug)]
pub(crate) enum SessionMsg {
    Engine {
        generation: u64,
        event: EngineEvent,
    },
    Duration {
        generation: u64,
        result: Result<f64, EngineError>,
    },
    Cover {
        generation: u64,
        artwork: Option<Artwork>,
    },
    Remote {
        command: RemoteCommand,
        reply: Option<Sender<CommandStatus>>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No playlist yet, or an empty one.
    #[default]
    Idle,
    /// A track handle exists but its duration is not known yet.
    Loading,
    Ready,
    Playing,
    Paused,
    Stopped,
}

/// The track currently owned by the session.
struct LoadedTrack {
    generation: u64,
    handle: Box<dyn TrackHandle>,
    duration: Option<f64>,
    time_observer: bool,
    /// Now-playing info was published for this load.
    published: bool,
    completed_plays: u32,
    /// Ticks left before a looping file starts its next pass.
    loop_countdown: Option<u32>,
}

pub struct PlayerSession {
    engine: Box<dyn MediaEngine>,
    audio_session: Box<dyn AudioSession>,
    now_playing: NowPlayingBridge,
    auto_stop: AutoStopService,
    events: EventHub,
    tx: Sender<SessionMsg>,
    rx: Receiver<SessionMsg>,

    playlist: Vec<MediaFile>,
    options: PlaybackOptions,
    index: usize,
    state: SessionState,
    rate: f32,
    generation: u64,
    track: Option<LoadedTrack>,
    /// Load generation whose playback waits on a cover fetch.
    pending_play: Option<u64>,
}

impl PlayerSession {
    pub fn new(
        engine: Box<dyn MediaEngine>,
        audio_session: Box<dyn AudioSession>,
        mut now_playing: NowPlayingBridge,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        now_playing.attach(RemoteControl::new(tx.clone()));
        Self {
            engine,
            audio_session,
            now_playing,
            auto_stop: AutoStopService::new(),
            events: EventHub::new(),
            tx,
            rx,
            playlist: Vec::new(),
            options: PlaybackOptions::default(),
            index: 0,
            state: SessionState::Idle,
            rate: 1.0,
            generation: 0,
            track: None,
            pending_play: None,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// Handle for sending transport commands from other threads.
    pub fn remote_control(&self) -> RemoteControl {
        RemoteControl::new(self.tx.clone())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn playlist(&self) -> &[MediaFile] {
        &self.playlist
    }

    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    /// Index of the current track. Meaningless while the playlist is empty.
    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_file(&self) -> Option<&MediaFile> {
        self.playlist.get(self.index)
    }

    pub fn is_playing(&self) -> bool {
        self.track.as_ref().is_some_and(|t| t.handle.is_playing())
    }

    pub fn can_play_next(&self) -> bool {
        !self.playlist.is_empty() && self.index + 1 < self.playlist.len()
    }

    pub fn can_play_previous(&self) -> bool {
        !self.playlist.is_empty() && self.index > 0
    }

    pub fn playback_rate(&self) -> f32 {
        self.rate
    }

    pub fn auto_stop_policy(&self) -> AutoStopPolicy {
        self.auto_stop.policy()
    }

    pub fn auto_stop_remaining(&self) -> Option<f64> {
        match self.auto_stop.policy() {
            AutoStopPolicy::After(_) => Some(self.auto_stop.remaining()),
            _ => None,
        }
    }

    /// Current position and duration, once the duration is known.
    pub fn current_time(&self) -> Option<PlaybackTime> {
        let track = self.track.as_ref()?;
        let duration = track.duration?;
        Some(PlaybackTime::new(track.handle.position(), duration))
    }

    /// Whether a track handle and its event subscriptions are live.
    pub fn has_observers(&self) -> bool {
        self.track.is_some()
    }

    pub fn has_time_observer(&self) -> bool {
        self.track.as_ref().is_some_and(|t| t.time_observer)
    }

    pub fn now_playing_published(&self) -> bool {
        self.now_playing.is_published()
    }

    /// Apply everything collaborators posted since the last call.
    /// Returns the number of messages handled.
    pub fn dispatch(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(msg) = self.rx.try_recv() {
            self.handle_message(msg);
            handled += 1;
        }
        handled
    }

    /// Advance one second: periodic time update, auto-stop countdown and any
    /// pending loop restart.
    pub fn tick(&mut self) {
        if self.is_playing() {
            if let Some(time) = self.current_time() {
                self.events.emit(PlayerEvent::TimeUpdated(time));
            }
        }

        let notices = self.auto_stop.tick();
        self.apply_auto_stop_notices(notices);

        self.advance_loop_countdown();
    }

    fn handle_message(&mut self, msg: SessionMsg) {
        match msg {
            SessionMsg::Engine { generation, event } => {
                if self.is_current(generation) {
                    self.handle_engine_event(event);
                } else {
                    tracing::debug!(generation, ?event, "dropping stale engine event");
                }
            }
            SessionMsg::Duration { generation, result } => {
                if self.is_current(generation) {
                    self.apply_duration(result);
                } else {
                    tracing::debug!(generation, "dropping stale duration");
                }
            }
            SessionMsg::Cover {
                generation,
                artwork,
            } => {
                if self.pending_play == Some(generation) && self.is_current(generation) {
                    self.pending_play = None;
                    self.publish_now_playing(artwork);
                    self.start_playing();
                } else {
                    tracing::debug!(generation, "dropping stale cover");
                }
            }
            SessionMsg::Remote { command, reply } => {
                let status = self.handle_remote_command(command);
                if let Some(reply) = reply {
                    let _ = reply.send(status);
                }
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.track
            .as_ref()
            .is_some_and(|t| t.generation == generation)
    }

    fn apply_auto_stop_notices(&mut self, notices: Vec<AutoStopNotice>) {
        for notice in notices {
            match notice {
                AutoStopNotice::Remaining(seconds) => {
                    self.events.emit(PlayerEvent::AutoStopTimeUpdated(seconds));
                }
                AutoStopNotice::PolicyChanged(policy) => {
                    self.events.emit(PlayerEvent::AutoStopPolicyUpdated(policy));
                }
                AutoStopNotice::StopRequested => {
                    tracing::info!("auto-stop countdown reached zero, stopping");
                    self.stop();
                }
            }
        }
    }

    fn publish_now_playing(&mut self, artwork: Option<Artwork>) {
        let info = NowPlayingInfo::capture(&*self, artwork);
        self.now_playing.publish(info);
        if let Some(track) = self.track.as_mut() {
            track.published = true;
        }
    }

    /// Re-publish the current track. Only a track that was itself published
    /// is refreshed, so the cached artwork always belongs to it.
    fn refresh_now_playing(&mut self) {
        let current_published = self.track.as_ref().is_some_and(|t| t.published);
        if !self.options.display_now_playing || !current_published {
            return;
        }
        let info = NowPlayingInfo::capture(&*self, self.now_playing.artwork().cloned());
        self.now_playing.refresh(info);
    }
}

impl PlaybackQuery for PlayerSession {
    fn is_playing_now(&self) -> bool {
        self.is_playing()
    }

    fn can_play_next(&self) -> bool {
        PlayerSession::can_play_next(self)
    }

    fn can_play_previous(&self) -> bool {
        PlayerSession::can_play_previous(self)
    }

    fn current_index(&self) -> Option<usize> {
        self.current_file().map(|_| self.index)
    }

    fn current_file(&self) -> Option<&MediaFile> {
        PlayerSession::current_file(self)
    }

    fn elapsed(&self) -> Option<f64> {
        self.track
            .as_ref()
            .map(|t| sanitize_seconds(t.handle.position()))
    }

    fn duration(&self) -> Option<f64> {
        self.track.as_ref().and_then(|t| t.duration)
    }

    fn rate(&self) -> f32 {
        self.rate
    }
}

#[cfg(test)]
mod tests;
