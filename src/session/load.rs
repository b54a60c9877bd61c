//! Track loading, teardown and engine callbacks.

use super::{LoadedTrack, PlayerSession, SessionMsg, SessionState};
use crate::engine::{EngineEvent, ItemStatus, TrackEvents};
use crate::error::{EngineError, PlayerError};
use crate::events::PlayerEvent;
use crate::media::MediaFile;
use crate::options::PlaybackOptions;
use crate::time::{PlaybackTime, sanitize_seconds};

impl PlayerSession {
    /// Replace the playlist and load (without playing) its first track.
    pub fn set_playlist(&mut self, files: Vec<MediaFile>, options: PlaybackOptions) {
        tracing::info!(tracks = files.len(), "playlist replaced");
        self.pending_play = None;
        self.teardown_track();
        self.playlist = files;
        self.options = options;
        self.index = 0;

        if self.playlist.is_empty() {
            self.state = SessionState::Idle;
            return;
        }
        self.load_track(0);
    }

    /// Tear down the current track and load the one at `index` without playing it.
    pub(super) fn load_track(&mut self, index: usize) {
        let Some(file) = self.playlist.get(index).cloned() else {
            return;
        };
        self.teardown_track();
        self.generation += 1;
        let generation = self.generation;
        self.index = index;
        self.state = SessionState::Loading;
        tracing::debug!(index, locator = %file.locator, generation, "loading track");

        let events = TrackEvents::new(self.tx.clone(), generation);
        let mut handle = match self.engine.open(&file, events) {
            Ok(handle) => handle,
            Err(source) => {
                tracing::warn!(index, %source, "track failed to load");
                self.state = SessionState::Stopped;
                self.events
                    .emit(PlayerEvent::Error(PlayerError::TrackLoadFailed { index, source }));
                return;
            }
        };
        handle.set_rate(self.rate);

        self.activate_audio_session();

        let tx = self.tx.clone();
        handle.resolve_duration(Box::new(move |result| {
            let _ = tx.send(SessionMsg::Duration { generation, result });
        }));

        self.track = Some(LoadedTrack {
            generation,
            handle,
            duration: None,
            time_observer: false,
            published: false,
            completed_plays: 0,
            loop_countdown: None,
        });
    }

    /// Drop the current handle together with its observers. Messages already
    /// in flight for it become stale.
    pub(super) fn teardown_track(&mut self) {
        if let Some(mut track) = self.track.take() {
            track.handle.pause();
            tracing::debug!(generation = track.generation, "track torn down");
        }
    }

    fn activate_audio_session(&mut self) {
        let activated = self
            .audio_session
            .configure(&self.options.session)
            .and_then(|()| self.audio_session.set_active(true));
        match activated {
            Ok(()) => self.audio_session.set_remote_control_events(true),
            Err(err) => {
                tracing::warn!(%err, "audio session activation failed");
                self.events
                    .emit(PlayerEvent::Error(PlayerError::AudioSessionActivationFailed(err)));
            }
        }
    }

    pub(super) fn deactivate_audio_session(&mut self) {
        self.audio_session.set_remote_control_events(false);
        if let Err(err) = self.audio_session.set_active(false) {
            tracing::warn!(%err, "audio session deactivation failed");
            self.events
                .emit(PlayerEvent::Error(PlayerError::AudioSessionDeactivationFailed(err)));
        }
    }

    pub(super) fn apply_duration(&mut self, result: Result<f64, EngineError>) {
        let index = self.index;
        let duration = match result {
            Ok(seconds) => sanitize_seconds(seconds),
            Err(source) => {
                tracing::warn!(index, %source, "duration unavailable");
                self.events.emit(PlayerEvent::Error(
                    PlayerError::DurationResolutionFailed { index, source },
                ));
                0.0
            }
        };

        let Some(track) = self.track.as_mut() else {
            return;
        };
        track.duration = Some(duration);
        track.time_observer = true;
        if self.state == SessionState::Loading {
            self.state = SessionState::Ready;
        }
        self.events
            .emit(PlayerEvent::TimeUpdated(PlaybackTime::start_of(duration)));
        self.refresh_now_playing();
    }

    pub(super) fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::StatusChanged(status) => {
                match status {
                    ItemStatus::ReadyToPlay if self.state == SessionState::Loading => {
                        self.state = SessionState::Ready;
                    }
                    ItemStatus::Failed => self.halt_track(),
                    _ => {}
                }
                self.events.emit(PlayerEvent::StatusUpdated(status));
            }
            EngineEvent::PlayedToEnd => self.handle_track_end(),
            EngineEvent::FailedToPlayToEnd(source) => {
                let index = self.index;
                tracing::warn!(index, %source, "track failed to play to the end");
                self.events
                    .emit(PlayerEvent::Error(PlayerError::TrackPlaybackFailed { index, source }));
                // Whatever the engine still reports for this load is stale from here on.
                self.halt_track();
                self.teardown_track();
                self.now_playing.dismiss();
            }
        }
    }

    /// Stop driving a track the engine gave up on. The auto-stop countdown is
    /// held rather than cancelled; a later `play` reloads the track.
    fn halt_track(&mut self) {
        self.pending_play = None;
        if let Some(track) = self.track.as_mut() {
            track.handle.pause();
            track.loop_countdown = None;
        }
        self.auto_stop.pause_timer();
        self.state = SessionState::Stopped;
    }
}
