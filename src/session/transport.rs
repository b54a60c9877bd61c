//! Transport controls, navigation and the track-end protocol.

use super::{MAX_RATE, MIN_RATE, PlayerSession, SessionMsg, SessionState};
use crate::autostop::AutoStopPolicy;
use crate::events::PlayerEvent;
use crate::nowplaying::{ArtworkLookup, CommandStatus, NowPlayingBridge, RemoteCommand};
use crate::options::AfterAutoStopAction;
use crate::time::sanitize_seconds;

impl PlayerSession {
    /// Start playing the current track, reloading it first if it was stopped.
    ///
    /// With now-playing enabled the track info is published before playback
    /// starts. When the cover has to be fetched, playback starts once the fetch
    /// completes (see [`PlayerSession::dispatch`]).
    pub fn play(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        if self.track.is_none() {
            self.load_track(self.index);
        }
        let Some((generation, published)) = self.track.as_ref().map(|t| (t.generation, t.published))
        else {
            return;
        };

        if !self.options.display_now_playing {
            self.start_playing();
            return;
        }
        if published {
            self.start_playing();
            return;
        }
        if self.pending_play == Some(generation) {
            return;
        }

        let Some(file) = self.playlist.get(self.index) else {
            return;
        };
        let tx = self.tx.clone();
        let lookup = self.now_playing.lookup_artwork(
            file,
            Box::new(move |artwork| {
                let _ = tx.send(SessionMsg::Cover {
                    generation,
                    artwork,
                });
            }),
        );
        match lookup {
            ArtworkLookup::Ready(artwork) => {
                self.publish_now_playing(artwork);
                self.start_playing();
            }
            ArtworkLookup::Pending => {
                tracing::debug!(generation, "waiting for cover art before playing");
                self.pending_play = Some(generation);
            }
        }
    }

    pub(super) fn start_playing(&mut self) {
        let Some(track) = self.track.as_mut() else {
            return;
        };
        track.loop_countdown = None;
        track.handle.set_rate(self.rate);
        track.handle.play();
        self.state = SessionState::Playing;

        let playing = self.is_playing();
        self.auto_stop.start_timer(playing);
        self.refresh_now_playing();
        self.events.emit(PlayerEvent::StartedPlaying);
    }

    pub fn pause(&mut self) {
        self.pending_play = None;
        if let Some(track) = self.track.as_mut() {
            track.handle.pause();
            track.loop_countdown = None;
            if matches!(
                self.state,
                SessionState::Loading | SessionState::Ready | SessionState::Playing
            ) {
                self.state = SessionState::Paused;
            }
        }
        self.auto_stop.pause_timer();
        self.refresh_now_playing();
        self.events.emit(PlayerEvent::Paused);
    }

    pub fn toggle_play_pause(&mut self) {
        if self.is_playing() || self.pending_play.is_some() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Stop playback and release the track, the audio session and the
    /// now-playing display. Any auto-stop policy is reset to `Disabled`.
    pub fn stop(&mut self) {
        self.pending_play = None;
        if let Some(track) = self.track.as_mut() {
            track.handle.pause();
            track.handle.seek(0.0);
        }
        let had_policy = !self.auto_stop.policy().is_disabled();
        self.auto_stop.cancel_timer();
        self.teardown_track();
        self.deactivate_audio_session();
        self.now_playing.dismiss();

        self.state = if self.playlist.is_empty() {
            SessionState::Idle
        } else {
            SessionState::Stopped
        };
        self.events.emit(PlayerEvent::Stopped);
        if had_policy {
            self.events
                .emit(PlayerEvent::AutoStopPolicyUpdated(AutoStopPolicy::Disabled));
        }
    }

    /// Seek to an absolute position in seconds.
    pub fn seek(&mut self, seconds: f64) {
        let Some(track) = self.track.as_mut() else {
            return;
        };
        track.handle.seek(sanitize_seconds(seconds));
        self.refresh_now_playing();
    }

    /// Seek relative to the current position, clamped to the track.
    pub fn seek_forward(&mut self, seconds: f64) {
        self.seek_by(seconds);
    }

    pub fn seek_backward(&mut self, seconds: f64) {
        self.seek_by(-seconds);
    }

    fn seek_by(&mut self, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        let Some(track) = self.track.as_ref() else {
            return;
        };
        let current = sanitize_seconds(track.handle.position());
        let mut target = (current + delta).max(0.0);
        if let Some(duration) = track.duration.filter(|d| *d > 0.0) {
            target = target.min(duration);
        }
        self.seek(target);
    }

    /// Set the playback rate, clamped to `MIN_RATE..=MAX_RATE`. NaN resets to 1.
    pub fn set_playback_rate(&mut self, rate: f32) {
        let rate = if rate.is_nan() {
            1.0
        } else {
            rate.clamp(MIN_RATE, MAX_RATE)
        };
        self.rate = rate;
        if let Some(track) = self.track.as_mut() {
            track.handle.set_rate(rate);
        }
        self.refresh_now_playing();
    }

    /// Switch to the track at `index` and play it. Out-of-range indices are ignored.
    ///
    /// The previous track is fully stopped first, so any auto-stop policy is
    /// cancelled and subscribers see `Stopped` before `SwitchedToTrack`.
    pub fn play_track(&mut self, index: usize) {
        if index >= self.playlist.len() {
            tracing::debug!(index, len = self.playlist.len(), "ignoring out-of-range track");
            return;
        }
        tracing::info!(index, "switching track");
        self.stop();
        self.load_track(index);
        self.play();
        self.events.emit(PlayerEvent::SwitchedToTrack(index));
    }

    /// Play the following track, or stop at the end of the playlist.
    pub fn play_next_track(&mut self) {
        if self.can_play_next() {
            self.play_track(self.index + 1);
        } else {
            self.stop();
        }
    }

    /// Play the preceding track. Does nothing on the first one.
    pub fn play_previous_track(&mut self) {
        if self.can_play_previous() {
            self.play_track(self.index - 1);
        }
    }

    pub fn setup_auto_stop(&mut self, policy: AutoStopPolicy) {
        tracing::info!(?policy, "auto-stop policy set");
        let playing = self.is_playing();
        let notices = self.auto_stop.setup(policy, playing);
        self.apply_auto_stop_notices(notices);
    }

    pub(super) fn handle_track_end(&mut self) {
        tracing::debug!(index = self.index, "track played to end");
        self.events.emit(PlayerEvent::FinishedPlaying);

        let repeat = match (self.track.as_mut(), self.playlist.get(self.index)) {
            (Some(track), Some(file)) => {
                track.completed_plays += 1;
                file.loop_policy.should_repeat(track.completed_plays)
            }
            _ => false,
        };

        if self.auto_stop.policy() == AutoStopPolicy::AfterTrackEnd {
            let notices = self.auto_stop.setup(AutoStopPolicy::Disabled, false);
            self.apply_auto_stop_notices(notices);
            self.apply_after_auto_stop(self.options.after_auto_stop);
        } else if repeat {
            self.restart_loop();
        } else {
            self.play_next_track();
        }
    }

    fn apply_after_auto_stop(&mut self, action: AfterAutoStopAction) {
        tracing::info!(?action, "auto-stop at track end");
        match action {
            AfterAutoStopAction::PauseCurrentTrack => self.pause(),
            AfterAutoStopAction::PauseAndLoadNextTrack => {
                self.pause();
                if self.can_play_next() {
                    let next = self.index + 1;
                    self.load_track(next);
                    self.events.emit(PlayerEvent::SwitchedToTrack(next));
                }
            }
            AfterAutoStopAction::ResetCurrentTrack => {
                self.pause();
                self.load_track(self.index);
            }
            AfterAutoStopAction::Stop => self.stop(),
        }
    }

    fn restart_loop(&mut self) {
        let ticks = self.options.loop_delay_ticks();
        let Some(track) = self.track.as_mut() else {
            return;
        };
        track.handle.seek(0.0);
        if ticks == 0 {
            self.start_playing();
        } else {
            tracing::debug!(ticks, "delaying next loop pass");
            track.loop_countdown = Some(ticks);
        }
    }

    pub(super) fn advance_loop_countdown(&mut self) {
        let Some(track) = self.track.as_mut() else {
            return;
        };
        let countdown = track.loop_countdown;
        match countdown {
            Some(left) if left > 1 => track.loop_countdown = Some(left - 1),
            Some(_) => self.start_playing(),
            None => {}
        }
    }

    pub(super) fn handle_remote_command(&mut self, command: RemoteCommand) -> CommandStatus {
        let status = NowPlayingBridge::evaluate(command, &*self);
        tracing::debug!(?command, ?status, "remote command");
        if status != CommandStatus::Success {
            return status;
        }
        match command {
            RemoteCommand::Play => self.play(),
            RemoteCommand::Pause => self.pause(),
            RemoteCommand::TogglePlayPause => self.toggle_play_pause(),
            RemoteCommand::Stop => self.stop(),
            RemoteCommand::Next => self.play_next_track(),
            RemoteCommand::Previous => self.play_previous_track(),
        }
        status
    }
}
