//! Application model types: `App` and auto-stop cycling.

use segue::library::Track;
use segue::{AutoStopPolicy, PlaybackTime, PlayerEvent, SessionState};

/// The main application model.
pub struct App {
    pub tracks: Vec<Track>,
    pub selected: usize,

    pub state: SessionState,
    /// Index of the track the session has loaded, if any.
    pub playing_index: Option<usize>,
    pub time: Option<PlaybackTime>,
    pub rate: f32,
    pub auto_stop: AutoStopPolicy,
    pub auto_stop_remaining: Option<f64>,
    pub last_error: Option<String>,

    pub follow_playback: bool,
    pub current_dir: Option<String>,
}

impl App {
    /// Create a new `App` with the provided list of `tracks`.
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            selected: 0,
            state: SessionState::Idle,
            playing_index: None,
            time: None,
            rate: 1.0,
            auto_stop: AutoStopPolicy::Disabled,
            auto_stop_remaining: None,
            last_error: None,
            follow_playback: true,
            current_dir: None,
        }
    }

    /// Fold a session event into the model.
    pub fn apply_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::StartedPlaying => self.last_error = None,
            PlayerEvent::Stopped => {
                self.time = None;
                self.auto_stop_remaining = None;
            }
            PlayerEvent::TimeUpdated(t) => self.time = Some(*t),
            PlayerEvent::AutoStopTimeUpdated(remaining) => {
                self.auto_stop_remaining = Some(*remaining);
            }
            PlayerEvent::AutoStopPolicyUpdated(policy) => {
                self.auto_stop = *policy;
                if !matches!(policy, AutoStopPolicy::After(_)) {
                    self.auto_stop_remaining = None;
                }
            }
            PlayerEvent::SwitchedToTrack(index) => {
                self.playing_index = Some(*index);
                self.time = None;
                if self.follow_playback && *index < self.tracks.len() {
                    self.selected = *index;
                }
            }
            PlayerEvent::Error(err) => self.last_error = Some(err.to_string()),
            PlayerEvent::Paused
            | PlayerEvent::FinishedPlaying
            | PlayerEvent::StatusUpdated(_) => {}
        }
    }

    /// Enable following playback (cursor follows the session's track).
    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }
    /// Disable follow-playback.
    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }
    /// Record the current directory in the app state.
    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }
    /// Set the selected track index, clamped to the library.
    pub fn set_selected(&mut self, idx: usize) {
        self.selected = idx.min(self.tracks.len().saturating_sub(1));
    }
    /// Return true if the library contains any tracks.
    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    /// Move selection to the next track, wrapping to the first.
    pub fn next(&mut self) {
        if self.has_tracks() {
            self.selected = (self.selected + 1) % self.tracks.len();
        }
    }

    /// Move selection to the previous track, wrapping to the last.
    pub fn prev(&mut self) {
        if self.has_tracks() {
            self.selected = match self.selected {
                0 => self.tracks.len() - 1,
                i => i - 1,
            };
        }
    }
}

/// The policy after `current` in `cycle`, wrapping around.
///
/// Anything not in the cycle (or an empty cycle) goes back to `Disabled`.
pub fn next_auto_stop(cycle: &[AutoStopPolicy], current: AutoStopPolicy) -> AutoStopPolicy {
    cycle
        .iter()
        .position(|p| *p == current)
        .and_then(|i| cycle.get((i + 1) % cycle.len()))
        .copied()
        .unwrap_or(AutoStopPolicy::Disabled)
}
