use serde::Deserialize;

use crate::autostop::AutoStopPolicy;
use crate::media::LoopPolicy;
use crate::options::{AfterAutoStopAction, PlaybackOptions, SessionConfig};

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/segue/config.toml` or `~/.config/segue/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `SEGUE__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub playback: PlaybackSettings,
    pub session: SessionConfig,
    pub controls: ControlsSettings,
    pub library: LibrarySettings,
    pub ui: UiSettings,
}

impl Settings {
    /// Session options built from the `playback` and `session` tables.
    pub fn playback_options(&self) -> PlaybackOptions {
        PlaybackOptions::new(self.playback.now_playing)
            .with_after_auto_stop(self.playback.after_auto_stop)
            .with_session(self.session)
            .with_loop_delay(self.playback.loop_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Publish now-playing info over MPRIS and accept its transport commands.
    pub now_playing: bool,
    /// What happens when an "after this track" auto-stop fires.
    pub after_auto_stop: AfterAutoStopAction,
    /// Pause between two passes of a repeating track (seconds).
    pub loop_delay_secs: f64,
    /// Play every track this many times in total before moving on.
    pub plays_per_track: u32,
    /// Repeat every track until the user moves on. Wins over `plays_per_track`.
    pub repeat_forever: bool,
    /// Countdown lengths offered when cycling the auto-stop timer (seconds).
    pub auto_stop_presets_secs: Vec<u64>,
    /// Timeout for fetching remote tracks (seconds).
    pub fetch_timeout_secs: u64,
    /// Timeout for fetching cover art (seconds).
    pub cover_timeout_secs: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            now_playing: true,
            after_auto_stop: AfterAutoStopAction::PauseCurrentTrack,
            loop_delay_secs: 0.0,
            plays_per_track: 1,
            repeat_forever: false,
            auto_stop_presets_secs: vec![15 * 60, 30 * 60, 60 * 60],
            fetch_timeout_secs: 30,
            cover_timeout_secs: 10,
        }
    }
}

impl PlaybackSettings {
    /// Loop policy applied to every scanned track.
    pub fn loop_policy(&self) -> LoopPolicy {
        if self.repeat_forever {
            LoopPolicy::Infinite
        } else if self.plays_per_track > 1 {
            LoopPolicy::Times(self.plays_per_track)
        } else {
            LoopPolicy::Disabled
        }
    }

    /// Auto-stop policies in the order the `t` key walks through them.
    pub fn auto_stop_cycle(&self) -> Vec<AutoStopPolicy> {
        let mut cycle = vec![AutoStopPolicy::Disabled, AutoStopPolicy::AfterTrackEnd];
        cycle.extend(
            self.auto_stop_presets_secs
                .iter()
                .map(|&secs| AutoStopPolicy::After(secs as f64)),
        );
        cycle
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to seek when pressing `H` / `L`.
    #[serde(alias = "scrub_seconds")]
    pub seek_seconds: u64,
    /// Playback rate change per `[` / `]` press.
    pub rate_step: f32,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            seek_seconds: 5,
            rate_step: 0.25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Whether the cursor follows the track the session switches to.
    pub follow_playback: bool,

    /// The text rendered inside the top "segue" header box.
    pub header_text: String,

    /// Which time fields to show for the status line, and in what order.
    ///
    /// Example: ["elapsed", "total", "remaining"]
    pub now_playing_time_fields: Vec<TimeField>,

    /// Separator used to join `now_playing_time_fields`.
    pub now_playing_time_separator: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            follow_playback: true,
            header_text: " ~ one track into the next ~ ".to_string(),
            now_playing_time_fields: vec![TimeField::Elapsed, TimeField::Total, TimeField::Remaining],
            now_playing_time_separator: " / ".to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeField {
    Elapsed,
    Total,
    Remaining,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    Title,
    Artist,
    Album,
    Filename,
    Path,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
    /// Image file names looked up next to a track and used as its cover.
    pub cover_names: Vec<String>,

    /// Which fields make up a track's title and in what order.
    ///
    /// Example: ["artist", "title"] -> "Artist - Title"
    pub display_fields: Vec<TrackDisplayField>,
    /// Separator used to join `display_fields`.
    pub display_separator: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
            cover_names: vec!["cover.jpg".into(), "folder.jpg".into(), "cover.png".into()],
            display_fields: vec![TrackDisplayField::Artist, TrackDisplayField::Title],
            display_separator: " - ".to_string(),
        }
    }
}
