use std::time::Duration;

use segue::audio_session::LocalAudioSession;
use segue::config;
use segue::cover::HttpCoverFetcher;
use segue::engine::rodio::RodioEngine;
use segue::error::EngineError;
use segue::library::Track;
use segue::mpris::MprisDisplay;
use segue::nowplaying::NowPlayingBridge;
use segue::{MediaFile, PlayerSession};

/// Build a session on the default output device.
///
/// MPRIS is only registered when now-playing is enabled.
pub fn build_session(settings: &config::Settings) -> Result<PlayerSession, EngineError> {
    let engine = RodioEngine::open_default()?
        .with_fetch_timeout(Duration::from_secs(settings.playback.fetch_timeout_secs));

    let now_playing = if settings.playback.now_playing {
        let covers = HttpCoverFetcher::new(Duration::from_secs(settings.playback.cover_timeout_secs));
        NowPlayingBridge::new(Box::new(MprisDisplay::spawn("segue")), Box::new(covers))
    } else {
        NowPlayingBridge::disabled()
    };

    Ok(PlayerSession::new(
        Box::new(engine),
        Box::new(LocalAudioSession::new()),
        now_playing,
    ))
}

pub fn playlist(tracks: &[Track], settings: &config::Settings) -> Vec<MediaFile> {
    let policy = settings.playback.loop_policy();
    tracks.iter().map(|t| t.media_file(policy)).collect()
}
