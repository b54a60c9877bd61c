//! Utilities for creating `rodio` sinks from in-memory audio.
//!
//! Tracks are read fully into memory once (from disk or over HTTP) so that a
//! sink can be rebuilt at any start offset without touching the source again.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use lofty::prelude::*;
use lofty::probe::Probe;
use rodio::mixer::Mixer;
use rodio::{Decoder, Sink, Source};

use crate::error::EngineError;
use crate::media::{is_remote_locator, local_path};

pub(super) type AudioBytes = Arc<[u8]>;

/// Read the whole resource behind `locator`.
pub(super) fn read_bytes(locator: &str, timeout: Duration) -> Result<AudioBytes, EngineError> {
    let read_err = |reason: String| EngineError::Read {
        locator: locator.to_string(),
        reason,
    };

    if is_remote_locator(locator) {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| read_err(e.to_string()))?;
        let body = client
            .get(locator)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .map_err(|e| read_err(e.to_string()))?;
        Ok(Arc::from(&body[..]))
    } else {
        let data = std::fs::read(local_path(locator)).map_err(|e| read_err(e.to_string()))?;
        Ok(Arc::from(data))
    }
}

/// Create a paused `Sink` for `bytes` that starts playback at `start_at`.
///
/// Also returns the decoder's idea of the total length, when it has one.
pub(super) fn create_sink_at(
    mixer: &Mixer,
    locator: &str,
    bytes: &AudioBytes,
    start_at: Duration,
) -> Result<(Sink, Option<Duration>), EngineError> {
    let source = Decoder::new(Cursor::new(bytes.clone())).map_err(|e| EngineError::Decode {
        locator: locator.to_string(),
        reason: e.to_string(),
    })?;
    let total = source.total_duration();

    // `skip_duration` is our fallback seeking primitive; even Duration::ZERO is fine.
    let sink = Sink::connect_new(mixer);
    sink.append(source.skip_duration(start_at));
    sink.pause();
    Ok((sink, total))
}

/// Read the track length from the container headers.
pub(super) fn probe_duration(bytes: &AudioBytes) -> Option<Duration> {
    let tagged = Probe::new(Cursor::new(bytes.clone()))
        .guess_file_type()
        .ok()?
        .read()
        .ok()?;
    let duration = tagged.properties().duration();
    (!duration.is_zero()).then_some(duration)
}
