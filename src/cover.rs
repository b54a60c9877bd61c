//! Cover art loading for the now-playing display.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::media::{Artwork, is_remote_locator, local_path};

/// Completion for a cover lookup. `None` means no artwork; failures are not errors.
pub type CoverReply = Box<dyn FnOnce(Option<Artwork>) + Send + 'static>;

pub trait CoverFetcher {
    /// Load the image behind `locator` and call `done` exactly once, from any thread.
    fn fetch(&self, locator: &str, done: CoverReply);
}

/// Never finds artwork.
#[derive(Debug, Default)]
pub struct NoCovers;

impl CoverFetcher for NoCovers {
    fn fetch(&self, _locator: &str, done: CoverReply) {
        done(None);
    }
}

/// Fetches covers on a worker thread, over HTTP(S) or from disk.
#[derive(Debug, Clone)]
pub struct HttpCoverFetcher {
    timeout: Duration,
}

impl Default for HttpCoverFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl HttpCoverFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CoverFetcher for HttpCoverFetcher {
    fn fetch(&self, locator: &str, done: CoverReply) {
        let locator = locator.to_string();
        let timeout = self.timeout;
        // Shared so the reply still fires when the worker never starts.
        let reply = Arc::new(Mutex::new(Some(done)));
        let worker_reply = reply.clone();
        let spawned = thread::Builder::new()
            .name("segue-cover".into())
            .spawn(move || {
                let artwork = match load_cover(&locator, timeout) {
                    Ok(bytes) => Some(Artwork::from_bytes(bytes).with_source(locator)),
                    Err(err) => {
                        tracing::warn!(%locator, %err, "cover art unavailable");
                        None
                    }
                };
                if let Some(done) = take_reply(&worker_reply) {
                    done(artwork);
                }
            });
        if let Err(err) = spawned {
            tracing::warn!(%err, "failed to spawn cover fetch thread");
            if let Some(done) = take_reply(&reply) {
                done(None);
            }
        }
    }
}

fn take_reply(slot: &Mutex<Option<CoverReply>>) -> Option<CoverReply> {
    slot.lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take()
}

fn load_cover(locator: &str, timeout: Duration) -> Result<Vec<u8>, String> {
    if is_remote_locator(locator) {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;
        let response = client
            .get(locator)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        let bytes = response.bytes().map_err(|e| e.to_string())?;
        Ok(bytes.to_vec())
    } else {
        std::fs::read(local_path(locator)).map_err(|e| e.to_string())
    }
}
