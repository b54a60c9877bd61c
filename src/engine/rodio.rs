//! `MediaEngine` backed by `rodio`.
//!
//! Each opened track gets its own worker thread. The worker reads and decodes
//! the track, reports readiness and duration, then keeps polling the sink to
//! notice the end of the track. The handle and the worker share state behind
//! a mutex; dropping the handle stops the sink and lets the worker exit.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use rodio::mixer::Mixer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};

use super::sink::{AudioBytes, create_sink_at, probe_duration, read_bytes};
use super::{DurationReply, EngineEvent, ItemStatus, MediaEngine, TrackEvents, TrackHandle};
use crate::error::EngineError;
use crate::media::{MediaFile, is_remote_locator, local_path};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct RodioEngine {
    _stream: OutputStream,
    mixer: Mixer,
    fetch_timeout: Duration,
}

impl RodioEngine {
    /// Open the default output device.
    pub fn open_default() -> Result<Self, EngineError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| EngineError::Output(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped. That's useful in debugging,
        // but noisy for a TUI app.
        stream.log_on_drop(false);
        let mixer = stream.mixer().clone();
        Ok(Self {
            _stream: stream,
            mixer,
            fetch_timeout: Duration::from_secs(30),
        })
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

impl MediaEngine for RodioEngine {
    fn open(
        &mut self,
        file: &MediaFile,
        events: TrackEvents,
    ) -> Result<Box<dyn TrackHandle>, EngineError> {
        let locator = file.locator.clone();
        if !is_remote_locator(&locator) && !std::path::Path::new(local_path(&locator)).is_file() {
            return Err(EngineError::Read {
                locator,
                reason: "no such file".into(),
            });
        }

        let shared = Arc::new(Mutex::new(Shared::new()));
        let worker = Worker {
            locator: locator.clone(),
            mixer: self.mixer.clone(),
            shared: shared.clone(),
            events,
            fetch_timeout: self.fetch_timeout,
        };
        thread::Builder::new()
            .name("segue-track".into())
            .spawn(move || worker.run())
            .map_err(|e| EngineError::Output(format!("failed to spawn track worker: {e}")))?;

        Ok(Box::new(RodioTrack {
            locator,
            mixer: self.mixer.clone(),
            shared,
        }))
    }
}

struct Shared {
    sink: Option<Sink>,
    bytes: Option<AudioBytes>,
    /// Where the current sink started, for sinks rebuilt by seeking.
    offset: Duration,
    want_playing: bool,
    ended: bool,
    /// The track never loaded; it cannot be played.
    failed: bool,
    closed: bool,
    rate: f32,
    pending_seek: Option<Duration>,
    duration: Option<Result<f64, EngineError>>,
    duration_reply: Option<DurationReply>,
}

impl Shared {
    fn new() -> Self {
        Self {
            sink: None,
            bytes: None,
            offset: Duration::ZERO,
            want_playing: false,
            ended: false,
            failed: false,
            closed: false,
            rate: 1.0,
            pending_seek: None,
            duration: None,
            duration_reply: None,
        }
    }

    fn install(&mut self, sink: Sink, offset: Duration) {
        sink.set_speed(self.rate);
        if self.want_playing {
            sink.play();
        }
        if let Some(old) = self.sink.replace(sink) {
            old.stop();
        }
        self.offset = offset;
        self.ended = false;
    }

    fn is_playing(&self) -> bool {
        self.want_playing && !self.ended && !self.failed
    }

    /// Returns false when the track failed to load.
    fn request_play(&mut self) -> bool {
        if self.failed {
            return false;
        }
        self.want_playing = true;
        true
    }

    fn fail(&mut self) {
        self.failed = true;
        self.want_playing = false;
        self.pending_seek = None;
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    /// A seek requested while the first sink was being decoded, unless the
    /// sink already starts there.
    fn take_late_seek(&mut self, decoded_at: Duration) -> Option<Duration> {
        self.pending_seek.take().filter(|at| *at != decoded_at)
    }

    /// Deliver the duration once both the result and a reply are present.
    fn take_duration_delivery(&mut self) -> Option<(DurationReply, Result<f64, EngineError>)> {
        if self.duration.is_some() && self.duration_reply.is_some() {
            let reply = self.duration_reply.take()?;
            let result = self.duration.take()?;
            return Some((reply, result));
        }
        None
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Worker {
    locator: String,
    mixer: Mixer,
    shared: Arc<Mutex<Shared>>,
    events: TrackEvents,
    fetch_timeout: Duration,
}

impl Worker {
    fn run(self) {
        if let Err(err) = self.load() {
            tracing::warn!(locator = %self.locator, %err, "track failed to load");
            lock(&self.shared).fail();
            self.events.send(EngineEvent::StatusChanged(ItemStatus::Failed));
            self.events.send(EngineEvent::FailedToPlayToEnd(err.clone()));
            self.finish_duration(Err(EngineError::Duration(err.to_string())));
            return;
        }
        self.events
            .send(EngineEvent::StatusChanged(ItemStatus::ReadyToPlay));
        self.watch();
    }

    fn load(&self) -> Result<(), EngineError> {
        let bytes = read_bytes(&self.locator, self.fetch_timeout)?;
        let start_at = lock(&self.shared).pending_seek.take().unwrap_or(Duration::ZERO);
        let (sink, decoder_total) = create_sink_at(&self.mixer, &self.locator, &bytes, start_at)?;

        let duration = probe_duration(&bytes)
            .or(decoder_total)
            .map(|d| d.as_secs_f64())
            .ok_or_else(|| EngineError::Duration("length not reported by the container".into()));

        {
            let mut shared = lock(&self.shared);
            if shared.closed {
                sink.stop();
                return Ok(());
            }
            let (sink, offset) = match shared.take_late_seek(start_at) {
                Some(late) => match create_sink_at(&self.mixer, &self.locator, &bytes, late) {
                    Ok((resought, _)) => {
                        sink.stop();
                        (resought, late)
                    }
                    Err(err) => {
                        tracing::warn!(locator = %self.locator, %err, "late seek failed");
                        (sink, start_at)
                    }
                },
                None => (sink, start_at),
            };
            shared.bytes = Some(bytes);
            shared.install(sink, offset);
        }
        tracing::debug!(locator = %self.locator, "track ready");
        self.finish_duration(duration);
        Ok(())
    }

    fn finish_duration(&self, result: Result<f64, EngineError>) {
        let delivery = {
            let mut shared = lock(&self.shared);
            shared.duration = Some(result);
            shared.take_duration_delivery()
        };
        if let Some((reply, result)) = delivery {
            reply(result);
        }
    }

    /// Poll the sink until the handle is dropped, reporting each end of track once.
    fn watch(&self) {
        loop {
            thread::sleep(POLL_INTERVAL);
            let mut shared = lock(&self.shared);
            if shared.closed {
                break;
            }
            let drained = shared.sink.as_ref().is_some_and(|s| s.empty());
            if drained && shared.want_playing && !shared.ended {
                shared.ended = true;
                shared.want_playing = false;
                drop(shared);
                tracing::debug!(locator = %self.locator, "track played to end");
                if !self.events.send(EngineEvent::PlayedToEnd) {
                    break;
                }
            }
        }
    }
}

struct RodioTrack {
    locator: String,
    mixer: Mixer,
    shared: Arc<Mutex<Shared>>,
}

impl RodioTrack {
    fn rebuild_at(&self, shared: &mut Shared, position: Duration) {
        let Some(bytes) = shared.bytes.clone() else {
            return;
        };
        match create_sink_at(&self.mixer, &self.locator, &bytes, position) {
            Ok((sink, _)) => shared.install(sink, position),
            Err(err) => tracing::warn!(locator = %self.locator, %err, "seek reload failed"),
        }
    }
}

impl TrackHandle for RodioTrack {
    fn play(&mut self) {
        let mut shared = lock(&self.shared);
        if !shared.request_play() {
            return;
        }
        if shared.ended {
            // Replaying a finished track starts it over.
            self.rebuild_at(&mut shared, Duration::ZERO);
        } else if let Some(sink) = shared.sink.as_ref() {
            sink.play();
        }
    }

    fn pause(&mut self) {
        let mut shared = lock(&self.shared);
        shared.want_playing = false;
        if let Some(sink) = shared.sink.as_ref() {
            sink.pause();
        }
    }

    fn seek(&mut self, seconds: f64) {
        let position = Duration::from_secs_f64(seconds.max(0.0));
        let mut shared = lock(&self.shared);
        let Some(sink) = shared.sink.as_ref() else {
            shared.pending_seek = Some(position);
            return;
        };

        if !shared.ended && !sink.empty() {
            match sink.try_seek(position) {
                Ok(()) => {
                    shared.offset = Duration::ZERO;
                    return;
                }
                Err(err) => {
                    tracing::debug!(?err, "direct seek failed, reloading");
                }
            }
        }
        self.rebuild_at(&mut shared, position);
    }

    fn set_rate(&mut self, rate: f32) {
        let mut shared = lock(&self.shared);
        shared.rate = rate;
        if let Some(sink) = shared.sink.as_ref() {
            sink.set_speed(rate);
        }
    }

    fn is_playing(&self) -> bool {
        lock(&self.shared).is_playing()
    }

    fn position(&self) -> f64 {
        let shared = lock(&self.shared);
        match (shared.sink.as_ref(), shared.pending_seek) {
            (Some(sink), _) => (shared.offset + sink.get_pos()).as_secs_f64(),
            (None, Some(seek)) => seek.as_secs_f64(),
            (None, None) => f64::NAN,
        }
    }

    fn resolve_duration(&mut self, reply: DurationReply) {
        let delivery = {
            let mut shared = lock(&self.shared);
            shared.duration_reply = Some(reply);
            shared.take_duration_delivery()
        };
        if let Some((reply, result)) = delivery {
            reply(result);
        }
    }
}

impl Drop for RodioTrack {
    fn drop(&mut self) {
        let mut shared = lock(&self.shared);
        shared.closed = true;
        shared.duration_reply = None;
        if let Some(sink) = shared.sink.take() {
            sink.stop();
        }
    }
}
