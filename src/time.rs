//! Playback time snapshots.
//!
//! A `PlaybackTime` pairs the current position with the total duration of the
//! active track. Both values are plain seconds and are normalized on
//! construction so observers never see NaN, negative or infinite values.

use std::time::Duration;

/// Immutable (current position, total duration) pair, in seconds.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct PlaybackTime {
    current: f64,
    duration: f64,
}

impl PlaybackTime {
    pub fn new(current: f64, duration: f64) -> Self {
        Self {
            current: sanitize_seconds(current),
            duration: sanitize_seconds(duration),
        }
    }

    /// Snapshot emitted right after the duration of a freshly loaded track resolves.
    pub fn start_of(duration: f64) -> Self {
        Self::new(0.0, duration)
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Seconds left until the end of the track, zero when the duration is unknown.
    pub fn remaining(&self) -> f64 {
        (self.duration - self.current).max(0.0)
    }

    /// Progress in `[0, 1]`; zero while the duration is unknown.
    pub fn fraction(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (self.current / self.duration).clamp(0.0, 1.0)
    }

    pub fn current_duration(&self) -> Duration {
        Duration::from_secs_f64(self.current)
    }

    pub fn total_duration(&self) -> Option<Duration> {
        (self.duration > 0.0).then(|| Duration::from_secs_f64(self.duration))
    }
}

/// Map any engine-reported value onto a finite, non-negative number of seconds.
pub fn sanitize_seconds(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
