//! Playable items and their per-file loop policy.

use std::path::Path;
use std::sync::Arc;

/// How often a single file repeats before the session moves on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LoopPolicy {
    /// Play once.
    #[default]
    Disabled,
    /// Repeat until the listener switches tracks or stops.
    Infinite,
    /// Play the file this many times in total.
    Times(u32),
}

impl LoopPolicy {
    /// Whether another pass is owed after `completed_plays` full plays.
    pub fn should_repeat(&self, completed_plays: u32) -> bool {
        match *self {
            LoopPolicy::Disabled => false,
            LoopPolicy::Infinite => true,
            LoopPolicy::Times(n) => completed_plays < n,
        }
    }
}

/// Cover art kept in memory, e.g. embedded in the file or fetched by URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub data: Arc<[u8]>,
    /// Where the bytes came from, if they came from somewhere addressable.
    pub source: Option<String>,
}

impl Artwork {
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A playable item in a playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    /// URL or local path of the media resource.
    pub locator: String,
    pub title: Option<String>,
    /// URL or path of a cover image to fetch when the track is published.
    pub cover_locator: Option<String>,
    pub cover: Option<Artwork>,
    pub loop_policy: LoopPolicy,
}

impl MediaFile {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            title: None,
            cover_locator: None,
            cover: None,
            loop_policy: LoopPolicy::Disabled,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(path.display().to_string())
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_cover_locator(mut self, locator: impl Into<String>) -> Self {
        self.cover_locator = Some(locator.into());
        self
    }

    pub fn with_cover(mut self, cover: Artwork) -> Self {
        self.cover = Some(cover);
        self
    }

    pub fn with_loop_policy(mut self, policy: LoopPolicy) -> Self {
        self.loop_policy = policy;
        self
    }

    /// Title for display surfaces: the explicit title, else the last locator segment.
    pub fn display_title(&self) -> String {
        if let Some(t) = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return t.to_string();
        }
        let tail = self
            .locator
            .trim_end_matches('/')
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.locator);
        match tail.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => tail.to_string(),
        }
    }

    pub fn is_remote(&self) -> bool {
        is_remote_locator(&self.locator)
    }
}

pub fn is_remote_locator(locator: &str) -> bool {
    let lower = locator.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Strip a `file://` scheme so the locator can be opened as a path.
pub fn local_path(locator: &str) -> &str {
    locator.strip_prefix("file://").unwrap_or(locator)
}
