use std::path::PathBuf;
use std::time::Duration;

use crate::media::{LoopPolicy, MediaFile};

#[derive(Debug, Clone)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<Duration>,
    pub display: String,
    /// Image found next to the track, used as its cover.
    pub cover: Option<PathBuf>,
}

impl Track {
    /// Playlist entry for this track.
    pub fn media_file(&self, loop_policy: LoopPolicy) -> MediaFile {
        let file = MediaFile::from_path(&self.path)
            .with_title(self.display.clone())
            .with_loop_policy(loop_policy);
        match &self.cover {
            Some(cover) => file.with_cover_locator(cover.display().to_string()),
            None => file,
        }
    }
}
