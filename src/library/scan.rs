use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::prelude::*;
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::display::display_from_fields;
use super::model::Track;

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .any(|e| !e.is_empty() && e == ext)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// First configured cover image that exists next to `path`.
fn find_cover(path: &Path, settings: &LibrarySettings) -> Option<PathBuf> {
    let dir = path.parent()?;
    settings
        .cover_names
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[derive(Default)]
struct Tags {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    duration: Option<Duration>,
}

fn read_tags(path: &Path) -> Tags {
    let Ok(tagged) = lofty::read_from_path(path) else {
        return Tags::default();
    };
    let duration = Some(tagged.properties().duration()).filter(|d| !d.is_zero());

    let clean = |v: Option<std::borrow::Cow<'_, str>>| {
        v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    };
    match tagged.primary_tag().or_else(|| tagged.first_tag()) {
        Some(tag) => Tags {
            title: clean(tag.title()),
            artist: clean(tag.artist()),
            album: clean(tag.album()),
            duration,
        },
        None => Tags {
            duration,
            ..Tags::default()
        },
    }
}

pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || !is_audio_file(path, settings) {
            continue;
        }

        let tags = read_tags(path);
        let title = tags.title.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("UNKNOWN")
                .to_string()
        });
        let display = display_from_fields(
            path,
            &title,
            tags.artist.as_deref(),
            tags.album.as_deref(),
            &settings.display_fields,
            &settings.display_separator,
        );

        tracks.push(Track {
            path: path.to_path_buf(),
            title,
            artist: tags.artist,
            album: tags.album,
            duration: tags.duration,
            display,
            cover: find_cover(path, settings),
        });
    }

    tracks.sort_by_key(|t| t.display.to_lowercase());
    tracing::debug!(dir = %dir.display(), count = tracks.len(), "library scanned");
    tracks
}
