//! Directory scanning into playlists.
//!
//! `scan` walks a directory, reads tags with `lofty` and returns `Track`s
//! sorted by their display text. `Track::media_file` turns a track into a
//! playlist entry for the session.

mod display;
mod model;
mod scan;

pub use model::Track;
pub use scan::scan;
