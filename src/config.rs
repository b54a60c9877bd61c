//! Configuration loader and schema types.
//!
//! `Settings` drives the demo player: playback options handed to the session,
//! the audio session setup, key bindings, library scanning and the status line.

mod load;
mod schema;

pub use load::{default_config_path, resolve_config_path};
pub use schema::*;
