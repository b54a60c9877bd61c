//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and mirrors what the session reports
//! next to the scanned library and the cursor.

mod model;

pub use model::*;
