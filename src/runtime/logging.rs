use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Install a file logger when `SEGUE_LOG` holds a filter (e.g. `segue=debug`).
///
/// Output goes to `SEGUE_LOG_FILE`, or `segue.log` in the temp dir, so the
/// terminal UI is left alone.
pub fn init() {
    let Ok(filter) = EnvFilter::try_from_env("SEGUE_LOG") else {
        return;
    };

    let path = std::env::var_os("SEGUE_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("segue.log"));
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("segue: cannot open log file {}: {e}", path.display());
            return;
        }
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    if let Err(e) = installed {
        eprintln!("segue: logging disabled: {e}");
    }
}
