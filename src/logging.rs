//! `tracing` setup. Output goes to a file because the terminal belongs to
//! the UI; with no file configured, events are dropped.

use std::fs::OpenOptions;
use std::io;
use std::panic;
use std::sync::Mutex;

use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::config::LogSettings;

/// `RUST_LOG` wins over the configured filter.
fn build_filter(settings: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Route panic messages into the log instead of over the UI. Backend panics
/// are caught by the controller.
fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        error!(panic = %info, "panic");
    }));
}

pub fn init(settings: &LogSettings) -> io::Result<()> {
    install_panic_hook();

    let Some(path) = &settings.file else {
        return Ok(());
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(settings))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}
