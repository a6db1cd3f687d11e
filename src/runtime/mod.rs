use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::logging;

mod event_loop;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, fallback) = settings::load_settings();

    if let Err(e) = logging::init(&settings.log) {
        eprintln!("mediadeck: cannot open log file, logging disabled: {e}");
    }
    if let Some(reason) = fallback {
        warn!(%reason, "using default settings");
    }
    info!(version = env!("CARGO_PKG_VERSION"), "mediadeck starting");

    let mut controller = startup::build_controller(&settings);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut state = event_loop::EventLoopState::new(Duration::from_millis(
            settings.controller.tick_ms,
        ));
        event_loop::run(&mut terminal, &settings, &mut controller, &mut state)
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    controller.deselect();
    info!("mediadeck stopped");

    run_result
}

#[cfg(test)]
mod tests;
