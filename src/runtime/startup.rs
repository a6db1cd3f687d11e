use tracing::{info, warn};

use crate::bluetooth::WirelessSource;
use crate::config;
use crate::controller::SourceController;
use crate::disc::DiscSource;
use crate::error::Result;
use crate::library::FileSource;
use crate::source::{Source, SourceId};
use crate::streaming::StreamingSource;

fn build_source(id: SourceId, settings: &config::Settings) -> Result<Box<dyn Source>> {
    let source: Box<dyn Source> = match id {
        SourceId::Disc => Box::new(DiscSource::from_settings(&settings.disc)?),
        SourceId::Bluetooth => Box::new(WirelessSource::from_settings(&settings.bluetooth)?),
        SourceId::Spotify => Box::new(StreamingSource::from_settings(&settings.streaming)?),
        SourceId::File => Box::new(FileSource::from_settings(&settings.library)?),
    };
    Ok(source)
}

/// Register every enabled backend that can start, then select the default.
///
/// A backend that fails to start is skipped; the others stay usable.
pub fn build_controller(settings: &config::Settings) -> SourceController {
    let mut controller = SourceController::new();
    for &id in &settings.controller.sources {
        match build_source(id, settings) {
            Ok(source) => controller.register(source),
            Err(e) => warn!(source = %id, error = %e, "backend unavailable, skipping"),
        }
    }
    info!(sources = ?controller.available(), "controller ready");

    if let Some(id) = settings.controller.default_source {
        controller.select(id);
    }
    controller
}
