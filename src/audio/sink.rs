//! Opening `rodio` sinks for playable items.

use std::fs::File;
use std::io::BufReader;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::error::{Result, SourceError};

use super::PlayableItem;

/// Create a paused `Sink` for `item` that starts playback at `start_at`.
pub(super) fn create_sink_at(
    stream: &OutputStream,
    item: &PlayableItem,
    start_at: Duration,
) -> Result<Sink> {
    let file = File::open(&item.location)?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| SourceError::Engine(format!("{}: {e}", item.location.display())))?
        // `skip_duration` is the seeking primitive; Duration::ZERO is fine.
        .skip_duration(start_at);

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.pause();
    Ok(sink)
}
