use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use rand::seq::SliceRandom;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, error, warn};

use crate::error::{Result, SourceError};

use super::{EngineSnapshot, EngineState, PlayableItem};
use super::player::{EngineCmd, SnapshotHandle};
use super::sink::create_sink_at;

/// How often the worker wakes up to publish the position and auto-advance.
const TICK: Duration = Duration::from_millis(200);

pub(super) fn spawn_engine_thread(
    rx: Receiver<EngineCmd>,
    snapshot: SnapshotHandle,
    ready: SyncSender<Result<()>>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("audio-engine".to_string())
        .spawn(move || {
            // The output stream is created here because it must live on the
            // thread that drives it.
            let mut stream = match OutputStreamBuilder::open_default_stream() {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, "no audio output device");
                    let _ = ready.send(Err(SourceError::Engine(e.to_string())));
                    return;
                }
            };
            // rodio logs to stderr when the stream is dropped; the terminal belongs to the UI.
            stream.log_on_drop(false);
            let _ = ready.send(Ok(()));

            let mut worker = Worker::new(stream, snapshot);
            loop {
                match rx.recv_timeout(TICK) {
                    Ok(EngineCmd::Quit) => {
                        worker.stop();
                        break;
                    }
                    Ok(cmd) => worker.handle(cmd),
                    Err(RecvTimeoutError::Timeout) => worker.tick(),
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                worker.publish();
            }
            debug!("engine thread exiting");
        })
}

struct Worker {
    stream: OutputStream,
    snapshot: SnapshotHandle,
    items: Vec<PlayableItem>,
    /// Play order as item indices; identity unless shuffled.
    order: Vec<usize>,
    order_pos: usize,
    sink: Option<Sink>,
    /// Offset the current sink was opened at; `Sink::get_pos` counts from it.
    seek_base: Duration,
    state: EngineState,
    looping: bool,
    shuffle: bool,
}

impl Worker {
    fn new(stream: OutputStream, snapshot: SnapshotHandle) -> Self {
        Self {
            stream,
            snapshot,
            items: Vec::new(),
            order: Vec::new(),
            order_pos: 0,
            sink: None,
            seek_base: Duration::ZERO,
            state: EngineState::NothingSpecial,
            looping: false,
            shuffle: false,
        }
    }

    fn handle(&mut self, cmd: EngineCmd) {
        match cmd {
            EngineCmd::SetItems(items) => {
                self.stop();
                self.items = items;
                self.order = (0..self.items.len()).collect();
                if self.shuffle {
                    self.order.shuffle(&mut rand::rng());
                }
                self.order_pos = 0;
                self.state = EngineState::NothingSpecial;
            }
            EngineCmd::Clear => {
                self.stop();
                self.items.clear();
                self.order.clear();
                self.order_pos = 0;
                self.state = EngineState::NothingSpecial;
            }
            EngineCmd::Play => {
                if let Some(sink) = &self.sink {
                    match self.state {
                        EngineState::Paused => {
                            sink.play();
                            self.state = EngineState::Playing;
                            return;
                        }
                        EngineState::Playing => return,
                        _ => {}
                    }
                }
                self.start_current(Duration::ZERO);
            }
            EngineCmd::Pause => {
                if let Some(sink) = &self.sink {
                    if self.state == EngineState::Playing {
                        sink.pause();
                        self.state = EngineState::Paused;
                    }
                }
            }
            EngineCmd::Stop => self.stop(),
            EngineCmd::Next => self.advance(),
            EngineCmd::Previous => {
                if self.order.is_empty() {
                    return;
                }
                if self.order_pos == 0 {
                    if self.looping {
                        self.order_pos = self.order.len() - 1;
                    }
                } else {
                    self.order_pos -= 1;
                }
                self.start_current(Duration::ZERO);
            }
            EngineCmd::Jump(index) => {
                if let Some(pos) = self.order.iter().position(|&i| i == index) {
                    self.order_pos = pos;
                    self.start_current(Duration::ZERO);
                }
            }
            EngineCmd::SetPosition(fraction) => self.seek_fraction(fraction),
            EngineCmd::SetLooping(enabled) => self.looping = enabled,
            EngineCmd::SetShuffle(enabled) => {
                self.shuffle = enabled;
                let current = self.order.get(self.order_pos).copied();
                self.order = (0..self.items.len()).collect();
                if enabled {
                    self.order.shuffle(&mut rand::rng());
                }
                if let Some(i) = current {
                    self.order_pos = self.order.iter().position(|&x| x == i).unwrap_or(0);
                }
            }
            EngineCmd::Quit => {}
        }
    }

    /// Periodic check for the end of the current item.
    fn tick(&mut self) {
        let finished = matches!(&self.sink, Some(s) if s.empty())
            && self.state == EngineState::Playing;
        if finished {
            self.advance();
        }
    }

    fn advance(&mut self) {
        if self.order.is_empty() {
            return;
        }
        if self.order_pos + 1 >= self.order.len() {
            if !self.looping {
                self.stop();
                self.state = EngineState::Ended;
                return;
            }
            self.order_pos = 0;
        } else {
            self.order_pos += 1;
        }
        self.start_current(Duration::ZERO);
    }

    fn start_current(&mut self, start_at: Duration) {
        let Some(item) = self.order.get(self.order_pos).and_then(|&i| self.items.get(i)) else {
            return;
        };
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        self.state = EngineState::Opening;
        self.seek_base = start_at;
        match create_sink_at(&self.stream, item, start_at) {
            Ok(sink) => {
                sink.play();
                self.sink = Some(sink);
                self.state = EngineState::Playing;
            }
            Err(e) => {
                warn!(error = %e, location = %item.location.display(), "failed to open item");
                self.state = EngineState::Error;
            }
        }
    }

    fn seek_fraction(&mut self, fraction: f64) {
        let Some(sink) = &self.sink else {
            return;
        };
        let Some(item) = self.order.get(self.order_pos).and_then(|&i| self.items.get(i)) else {
            return;
        };
        let target_ms = (item.duration_ms as f64 * fraction.clamp(0.0, 1.0)) as u64;
        let was_paused = self.state == EngineState::Paused;
        sink.stop();
        // Rebuild the sink at the new offset, keeping the pause state.
        self.start_current(Duration::from_millis(target_ms));
        if was_paused {
            if let Some(s) = &self.sink {
                s.pause();
                self.state = EngineState::Paused;
            }
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.seek_base = Duration::ZERO;
        if self.state != EngineState::NothingSpecial {
            self.state = EngineState::Stopped;
        }
    }

    fn publish(&self) {
        let position = self
            .sink
            .as_ref()
            .map_or(Duration::ZERO, |s| self.seek_base + s.get_pos());
        let next = EngineSnapshot {
            state: self.state,
            index: self.order.get(self.order_pos).copied(),
            position_ms: u64::try_from(position.as_millis()).unwrap_or(u64::MAX),
        };
        if let Ok(mut snap) = self.snapshot.lock() {
            *snap = next;
        }
    }
}
