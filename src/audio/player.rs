use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, SourceError};

use super::{EngineSnapshot, MediaEngine, PlayableItem};
use super::thread::spawn_engine_thread;

/// How long to wait for the engine thread to open the audio device.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub(super) enum EngineCmd {
    SetItems(Vec<PlayableItem>),
    Clear,
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Jump(usize),
    SetPosition(f64),
    SetLooping(bool),
    SetShuffle(bool),
    Quit,
}

pub(super) type SnapshotHandle = Arc<Mutex<EngineSnapshot>>;

/// `rodio`-backed engine running on its own thread.
///
/// Commands are queued to the thread; state comes back through a shared
/// snapshot the thread overwrites after every command and tick.
pub struct RodioEngine {
    tx: Sender<EngineCmd>,
    snapshot: SnapshotHandle,
    join: Option<JoinHandle<()>>,
}

impl RodioEngine {
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = mpsc::channel::<EngineCmd>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);
        let snapshot: SnapshotHandle = Arc::new(Mutex::new(EngineSnapshot::default()));

        let handle = spawn_engine_thread(rx, snapshot.clone(), ready_tx)?;
        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(SourceError::Engine(
                    "engine thread did not start in time".to_string(),
                ));
            }
        }

        Ok(Self {
            tx,
            snapshot,
            join: Some(handle),
        })
    }

    fn send(&self, cmd: EngineCmd) {
        if let Err(e) = self.tx.send(cmd) {
            debug!(cmd = ?e.0, "engine thread gone, command dropped");
        }
    }
}

impl MediaEngine for RodioEngine {
    fn set_items(&mut self, items: Vec<PlayableItem>) {
        self.send(EngineCmd::SetItems(items));
    }

    fn clear(&mut self) {
        self.send(EngineCmd::Clear);
    }

    fn play(&mut self) {
        self.send(EngineCmd::Play);
    }

    fn pause(&mut self) {
        self.send(EngineCmd::Pause);
    }

    fn stop(&mut self) {
        self.send(EngineCmd::Stop);
    }

    fn next(&mut self) {
        self.send(EngineCmd::Next);
    }

    fn previous(&mut self) {
        self.send(EngineCmd::Previous);
    }

    fn jump_to(&mut self, index: usize) {
        self.send(EngineCmd::Jump(index));
    }

    fn set_position(&mut self, fraction: f64) {
        self.send(EngineCmd::SetPosition(fraction));
    }

    fn set_looping(&mut self, enabled: bool) {
        self.send(EngineCmd::SetLooping(enabled));
    }

    fn set_shuffle(&mut self, enabled: bool) {
        self.send(EngineCmd::SetShuffle(enabled));
    }

    fn snapshot(&self) -> EngineSnapshot {
        self.snapshot
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl Drop for RodioEngine {
    fn drop(&mut self) {
        let _ = self.tx.send(EngineCmd::Quit);
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}
