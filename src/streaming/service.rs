use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_io::{Timer, block_on};
use tracing::{debug, error, info};
use zbus::{Connection, interface};

use crate::config::StreamingSettings;
use crate::error::{Result, SourceError};

use super::events::{SharedEvents, apply_event};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

struct EventReceiver {
    shared: SharedEvents,
}

#[interface(name = "org.mediadeck.LibrespotInterface")]
impl EventReceiver {
    fn send_event(&self, data: HashMap<String, String>) {
        let event = data.get("event").map(String::as_str).unwrap_or_default();
        let Ok(mut state) = self.shared.lock() else {
            return;
        };
        if apply_event(&mut state, &data, Instant::now()) {
            debug!(event, revision = state.revision, "streaming event");
        } else {
            debug!(event, "ignoring unknown streaming event");
        }
    }
}

/// The exported event receiver, alive until dropped.
pub struct EventService {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl EventService {
    /// Export the receiver and wait until the bus name is ours.
    pub fn spawn(settings: &StreamingSettings, shared: SharedEvents) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);

        let bus_name = settings.bus_name.clone();
        let object_path = settings.object_path.clone();
        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name("streaming-bus".to_string())
            .spawn(move || {
                block_on(serve(bus_name, object_path, shared, thread_stop, ready_tx));
            })?;

        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(())) => Ok(Self {
                stop,
                join: Some(handle),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                stop.store(true, Ordering::Release);
                Err(SourceError::Transient(
                    "streaming event service did not start in time".to_string(),
                ))
            }
        }
    }
}

impl Drop for EventService {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

async fn export(
    bus_name: &str,
    object_path: &str,
    shared: SharedEvents,
) -> Result<Connection> {
    let connection = Connection::session().await?;
    connection
        .object_server()
        .at(object_path, EventReceiver { shared })
        .await?;
    connection.request_name(bus_name).await?;
    Ok(connection)
}

async fn serve(
    bus_name: String,
    object_path: String,
    shared: SharedEvents,
    stop: Arc<AtomicBool>,
    ready: SyncSender<Result<()>>,
) {
    let connection = match export(&bus_name, &object_path, shared).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, bus_name = %bus_name, "streaming: failed to export event receiver");
            let _ = ready.send(Err(e));
            return;
        }
    };
    info!(bus_name = %bus_name, object_path = %object_path, "streaming event receiver exported");
    let _ = ready.send(Ok(()));

    // Keep the service alive.
    while !stop.load(Ordering::Acquire) {
        Timer::after(SHUTDOWN_POLL).await;
    }
    drop(connection);
    debug!("streaming bus thread exiting");
}
