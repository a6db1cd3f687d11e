use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_io::block_on;
use tracing::{debug, info, warn};
use zbus::Connection;
use zbus::fdo::ObjectManagerProxy;
use zvariant::Value;

use crate::config::BluetoothSettings;
use crate::error::{Result, SourceError};

use super::state::{
    BLUEZ_SERVICE, BluetoothState, PLAYER_IFACE, mode_value, parse_managed_objects,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    SetShuffle(bool),
    SetRepeat(bool),
}

/// The wireless backend's view of the bus thread.
pub trait WirelessLink: Send {
    /// Fetch fresh state and wait for it, at most `timeout`.
    fn refresh(&mut self, timeout: Duration) -> Result<BluetoothState>;
    /// Ask for a re-fetch without waiting. Requests coalesce until served.
    fn request_refresh(&mut self);
    /// Latest state published by the bus thread.
    fn latest(&self) -> BluetoothState;
    /// Fire-and-forget player control.
    fn send(&mut self, cmd: PlayerCommand);
}

#[derive(Debug)]
enum BusMsg {
    Refresh(Option<SyncSender<BluetoothState>>),
    Command(PlayerCommand),
    Quit,
}

/// Handle to the thread that owns the system bus connection.
pub struct BluezLink {
    tx: Sender<BusMsg>,
    state: Arc<Mutex<BluetoothState>>,
    pending: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl BluezLink {
    pub fn spawn(settings: &BluetoothSettings) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<BusMsg>();
        let state = Arc::new(Mutex::new(BluetoothState::disconnected()));
        let pending = Arc::new(AtomicBool::new(false));
        let call_timeout = Duration::from_millis(settings.call_timeout_ms);

        let thread_state = state.clone();
        let thread_pending = pending.clone();
        let handle = thread::Builder::new()
            .name("bluez-bus".to_string())
            .spawn(move || run_bus_thread(rx, thread_state, thread_pending, call_timeout))?;

        Ok(Self {
            tx,
            state,
            pending,
            join: Some(handle),
        })
    }
}

impl WirelessLink for BluezLink {
    fn refresh(&mut self, timeout: Duration) -> Result<BluetoothState> {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        self.tx
            .send(BusMsg::Refresh(Some(reply_tx)))
            .map_err(|_| SourceError::Transient("bluetooth bus thread is gone".to_string()))?;
        reply_rx
            .recv_timeout(timeout)
            .map_err(|_| SourceError::Transient("bluetooth refresh timed out".to_string()))
    }

    fn request_refresh(&mut self) {
        if self.pending.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.tx.send(BusMsg::Refresh(None)).is_err() {
            self.pending.store(false, Ordering::Release);
            debug!("bluetooth bus thread is gone, refresh dropped");
        }
    }

    fn latest(&self) -> BluetoothState {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn send(&mut self, cmd: PlayerCommand) {
        if let Err(e) = self.tx.send(BusMsg::Command(cmd)) {
            debug!(cmd = ?e.0, "bluetooth bus thread is gone, command dropped");
        }
    }
}

impl Drop for BluezLink {
    fn drop(&mut self) {
        let _ = self.tx.send(BusMsg::Quit);
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

/// Connection plus the object manager proxy, created once and reused.
struct BluezBus {
    conn: Connection,
    objects: ObjectManagerProxy<'static>,
    player_path: Option<String>,
}

impl BluezBus {
    async fn connect(call_timeout: Duration) -> Result<Self> {
        let conn = zbus::connection::Builder::system()?
            .method_timeout(call_timeout)
            .build()
            .await?;
        let objects = ObjectManagerProxy::builder(&conn)
            .destination(BLUEZ_SERVICE)?
            .path("/")?
            .build()
            .await?;
        info!("connected to the system bus");
        Ok(Self {
            conn,
            objects,
            player_path: None,
        })
    }

    async fn fetch(&mut self) -> Result<BluetoothState> {
        let objects = self.objects.get_managed_objects().await?;
        let state = parse_managed_objects(&objects);
        if state.player_path != self.player_path {
            debug!(player = ?state.player_path, "bluetooth media player changed");
        }
        self.player_path = state.player_path.clone();
        Ok(state)
    }

    async fn dispatch(&self, cmd: PlayerCommand) -> Result<()> {
        let Some(path) = self.player_path.as_deref() else {
            debug!(?cmd, "no media player, command dropped");
            return Ok(());
        };
        let method = match cmd {
            PlayerCommand::Play => "Play",
            PlayerCommand::Pause => "Pause",
            PlayerCommand::Stop => "Stop",
            PlayerCommand::Next => "Next",
            PlayerCommand::Previous => "Previous",
            PlayerCommand::SetShuffle(on) => {
                return self.set_player_property(path, "Shuffle", mode_value(on)).await;
            }
            PlayerCommand::SetRepeat(on) => {
                return self.set_player_property(path, "Repeat", mode_value(on)).await;
            }
        };
        self.conn
            .call_method(Some(BLUEZ_SERVICE), path, Some(PLAYER_IFACE), method, &())
            .await?;
        Ok(())
    }

    async fn set_player_property(&self, path: &str, name: &str, value: &str) -> Result<()> {
        self.conn
            .call_method(
                Some(BLUEZ_SERVICE),
                path,
                Some("org.freedesktop.DBus.Properties"),
                "Set",
                &(PLAYER_IFACE, name, Value::from(value)),
            )
            .await?;
        Ok(())
    }
}

fn run_bus_thread(
    rx: Receiver<BusMsg>,
    shared: Arc<Mutex<BluetoothState>>,
    pending: Arc<AtomicBool>,
    call_timeout: Duration,
) {
    block_on(async move {
        let mut bus = match BluezBus::connect(call_timeout).await {
            Ok(b) => Some(b),
            Err(e) => {
                warn!(error = %e, "bluetooth: system bus unavailable, will retry on refresh");
                None
            }
        };

        while let Ok(msg) = rx.recv() {
            match msg {
                BusMsg::Quit => break,
                BusMsg::Refresh(reply) => {
                    if bus.is_none() {
                        bus = BluezBus::connect(call_timeout).await.ok();
                    }
                    let next = match bus.as_mut() {
                        Some(b) => b.fetch().await.unwrap_or_else(|e| {
                            warn!(error = %e, transient = e.is_transient(), "bluetooth refresh failed");
                            BluetoothState::disconnected()
                        }),
                        None => BluetoothState::disconnected(),
                    };
                    pending.store(false, Ordering::Release);
                    if let Ok(mut s) = shared.lock() {
                        *s = next.clone();
                    }
                    if let Some(reply) = reply {
                        let _ = reply.send(next);
                    }
                }
                BusMsg::Command(cmd) => {
                    if let Some(b) = &bus {
                        if let Err(e) = b.dispatch(cmd).await {
                            warn!(error = %e, ?cmd, "bluetooth command failed");
                        }
                    }
                }
            }
        }
        debug!("bluetooth bus thread exiting");
    });
}
