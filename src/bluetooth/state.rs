use std::collections::HashMap;

use zbus::fdo::ManagedObjects;
use zbus::names::OwnedInterfaceName;
use zvariant::{OwnedValue, Value};

use crate::source::{DEFAULT_SAMPLE_RATE_HZ, PlaybackStatus, TrackRecord};

pub const BLUEZ_SERVICE: &str = "org.bluez";
pub const PLAYER_IFACE: &str = "org.bluez.MediaPlayer1";
pub const DEVICE_IFACE: &str = "org.bluez.Device1";
pub const TRANSPORT_IFACE: &str = "org.bluez.MediaTransport1";

const MODE_OFF: &str = "off";
const MODE_ALL_TRACKS: &str = "alltracks";

type Properties = HashMap<String, OwnedValue>;

/// What the bus thread last saw. Replaced as a whole on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BluetoothState {
    /// A media player object exists.
    pub connected: bool,
    pub player_path: Option<String>,
    pub device_alias: Option<String>,
    /// Native status string (`playing`, `forward-seek`, ...).
    pub status: String,
    pub track: TrackRecord,
    pub position_ms: u64,
    /// Native mode strings: `off`, `alltracks`, `group`, `singletrack`.
    pub shuffle: String,
    pub repeat: String,
}

impl BluetoothState {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            player_path: None,
            device_alias: None,
            status: String::new(),
            track: TrackRecord::EMPTY,
            position_ms: 0,
            shuffle: MODE_OFF.to_string(),
            repeat: MODE_OFF.to_string(),
        }
    }

    pub fn playback_status(&self) -> PlaybackStatus {
        map_status(&self.status)
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle != MODE_OFF
    }

    pub fn repeat_enabled(&self) -> bool {
        self.repeat != MODE_OFF
    }
}

impl Default for BluetoothState {
    fn default() -> Self {
        Self::disconnected()
    }
}

pub fn map_status(native: &str) -> PlaybackStatus {
    match native {
        "playing" => PlaybackStatus::Playing,
        "paused" => PlaybackStatus::Paused,
        "stopped" => PlaybackStatus::Stopped,
        "error" => PlaybackStatus::Error,
        "forward-seek" | "reverse-seek" => PlaybackStatus::Loading,
        _ => PlaybackStatus::Idle,
    }
}

/// Transport codec byte to a display name. Unknown codecs map to "".
pub fn codec_name(codec: u8) -> &'static str {
    match codec {
        0 => "SBC",
        1 => "MP3",
        2 => "AAC",
        3 => "APTX",
        4 => "APTXHD",
        _ => "",
    }
}

/// Value written to the `Shuffle`/`Repeat` properties.
pub fn mode_value(enabled: bool) -> &'static str {
    if enabled { MODE_ALL_TRACKS } else { MODE_OFF }
}

/// Build a snapshot from `GetManagedObjects` output.
///
/// The first media player by object path wins. The transport belonging to
/// the same device is preferred over any other.
pub fn parse_managed_objects(objects: &ManagedObjects) -> BluetoothState {
    let mut paths: Vec<_> = objects.keys().collect();
    paths.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    let player = paths.iter().find_map(|path| {
        interface(&objects[*path], PLAYER_IFACE).map(|props| (path.as_str(), props))
    });
    let Some((player_path, player)) = player else {
        return BluetoothState::disconnected();
    };

    let device_path = string_prop(player, "Device");
    let device_alias = device_path.as_deref().and_then(|dev| {
        objects
            .iter()
            .find(|(path, _)| path.as_str() == dev)
            .and_then(|(_, ifaces)| interface(ifaces, DEVICE_IFACE))
            .and_then(|props| string_prop(props, "Alias"))
    });

    let transports: Vec<&Properties> = paths
        .iter()
        .filter_map(|path| interface(&objects[*path], TRANSPORT_IFACE))
        .collect();
    let transport = transports
        .iter()
        .find(|t| string_prop(t, "Device") == device_path)
        .or_else(|| transports.first());
    let codec = transport
        .and_then(|t| uint_prop(t, "Codec"))
        .and_then(|c| u8::try_from(c).ok())
        .map(codec_name)
        .unwrap_or_default();

    let track = dict_prop(player, "Track")
        .map(|fields| track_from_fields(&fields, codec))
        .unwrap_or(TrackRecord::EMPTY);

    BluetoothState {
        connected: true,
        player_path: Some(player_path.to_string()),
        device_alias,
        status: string_prop(player, "Status").unwrap_or_default(),
        track,
        position_ms: uint_prop(player, "Position").map_or(0, u64::from),
        shuffle: string_prop(player, "Shuffle").unwrap_or_else(|| MODE_OFF.to_string()),
        repeat: string_prop(player, "Repeat").unwrap_or_else(|| MODE_OFF.to_string()),
    }
}

/// Missing fields stay empty or zero.
fn track_from_fields(fields: &Properties, codec: &str) -> TrackRecord {
    TrackRecord {
        index: uint_prop(fields, "TrackNumber").unwrap_or(0),
        artist: string_prop(fields, "Artist").unwrap_or_default(),
        album: string_prop(fields, "Album").unwrap_or_default(),
        title: string_prop(fields, "Title").unwrap_or_default(),
        duration_ms: uint_prop(fields, "Duration").map_or(0, u64::from),
        codec: codec.to_string(),
        bitrate_bps: 0,
        sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
    }
}

fn interface<'a>(
    ifaces: &'a HashMap<OwnedInterfaceName, Properties>,
    name: &str,
) -> Option<&'a Properties> {
    ifaces
        .iter()
        .find(|(iface, _)| iface.as_str() == name)
        .map(|(_, props)| props)
}

fn unwrap_variant<'a, 'v>(value: &'a Value<'v>) -> &'a Value<'v> {
    match value {
        Value::Value(inner) => unwrap_variant(inner),
        other => other,
    }
}

fn string_prop(props: &Properties, key: &str) -> Option<String> {
    match unwrap_variant(&**props.get(key)?) {
        Value::Str(s) => Some(s.as_str().to_string()),
        Value::ObjectPath(p) => Some(p.as_str().to_string()),
        _ => None,
    }
}

fn uint_prop(props: &Properties, key: &str) -> Option<u32> {
    match unwrap_variant(&**props.get(key)?) {
        Value::U8(n) => Some(u32::from(*n)),
        Value::U16(n) => Some(u32::from(*n)),
        Value::U32(n) => Some(*n),
        Value::U64(n) => u32::try_from(*n).ok(),
        Value::I32(n) => u32::try_from(*n).ok(),
        _ => None,
    }
}

fn dict_prop(props: &Properties, key: &str) -> Option<Properties> {
    let value = props.get(key)?.try_clone().ok()?;
    Properties::try_from(value).ok()
}
