use std::path::PathBuf;

use serde::Deserialize;

use crate::source::SourceId;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/mediadeck/config.toml` or `~/.config/mediadeck/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `MEDIADECK__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub controller: ControllerSettings,
    pub disc: DiscSettings,
    pub bluetooth: BluetoothSettings,
    pub streaming: StreamingSettings,
    pub library: LibrarySettings,
    pub ui: UiSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Interval between `tick()` calls (milliseconds).
    pub tick_ms: u64,
    /// Source selected at startup. `None` starts with nothing selected.
    pub default_source: Option<SourceId>,
    /// Backends to construct. Anything not listed is never started.
    pub sources: Vec<SourceId>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            tick_ms: 250,
            default_source: None,
            sources: SourceId::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscSettings {
    /// Block device handed to the eject command.
    pub device: String,
    /// Directory where the disc's tracks are exposed as files.
    pub mount_dir: PathBuf,
    pub eject_command: String,

    /// Query the metadata directory by disc id on load.
    pub lookup_enabled: bool,
    pub lookup_base_url: String,
    /// The directory rejects anonymous clients; identify the application.
    pub lookup_user_agent: String,
    pub lookup_timeout_ms: u64,
}

impl Default for DiscSettings {
    fn default() -> Self {
        Self {
            device: "/dev/cdrom".to_string(),
            mount_dir: PathBuf::from("/run/mediadeck/disc"),
            eject_command: "eject".to_string(),
            lookup_enabled: true,
            lookup_base_url: "https://musicbrainz.org/ws/2".to_string(),
            lookup_user_agent: concat!("mediadeck/", env!("CARGO_PKG_VERSION")).to_string(),
            lookup_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BluetoothSettings {
    /// Timeout applied to every call on the system bus (milliseconds).
    pub call_timeout_ms: u64,
    /// How long `load()` waits for the first refresh (milliseconds).
    pub load_timeout_ms: u64,
}

impl Default for BluetoothSettings {
    fn default() -> Self {
        Self {
            call_timeout_ms: 1_500,
            load_timeout_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Well-known name requested on the session bus.
    pub bus_name: String,
    /// Path the event receiver is exported at.
    pub object_path: String,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            bus_name: "org.mediadeck.Librespot".to_string(),
            object_path: "/org/mediadeck/librespot".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Root of the local music collection.
    pub music_dir: PathBuf,
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    pub follow_links: bool,
    /// Include dotfiles and dot-directories.
    pub include_hidden: bool,
    /// Descend into subdirectories.
    pub recursive: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        let music_dir = std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join("Music"))
            .unwrap_or_else(|| PathBuf::from("Music"));
        Self {
            music_dir,
            extensions: vec!["mp3".into(), "flac".into(), "ogg".into(), "wav".into()],
            follow_links: true,
            include_hidden: false,
            recursive: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Number of seconds to scrub when pressing `H` / `L`.
    pub scrub_seconds: u64,
    /// The text rendered inside the top header box.
    pub header_text: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            scrub_seconds: 5,
            header_text: " mediadeck ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Log file. Without one, nothing is logged: the terminal belongs to the UI.
    pub file: Option<PathBuf>,
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: None,
            filter: "info".to_string(),
        }
    }
}
