//! Layered loading: struct defaults, then the optional TOML file, then
//! `MEDIADECK__SECTION__KEY` environment variables.

use std::env;
use std::path::{Path, PathBuf};

use ::config::{Config, ConfigError, Environment, File};

use super::schema::Settings;

const ENV_PREFIX: &str = "MEDIADECK";
const PATH_VAR: &str = "MEDIADECK_CONFIG_PATH";
const APP_DIR: &str = "mediadeck";
const FILE_NAME: &str = "config.toml";
/// Env values split on `,` into a list; everything else stays a scalar.
const LIST_KEY: &str = "controller.sources";

impl Settings {
    /// Load from the resolved config path and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(resolve_config_path().as_deref())
    }

    /// Load with `path` as the file layer. A missing file is not an error.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key(LIST_KEY),
            )
            .build()?
            .try_deserialize()
    }

    /// Check cross-field constraints. Every problem found is reported,
    /// separated by `; `.
    pub fn validate(&self) -> Result<(), String> {
        let mut problems: Vec<String> = Vec::new();

        let positive = [
            ("controller.tick_ms", self.controller.tick_ms),
            ("bluetooth.call_timeout_ms", self.bluetooth.call_timeout_ms),
            ("bluetooth.load_timeout_ms", self.bluetooth.load_timeout_ms),
        ];
        for (key, value) in positive {
            if value == 0 {
                problems.push(format!("{key} must be >= 1"));
            }
        }
        if self.disc.lookup_enabled && self.disc.lookup_timeout_ms == 0 {
            problems.push("disc.lookup_timeout_ms must be >= 1 when lookup is enabled".to_string());
        }
        if let Some(id) = self.controller.default_source {
            if !self.controller.sources.contains(&id) {
                problems.push(format!("controller.default_source `{id}` is not in controller.sources"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }
}

/// `$MEDIADECK_CONFIG_PATH` when set, otherwise [`default_config_path`].
pub fn resolve_config_path() -> Option<PathBuf> {
    env::var_os(PATH_VAR)
        .map(PathBuf::from)
        .or_else(default_config_path)
}

/// `$XDG_CONFIG_HOME/mediadeck/config.toml`, or `~/.config/mediadeck/config.toml`
/// when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .map(|dir| dir.join(APP_DIR).join(FILE_NAME))
}
