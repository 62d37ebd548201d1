//! Layered key/value configuration.
//!
//! A [`ConfigSource`] is an ordered list of read-only layers. Lookups return
//! the value from the first layer that has a non-empty entry. Loading an env
//! file never touches the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, HalldyllError, Result};

/// Prefix of the environment variables this crate reads.
pub const ENV_PREFIX: &str = "RUNPOD_";

/// Name of the per-user env file under the config directory.
const USER_ENV_FILE: &str = "halldyll/pod.env";

/// One named layer of configuration values.
#[derive(Debug, Clone, Default)]
struct Layer {
    name: String,
    values: HashMap<String, String>,
}

/// Ordered, read-only key/value configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    layers: Vec<Layer>,
}

impl ConfigSource {
    /// Creates an empty source.
    #[must_use]
    pub const fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Appends a layer with lower priority than the existing ones.
    #[must_use]
    pub fn with_layer(mut self, name: impl Into<String>, values: HashMap<String, String>) -> Self {
        self.layers.push(Layer {
            name: name.into(),
            values,
        });
        self
    }

    /// Appends a snapshot of the `RUNPOD_*` process environment variables.
    #[must_use]
    pub fn with_process_env(self) -> Self {
        let values = std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect();
        self.with_layer("environment", values)
    }

    /// Appends the values of an env file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line cannot be parsed.
    pub fn with_env_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let values = read_env_file(path)?;
        Ok(self.with_layer(path.display().to_string(), values))
    }

    /// Looks up a key, ignoring empty values.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.layers.iter().find_map(|layer| {
            layer
                .values
                .get(key)
                .map(String::as_str)
                .filter(|v| !v.is_empty())
                .inspect(|_| debug!(key, layer = %layer.name, "Resolved configuration key"))
        })
    }

    /// Looks up and parses a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is present but cannot be parsed.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| {
                    HalldyllError::from(ConfigError::invalid_value(key, raw, e.to_string()))
                })
            })
            .transpose()
    }
}

/// Reads `KEY=VALUE` lines from an env file.
///
/// Comments and blank lines are skipped and surrounding quotes are stripped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    info!("Loading environment from: {}", path.display());

    let env_error = |message: String| ConfigError::EnvFile {
        path: path.to_path_buf(),
        message,
    };

    let iter = dotenvy::from_path_iter(path).map_err(|e| env_error(e.to_string()))?;

    let mut values = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| env_error(e.to_string()))?;
        values.entry(key).or_insert(value);
    }

    debug!("Read {} entries from {}", values.len(), path.display());
    Ok(values)
}

/// Finds an env file: `.env` in `start_dir`, then the per-user file.
#[must_use]
pub fn find_env_file(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let mut candidates = vec![start_dir.as_ref().join(".env")];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join(USER_ENV_FILE));
    }

    candidates.into_iter().find(|path| {
        let found = path.is_file();
        if found {
            info!("Found environment file: {}", path.display());
        }
        found
    })
}
