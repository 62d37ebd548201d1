//! Typed controller settings.
//!
//! Every setting has a default and can be overridden through the layered
//! [`ConfigSource`]:
//!
//! | Key | Default |
//! |-----|---------|
//! | `RUNPOD_API_URL` | `https://api.runpod.io/graphql` |
//! | `RUNPOD_HTTP_TIMEOUT_SECS` | 30 |
//! | `RUNPOD_MUTATION_TIMEOUT_SECS` | 60 |
//! | `RUNPOD_CREATE_TIMEOUT_SECS` | 120 |
//! | `RUNPOD_POLL_INTERVAL_SECS` | 5 |
//! | `RUNPOD_WAIT_TIMEOUT_SECS` | 120 |
//! | `RUNPOD_GPU_TYPE` | `NVIDIA GeForce RTX 4080 SUPER` |
//! | `RUNPOD_IMAGE_NAME` | CUDA devel image |
//! | `RUNPOD_DISK_GB` | 50 |
//! | `RUNPOD_PORTS` | `22/tcp` |

use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::runpod::{CreatePodRequest, RUNPOD_API_URL};

use super::source::ConfigSource;

/// Default timeout for read-only queries in seconds.
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Default timeout for start/stop mutations in seconds.
const DEFAULT_MUTATION_TIMEOUT_SECS: u64 = 60;

/// Default timeout for the deploy mutation in seconds.
const DEFAULT_CREATE_TIMEOUT_SECS: u64 = 120;

/// Default interval between reachability polls in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default reachability budget in seconds.
const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 120;

/// Settings shared by every controller operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// GraphQL endpoint.
    pub api_url: String,
    /// Timeout for status queries.
    pub query_timeout: Duration,
    /// Timeout for start and stop.
    pub mutation_timeout: Duration,
    /// Timeout for create.
    pub create_timeout: Duration,
    /// Pause between reachability polls.
    pub poll_interval: Duration,
    /// Total reachability budget.
    pub wait_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            api_url: RUNPOD_API_URL.to_string(),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            mutation_timeout: Duration::from_secs(DEFAULT_MUTATION_TIMEOUT_SECS),
            create_timeout: Duration::from_secs(DEFAULT_CREATE_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            wait_timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
        }
    }
}

impl ControllerSettings {
    /// Reads settings from a configuration source.
    ///
    /// # Errors
    ///
    /// Returns an error if a present value cannot be parsed or a duration is zero.
    pub fn from_source(source: &ConfigSource) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            api_url: source
                .get("RUNPOD_API_URL")
                .map_or(defaults.api_url, ToString::to_string),
            query_timeout: secs(source, "RUNPOD_HTTP_TIMEOUT_SECS")?.unwrap_or(defaults.query_timeout),
            mutation_timeout: secs(source, "RUNPOD_MUTATION_TIMEOUT_SECS")?
                .unwrap_or(defaults.mutation_timeout),
            create_timeout: secs(source, "RUNPOD_CREATE_TIMEOUT_SECS")?
                .unwrap_or(defaults.create_timeout),
            poll_interval: secs(source, "RUNPOD_POLL_INTERVAL_SECS")?
                .unwrap_or(defaults.poll_interval),
            wait_timeout: secs(source, "RUNPOD_WAIT_TIMEOUT_SECS")?
                .unwrap_or(defaults.wait_timeout),
        })
    }
}

/// Reads a positive number of seconds.
fn secs(source: &ConfigSource, key: &str) -> Result<Option<Duration>> {
    match source.parse::<u64>(key)? {
        Some(0) => Err(ConfigError::invalid_value(key, "0", "must be greater than zero").into()),
        value => Ok(value.map(Duration::from_secs)),
    }
}

impl CreatePodRequest {
    /// Builds the default creation request, overridden from the source.
    ///
    /// # Errors
    ///
    /// Returns an error if `RUNPOD_DISK_GB` is not a number.
    pub fn from_source(source: &ConfigSource) -> Result<Self> {
        let mut request = Self::default();

        if let Some(gpu) = source.get("RUNPOD_GPU_TYPE") {
            request = request.with_gpu_type(gpu);
        }
        if let Some(image) = source.get("RUNPOD_IMAGE_NAME") {
            request = request.with_image(image);
        }
        if let Some(disk) = source.parse::<u32>("RUNPOD_DISK_GB")? {
            request = request.with_volume_gb(disk);
        }
        if let Some(ports) = source.get("RUNPOD_PORTS") {
            request = request.with_ports(split_csv(ports));
        }

        Ok(request)
    }
}

/// Splits a comma separated list, dropping blanks.
fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
