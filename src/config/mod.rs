//! Configuration module for the Halldyll pod manager.
//!
//! This module handles all configuration-related functionality:
//! - Layered key/value sources (process environment, env files)
//! - Credential resolution with explicit overrides
//! - Typed controller settings and pod creation defaults

mod credentials;
mod settings;
mod source;

pub use credentials::{CredentialResolver, Credentials};
pub use settings::ControllerSettings;
pub use source::{ConfigSource, ENV_PREFIX, find_env_file, read_env_file};
