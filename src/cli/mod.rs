//! CLI module for the Halldyll pod manager.
//!
//! This module provides the command-line interface for controlling a
//! single `RunPod` pod.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat, PodTarget};
pub use output::{OutputFormatter, write_output};
