//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Halldyll pod - start, stop and connect to a `RunPod` GPU pod.
#[derive(Parser, Debug)]
#[command(name = "halldyll-pod")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to an env file with `RUNPOD_API_KEY` / `RUNPOD_POD_ID`.
    ///
    /// Defaults to `./.env`, then the per-user `halldyll/pod.env`.
    #[arg(long, global = true, env = "HALLDYLL_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// `RunPod` API key (overrides the environment and env file).
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (json, text).
    #[arg(long, global = true, default_value = "json")]
    pub output: OutputFormat,

    /// Log format on stderr (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a new on-demand pod.
    Create {
        /// API key (legacy positional form).
        #[arg(value_name = "API_KEY")]
        legacy_api_key: Option<String>,

        /// GPU type.
        #[arg(long)]
        gpu: Option<String>,

        /// Container image.
        #[arg(long)]
        image: Option<String>,

        /// Volume size in GB.
        #[arg(long)]
        disk_gb: Option<u32>,

        /// Port to expose, e.g. `22/tcp` (repeatable).
        #[arg(long = "port")]
        ports: Vec<String>,

        /// Pod name.
        #[arg(long)]
        name: Option<String>,

        /// Deploy to secure cloud instead of community hosts.
        #[arg(long)]
        secure: bool,
    },

    /// Resume a stopped pod and wait for SSH.
    Start {
        /// Target pod.
        #[command(flatten)]
        target: PodTarget,

        /// Return as soon as the start request is accepted.
        #[arg(long)]
        no_wait: bool,

        /// Seconds to wait for SSH.
        #[arg(long)]
        wait_timeout: Option<u64>,
    },

    /// Stop a running pod.
    Stop {
        /// Target pod.
        #[command(flatten)]
        target: PodTarget,
    },

    /// Show pod status.
    Status {
        /// Target pod.
        #[command(flatten)]
        target: PodTarget,
    },

    /// Show the SSH endpoint of a running pod.
    #[command(name = "ssh-info")]
    SshInfo {
        /// Target pod.
        #[command(flatten)]
        target: PodTarget,
    },
}

/// Pod selection shared by the pod subcommands.
///
/// Both values are optional and fall back to `RUNPOD_POD_ID` and
/// `RUNPOD_API_KEY`; `start <pod_id> <api_key>` is the legacy form.
#[derive(Args, Debug, Clone, Default)]
pub struct PodTarget {
    /// Pod identifier.
    #[arg(value_name = "POD_ID")]
    pub pod_id: Option<String>,

    /// API key (legacy positional form).
    #[arg(value_name = "API_KEY")]
    pub legacy_api_key: Option<String>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output for scripting.
    #[default]
    Json,
    /// Human-readable text output.
    Text,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_legacy_positional_start() {
        let cli = Cli::try_parse_from(["halldyll-pod", "start", "abc123", "rpa_key"]).unwrap();
        match cli.command {
            Commands::Start { target, no_wait, .. } => {
                assert_eq!(target.pod_id.as_deref(), Some("abc123"));
                assert_eq!(target.legacy_api_key.as_deref(), Some("rpa_key"));
                assert!(!no_wait);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_ssh_info_without_arguments() {
        let cli = Cli::try_parse_from(["halldyll-pod", "ssh-info", "--output", "text"]).unwrap();
        assert!(matches!(cli.output, OutputFormat::Text));
        assert!(matches!(cli.command, Commands::SshInfo { .. }));
    }

    #[test]
    fn test_create_options() {
        let cli = Cli::try_parse_from([
            "halldyll-pod",
            "create",
            "--gpu",
            "NVIDIA A40",
            "--port",
            "22/tcp",
            "--port",
            "8888/http",
            "--secure",
        ])
        .unwrap();

        match cli.command {
            Commands::Create { gpu, ports, secure, legacy_api_key, .. } => {
                assert_eq!(gpu.as_deref(), Some("NVIDIA A40"));
                assert_eq!(ports, vec![String::from("22/tcp"), String::from("8888/http")]);
                assert!(secure);
                assert!(legacy_api_key.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
