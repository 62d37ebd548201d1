//! Output formatting for CLI commands.
//!
//! JSON output is meant for scripts and is printed on stdout; text output
//! is for people. Logs never go through here.

use colored::Colorize;
use serde_json::json;
use std::fmt::Write;
use std::io;
use tabled::{Table, Tabled};

use crate::error::{HalldyllError, Result};
use crate::runpod::{DesiredStatus, PodStatus, Reachability, SshEndpoint};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Port binding row for table display.
#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Private")]
    private_port: u16,
    #[tabled(rename = "Public")]
    public: String,
    #[tabled(rename = "Type")]
    protocol: String,
    #[tabled(rename = "Public IP")]
    is_public: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a pod status.
    #[must_use]
    pub fn format_status(&self, status: &PodStatus) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!(status)),
            OutputFormat::Text => Self::format_status_text(status),
        }
    }

    /// Formats the result of a start request and the optional wait after it.
    #[must_use]
    pub fn format_start(&self, status: &PodStatus, reachability: Option<&Reachability>) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({ "pod": status, "ssh": reachability })),
            OutputFormat::Text => {
                let mut output = Self::format_status_text(status);
                match reachability {
                    Some(Reachability::Reachable(endpoint)) => {
                        output.push_str(&Self::format_ssh_text(endpoint));
                    }
                    Some(Reachability::TimedOut { polls, waited }) => {
                        let _ = writeln!(
                            output,
                            "{} Timed out waiting for SSH ({polls} polls over {}s)",
                            "✗".red(),
                            waited.as_secs()
                        );
                    }
                    None => {}
                }
                output
            }
        }
    }

    /// Formats an SSH lookup.
    #[must_use]
    pub fn format_ssh(&self, endpoint: Option<&SshEndpoint>) -> String {
        match (self.format, endpoint) {
            (OutputFormat::Json, Some(endpoint)) => to_json(&json!({
                "ssh": endpoint,
                "command": endpoint.ssh_command(),
            })),
            (OutputFormat::Json, None) => to_json(&json!({ "ssh": null })),
            (OutputFormat::Text, Some(endpoint)) => Self::format_ssh_text(endpoint),
            (OutputFormat::Text, None) => format!(
                "{} No SSH endpoint available. The pod may not be running yet.\n",
                "!".yellow()
            ),
        }
    }

    /// Formats an error.
    #[must_use]
    pub fn format_error(&self, error: &HalldyllError) -> String {
        let kind = error.kind();
        match self.format {
            OutputFormat::Json => {
                let mut body = json!({
                    "kind": kind.as_str(),
                    "message": error.to_string(),
                });
                if let Some(status) = transport_status(error) {
                    body["status"] = json!(status);
                }
                to_json(&json!({ "error": body }))
            }
            OutputFormat::Text => format!("{} {error}\n", "✗".red()),
        }
    }

    /// Formats a status as text.
    fn format_status_text(status: &PodStatus) -> String {
        let mut output = String::new();

        let id = if status.id.is_empty() { "-" } else { status.id.as_str() };
        let _ = writeln!(output, "Pod:     {} ({id})", status.name.bold());
        let _ = writeln!(output, "Status:  {}", Self::format_desired_status(status.desired_status));

        if let Some(uptime) = status.uptime_secs() {
            let _ = writeln!(output, "Uptime:  {}", Self::format_uptime(uptime));
        }

        let rows: Vec<PortRow> = status
            .runtime
            .iter()
            .flat_map(|r| r.ports.iter())
            .map(|p| PortRow {
                private_port: p.private_port,
                public: p
                    .public_port
                    .map_or_else(|| String::from("-"), |port| format!("{}:{port}", p.ip)),
                protocol: p.protocol.to_string(),
                is_public: if p.is_public { "yes" } else { "no" }.to_string(),
            })
            .collect();

        if !rows.is_empty() {
            output.push('\n');
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        output
    }

    fn format_ssh_text(endpoint: &SshEndpoint) -> String {
        format!(
            "{} SSH ready at {endpoint}\n  {}\n",
            "✓".green(),
            endpoint.ssh_command().bold()
        )
    }

    fn format_desired_status(status: DesiredStatus) -> String {
        match status {
            DesiredStatus::Running => "running".green().to_string(),
            DesiredStatus::Created => "created".yellow().to_string(),
            DesiredStatus::Exited | DesiredStatus::Terminated => status.to_string().red().to_string(),
            DesiredStatus::Unknown => "unknown".dimmed().to_string(),
        }
    }

    fn format_uptime(secs: u64) -> String {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        format!("{hours}h {minutes:02}m")
    }
}

/// Writes rendered output and flushes it.
///
/// # Errors
///
/// Returns [`HalldyllError::Io`] if the writer fails, e.g. on a closed pipe.
pub fn write_output(writer: &mut impl io::Write, output: &str) -> Result<()> {
    writer.write_all(output.as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn transport_status(error: &HalldyllError) -> Option<u16> {
    match error {
        HalldyllError::Transport(e) => e.status(),
        _ => None,
    }
}

fn to_json(value: &serde_json::Value) -> String {
    let mut rendered = serde_json::to_string_pretty(value).unwrap_or_default();
    rendered.push('\n');
    rendered
}
