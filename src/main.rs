//! Halldyll pod CLI entrypoint.
//!
//! Results go to stdout, logs go to stderr, and the exit code reflects the
//! kind of failure.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use halldyll_pod_manager::cli::{
    Cli, Commands, LogFormat, OutputFormatter, PodTarget, write_output,
};
use halldyll_pod_manager::config::{
    ConfigSource, ControllerSettings, CredentialResolver, find_env_file,
};
use halldyll_pod_manager::error::Result;
use halldyll_pod_manager::runpod::{CloudType, CreatePodRequest, PodController, Reachability};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Exit code when the pod started but SSH never came up.
const EXIT_NOT_REACHABLE: u8 = 5;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);
    let cancel = CancellationToken::new();

    let outcome = runtime.block_on(async {
        let trigger = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                trigger.cancel();
            }
        });

        run(cli, &formatter, cancel).await
    });

    let (output, code) = match outcome {
        Ok(Outcome { output, code }) => (output, code),
        Err(e) => (formatter.format_error(&e), e.kind().exit_code()),
    };

    match write_output(&mut std::io::stdout().lock(), &output) {
        Ok(()) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Failed to write output: {e}");
            ExitCode::from(e.kind().exit_code())
        }
    }
}

/// Rendered result of a command.
struct Outcome {
    output: String,
    code: u8,
}

impl Outcome {
    const fn success(output: String) -> Self {
        Self { output, code: 0 }
    }
}

/// Initializes the logging system on stderr.
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Builds the configuration layers: process environment, then the env file.
fn load_source(env_file: Option<&Path>) -> Result<ConfigSource> {
    let source = ConfigSource::new().with_process_env();

    match env_file {
        Some(path) => source.with_env_file(path),
        None => match find_env_file(".") {
            Some(path) => {
                debug!(path = %path.display(), "Using env file");
                source.with_env_file(path)
            }
            None => Ok(source),
        },
    }
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter, cancel: CancellationToken) -> Result<Outcome> {
    let source = load_source(cli.env_file.as_deref())?;
    let settings = ControllerSettings::from_source(&source)?;
    let global_key = cli.api_key;

    match cli.command {
        Commands::Create {
            legacy_api_key,
            gpu,
            image,
            disk_gb,
            ports,
            name,
            secure,
        } => {
            let credentials = CredentialResolver::new(source.clone())
                .with_api_key(global_key.or(legacy_api_key))
                .resolve_api_key()?;

            let mut request = CreatePodRequest::from_source(&source)?;
            if let Some(gpu) = gpu {
                request = request.with_gpu_type(&gpu);
            }
            if let Some(image) = image {
                request = request.with_image(&image);
            }
            if let Some(disk_gb) = disk_gb {
                request = request.with_volume_gb(disk_gb);
            }
            if !ports.is_empty() {
                request = request.with_ports(ports);
            }
            if let Some(name) = name {
                request = request.with_name(&name);
            }
            if secure {
                request = request.with_cloud_type(CloudType::Secure);
            }

            let controller = PodController::connect(credentials, settings)?.with_cancellation(cancel);
            let status = controller.create(&request).await?;
            Ok(Outcome::success(formatter.format_status(&status)))
        }

        Commands::Start {
            target,
            no_wait,
            wait_timeout,
        } => {
            let budget = wait_timeout.map_or(settings.wait_timeout, Duration::from_secs);
            let (controller, pod_id) = connect(source, settings, global_key, target, cancel)?;

            if no_wait {
                let status = controller.start(&pod_id).await?;
                return Ok(Outcome::success(formatter.format_start(&status, None)));
            }

            let (status, reachability) = controller.start_and_wait(&pod_id, budget).await?;
            let code = match reachability {
                Reachability::Reachable(_) => 0,
                Reachability::TimedOut { .. } => EXIT_NOT_REACHABLE,
            };
            Ok(Outcome {
                output: formatter.format_start(&status, Some(&reachability)),
                code,
            })
        }

        Commands::Stop { target } => {
            let (controller, pod_id) = connect(source, settings, global_key, target, cancel)?;
            let status = controller.stop(&pod_id).await?;
            Ok(Outcome::success(formatter.format_status(&status)))
        }

        Commands::Status { target } => {
            let (controller, pod_id) = connect(source, settings, global_key, target, cancel)?;
            let status = controller.get_status(&pod_id).await?;
            Ok(Outcome::success(formatter.format_status(&status)))
        }

        Commands::SshInfo { target } => {
            let (controller, pod_id) = connect(source, settings, global_key, target, cancel)?;
            let endpoint = controller.ssh_endpoint(&pod_id).await?;
            Ok(Outcome::success(formatter.format_ssh(endpoint.as_ref())))
        }
    }
}

/// Resolves credentials for a pod command and builds the controller.
fn connect(
    source: ConfigSource,
    settings: ControllerSettings,
    global_key: Option<String>,
    target: PodTarget,
    cancel: CancellationToken,
) -> Result<(PodController, String)> {
    let (credentials, pod_id) = CredentialResolver::new(source)
        .with_api_key(global_key.or(target.legacy_api_key))
        .with_pod_id(target.pod_id)
        .resolve()?;

    let controller = PodController::connect(credentials, settings)?.with_cancellation(cancel);

    Ok((controller, pod_id))
}
