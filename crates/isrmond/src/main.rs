//! GPIO Interrupt Monitor Daemon
//!
//! Main entry point for the isrmond daemon.
//! Counts edge interrupts on the configured GPIO lines and reports every
//! change until a termination signal arrives.

use clap::Parser;
use gpio_hal::EdgeMode;
use gpio_isrmond::{
    build_platform, install_signal_handlers, run_monitor, Backend, IsrError, IsrmondConfig,
    MonitorSummary, Result, ShutdownFlag, DEFAULT_CONFIG_PATH,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// GPIO edge-interrupt monitor
#[derive(Parser, Debug)]
#[command(name = "isrmond")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults are used if it does not exist)
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// GPIO backend, overrides the configuration file
    #[arg(short = 'b', long, value_enum)]
    backend: Option<Backend>,

    /// Edge that fires the interrupt (falling, rising, both)
    #[arg(short = 'e', long)]
    edge: Option<EdgeMode>,

    /// Longest idle period between counter scans, in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("isrmond: {}", e);
        return ExitCode::from(e.exit_code());
    }

    info!("isrmond: Starting GPIO interrupt monitor");

    let result = run_daemon(args, Arc::new(ShutdownFlag::new())).await;
    ExitCode::from(exit_status(&result, &mut std::io::stderr()))
}

/// Maps the daemon outcome to the process exit status. Fatal errors get a
/// one-line diagnostic on `diag`.
fn exit_status(result: &Result<MonitorSummary>, diag: &mut impl Write) -> u8 {
    match result {
        Ok(summary) => {
            info!(
                reports = summary.stats.reports,
                lines = summary.final_counts.len(),
                "isrmond: Exiting normally"
            );
            0
        }
        Err(e) => {
            // Nowhere left to report a failing stderr.
            let _ = writeln!(diag, "isrmond: {}", e);
            error!(error = %e, "isrmond: Exiting with error");
            e.exit_code()
        }
    }
}

/// Initialize structured logging on stderr; stdout carries the edge report.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| IsrError::Configuration(format!("Invalid log level '{}': {}", level, e)))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| IsrError::Configuration(format!("Failed to set logger: {}", e)))
}

/// Load configuration, arm the lines and observe until shutdown
async fn run_daemon(args: Args, shutdown: Arc<ShutdownFlag>) -> Result<MonitorSummary> {
    let mut config = IsrmondConfig::load_or_default(&args.config)?;
    if let Some(backend) = args.backend {
        config.platform.backend = backend;
    }
    if let Some(edge) = args.edge {
        config.lines.edge = edge;
    }
    if let Some(poll_interval_ms) = args.poll_interval_ms {
        config.observer.poll_interval_ms = poll_interval_ms;
    }
    config.validate()?;

    // Installed before the platform is touched so an early signal still
    // leads to an orderly exit.
    let _signal_tasks = install_signal_handlers(shutdown.clone())?;

    let mut platform = build_platform(&config)?;
    info!(
        backend = platform.name(),
        lines = ?config.line_ids(),
        edge = %config.lines.edge,
        "isrmond: Monitoring GPIO lines"
    );

    run_monitor(&mut platform, &config, shutdown, std::io::stdout()).await
}
