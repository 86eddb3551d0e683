//! Claude Relay - mirrors Claude Code conversations into Langfuse telemetry.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use claude_relay::config::{ConfigLoader, MonitorConfig};
use claude_relay::display;
use claude_relay::monitor::{Monitor, StatusReport};
use claude_relay::telemetry::{LangfuseSink, MemorySink, TelemetrySink};

#[derive(Parser)]
#[command(
    name = "claude-relay",
    about = "Mirrors Claude Code conversations into Langfuse telemetry",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file path (overrides the default search).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch conversation logs and forward messages.
    Watch {
        /// Catch-up window in hours; 0 disables backfill.
        #[arg(long)]
        lookback_hours: Option<i64>,
        /// Suppress per-message output.
        #[arg(long)]
        quiet: bool,
        /// Process everything but never call the backend.
        #[arg(long)]
        dry_run: bool,
        /// Conversation root (defaults to ~/.claude).
        #[arg(long)]
        claude_dir: Option<PathBuf>,
    },
    /// Report readiness diagnostics and exit.
    Status,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Option<MonitorConfig> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    match loader.load() {
        Ok(config) => Some(config),
        Err(e) => {
            display::print_error(&e.to_string());
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Watch {
            lookback_hours,
            quiet,
            dry_run,
            claude_dir,
        } => {
            let Some(mut config) = load_config(cli.config) else {
                return ExitCode::FAILURE;
            };
            if let Some(hours) = lookback_hours {
                config.lookback_hours = hours;
            }
            config.quiet |= quiet;
            config.dry_run |= dry_run;
            if claude_dir.is_some() {
                config.claude_dir = claude_dir;
            }

            run_watch(config).await
        }
        Commands::Status => {
            let Some(config) = load_config(cli.config) else {
                return ExitCode::FAILURE;
            };
            run_status(&config)
        }
    }
}

async fn run_watch(config: MonitorConfig) -> ExitCode {
    // Dry-run keeps every local effect but swaps the backend for an
    // in-process sink: zero network traffic, no credentials needed.
    let sink: Arc<dyn TelemetrySink> = if config.dry_run {
        Arc::new(MemorySink::new())
    } else {
        match LangfuseSink::from_config(&config.langfuse) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                display::print_error(&e.to_string());
                return ExitCode::FAILURE;
            }
        }
    };

    let mut monitor = Monitor::new(config, sink);
    match monitor.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run_status(config: &MonitorConfig) -> ExitCode {
    let report = StatusReport::gather(config);

    println!("{}", "claude-relay status".bold());
    display::print_check(
        "conversation root",
        report.root_present,
        &report.root.display().to_string(),
    );
    display::print_check(
        "public key",
        report.public_key_present,
        &config.langfuse.public_key_env,
    );
    display::print_check(
        "secret key",
        report.secret_key_present,
        &config.langfuse.secret_key_env,
    );
    display::print_check("backend", report.base_url_valid, &report.base_url);

    if report.ready() {
        println!("{}", "ready to watch".green().bold());
        ExitCode::SUCCESS
    } else {
        println!("{}", "not ready".red().bold());
        ExitCode::FAILURE
    }
}
