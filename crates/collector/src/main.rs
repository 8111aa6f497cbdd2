//! flowcaskd - NetFlow collector daemon
//!
//! Receives NetFlow v1/v5/v7 exports over UDP, filters each flow through the
//! configured rule list, and appends accepted flows to a binary flow log.
//!
//! ```bash
//! flowcaskd                       # default config search, 0.0.0.0:2055
//! flowcaskd -f /etc/flowcask.toml
//! flowcaskd -d -D logdir=/tmp    # foreground-verbose, macro for the config
//! ```
//!
//! Process supervision and privilege separation are deployment concerns;
//! flowcaskd always runs in the foreground.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flowcask_collector::control::ControlFlags;
use flowcask_collector::monitor::{load_config, LocalMonitor};
use flowcask_collector::serve;
use flowcask_config::parse_defines;

/// NetFlow collector daemon
#[derive(Parser, Debug)]
#[command(name = "flowcaskd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Don't detach; also log each stored flow
    #[arg(short = 'd')]
    debug: bool,

    /// Configuration file path
    #[arg(short = 'f', long = "config", value_name = "path")]
    config: Option<PathBuf>,

    /// Define a macro for the configuration file, repeatable
    #[arg(short = 'D', value_name = "name=value")]
    define: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let defines = parse_defines(&cli.define)?;
    let config =
        load_config(cli.config.as_deref(), &defines).context("config file has errors")?;

    init_logging(if cli.debug { "debug" } else { &config.log.level })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listeners = config.listen.len(),
        logfile = %config.logfile.display(),
        "flowcaskd starting"
    );

    let flags = ControlFlags::new();
    ControlFlags::install(&flags).context("signal handler setup failed")?;

    let monitor = Arc::new(LocalMonitor::new(
        cli.config,
        defines,
        config.logfile.clone(),
    ));

    serve::run(config, monitor, flags, cli.debug).await?;

    tracing::info!("flowcaskd shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
