//! Main collector loop
//!
//! One cooperative loop multiplexes the datagram channel, the monitor's
//! liveness, and the control flags. The flags are observed and cleared at
//! the top of every iteration, in the same order the original daemon used:
//! exit, reopen, reconfigure, (re)open the log, info. The log handle is
//! opened lazily whenever it is absent, so consecutive reopen requests cost
//! one header verification, not two.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use flowcask_config::Config;
use flowcask_store::FlowLog;

use crate::control::ControlFlags;
use crate::ingest::Ingest;
use crate::listener::ListenerSet;
use crate::monitor::Monitor;

/// Run the collector until an exit flag, monitor loss, or a fatal error
pub async fn run(
    mut config: Config,
    monitor: Arc<dyn Monitor>,
    flags: Arc<ControlFlags>,
    verbose_cli: bool,
) -> Result<()> {
    let mut ingest = Ingest::new(
        config.max_peers,
        config.rules().context("filter rules")?,
        config.store_mask().context("store mask")?,
        config.verbose || verbose_cli,
    );

    let mut listeners = ListenerSet::spawn(&config.listen).context("listener setup failed")?;
    let mut log: Option<FlowLog> = None;

    loop {
        if let Some(signo) = flags.take_exit() {
            info!(signal = signo, "exiting on signal");
            break;
        }
        if flags.take_reopen() && log.is_some() {
            info!("log reopen requested");
            log = None;
        }
        if flags.take_reconf() {
            info!("reconfiguration requested");
            config = monitor
                .reconfigure()
                .context("reconfigure failed, exiting")?;
            ingest.apply_config(
                config.max_peers,
                config.rules().context("filter rules")?,
                config.store_mask().context("store mask")?,
                config.verbose || verbose_cli,
            );
            listeners.shutdown().await;
            listeners =
                ListenerSet::spawn(&config.listen).context("listener setup failed")?;
        }
        if log.is_none() {
            let file = monitor.open_log().context("log open failed, exiting")?;
            log = Some(FlowLog::open(file).context("flow log startup failed, exiting")?);
        }
        if flags.take_info() {
            ingest.dump_state();
        }

        tokio::select! {
            _ = flags.notified() => {}

            _ = monitor.closed() => {
                info!("monitor closed, exiting");
                break;
            }

            maybe = listeners.recv() => {
                let Some(datagram) = maybe else { break };
                if let Some(log) = log.as_mut() {
                    ingest
                        .handle_datagram(&datagram.payload, datagram.from, log)
                        .context("flow log write failed, exiting")?;
                }
            }
        }
    }

    listeners.shutdown().await;
    Ok(())
}
