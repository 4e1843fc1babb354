//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

//! Covert gossipsub crawler.
//!
//! Each identity joins the network through a set of bootstrappers and then waits for peers to open gossipsub streams
//! to it. Every such peer is grafted on the topics it announces and pruned us in return, and the signed peer records
//! carried in the peer exchange of each PRUNE are verified, deduplicated and written out as JSON lines.

pub mod backoff;
pub mod bootstrap;
pub mod cli;
mod config;
mod error;
pub mod exit_codes;
pub mod identity;
pub mod logging;
pub mod node;
pub mod proto;
pub mod record_log;
mod serializers;
pub mod session;
mod transport;

#[cfg(test)]
mod test_utils;

use std::{fs::OpenOptions, path::Path, sync::Arc, time::Duration};

use futures::future;
use log::*;
use spook_network::identity::Keypair;
use spook_shutdown::{Shutdown, ShutdownSignal};
use tokio::task::JoinHandle;

pub use crate::{config::*, error::*, transport::Transport};
use crate::{
    bootstrap::parse_bootstrap_peers,
    cli::Cli,
    exit_codes::ExitError,
    identity::{identity_path, load_or_create_identity},
    node::spawn_identity,
    record_log::PeerRecordLog,
};

const LOG_TARGET: &str = "spook::app";

/// Runs `cli.num_peers` crawler identities until every bootstrap task has ended, Ctrl-C is pressed or `shutdown` is
/// triggered. Returns straight away if no identity has a bootstrapper to connect to.
pub async fn run_crawler(cli: Cli, config: ApplicationConfig, mut shutdown: Shutdown) -> Result<(), ExitError> {
    let mut config = config.crawler;
    if let Some(bootstrappers) = cli.bootstrappers {
        config.bootstrappers = bootstrappers;
    }
    let config = Arc::new(config);

    let records = Arc::new(open_record_log(cli.file.as_deref())?);
    let bootstrappers = parse_bootstrap_peers(&config.bootstrappers);

    let mut bootstrap_tasks = Vec::new();
    let mut networks = Vec::with_capacity(cli.num_peers);
    for i in 0..cli.num_peers {
        let identity = match cli.id.as_deref() {
            Some(base) => load_or_create_identity(identity_path(base, i))?,
            None => Keypair::generate_ed25519(),
        };
        let running = spawn_identity(
            identity,
            records.clone(),
            config.clone(),
            bootstrappers.clone(),
            shutdown.to_signal(),
        )?;
        if running.bootstrap_tasks.is_empty() {
            warn!(target: LOG_TARGET, "Identity {} has no bootstrappers", running.peer_id);
        }
        bootstrap_tasks.extend(running.bootstrap_tasks);
        networks.push(running.network);
    }

    if bootstrap_tasks.is_empty() {
        warn!(target: LOG_TARGET, "Nothing to connect to. Exiting.");
        shutdown.trigger();
        return Ok(());
    }

    let _stats = spawn_stats_logger(records.clone(), config.stats_interval, shutdown.to_signal());
    let signal = shutdown.to_signal();
    tokio::select! {
        _ = future::join_all(bootstrap_tasks) => {
            info!(target: LOG_TARGET, "All bootstrap tasks have ended");
        },
        _ = tokio::signal::ctrl_c() => {
            info!(target: LOG_TARGET, "Interrupt received. Shutting down.");
        },
        _ = signal => {},
    }

    shutdown.trigger();
    for network in networks {
        match network.await {
            Ok(Ok(())) => {},
            Ok(Err(err)) => warn!(target: LOG_TARGET, "Networking worker failed: {}", err),
            Err(err) => warn!(target: LOG_TARGET, "Networking worker panicked: {}", err),
        }
    }
    info!(
        target: LOG_TARGET,
        "Harvested records for {} distinct peer(s)",
        records.known_peers()
    );
    Ok(())
}

/// Records are appended to `file`, or written to stdout without one.
fn open_record_log(file: Option<&Path>) -> Result<PeerRecordLog, ExitError> {
    match file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            info!(target: LOG_TARGET, "Writing peer records to {}", path.display());
            Ok(PeerRecordLog::new(file))
        },
        None => Ok(PeerRecordLog::new(std::io::stdout())),
    }
}

fn spawn_stats_logger(
    records: Arc<PeerRecordLog>,
    interval: Duration,
    shutdown_signal: ShutdownSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while shutdown_signal.sleep(interval).await.is_ok() {
            info!(
                target: LOG_TARGET,
                "{} distinct peer(s) harvested so far",
                records.known_peers()
            );
        }
    })
}
