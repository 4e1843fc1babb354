//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{str::FromStr, sync::Arc};

use log::*;
use spook_network::{swarm::is_supported_multiaddr, BootstrapPeer};
use spook_shutdown::ShutdownSignal;
use tokio::{task::JoinHandle, time};

use crate::{CrawlerConfig, Transport, TransportError};

const LOG_TARGET: &str = "spook::bootstrap";

/// Parses bootstrap addresses, logging and skipping any that are malformed or cannot be dialed.
pub fn parse_bootstrap_peers<I, S>(addresses: I) -> Vec<BootstrapPeer>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    addresses
        .into_iter()
        .enumerate()
        .filter_map(|(i, addr)| {
            let addr = addr.as_ref();
            let peer = match BootstrapPeer::from_str(addr) {
                Ok(peer) => peer,
                Err(err) => {
                    error!(target: LOG_TARGET, "Error parsing bootstrapper {} address '{}': {}", i, addr, err);
                    return None;
                },
            };
            if !is_supported_multiaddr(peer.address()) {
                error!(
                    target: LOG_TARGET,
                    "Bootstrapper {} address '{}' uses an unsupported transport", i, addr
                );
                return None;
            }
            Some(peer)
        })
        .collect()
}

/// Spawns one task per bootstrapper that keeps a connection to it for as long as the process runs. Returns no tasks
/// if `peers` is empty.
pub fn spawn_bootstrap<T: Transport>(
    transport: T,
    peers: Vec<BootstrapPeer>,
    config: Arc<CrawlerConfig>,
    shutdown_signal: ShutdownSignal,
) -> Vec<JoinHandle<()>> {
    if peers.is_empty() {
        warn!(target: LOG_TARGET, "No usable bootstrappers for {}", transport.local_peer_id());
    }
    peers
        .into_iter()
        .map(|peer| {
            tokio::spawn(maintain_connection(
                transport.clone(),
                peer,
                config.clone(),
                shutdown_signal.clone(),
            ))
        })
        .collect()
}

async fn maintain_connection<T: Transport>(
    transport: T,
    peer: BootstrapPeer,
    config: Arc<CrawlerConfig>,
    shutdown_signal: ShutdownSignal,
) {
    let peer_id = peer.peer_id();
    loop {
        debug!(target: LOG_TARGET, "Connecting to bootstrapper {}", peer);
        let result = match shutdown_signal.run_until(connect(&transport, &peer, &config)).await {
            Ok(result) => result,
            Err(_) => break,
        };
        if let Err(err) = result {
            warn!(target: LOG_TARGET, "Error connecting to bootstrapper {}: {}", peer, err);
            if shutdown_signal.sleep(config.reconnect_interval).await.is_err() {
                break;
            }
            continue;
        }

        debug!(target: LOG_TARGET, "Connected to bootstrapper {}", peer_id);
        loop {
            match transport.is_connected(peer_id).await {
                Ok(true) => {},
                Ok(false) => break,
                Err(err) => {
                    warn!(target: LOG_TARGET, "Failed to check connection to {}: {}", peer_id, err);
                    break;
                },
            }
            if shutdown_signal.sleep(config.liveness_poll_interval).await.is_err() {
                return;
            }
        }
        debug!(target: LOG_TARGET, "Disconnected from bootstrapper {}", peer_id);
    }
    debug!(target: LOG_TARGET, "Stopped connecting to bootstrapper {}", peer_id);
}

async fn connect<T: Transport>(
    transport: &T,
    peer: &BootstrapPeer,
    config: &CrawlerConfig,
) -> Result<(), TransportError> {
    time::timeout(config.dial_timeout, transport.connect(peer))
        .await
        .map_err(|_| TransportError::Timeout(config.dial_timeout))?
}
