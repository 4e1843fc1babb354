//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{collections::HashSet, sync::Arc};

use log::*;
use spook_network::{identity::Keypair, BootstrapPeer, NetworkHandle, PeerId, ProtocolNotification};
use spook_shutdown::ShutdownSignal;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    backoff::BackoffTracker,
    bootstrap,
    record_log::PeerRecordLog,
    session::{GossipSession, SessionOutcome, GOSSIPSUB_PROTOCOL},
    CrawlerConfig,
    Transport,
    TransportError,
};

const LOG_TARGET: &str = "spook::node";

/// One crawler identity: a transport, its own backoff table and the record log shared with every other identity.
pub struct CrawlerNode<T: Transport> {
    transport: T,
    backoff: Arc<BackoffTracker>,
    records: Arc<PeerRecordLog>,
    config: Arc<CrawlerConfig>,
    shutdown_signal: ShutdownSignal,
}

impl<T: Transport> CrawlerNode<T> {
    pub fn new(
        transport: T,
        records: Arc<PeerRecordLog>,
        config: Arc<CrawlerConfig>,
        shutdown_signal: ShutdownSignal,
    ) -> Self {
        let backoff = Arc::new(BackoffTracker::new(config.max_backoff, config.graft_grace));
        Self {
            transport,
            backoff,
            records,
            config,
            shutdown_signal,
        }
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.transport.local_peer_id()
    }

    /// Starts a gossip session on a stream that `peer_id` opened to us.
    pub fn handle_inbound(&self, peer_id: PeerId, substream: T::Substream) -> JoinHandle<SessionOutcome> {
        let session = GossipSession::new(
            peer_id,
            self.transport.clone(),
            self.backoff.clone(),
            self.records.clone(),
            self.config.clone(),
            self.shutdown_signal.clone(),
        );
        tokio::spawn(session.run(substream))
    }

    /// Spawns the loop that starts a session for every inbound gossip stream. Streams for any other protocol are
    /// dropped.
    pub fn spawn_inbound_handler(
        &self,
        mut inbound: mpsc::UnboundedReceiver<ProtocolNotification<T::Substream>>,
    ) -> JoinHandle<()> {
        let node = self.clone();
        tokio::spawn(async move {
            loop {
                let notification = match node.shutdown_signal.run_until(inbound.recv()).await {
                    Ok(Some(notification)) => notification,
                    Ok(None) | Err(_) => break,
                };
                if notification.protocol != GOSSIPSUB_PROTOCOL {
                    warn!(
                        target: LOG_TARGET,
                        "Dropping {} stream from {}", notification.protocol, notification.peer_id
                    );
                    continue;
                }
                debug!(target: LOG_TARGET, "New gossip stream from {}", notification.peer_id);
                let _session = node.handle_inbound(notification.peer_id, notification.substream);
            }
            debug!(target: LOG_TARGET, "Inbound handler for {} stopped", node.local_peer_id());
        })
    }

    pub fn spawn_bootstrap(&self, peers: Vec<BootstrapPeer>) -> Vec<JoinHandle<()>> {
        bootstrap::spawn_bootstrap(
            self.transport.clone(),
            peers,
            self.config.clone(),
            self.shutdown_signal.clone(),
        )
    }
}

impl<T: Transport> Clone for CrawlerNode<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            backoff: self.backoff.clone(),
            records: self.records.clone(),
            config: self.config.clone(),
            shutdown_signal: self.shutdown_signal.clone(),
        }
    }
}

/// A running identity
pub struct RunningIdentity {
    pub peer_id: PeerId,
    pub bootstrap_tasks: Vec<JoinHandle<()>>,
    pub network: JoinHandle<Result<(), spook_network::NetworkError>>,
}

/// Starts the libp2p host for `identity`, registers the gossip handler and begins connecting to `bootstrappers`.
/// Must be called from within a tokio runtime.
pub fn spawn_identity(
    identity: Keypair,
    records: Arc<PeerRecordLog>,
    config: Arc<CrawlerConfig>,
    bootstrappers: Vec<BootstrapPeer>,
    shutdown_signal: ShutdownSignal,
) -> Result<RunningIdentity, TransportError> {
    let (handle, inbound, network) = spook_network::spawn(
        identity,
        HashSet::from([GOSSIPSUB_PROTOCOL]),
        spook_network::Config::default(),
        shutdown_signal.clone(),
    )?;
    let peer_id = *handle.local_peer_id();
    info!(target: LOG_TARGET, "Started crawler identity {}", peer_id);

    let node = CrawlerNode::<NetworkHandle>::new(handle, records, config, shutdown_signal);
    node.spawn_inbound_handler(inbound);
    let bootstrap_tasks = node.spawn_bootstrap(bootstrappers);

    Ok(RunningIdentity {
        peer_id,
        bootstrap_tasks,
        network,
    })
}
