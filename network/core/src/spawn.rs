//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::collections::HashSet;

use libp2p::{identity::Keypair, Stream, StreamProtocol};
use log::*;
use spook_shutdown::ShutdownSignal;
use spook_swarm::substream::ProtocolNotification;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{worker::NetworkingWorker, NetworkError, NetworkHandle};

const LOG_TARGET: &str = "spook::network::spawn";

pub type InboundSubstreams = mpsc::UnboundedReceiver<ProtocolNotification<Stream>>;

pub type NetworkHandles = (NetworkHandle, InboundSubstreams, JoinHandle<Result<(), NetworkError>>);

/// Builds the swarm for `identity` and spawns its networking worker. Must be called from within a tokio runtime.
///
/// Substreams that remote peers open for any of `supported_protocols` are delivered on the returned
/// [`InboundSubstreams`] receiver.
pub fn spawn(
    identity: Keypair,
    supported_protocols: HashSet<StreamProtocol>,
    config: crate::Config,
    shutdown_signal: ShutdownSignal,
) -> Result<NetworkHandles, NetworkError> {
    let swarm = spook_swarm::create_swarm(identity, supported_protocols, config.swarm.clone())?;
    let local_peer_id = *swarm.local_peer_id();
    debug!(target: LOG_TARGET, "Spawning networking worker for {}", local_peer_id);

    let (tx_requests, rx_requests) = mpsc::channel(config.request_buffer_size);
    let (tx_inbound, rx_inbound) = mpsc::unbounded_channel();
    let handle = tokio::spawn(NetworkingWorker::new(rx_requests, tx_inbound, swarm, shutdown_signal).run());

    Ok((NetworkHandle::new(local_peer_id, tx_requests), rx_inbound, handle))
}
