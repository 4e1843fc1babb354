//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::collections::HashMap;

use libp2p::{
    futures::StreamExt,
    identify,
    swarm::{
        dial_opts::{DialOpts, PeerCondition},
        DialError,
        SwarmEvent,
    },
    PeerId,
    Stream,
    Swarm,
};
use log::*;
use spook_shutdown::ShutdownSignal;
use spook_swarm::{
    substream,
    substream::{ProtocolNotification, StreamId},
    SpookBehaviour,
    SpookBehaviourEvent,
};
use tokio::sync::mpsc;

use crate::{handle::NetworkingRequest, NetworkError, Reply};

const LOG_TARGET: &str = "spook::network::worker";

pub struct NetworkingWorker {
    rx_requests: mpsc::Receiver<NetworkingRequest>,
    tx_inbound: mpsc::UnboundedSender<ProtocolNotification<Stream>>,
    swarm: Swarm<SpookBehaviour>,
    pending_dial_requests: HashMap<PeerId, Vec<Reply<()>>>,
    pending_substream_requests: HashMap<StreamId, Reply<Stream>>,
    shutdown_signal: ShutdownSignal,
}

impl NetworkingWorker {
    pub(crate) fn new(
        rx_requests: mpsc::Receiver<NetworkingRequest>,
        tx_inbound: mpsc::UnboundedSender<ProtocolNotification<Stream>>,
        swarm: Swarm<SpookBehaviour>,
        shutdown_signal: ShutdownSignal,
    ) -> Self {
        Self {
            rx_requests,
            tx_inbound,
            swarm,
            pending_dial_requests: HashMap::new(),
            pending_substream_requests: HashMap::new(),
            shutdown_signal,
        }
    }

    pub async fn run(mut self) -> Result<(), NetworkError> {
        let mut shutdown_signal = self.shutdown_signal.clone();
        loop {
            tokio::select! {
                request = self.rx_requests.recv() => {
                    let Some(request) = request else {
                        info!(target: LOG_TARGET, "🌐 All network handles dropped. Stopping networking worker.");
                        break;
                    };
                    self.handle_request(request);
                },
                event = self.swarm.select_next_some() => {
                    self.on_swarm_event(event);
                },
                _ = &mut shutdown_signal => {
                    info!(target: LOG_TARGET, "🌐 Shutdown signal received. Stopping networking worker.");
                    break;
                },
            }
        }

        Ok(())
    }

    fn handle_request(&mut self, request: NetworkingRequest) {
        match request {
            NetworkingRequest::DialPeer {
                peer_id,
                address,
                reply_tx,
            } => {
                let opts = DialOpts::peer_id(peer_id)
                    .addresses(vec![address])
                    .condition(PeerCondition::Disconnected)
                    .build();
                match self.swarm.dial(opts) {
                    Ok(()) => {
                        self.pending_dial_requests.entry(peer_id).or_default().push(reply_tx);
                    },
                    Err(DialError::DialPeerConditionFalse(_)) => {
                        debug!(target: LOG_TARGET, "Already connected to {}", peer_id);
                        let _ignore = reply_tx.send(Ok(()));
                    },
                    Err(err) => {
                        let _ignore = reply_tx.send(Err(NetworkError::DialError(err.to_string())));
                    },
                }
            },
            NetworkingRequest::OpenSubstream {
                peer_id,
                protocol,
                reply_tx,
            } => {
                let stream_id = self
                    .swarm
                    .behaviour_mut()
                    .substream
                    .open_substream(peer_id, protocol);
                self.pending_substream_requests.insert(stream_id, reply_tx);
            },
            NetworkingRequest::IsConnected { peer_id, reply_tx } => {
                let _ignore = reply_tx.send(Ok(self.swarm.is_connected(&peer_id)));
            },
            NetworkingRequest::DisconnectPeer { peer_id, reply_tx } => {
                let _ignore = reply_tx.send(Ok(self.swarm.disconnect_peer_id(peer_id).is_ok()));
            },
        }
    }

    fn on_swarm_event(&mut self, event: SwarmEvent<SpookBehaviourEvent>) {
        match event {
            SwarmEvent::Behaviour(SpookBehaviourEvent::Substream(event)) => self.on_substream_event(event),
            SwarmEvent::Behaviour(SpookBehaviourEvent::Identify(identify::Event::Received { peer_id, info, .. })) => {
                debug!(
                    target: LOG_TARGET,
                    "Identified {} running {} with {} protocol(s)",
                    peer_id,
                    info.agent_version,
                    info.protocols.len()
                );
            },
            SwarmEvent::ConnectionEstablished {
                peer_id,
                endpoint,
                num_established,
                ..
            } => {
                debug!(
                    target: LOG_TARGET,
                    "Connection established with {} ({} total) via {:?}",
                    peer_id,
                    num_established,
                    endpoint
                );
                for reply_tx in self.pending_dial_requests.remove(&peer_id).unwrap_or_default() {
                    let _ignore = reply_tx.send(Ok(()));
                }
            },
            SwarmEvent::ConnectionClosed {
                peer_id,
                num_established,
                cause,
                ..
            } => {
                debug!(
                    target: LOG_TARGET,
                    "Connection closed with {} ({} remaining): {:?}",
                    peer_id,
                    num_established,
                    cause
                );
            },
            SwarmEvent::OutgoingConnectionError {
                peer_id: Some(peer_id),
                error,
                ..
            } => {
                debug!(target: LOG_TARGET, "Outgoing connection to {} failed: {}", peer_id, error);
                let details = error.to_string();
                for reply_tx in self.pending_dial_requests.remove(&peer_id).unwrap_or_default() {
                    let _ignore = reply_tx.send(Err(NetworkError::DialError(details.clone())));
                }
            },
            _ => {},
        }
    }

    fn on_substream_event(&mut self, event: substream::Event) {
        match event {
            substream::Event::SubstreamOpen {
                peer_id,
                stream_id,
                stream,
                protocol,
            } => {
                debug!(target: LOG_TARGET, "Opened {} substream {} to {}", protocol, stream_id, peer_id);
                match self.pending_substream_requests.remove(&stream_id) {
                    Some(reply_tx) => {
                        let _ignore = reply_tx.send(Ok(stream));
                    },
                    None => {
                        warn!(target: LOG_TARGET, "Substream {} opened but nobody asked for it", stream_id);
                    },
                }
            },
            substream::Event::OutboundFailure {
                peer_id,
                protocol,
                stream_id,
                error,
            } => {
                debug!(
                    target: LOG_TARGET,
                    "Failed to open {} substream {} to {}: {}", protocol, stream_id, peer_id, error
                );
                if let Some(reply_tx) = self.pending_substream_requests.remove(&stream_id) {
                    let _ignore = reply_tx.send(Err(error.into()));
                }
            },
            substream::Event::InboundSubstreamOpen { notification } => {
                let peer_id = notification.peer_id;
                if self.tx_inbound.send(notification).is_err() {
                    warn!(
                        target: LOG_TARGET,
                        "Dropping inbound substream from {} because no handler is listening", peer_id
                    );
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use libp2p::{identity::Keypair, StreamProtocol};
    use spook_shutdown::Shutdown;

    use super::*;
    use crate::{spawn, Config};

    const GOSSIP: StreamProtocol = StreamProtocol::new("/meshsub/1.1.0");

    #[tokio::test]
    async fn it_reports_unknown_peers_as_not_connected() {
        let shutdown = Shutdown::new();
        let (handle, _inbound, _join) = spawn(
            Keypair::generate_ed25519(),
            HashSet::from([GOSSIP]),
            Config::default(),
            shutdown.to_signal(),
        )
        .unwrap();

        let peer_id = PeerId::random();
        assert!(!handle.is_connected(peer_id).await.unwrap());
        assert!(!handle.disconnect_peer(peer_id).await.unwrap());
    }

    #[tokio::test]
    async fn it_fails_to_open_substreams_to_unconnected_peers() {
        let shutdown = Shutdown::new();
        let (handle, _inbound, _join) = spawn(
            Keypair::generate_ed25519(),
            HashSet::from([GOSSIP]),
            Config::default(),
            shutdown.to_signal(),
        )
        .unwrap();

        let err = handle.open_substream(PeerId::random(), GOSSIP).await.unwrap_err();
        assert!(matches!(err, NetworkError::SubstreamError(substream::Error::NotConnected)));
    }

    #[tokio::test]
    async fn it_stops_on_shutdown() {
        let mut shutdown = Shutdown::new();
        let (handle, _inbound, join) = spawn(
            Keypair::generate_ed25519(),
            HashSet::from([GOSSIP]),
            Config::default(),
            shutdown.to_signal(),
        )
        .unwrap();

        shutdown.trigger();
        join.await.unwrap().unwrap();
        let err = handle.is_connected(PeerId::random()).await.unwrap_err();
        assert!(matches!(
            err,
            NetworkError::ServiceHasShutdown | NetworkError::ReplyCanceled(_)
        ));
    }
}
