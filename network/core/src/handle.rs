//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use libp2p::{Multiaddr, PeerId, Stream, StreamProtocol};
use tokio::sync::{mpsc, oneshot};

use crate::NetworkError;

pub type Reply<T> = oneshot::Sender<Result<T, NetworkError>>;

pub enum NetworkingRequest {
    DialPeer {
        peer_id: PeerId,
        address: Multiaddr,
        reply_tx: Reply<()>,
    },
    OpenSubstream {
        peer_id: PeerId,
        protocol: StreamProtocol,
        reply_tx: Reply<Stream>,
    },
    IsConnected {
        peer_id: PeerId,
        reply_tx: Reply<bool>,
    },
    DisconnectPeer {
        peer_id: PeerId,
        reply_tx: Reply<bool>,
    },
}

/// Cheaply cloneable handle to one identity's networking worker.
#[derive(Debug, Clone)]
pub struct NetworkHandle {
    local_peer_id: PeerId,
    tx_requests: mpsc::Sender<NetworkingRequest>,
}

impl NetworkHandle {
    pub(crate) fn new(local_peer_id: PeerId, tx_requests: mpsc::Sender<NetworkingRequest>) -> Self {
        Self {
            local_peer_id,
            tx_requests,
        }
    }

    pub fn local_peer_id(&self) -> &PeerId {
        &self.local_peer_id
    }

    /// Dials the peer at the given address. Resolves once a connection is established, or immediately if one
    /// already exists.
    pub async fn dial_peer(&self, peer_id: PeerId, address: Multiaddr) -> Result<(), NetworkError> {
        self.request(|reply_tx| NetworkingRequest::DialPeer {
            peer_id,
            address,
            reply_tx,
        })
        .await
    }

    /// Opens a new outbound substream to a connected peer
    pub async fn open_substream(&self, peer_id: PeerId, protocol: StreamProtocol) -> Result<Stream, NetworkError> {
        self.request(|reply_tx| NetworkingRequest::OpenSubstream {
            peer_id,
            protocol,
            reply_tx,
        })
        .await
    }

    pub async fn is_connected(&self, peer_id: PeerId) -> Result<bool, NetworkError> {
        self.request(|reply_tx| NetworkingRequest::IsConnected { peer_id, reply_tx })
            .await
    }

    /// Closes all connections to the peer. Returns false if there were none.
    pub async fn disconnect_peer(&self, peer_id: PeerId) -> Result<bool, NetworkError> {
        self.request(|reply_tx| NetworkingRequest::DisconnectPeer { peer_id, reply_tx })
            .await
    }

    async fn request<T, F>(&self, make_request: F) -> Result<T, NetworkError>
    where F: FnOnce(Reply<T>) -> NetworkingRequest {
        let (tx, rx) = oneshot::channel();
        self.tx_requests
            .send(make_request(tx))
            .await
            .map_err(|_| NetworkError::ServiceHasShutdown)?;
        rx.await?
    }
}
