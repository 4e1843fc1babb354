//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use async_trait::async_trait;
use futures::{AsyncRead, AsyncWrite};
use spook_network::{BootstrapPeer, NetworkHandle, PeerId, Stream, StreamProtocol};

use crate::TransportError;

/// The host operations the crawler needs from a single identity's network stack.
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    type Substream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn local_peer_id(&self) -> PeerId;

    async fn connect(&self, peer: &BootstrapPeer) -> Result<(), TransportError>;

    async fn is_connected(&self, peer_id: PeerId) -> Result<bool, TransportError>;

    async fn open_substream(
        &self,
        peer_id: PeerId,
        protocol: StreamProtocol,
    ) -> Result<Self::Substream, TransportError>;

    /// Closes every connection to the peer. Returns false if there was nothing to close.
    async fn disconnect(&self, peer_id: PeerId) -> Result<bool, TransportError>;
}

#[async_trait]
impl Transport for NetworkHandle {
    type Substream = Stream;

    fn local_peer_id(&self) -> PeerId {
        *NetworkHandle::local_peer_id(self)
    }

    async fn connect(&self, peer: &BootstrapPeer) -> Result<(), TransportError> {
        self.dial_peer(peer.peer_id(), peer.address().clone()).await?;
        Ok(())
    }

    async fn is_connected(&self, peer_id: PeerId) -> Result<bool, TransportError> {
        Ok(NetworkHandle::is_connected(self, peer_id).await?)
    }

    async fn open_substream(&self, peer_id: PeerId, protocol: StreamProtocol) -> Result<Stream, TransportError> {
        Ok(NetworkHandle::open_substream(self, peer_id, protocol).await?)
    }

    async fn disconnect(&self, peer_id: PeerId) -> Result<bool, TransportError> {
        Ok(self.disconnect_peer(peer_id).await?)
    }
}
