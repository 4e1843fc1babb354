//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use libp2p::{multiaddr, multiaddr::Protocol, Multiaddr, PeerId};

/// A well-known peer given as a `/.../p2p/<peer id>` multiaddr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPeer {
    peer_id: PeerId,
    address: Multiaddr,
}

impl BootstrapPeer {
    /// Splits a `/p2p/<peer id>` terminated multiaddr into the peer id and the transport address.
    pub fn from_p2p_addr(mut addr: Multiaddr) -> Result<Self, PeerAddressError> {
        let Some(Protocol::P2p(peer_id)) = addr.pop() else {
            return Err(PeerAddressError::MissingPeerId);
        };
        if addr.is_empty() {
            return Err(PeerAddressError::MissingTransportAddress);
        }
        Ok(Self { peer_id, address: addr })
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn address(&self) -> &Multiaddr {
        &self.address
    }
}

impl FromStr for BootstrapPeer {
    type Err = PeerAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr = Multiaddr::from_str(s.trim())?;
        Self::from_p2p_addr(addr)
    }
}

impl Display for BootstrapPeer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/p2p/{}", self.address, self.peer_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PeerAddressError {
    #[error("Invalid multiaddr: {0}")]
    InvalidMultiaddr(#[from] multiaddr::Error),
    #[error("Address does not end with a /p2p/<peer id> component")]
    MissingPeerId,
    #[error("Address has no transport component before /p2p")]
    MissingTransportAddress,
}
