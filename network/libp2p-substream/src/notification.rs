//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use libp2p::{PeerId, StreamProtocol};

/// A substream that a remote peer opened to us for one of our supported protocols.
#[derive(Debug)]
pub struct ProtocolNotification<TSubstream> {
    pub peer_id: PeerId,
    pub protocol: StreamProtocol,
    pub substream: TSubstream,
}

impl<TSubstream> ProtocolNotification<TSubstream> {
    pub fn new(peer_id: PeerId, protocol: StreamProtocol, substream: TSubstream) -> Self {
        Self {
            peer_id,
            protocol,
            substream,
        }
    }
}
