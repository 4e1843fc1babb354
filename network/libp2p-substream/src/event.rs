//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use libp2p::{PeerId, Stream, StreamProtocol};

use crate::{error::Error, ProtocolNotification, StreamId};

#[derive(Debug)]
pub enum Event {
    SubstreamOpen {
        peer_id: PeerId,
        stream_id: StreamId,
        stream: Stream,
        protocol: StreamProtocol,
    },
    InboundSubstreamOpen {
        notification: ProtocolNotification<Stream>,
    },
    OutboundFailure {
        peer_id: PeerId,
        protocol: StreamProtocol,
        stream_id: StreamId,
        error: Error,
    },
}

impl Event {
    /// The outbound request this event settles, if any
    pub fn outbound_stream_id(&self) -> Option<StreamId> {
        match self {
            Event::SubstreamOpen { stream_id, .. } | Event::OutboundFailure { stream_id, .. } => Some(*stream_id),
            Event::InboundSubstreamOpen { .. } => None,
        }
    }
}
