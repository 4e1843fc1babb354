//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{io, time::Duration};

use spook_network::NetworkError;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Timed out after {0:.1?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Gossip codec error: {0}")]
    Codec(#[from] io::Error),
    #[error("Stream closed before the peer said hello")]
    ClosedBeforeHello,
    #[error("Outbound stream is gone")]
    OutboundClosed,
    #[error("Write did not complete within {0:.1?}")]
    WriteTimeout(Duration),
}

impl From<quick_protobuf_codec::Error> for SessionError {
    fn from(err: quick_protobuf_codec::Error) -> Self {
        SessionError::Codec(err.into())
    }
}
