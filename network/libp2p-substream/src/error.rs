//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected to peer")]
    NotConnected,
    #[error("Connection closed before the substream was negotiated")]
    ConnectionClosed,
    #[error("Substream negotiation timed out")]
    Timeout,
    #[error("Protocol not supported")]
    ProtocolNotSupported,
    #[error("Too many pending outbound substream requests (max {max})")]
    TooManyPendingRequests { max: usize },
    #[error("Substream IO error: {0}")]
    Io(#[from] io::Error),
}
