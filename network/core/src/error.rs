//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use spook_swarm::{substream, SpookSwarmError};
use tokio::sync::oneshot;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Swarm error: {0}")]
    SwarmError(#[from] SpookSwarmError),
    #[error("Failed to dial peer: {0}")]
    DialError(String),
    #[error("Substream error: {0}")]
    SubstreamError(#[from] substream::Error),
    #[error("The networking service has shut down")]
    ServiceHasShutdown,
    #[error("The networking service dropped the request: {0}")]
    ReplyCanceled(#[from] oneshot::error::RecvError),
}
