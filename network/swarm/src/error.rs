//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum SpookSwarmError {
    #[error("Security upgrade error: {0}")]
    Security(String),
    #[error("DNS transport error: {0}")]
    Dns(#[from] io::Error),
    #[error("Behaviour error: {0}")]
    BehaviourError(String),
}
