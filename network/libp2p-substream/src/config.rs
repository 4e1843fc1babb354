//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// How long multistream-select may take to agree on a protocol for an outbound substream
    pub substream_negotiation_timeout: Duration,
    pub max_pending_outbound_per_peer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            substream_negotiation_timeout: Duration::from_secs(10),
            max_pending_outbound_per_peer: 32,
        }
    }
}
