//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::time::Duration;

use libp2p::ping;

use crate::substream;

#[derive(Debug, Clone)]
pub struct Config {
    /// Protocol version announced through identify
    pub protocol_version: String,
    pub user_agent: String,
    pub identify_interval: Duration,
    pub ping: ping::Config,
    pub idle_connection_timeout: Duration,
    pub max_connections_per_peer: Option<u32>,
    pub substream: substream::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol_version: "ipfs/0.1.0".to_string(),
            user_agent: concat!("spook/", env!("CARGO_PKG_VERSION")).to_string(),
            identify_interval: Duration::from_secs(5 * 60),
            ping: ping::Config::default(),
            idle_connection_timeout: Duration::from_secs(10 * 60),
            max_connections_per_peer: Some(3),
            substream: substream::Config::default(),
        }
    }
}
