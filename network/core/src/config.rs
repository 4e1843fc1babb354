//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

#[derive(Debug, Clone)]
pub struct Config {
    pub swarm: spook_swarm::Config,
    /// Capacity of the request channel between handles and the networking worker
    pub request_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            swarm: spook_swarm::Config::default(),
            request_buffer_size: 100,
        }
    }
}
