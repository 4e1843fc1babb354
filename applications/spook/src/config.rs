//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{ops::RangeInclusive, path::Path, time::Duration};

use config::{Config, ConfigError};
use log::*;
use serde::{Deserialize, Serialize};

use crate::serializers;

const LOG_TARGET: &str = "spook::config";

/// Filecoin mainnet bootstrappers
pub const DEFAULT_BOOTSTRAPPERS: &[&str] = &[
    "/dns4/bootstrap-0.mainnet.filops.net/tcp/1347/p2p/12D3KooWCVe8MmsEMes2FzgTpt9fXtmCY7wrq91GRiaC8PHSCCBj",
    "/dns4/bootstrap-1.mainnet.filops.net/tcp/1347/p2p/12D3KooWCwevHg1yLCvktf2nvLu7L9894mcrJR4MsBCcm4syShVc",
    "/dns4/bootstrap-2.mainnet.filops.net/tcp/1347/p2p/12D3KooWEWVwHGn2yR36gKLozmb4YjDJGerotAPGxmdWZx2nxMC4",
    "/dns4/bootstrap-3.mainnet.filops.net/tcp/1347/p2p/12D3KooWKhgq8c7NQ9iGjbyK7v7phXvG6492HQfiDaGHLHLQjk7R",
    "/dns4/bootstrap-4.mainnet.filops.net/tcp/1347/p2p/12D3KooWL6PsFNPhYftrJzGgF5U18hFoaVhfGk7xwzD8yVrHJ3Uc",
    "/dns4/bootstrap-5.mainnet.filops.net/tcp/1347/p2p/12D3KooWLFynvDQiUpXoHroV1YxKHhPJgysQGH2k3ZGwtWzR4dFH",
    "/dns4/bootstrap-6.mainnet.filops.net/tcp/1347/p2p/12D3KooWP5MwCiqdMETF9ub1P3MbCvQCcfconnYHbWg6sUJcDRQQ",
    "/dns4/bootstrap-7.mainnet.filops.net/tcp/1347/p2p/12D3KooWRs3aY1p3juFjPy8gPN95PEQChm2QKGUCAdcDCC4EBMKf",
    "/dns4/bootstrap-8.mainnet.filops.net/tcp/1347/p2p/12D3KooWScFR7385LTyR4zU1bYdzSiiAb5rnNABfVahPvVSzyTkR",
];

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub crawler: CrawlerConfig,
}

impl ApplicationConfig {
    /// Reads the `[crawler]` section. A missing section yields the defaults.
    pub fn load_from(cfg: &Config) -> Result<Self, ConfigError> {
        let crawler = match cfg.get::<CrawlerConfig>(CrawlerConfig::main_key_prefix()) {
            Ok(crawler) => crawler,
            Err(ConfigError::NotFound(_)) => {
                debug!(target: LOG_TARGET, "No [crawler] section found, using defaults");
                CrawlerConfig::default()
            },
            Err(err) => return Err(err),
        };
        Ok(Self { crawler })
    }
}

/// Tunables for the bootstrap connector and the gossip sessions of every identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Bootstrap peers given as `/.../p2p/<peer id>` multiaddrs
    pub bootstrappers: Vec<String>,
    /// Upper bound on a single dial attempt to a bootstrapper
    #[serde(with = "serializers::seconds")]
    pub dial_timeout: Duration,
    /// Fixed wait between failed dial attempts. There is no growth and no retry limit.
    #[serde(with = "serializers::seconds")]
    pub reconnect_interval: Duration,
    /// How often a connected bootstrapper is checked for liveness
    #[serde(with = "serializers::seconds")]
    pub liveness_poll_interval: Duration,
    /// Upper bound on opening the reciprocal gossip stream
    #[serde(with = "serializers::seconds")]
    pub open_stream_timeout: Duration,
    /// Upper bound on writing one message to a peer
    #[serde(with = "serializers::seconds")]
    pub write_timeout: Duration,
    /// Margin added to a peer's backoff before grafting again
    #[serde(with = "serializers::seconds")]
    pub graft_grace: Duration,
    /// Lower bound of the random delay added to a re-graft after a prune
    #[serde(with = "serializers::seconds")]
    pub regraft_jitter_min: Duration,
    /// Upper bound of the random delay added to a re-graft after a prune
    #[serde(with = "serializers::seconds")]
    pub regraft_jitter_max: Duration,
    /// Backoffs advertised by remote peers are clamped to this value
    #[serde(with = "serializers::seconds")]
    pub max_backoff: Duration,
    /// Maximum size of a single gossip RPC frame
    pub max_frame_size: usize,
    /// Interval between harvest statistics log lines
    #[serde(with = "serializers::seconds")]
    pub stats_interval: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            bootstrappers: DEFAULT_BOOTSTRAPPERS.iter().map(|s| (*s).to_string()).collect(),
            dial_timeout: Duration::from_secs(60),
            reconnect_interval: Duration::from_secs(60),
            liveness_poll_interval: Duration::from_secs(5 * 60),
            open_stream_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
            graft_grace: Duration::from_secs(1),
            regraft_jitter_min: Duration::from_secs(1),
            regraft_jitter_max: Duration::from_secs(10),
            max_backoff: Duration::from_secs(60 * 60),
            max_frame_size: 1024 * 1024,
            stats_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl CrawlerConfig {
    pub fn main_key_prefix() -> &'static str {
        "crawler"
    }

    /// The re-graft jitter range. An inverted range collapses to its lower bound.
    pub fn regraft_jitter(&self) -> RangeInclusive<Duration> {
        self.regraft_jitter_min..=self.regraft_jitter_max.max(self.regraft_jitter_min)
    }
}

/// Builds the configuration source from an optional TOML file. Without a file every value takes its default.
pub fn load_configuration<P: AsRef<Path>>(config_file: Option<P>) -> Result<Config, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = config_file {
        let path = path.as_ref();
        info!(target: LOG_TARGET, "Loading configuration file from {}", path.display());
        builder = builder.add_source(config::File::from(path).required(true));
    }
    builder.build()
}
