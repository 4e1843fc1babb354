//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::path::PathBuf;

use clap::Parser;

#[derive(Clone, Debug, Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Number of embedded peers
    #[clap(short = 'n', long = "num-peers", default_value_t = 1)]
    pub num_peers: usize,
    /// Only log errors
    #[clap(short, long)]
    pub quiet: bool,
    /// Output file, appended to. Records go to stdout if omitted.
    #[clap(short, long, parse(from_os_str))]
    pub file: Option<PathBuf>,
    /// Permanent identity file. The ith peer uses `<id>.<i>`, which is created if missing.
    #[clap(long, parse(from_os_str))]
    pub id: Option<PathBuf>,
    /// Comma separated list of bootstrappers, overriding the configured ones
    #[clap(short, long, use_value_delimiter = true, value_delimiter = ',')]
    pub bootstrappers: Option<Vec<String>>,
    /// A log4rs yaml configuration. A sample is written there if the file does not exist.
    #[clap(long, parse(from_os_str))]
    pub log_config: Option<PathBuf>,
    /// A TOML file with a [crawler] section to tune timings
    #[clap(short, long, parse(from_os_str))]
    pub config: Option<PathBuf>,
}
