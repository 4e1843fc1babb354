//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

mod behaviour;
mod config;
mod error;

pub use behaviour::*;
pub use config::*;
pub use error::*;
pub use libp2p_substream as substream;
