//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

mod config;
mod error;
mod handle;
mod peer;
mod spawn;
mod worker;

pub use config::*;
pub use error::*;
pub use handle::*;
pub use libp2p::{identity, Multiaddr, PeerId, Stream, StreamProtocol};
pub use peer::*;
pub use spawn::*;
pub use spook_swarm::{self as swarm, substream::ProtocolNotification};
