//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

//! A libp2p behaviour that negotiates raw substreams and hands them to the application untouched.
//!
//! Inbound substreams for any of the supported protocols are surfaced as [`Event::InboundSubstreamOpen`].
//! Outbound substreams are requested with [`Behaviour::open_substream`] and resolve to either
//! [`Event::SubstreamOpen`] or [`Event::OutboundFailure`] carrying the same [`StreamId`].

mod behaviour;
mod config;
pub mod error;
mod event;
mod handler;
mod notification;

pub use behaviour::*;
pub use config::*;
pub use error::Error;
pub use event::*;
pub use handler::OpenSubstream;
pub use notification::*;

/// Correlates an outbound substream request with its outcome.
pub type StreamId = u32;
