//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    collections::VecDeque,
    convert::Infallible,
    future::{ready, Ready},
    task::{Context, Poll},
};

use libp2p::{
    core::UpgradeInfo,
    swarm::{
        handler::{
            ConnectionEvent,
            DialUpgradeError,
            FullyNegotiatedInbound,
            FullyNegotiatedOutbound,
            ListenUpgradeError,
        },
        ConnectionHandler,
        ConnectionHandlerEvent,
        StreamUpgradeError,
        SubstreamProtocol,
    },
    InboundUpgrade,
    OutboundUpgrade,
    PeerId,
    Stream,
    StreamProtocol,
};

use crate::{error::Error, event::Event, Config, ProtocolNotification, StreamId, EMPTY_QUEUE_SHRINK_THRESHOLD};

/// Instructs a connection handler to open an outbound substream.
#[derive(Debug, Clone)]
pub struct OpenSubstream {
    pub stream_id: StreamId,
    pub protocol: StreamProtocol,
}

pub struct Handler {
    peer_id: PeerId,
    supported_protocols: Vec<StreamProtocol>,
    requested_streams: VecDeque<OpenSubstream>,
    pending_events: VecDeque<Event>,
    config: Config,
}

impl Handler {
    pub fn new(peer_id: PeerId, supported_protocols: Vec<StreamProtocol>, config: Config) -> Self {
        Self {
            peer_id,
            supported_protocols,
            requested_streams: VecDeque::new(),
            pending_events: VecDeque::new(),
            config,
        }
    }

    fn on_listen_upgrade_error(&self, error: ListenUpgradeError<(), Protocols>) {
        tracing::warn!("unexpected listen upgrade error from {}: {:?}", self.peer_id, error.error);
    }

    fn on_dial_upgrade_error(&mut self, error: DialUpgradeError<OpenSubstream, Protocols>) {
        let OpenSubstream { stream_id, protocol } = error.info;
        let error = match error.error {
            StreamUpgradeError::Timeout => Error::Timeout,
            // The remote merely doesn't support the protocol we requested. Other protocols on the connection may
            // be fine, so the connection is left alone.
            StreamUpgradeError::NegotiationFailed => Error::ProtocolNotSupported,
            StreamUpgradeError::Apply(never) => match never {},
            StreamUpgradeError::Io(e) => Error::Io(e),
        };
        tracing::debug!(
            "substream[{}]: outbound {} request {} failed: {}",
            self.peer_id,
            protocol,
            stream_id,
            error
        );
        self.pending_events.push_back(Event::OutboundFailure {
            peer_id: self.peer_id,
            protocol,
            stream_id,
            error,
        });
    }

    fn on_fully_negotiated_outbound(&mut self, outbound: FullyNegotiatedOutbound<Protocols, OpenSubstream>) {
        let (stream, protocol) = outbound.protocol;
        self.pending_events.push_back(Event::SubstreamOpen {
            peer_id: self.peer_id,
            stream_id: outbound.info.stream_id,
            stream,
            protocol,
        });
    }

    fn on_fully_negotiated_inbound(&mut self, inbound: FullyNegotiatedInbound<Protocols, ()>) {
        let (stream, protocol) = inbound.protocol;
        tracing::debug!("substream[{}]: inbound {} substream negotiated", self.peer_id, protocol);
        self.pending_events.push_back(Event::InboundSubstreamOpen {
            notification: ProtocolNotification::new(self.peer_id, protocol, stream),
        });
    }
}

impl ConnectionHandler for Handler {
    type FromBehaviour = OpenSubstream;
    type InboundOpenInfo = ();
    type InboundProtocol = Protocols;
    type OutboundOpenInfo = OpenSubstream;
    type OutboundProtocol = Protocols;
    type ToBehaviour = Event;

    fn listen_protocol(&self) -> SubstreamProtocol<Self::InboundProtocol, Self::InboundOpenInfo> {
        SubstreamProtocol::new(Protocols::new(self.supported_protocols.clone()), ())
    }

    fn poll(
        &mut self,
        _cx: &mut Context<'_>,
    ) -> Poll<ConnectionHandlerEvent<Self::OutboundProtocol, Self::OutboundOpenInfo, Self::ToBehaviour>> {
        // Drain pending events that were produced by the handler
        if let Some(event) = self.pending_events.pop_front() {
            return Poll::Ready(ConnectionHandlerEvent::NotifyBehaviour(event));
        }
        if self.pending_events.capacity() > EMPTY_QUEUE_SHRINK_THRESHOLD {
            self.pending_events.shrink_to_fit();
        }

        if let Some(request) = self.requested_streams.pop_front() {
            tracing::debug!(
                "substream[{}]: requesting {} substream {}",
                self.peer_id,
                request.protocol,
                request.stream_id
            );
            let protocol = Protocols::new(vec![request.protocol.clone()]);
            return Poll::Ready(ConnectionHandlerEvent::OutboundSubstreamRequest {
                protocol: SubstreamProtocol::new(protocol, request)
                    .with_timeout(self.config.substream_negotiation_timeout),
            });
        }

        Poll::Pending
    }

    fn on_behaviour_event(&mut self, request: Self::FromBehaviour) {
        let max = self.config.max_pending_outbound_per_peer;
        if self.requested_streams.len() >= max {
            self.pending_events.push_back(Event::OutboundFailure {
                peer_id: self.peer_id,
                protocol: request.protocol,
                stream_id: request.stream_id,
                error: Error::TooManyPendingRequests { max },
            });
            return;
        }
        self.requested_streams.push_back(request);
    }

    fn on_connection_event(
        &mut self,
        event: ConnectionEvent<
            Self::InboundProtocol,
            Self::OutboundProtocol,
            Self::InboundOpenInfo,
            Self::OutboundOpenInfo,
        >,
    ) {
        match event {
            ConnectionEvent::FullyNegotiatedInbound(fully_negotiated_inbound) => {
                self.on_fully_negotiated_inbound(fully_negotiated_inbound)
            },
            ConnectionEvent::FullyNegotiatedOutbound(fully_negotiated_outbound) => {
                self.on_fully_negotiated_outbound(fully_negotiated_outbound)
            },
            ConnectionEvent::DialUpgradeError(dial_upgrade_error) => self.on_dial_upgrade_error(dial_upgrade_error),
            ConnectionEvent::ListenUpgradeError(listen_upgrade_error) => {
                self.on_listen_upgrade_error(listen_upgrade_error)
            },
            _ => {},
        }
    }
}

/// The set of protocols offered on a substream. Inbound substreams offer every supported protocol, outbound
/// substreams offer exactly the one that was requested.
#[derive(Debug, Clone)]
pub struct Protocols {
    protocols: Vec<StreamProtocol>,
}

impl Protocols {
    pub fn new(protocols: Vec<StreamProtocol>) -> Self {
        Self { protocols }
    }
}

impl UpgradeInfo for Protocols {
    type Info = StreamProtocol;
    type InfoIter = std::vec::IntoIter<Self::Info>;

    fn protocol_info(&self) -> Self::InfoIter {
        self.protocols.clone().into_iter()
    }
}

impl InboundUpgrade<Stream> for Protocols {
    type Error = Infallible;
    type Future = Ready<Result<Self::Output, Self::Error>>;
    type Output = (Stream, StreamProtocol);

    fn upgrade_inbound(self, io: Stream, protocol: Self::Info) -> Self::Future {
        ready(Ok((io, protocol)))
    }
}

impl OutboundUpgrade<Stream> for Protocols {
    type Error = Infallible;
    type Future = Ready<Result<Self::Output, Self::Error>>;
    type Output = (Stream, StreamProtocol);

    fn upgrade_outbound(self, io: Stream, protocol: Self::Info) -> Self::Future {
        ready(Ok((io, protocol)))
    }
}
