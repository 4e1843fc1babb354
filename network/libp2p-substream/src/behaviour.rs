//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    collections::{HashMap, HashSet, VecDeque},
    task::{Context, Poll},
};

use libp2p::{
    core::Endpoint,
    swarm::{
        ConnectionClosed,
        ConnectionDenied,
        ConnectionId,
        FromSwarm,
        NetworkBehaviour,
        NotifyHandler,
        THandler,
        THandlerInEvent,
        THandlerOutEvent,
        ToSwarm,
    },
    Multiaddr,
    PeerId,
    StreamProtocol,
};

use crate::{error::Error, event::Event, handler::Handler, Config, OpenSubstream, StreamId};

/// Internal threshold for when to shrink the capacity
/// of empty queues. If the capacity of an empty queue
/// exceeds this threshold, the associated memory is
/// released.
pub const EMPTY_QUEUE_SHRINK_THRESHOLD: usize = 100;

pub struct Behaviour {
    supported_protocols: Vec<StreamProtocol>,
    config: Config,
    next_stream_id: StreamId,
    pending_events: VecDeque<ToSwarm<Event, THandlerInEvent<Self>>>,
    connected_peers: HashSet<PeerId>,
    pending_outbound: HashMap<StreamId, (PeerId, StreamProtocol)>,
}

impl Behaviour {
    pub fn new<I: IntoIterator<Item = StreamProtocol>>(supported_protocols: I, config: Config) -> Self {
        Self {
            supported_protocols: supported_protocols.into_iter().collect(),
            config,
            next_stream_id: 0,
            pending_events: VecDeque::new(),
            connected_peers: HashSet::new(),
            pending_outbound: HashMap::new(),
        }
    }

    pub fn supported_protocols(&self) -> &[StreamProtocol] {
        &self.supported_protocols
    }

    /// Requests a new outbound substream to a connected peer. The outcome is reported as an [`Event::SubstreamOpen`]
    /// or [`Event::OutboundFailure`] with the returned stream id.
    pub fn open_substream(&mut self, peer_id: PeerId, protocol: StreamProtocol) -> StreamId {
        let stream_id = self.next_stream_id();
        if !self.connected_peers.contains(&peer_id) {
            self.pending_events
                .push_back(ToSwarm::GenerateEvent(Event::OutboundFailure {
                    peer_id,
                    protocol,
                    stream_id,
                    error: Error::NotConnected,
                }));
            return stream_id;
        }

        self.pending_outbound.insert(stream_id, (peer_id, protocol.clone()));
        self.pending_events.push_back(ToSwarm::NotifyHandler {
            peer_id,
            handler: NotifyHandler::Any,
            event: OpenSubstream { stream_id, protocol },
        });
        stream_id
    }

    fn next_stream_id(&mut self) -> StreamId {
        let id = self.next_stream_id;
        self.next_stream_id = self.next_stream_id.wrapping_add(1);
        id
    }

    fn new_handler(&self, peer_id: PeerId) -> Handler {
        Handler::new(peer_id, self.supported_protocols.clone(), self.config.clone())
    }

    fn on_connection_closed(
        &mut self,
        ConnectionClosed {
            peer_id,
            remaining_established,
            ..
        }: ConnectionClosed,
    ) {
        if remaining_established > 0 {
            return;
        }
        self.connected_peers.remove(&peer_id);

        // Requests that were routed to the closed connection will never be answered
        let orphaned = self
            .pending_outbound
            .iter()
            .filter(|(_, (p, _))| *p == peer_id)
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        for stream_id in orphaned {
            if let Some((peer_id, protocol)) = self.pending_outbound.remove(&stream_id) {
                self.pending_events
                    .push_back(ToSwarm::GenerateEvent(Event::OutboundFailure {
                        peer_id,
                        protocol,
                        stream_id,
                        error: Error::ConnectionClosed,
                    }));
            }
        }
    }
}

impl NetworkBehaviour for Behaviour {
    type ConnectionHandler = Handler;
    type ToSwarm = Event;

    fn handle_established_inbound_connection(
        &mut self,
        _connection_id: ConnectionId,
        peer: PeerId,
        _local_addr: &Multiaddr,
        _remote_addr: &Multiaddr,
    ) -> Result<THandler<Self>, ConnectionDenied> {
        Ok(self.new_handler(peer))
    }

    fn handle_established_outbound_connection(
        &mut self,
        _connection_id: ConnectionId,
        peer: PeerId,
        _addr: &Multiaddr,
        _role_override: Endpoint,
    ) -> Result<THandler<Self>, ConnectionDenied> {
        Ok(self.new_handler(peer))
    }

    fn on_swarm_event(&mut self, event: FromSwarm) {
        match event {
            FromSwarm::ConnectionEstablished(established) => {
                self.connected_peers.insert(established.peer_id);
            },
            FromSwarm::ConnectionClosed(connection_closed) => self.on_connection_closed(connection_closed),
            _ => {},
        }
    }

    fn on_connection_handler_event(
        &mut self,
        _peer_id: PeerId,
        _connection_id: ConnectionId,
        event: THandlerOutEvent<Self>,
    ) {
        if let Some(stream_id) = event.outbound_stream_id() {
            self.pending_outbound.remove(&stream_id);
        }
        self.pending_events.push_back(ToSwarm::GenerateEvent(event));
    }

    fn poll(&mut self, _cx: &mut Context<'_>) -> Poll<ToSwarm<Self::ToSwarm, THandlerInEvent<Self>>> {
        if let Some(event) = self.pending_events.pop_front() {
            return Poll::Ready(event);
        }
        if self.pending_events.capacity() > EMPTY_QUEUE_SHRINK_THRESHOLD {
            self.pending_events.shrink_to_fit();
        }

        Poll::Pending
    }
}
