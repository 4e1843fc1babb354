//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    collections::{HashMap, HashSet, VecDeque},
    io,
    io::Write,
    sync::{Arc, Mutex, MutexGuard},
};

use asynchronous_codec::Framed;
use async_trait::async_trait;
use libp2p::{core::SignedEnvelope, identity::Keypair, Multiaddr};
use quick_protobuf::{MessageWrite, Writer};
use spook_network::{swarm::substream, BootstrapPeer, NetworkError, PeerId, StreamProtocol};
use tokio::{io::DuplexStream, time::Instant};
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use crate::{
    proto,
    record_log::{PEER_RECORD_DOMAIN, PEER_RECORD_PAYLOAD_TYPE},
    Transport,
    TransportError,
};

pub type TestStream = Compat<DuplexStream>;

pub fn duplex_pair() -> (TestStream, TestStream) {
    duplex_pair_with_capacity(64 * 1024)
}

/// Writes block once `capacity` bytes are buffered and unread
pub fn duplex_pair_with_capacity(capacity: usize) -> (TestStream, TestStream) {
    let (a, b) = tokio::io::duplex(capacity);
    (a.compat(), b.compat())
}

/// The remote end of a gossip stream
pub fn framed(stream: TestStream) -> Framed<TestStream, quick_protobuf_codec::Codec<proto::Rpc>> {
    Framed::new(stream, quick_protobuf_codec::Codec::new(1024 * 1024))
}

pub fn signed_envelope(key: &Keypair, domain: &str, payload_type: Vec<u8>, payload: Vec<u8>) -> Vec<u8> {
    SignedEnvelope::new(key, domain.to_string(), payload_type, payload)
        .unwrap()
        .into_protobuf_encoding()
}

/// A valid `libp2p-peer-record` envelope with a chosen sequence number
pub fn signed_peer_record(key: &Keypair, seq: u64, addrs: &[Multiaddr]) -> Vec<u8> {
    let addrs = addrs.iter().map(|a| a.to_vec()).collect::<Vec<_>>();
    signed_peer_record_for(key, &key.public().to_peer_id(), seq, addrs)
}

/// A `libp2p-peer-record` envelope signed by `key` describing `subject` with raw address bytes
pub fn signed_peer_record_for(key: &Keypair, subject: &PeerId, seq: u64, addrs: Vec<Vec<u8>>) -> Vec<u8> {
    let record = proto::PeerRecord {
        peer_id: subject.to_bytes(),
        seq,
        addresses: addrs
            .into_iter()
            .map(|multiaddr| proto::mod_PeerRecord::AddressInfo { multiaddr })
            .collect(),
    };
    let mut payload = Vec::with_capacity(record.get_size());
    record.write_message(&mut Writer::new(&mut payload)).unwrap();
    signed_envelope(key, PEER_RECORD_DOMAIN, PEER_RECORD_PAYLOAD_TYPE.to_vec(), payload)
}

#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(ToString::to_string)
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct MockState {
    reachable: HashSet<PeerId>,
    connected: HashSet<PeerId>,
    dial_attempts: HashMap<PeerId, Vec<Instant>>,
    outbound: VecDeque<TestStream>,
    disconnected: Vec<PeerId>,
}

/// In-memory [`Transport`]. Dials succeed only for peers marked reachable and substreams are handed out from a
/// queue of prepared duplex streams.
#[derive(Clone)]
pub struct MockTransport {
    local_peer_id: PeerId,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            local_peer_id: PeerId::random(),
            state: Arc::default(),
        }
    }

    pub fn set_reachable(&self, peer_id: PeerId) {
        self.state().reachable.insert(peer_id);
    }

    /// Simulates the remote side dropping the connection
    pub fn drop_connection(&self, peer_id: &PeerId) {
        self.state().connected.remove(peer_id);
    }

    pub fn push_outbound(&self, stream: TestStream) {
        self.state().outbound.push_back(stream);
    }

    pub fn dial_attempts(&self, peer_id: &PeerId) -> Vec<Instant> {
        self.state().dial_attempts.get(peer_id).cloned().unwrap_or_default()
    }

    pub fn dialed_peers(&self) -> HashSet<PeerId> {
        self.state().dial_attempts.keys().copied().collect()
    }

    pub fn disconnected(&self) -> Vec<PeerId> {
        self.state().disconnected.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Substream = TestStream;

    fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    async fn connect(&self, peer: &BootstrapPeer) -> Result<(), TransportError> {
        let mut state = self.state();
        let peer_id = peer.peer_id();
        state.dial_attempts.entry(peer_id).or_default().push(Instant::now());
        if !state.reachable.contains(&peer_id) {
            return Err(NetworkError::DialError("connection refused".to_string()).into());
        }
        state.connected.insert(peer_id);
        Ok(())
    }

    async fn is_connected(&self, peer_id: PeerId) -> Result<bool, TransportError> {
        Ok(self.state().connected.contains(&peer_id))
    }

    async fn open_substream(&self, _peer_id: PeerId, _protocol: StreamProtocol) -> Result<TestStream, TransportError> {
        self.state()
            .outbound
            .pop_front()
            .ok_or_else(|| NetworkError::SubstreamError(substream::Error::ProtocolNotSupported).into())
    }

    async fn disconnect(&self, peer_id: PeerId) -> Result<bool, TransportError> {
        let mut state = self.state();
        state.disconnected.push(peer_id);
        Ok(state.connected.remove(&peer_id))
    }
}
