//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

//! A single gossipsub exchange with a remote peer that opened a stream to us.
//!
//! The remote peer says hello with its subscriptions. We GRAFT every topic it announced and wait for it to PRUNE us.
//! Each PRUNE carries peer exchange entries with signed peer records, which are handed to the [`PeerRecordLog`]. After
//! the advertised backoff (plus jitter) we GRAFT that topic again to provoke another PRUNE. The session ends when the
//! inbound stream does, and the connection to the peer is dropped.

use std::{collections::HashMap, sync::Arc, time::Duration};

use asynchronous_codec::Framed;
use futures::{SinkExt, StreamExt};
use log::*;
use quick_protobuf_codec::Codec;
use rand::Rng;
use spook_network::{PeerId, StreamProtocol};
use spook_shutdown::ShutdownSignal;
use tokio::{sync::Mutex, task::JoinHandle, time};

use crate::{
    backoff::BackoffTracker,
    proto,
    record_log::PeerRecordLog,
    CrawlerConfig,
    SessionError,
    Transport,
    TransportError,
};

const LOG_TARGET: &str = "spook::session";

pub const GOSSIPSUB_PROTOCOL: StreamProtocol = StreamProtocol::new("/meshsub/1.1.0");

type FramedRpc<S> = Framed<S, Codec<proto::Rpc>>;

/// The outbound half of a session. Deferred re-grafts write through it until the session ends and takes it.
type SharedOutbound<S> = Arc<Mutex<Option<FramedRpc<S>>>>;

/// Re-grafts scheduled by one session, at most one per topic. A newer PRUNE for a topic replaces the pending re-graft
/// and anything still pending is aborted with the session.
#[derive(Default)]
struct PendingRegrafts {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl PendingRegrafts {
    fn replace(&mut self, topic: String, task: JoinHandle<()>) {
        if let Some(previous) = self.tasks.insert(topic, task) {
            previous.abort();
        }
    }

    fn abort_all(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

impl Drop for PendingRegrafts {
    fn drop(&mut self) {
        self.abort_all();
    }
}

#[derive(Debug)]
pub enum SessionEnd {
    /// The reciprocal outbound stream could not be opened
    OutboundOpenFailed(SessionError),
    /// No valid hello was read
    HelloFailed(SessionError),
    /// The GRAFT could not be written
    SolicitFailed(SessionError),
    /// The peer closed the inbound stream
    Closed,
    ReadFailed(SessionError),
    Shutdown,
}

#[derive(Debug)]
pub struct SessionOutcome {
    pub end: SessionEnd,
    pub topics: Vec<String>,
    pub prunes: usize,
    pub records_submitted: usize,
}

#[derive(Debug, Default)]
struct SessionStats {
    topics: Vec<String>,
    prunes: usize,
    records_submitted: usize,
}

pub struct GossipSession<T: Transport> {
    peer_id: PeerId,
    transport: T,
    backoff: Arc<BackoffTracker>,
    records: Arc<PeerRecordLog>,
    config: Arc<CrawlerConfig>,
    shutdown_signal: ShutdownSignal,
}

impl<T: Transport> GossipSession<T> {
    pub fn new(
        peer_id: PeerId,
        transport: T,
        backoff: Arc<BackoffTracker>,
        records: Arc<PeerRecordLog>,
        config: Arc<CrawlerConfig>,
        shutdown_signal: ShutdownSignal,
    ) -> Self {
        Self {
            peer_id,
            transport,
            backoff,
            records,
            config,
            shutdown_signal,
        }
    }

    /// Runs the session on a stream the peer opened to us. Both streams are released and the peer is disconnected
    /// before this returns.
    pub async fn run(self, inbound: T::Substream) -> SessionOutcome {
        let mut stats = SessionStats::default();
        let end = self.drive(inbound, &mut stats).await;

        match &end {
            SessionEnd::Closed => {
                debug!(target: LOG_TARGET, "Gossip stream from {} closed", self.peer_id);
            },
            SessionEnd::Shutdown => {
                debug!(target: LOG_TARGET, "Gossip session with {} interrupted by shutdown", self.peer_id);
            },
            SessionEnd::OutboundOpenFailed(err) => {
                error!(
                    target: LOG_TARGET,
                    "Failed to open gossip stream to {}: {}", self.peer_id, err
                );
            },
            SessionEnd::HelloFailed(err) => {
                warn!(target: LOG_TARGET, "Failed to read hello from {}: {}", self.peer_id, err);
            },
            SessionEnd::SolicitFailed(err) => {
                warn!(target: LOG_TARGET, "Failed to send GRAFT to {}: {}", self.peer_id, err);
            },
            SessionEnd::ReadFailed(err) => {
                warn!(target: LOG_TARGET, "Error reading from {}: {}", self.peer_id, err);
            },
        }

        if let Err(err) = self.transport.disconnect(self.peer_id).await {
            debug!(target: LOG_TARGET, "Failed to disconnect {}: {}", self.peer_id, err);
        }

        SessionOutcome {
            end,
            topics: stats.topics,
            prunes: stats.prunes,
            records_submitted: stats.records_submitted,
        }
    }

    async fn drive(&self, inbound: T::Substream, stats: &mut SessionStats) -> SessionEnd {
        let open_timeout = self.config.open_stream_timeout;
        let outbound = match time::timeout(
            open_timeout,
            self.transport.open_substream(self.peer_id, GOSSIPSUB_PROTOCOL),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => return SessionEnd::OutboundOpenFailed(err.into()),
            Err(_) => return SessionEnd::OutboundOpenFailed(TransportError::Timeout(open_timeout).into()),
        };

        let max_frame_size = self.config.max_frame_size;
        let mut inbound = Framed::new(inbound, Codec::<proto::Rpc>::new(max_frame_size));
        let outbound: SharedOutbound<T::Substream> = Arc::new(Mutex::new(Some(Framed::new(
            outbound,
            Codec::<proto::Rpc>::new(max_frame_size),
        ))));

        let mut regrafts = PendingRegrafts::default();
        let end = self.exchange(&mut inbound, &outbound, &mut regrafts, stats).await;

        // An aborted re-graft releases the outbound lock even if it was stuck writing. Dropping the streams without
        // closing them resets them.
        regrafts.abort_all();
        drop(outbound.lock().await.take());
        drop(inbound);
        end
    }

    async fn exchange(
        &self,
        inbound: &mut FramedRpc<T::Substream>,
        outbound: &SharedOutbound<T::Substream>,
        regrafts: &mut PendingRegrafts,
        stats: &mut SessionStats,
    ) -> SessionEnd {
        let hello = match self.shutdown_signal.run_until(inbound.next()).await {
            Err(_) => return SessionEnd::Shutdown,
            Ok(None) => return SessionEnd::HelloFailed(SessionError::ClosedBeforeHello),
            Ok(Some(Err(err))) => return SessionEnd::HelloFailed(err.into()),
            Ok(Some(Ok(rpc))) => rpc,
        };

        stats.topics = hello.subscribed_topics();
        debug!(
            target: LOG_TARGET,
            "{} says hello with {} topic(s): {:?}",
            self.peer_id,
            stats.topics.len(),
            stats.topics
        );

        if let Some(delay) = self.backoff.solicit_delay(&self.peer_id) {
            debug!(
                target: LOG_TARGET,
                "Backing off for {:.1?} before grafting {}", delay, self.peer_id
            );
            if self.shutdown_signal.sleep(delay).await.is_err() {
                return SessionEnd::Shutdown;
            }
        }

        let graft = proto::Rpc::graft(stats.topics.iter().cloned());
        if let Err(err) = write_rpc(outbound, graft, self.config.write_timeout).await {
            return SessionEnd::SolicitFailed(err);
        }

        loop {
            let rpc = match self.shutdown_signal.run_until(inbound.next()).await {
                Err(_) => return SessionEnd::Shutdown,
                Ok(None) => return SessionEnd::Closed,
                Ok(Some(Err(err))) => return SessionEnd::ReadFailed(err.into()),
                Ok(Some(Ok(rpc))) => rpc,
            };

            let Some(control) = rpc.control else {
                continue;
            };
            for prune in control.prune {
                self.handle_prune(prune, outbound, regrafts, stats);
            }
        }
    }

    fn handle_prune(
        &self,
        prune: proto::ControlPrune,
        outbound: &SharedOutbound<T::Substream>,
        regrafts: &mut PendingRegrafts,
        stats: &mut SessionStats,
    ) {
        let topic = prune.topic_id.unwrap_or_default();
        stats.prunes += 1;
        debug!(
            target: LOG_TARGET,
            "PRUNE from {} for {} with {} PX peer(s), backoff {:?}",
            self.peer_id,
            topic,
            prune.peers.len(),
            prune.backoff
        );

        for px in prune.peers {
            let Some(envelope) = px.signed_peer_record else {
                continue;
            };
            let claimed = match PeerId::from_bytes(px.peer_id.as_deref().unwrap_or_default()) {
                Ok(peer_id) => peer_id,
                Err(err) => {
                    warn!(
                        target: LOG_TARGET,
                        "Skipping PX entry from {} with invalid peer id: {}", self.peer_id, err
                    );
                    continue;
                },
            };
            stats.records_submitted += 1;
            self.records.submit(&claimed, &envelope);
        }

        let backoff = self.backoff.record_prune(self.peer_id, prune.backoff.unwrap_or(0));
        let task = self.schedule_regraft(topic.clone(), backoff, outbound.clone());
        regrafts.replace(topic, task);
    }

    fn schedule_regraft(
        &self,
        topic: String,
        backoff: Duration,
        outbound: SharedOutbound<T::Substream>,
    ) -> JoinHandle<()> {
        let delay = backoff + self.regraft_jitter();
        let peer_id = self.peer_id;
        let write_timeout = self.config.write_timeout;
        let shutdown_signal = self.shutdown_signal.clone();
        tokio::spawn(async move {
            if shutdown_signal.sleep(delay).await.is_err() {
                return;
            }
            debug!(target: LOG_TARGET, "Re-grafting {} in {}", peer_id, topic);
            if let Err(err) = write_rpc(&outbound, proto::Rpc::graft([topic.clone()]), write_timeout).await {
                warn!(
                    target: LOG_TARGET,
                    "Failed to re-graft {} in {}: {}", peer_id, topic, err
                );
            }
        })
    }

    fn regraft_jitter(&self) -> Duration {
        let range = self.config.regraft_jitter();
        if range.start() == range.end() {
            return *range.start();
        }
        rand::thread_rng().gen_range(range)
    }
}

/// Writes `rpc` to the outbound stream. A stream that fails or stalls is taken out of the session, so later writes
/// fail with [`SessionError::OutboundClosed`].
async fn write_rpc<S>(outbound: &SharedOutbound<S>, rpc: proto::Rpc, timeout: Duration) -> Result<(), SessionError>
where S: futures::AsyncRead + futures::AsyncWrite + Unpin {
    let mut outbound = outbound.lock().await;
    let framed = outbound.as_mut().ok_or(SessionError::OutboundClosed)?;
    let result = match time::timeout(timeout, framed.send(rpc)).await {
        Ok(result) => result.map_err(SessionError::from),
        Err(_) => Err(SessionError::WriteTimeout(timeout)),
    };
    if result.is_err() {
        drop(outbound.take());
    }
    result
}

#[cfg(test)]
mod tests {
    use libp2p::identity::Keypair;
    use spook_shutdown::Shutdown;
    use tokio::time::Instant;

    use super::*;
    use crate::test_utils::{
        duplex_pair,
        duplex_pair_with_capacity,
        framed,
        signed_peer_record,
        MockTransport,
        SharedBuffer,
        TestStream,
    };

    struct Harness {
        transport: MockTransport,
        records: Arc<PeerRecordLog>,
        output: SharedBuffer,
        backoff: Arc<BackoffTracker>,
        config: Arc<CrawlerConfig>,
        shutdown: Shutdown,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(CrawlerConfig::default())
        }

        fn with_config(config: CrawlerConfig) -> Self {
            let output = SharedBuffer::default();
            Self {
                transport: MockTransport::new(),
                records: Arc::new(PeerRecordLog::new(output.clone())),
                output,
                backoff: Arc::new(BackoffTracker::new(config.max_backoff, config.graft_grace)),
                config: Arc::new(config),
                shutdown: Shutdown::new(),
            }
        }

        /// Spawns a session for `peer_id` and returns the remote ends of its inbound and outbound streams
        fn spawn_session(
            &self,
            peer_id: PeerId,
        ) -> (
            FramedRpc<TestStream>,
            FramedRpc<TestStream>,
            tokio::task::JoinHandle<SessionOutcome>,
        ) {
            self.spawn_session_with_outbound(peer_id, duplex_pair())
        }

        fn spawn_session_with_outbound(
            &self,
            peer_id: PeerId,
            (outbound_local, outbound_remote): (TestStream, TestStream),
        ) -> (
            FramedRpc<TestStream>,
            FramedRpc<TestStream>,
            tokio::task::JoinHandle<SessionOutcome>,
        ) {
            let (inbound_local, inbound_remote) = duplex_pair();
            self.transport.push_outbound(outbound_local);
            let session = GossipSession::new(
                peer_id,
                self.transport.clone(),
                self.backoff.clone(),
                self.records.clone(),
                self.config.clone(),
                self.shutdown.to_signal(),
            );
            let join = tokio::spawn(session.run(inbound_local));
            (framed(inbound_remote), framed(outbound_remote), join)
        }
    }

    fn hello(topics: &[&str]) -> proto::Rpc {
        proto::Rpc {
            subscriptions: topics
                .iter()
                .map(|t| proto::SubOpts {
                    subscribe: Some(true),
                    topic_id: Some(t.to_string()),
                })
                .collect(),
            control: None,
        }
    }

    fn prune(topic: &str, backoff: u64, px: Vec<proto::PeerInfo>) -> proto::Rpc {
        prunes(vec![proto::ControlPrune {
            topic_id: Some(topic.to_string()),
            peers: px,
            backoff: Some(backoff),
        }])
    }

    fn prunes(prune: Vec<proto::ControlPrune>) -> proto::Rpc {
        proto::Rpc {
            subscriptions: vec![],
            control: Some(proto::ControlMessage { graft: vec![], prune }),
        }
    }

    fn fixed_jitter(jitter: Duration) -> CrawlerConfig {
        CrawlerConfig {
            regraft_jitter_min: jitter,
            regraft_jitter_max: jitter,
            ..Default::default()
        }
    }

    fn px_entry(key: &Keypair, seq: u64) -> proto::PeerInfo {
        proto::PeerInfo {
            peer_id: Some(key.public().to_peer_id().to_bytes()),
            signed_peer_record: Some(signed_peer_record(key, seq, &["/ip4/10.1.1.1/tcp/4001".parse().unwrap()])),
        }
    }

    #[tokio::test]
    async fn it_grafts_exactly_the_announced_topics() {
        let harness = Harness::new();
        let peer_id = PeerId::random();
        let (mut remote_in, mut remote_out, join) = harness.spawn_session(peer_id);

        remote_in.send(hello(&["t1", "t2", "t1"])).await.unwrap();
        let graft = remote_out.next().await.unwrap().unwrap();
        assert_eq!(graft.grafted_topics(), vec!["t1", "t2"]);
        assert!(graft.subscriptions.is_empty());

        drop(remote_in);
        let outcome = join.await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::Closed));
        assert_eq!(outcome.topics, vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(harness.transport.disconnected(), vec![peer_id]);
    }

    #[tokio::test]
    async fn it_harvests_px_records_from_prunes() {
        let harness = Harness::new();
        let (mut remote_in, mut remote_out, join) = harness.spawn_session(PeerId::random());

        remote_in.send(hello(&["blocks"])).await.unwrap();
        remote_out.next().await.unwrap().unwrap();

        let a = Keypair::generate_ed25519();
        let b = Keypair::generate_ed25519();
        let forged = Keypair::generate_ed25519();
        let mismatched = proto::PeerInfo {
            peer_id: Some(PeerId::random().to_bytes()),
            signed_peer_record: px_entry(&forged, 1).signed_peer_record,
        };
        let no_record = proto::PeerInfo {
            peer_id: Some(PeerId::random().to_bytes()),
            signed_peer_record: None,
        };
        remote_in
            .send(prune("blocks", 60, vec![px_entry(&a, 1), mismatched, no_record, px_entry(&b, 4)]))
            .await
            .unwrap();
        // Messages without control are ignored
        remote_in.send(hello(&["ignored"])).await.unwrap();
        drop(remote_in);

        let outcome = join.await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::Closed));
        assert_eq!(outcome.prunes, 1);
        assert_eq!(outcome.records_submitted, 3);

        let logged = harness
            .output
            .lines()
            .iter()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["PeerID"].clone())
            .collect::<Vec<_>>();
        assert_eq!(logged, vec![
            serde_json::json!(a.public().to_peer_id().to_string()),
            serde_json::json!(b.public().to_peer_id().to_string()),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn it_regrafts_after_the_prune_backoff() {
        let harness = Harness::new();
        let peer_id = PeerId::random();
        let (mut remote_in, mut remote_out, _join) = harness.spawn_session(peer_id);

        remote_in.send(hello(&["blocks"])).await.unwrap();
        remote_out.next().await.unwrap().unwrap();

        let backoff = Duration::from_secs(60);
        remote_in.send(prune("blocks", backoff.as_secs(), vec![])).await.unwrap();
        let pruned_at = Instant::now();

        // The remote stays silent. Paused time auto-advances to the re-graft timer.
        let regraft = remote_out.next().await.unwrap().unwrap();
        let elapsed = pruned_at.elapsed();
        assert_eq!(regraft.grafted_topics(), vec!["blocks"]);
        assert!(elapsed >= backoff, "re-grafted after {:?}", elapsed);
        assert!(
            elapsed <= backoff + harness.config.regraft_jitter_max + Duration::from_secs(1),
            "re-grafted after {:?}",
            elapsed
        );
        assert!(harness.backoff.next_graft(&peer_id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn a_new_session_waits_for_an_active_backoff() {
        let harness = Harness::new();
        let peer_id = PeerId::random();
        harness.backoff.record_prune(peer_id, 30);
        let start = Instant::now();

        let (mut remote_in, mut remote_out, _join) = harness.spawn_session(peer_id);
        remote_in.send(hello(&["blocks"])).await.unwrap();
        let graft = remote_out.next().await.unwrap().unwrap();

        assert_eq!(graft.grafted_topics(), vec!["blocks"]);
        assert!(start.elapsed() >= Duration::from_secs(30) + harness.config.graft_grace);
    }

    #[tokio::test]
    async fn a_malformed_hello_ends_the_session() {
        let harness = Harness::new();
        let peer_id = PeerId::random();
        let (inbound_local, mut inbound_remote) = duplex_pair();
        let (outbound_local, outbound_remote) = duplex_pair();
        harness.transport.push_outbound(outbound_local);
        let session = GossipSession::new(
            peer_id,
            harness.transport.clone(),
            harness.backoff.clone(),
            harness.records.clone(),
            harness.config.clone(),
            harness.shutdown.to_signal(),
        );
        let join = tokio::spawn(session.run(inbound_local));

        // A length prefix announcing a frame bigger than the limit
        futures::AsyncWriteExt::write_all(&mut inbound_remote, &[0xff, 0xff, 0xff, 0x7f])
            .await
            .unwrap();

        let outcome = join.await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::HelloFailed(SessionError::Codec(_))));
        assert_eq!(harness.transport.disconnected(), vec![peer_id]);

        // The outbound stream was released without anything written
        let mut remote_out = framed(outbound_remote);
        assert!(remote_out.next().await.is_none());
    }

    #[tokio::test]
    async fn it_gives_up_when_the_reciprocal_stream_cannot_be_opened() {
        let harness = Harness::new();
        let (inbound_local, _inbound_remote) = duplex_pair();
        let session = GossipSession::new(
            PeerId::random(),
            harness.transport.clone(),
            harness.backoff.clone(),
            harness.records.clone(),
            harness.config.clone(),
            harness.shutdown.to_signal(),
        );

        let outcome = session.run(inbound_local).await;
        assert!(matches!(
            outcome.end,
            SessionEnd::OutboundOpenFailed(SessionError::Transport(_))
        ));
        assert!(outcome.topics.is_empty());
    }

    #[tokio::test]
    async fn pending_regrafts_are_dropped_once_the_session_ends() {
        let harness = Harness::new();
        let (mut remote_in, mut remote_out, join) = harness.spawn_session(PeerId::random());

        remote_in.send(hello(&["blocks"])).await.unwrap();
        remote_out.next().await.unwrap().unwrap();
        remote_in.send(prune("blocks", 0, vec![])).await.unwrap();
        drop(remote_in);

        let outcome = join.await.unwrap();
        assert_eq!(outcome.prunes, 1);
        // The session released the outbound stream, so no re-graft can follow
        assert!(remote_out.next().await.is_none());
    }

    #[tokio::test]
    async fn shutdown_interrupts_the_drain_loop() {
        let mut harness = Harness::new();
        let (mut remote_in, mut remote_out, join) = harness.spawn_session(PeerId::random());

        remote_in.send(hello(&["blocks"])).await.unwrap();
        remote_out.next().await.unwrap().unwrap();
        harness.shutdown.trigger();

        let outcome = join.await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::Shutdown));
    }

    #[tokio::test]
    async fn a_failed_graft_ends_the_session() {
        let harness = Harness::new();
        let peer_id = PeerId::random();
        let (mut remote_in, remote_out, join) = harness.spawn_session(peer_id);

        drop(remote_out);
        remote_in.send(hello(&["blocks"])).await.unwrap();

        let outcome = join.await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::SolicitFailed(SessionError::Codec(_))));
        assert_eq!(outcome.topics, vec!["blocks".to_string()]);
        assert_eq!(harness.transport.disconnected(), vec![peer_id]);
    }

    #[tokio::test(start_paused = true)]
    async fn a_stalled_graft_times_out() {
        let harness = Harness::new();
        let (mut remote_in, _remote_out, join) =
            harness.spawn_session_with_outbound(PeerId::random(), duplex_pair_with_capacity(16));

        let topic = "t".repeat(64);
        remote_in.send(hello(&[&topic])).await.unwrap();

        let outcome = join.await.unwrap();
        assert!(matches!(
            outcome.end,
            SessionEnd::SolicitFailed(SessionError::WriteTimeout(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_regraft_does_not_end_the_session() {
        let harness = Harness::new();
        let (mut remote_in, mut remote_out, join) = harness.spawn_session(PeerId::random());

        remote_in.send(hello(&["blocks"])).await.unwrap();
        remote_out.next().await.unwrap().unwrap();
        drop(remote_out);

        remote_in.send(prune("blocks", 0, vec![])).await.unwrap();
        // Let the re-graft fire and fail
        time::sleep(harness.config.regraft_jitter_max + Duration::from_secs(1)).await;

        let key = Keypair::generate_ed25519();
        remote_in.send(prune("blocks", 0, vec![px_entry(&key, 3)])).await.unwrap();
        drop(remote_in);

        let outcome = join.await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::Closed));
        assert_eq!(outcome.prunes, 2);
        assert_eq!(harness.records.known_peers(), 1);
        assert_eq!(harness.output.lines().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_prunes_for_a_topic_leave_one_regraft() {
        let harness = Harness::new();
        let (mut remote_in, mut remote_out, _join) = harness.spawn_session(PeerId::random());

        remote_in.send(hello(&["blocks"])).await.unwrap();
        remote_out.next().await.unwrap().unwrap();

        let prune_blocks = || proto::ControlPrune {
            topic_id: Some("blocks".to_string()),
            peers: vec![],
            backoff: Some(60),
        };
        remote_in
            .send(prunes(vec![prune_blocks(), prune_blocks(), prune_blocks()]))
            .await
            .unwrap();

        let regraft = remote_out.next().await.unwrap().unwrap();
        assert_eq!(regraft.grafted_topics(), vec!["blocks"]);
        assert!(time::timeout(Duration::from_secs(3600), remote_out.next())
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn a_flood_of_prunes_leaves_no_tasks_behind() {
        let harness = Harness::new();
        let (mut remote_in, mut remote_out, join) = harness.spawn_session(PeerId::random());

        remote_in.send(hello(&["blocks"])).await.unwrap();
        remote_out.next().await.unwrap().unwrap();

        let flood = (0..5000)
            .map(|i| proto::ControlPrune {
                topic_id: Some(format!("t{}", i)),
                peers: vec![],
                backoff: Some(3600),
            })
            .collect();
        remote_in.send(prunes(flood)).await.unwrap();
        drop(remote_in);

        let outcome = join.await.unwrap();
        assert_eq!(outcome.prunes, 5000);

        // Aborted tasks are released the next time the runtime polls them
        let metrics = tokio::runtime::Handle::current().metrics();
        for _ in 0..1000 {
            if metrics.num_alive_tasks() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(metrics.num_alive_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_does_not_wait_for_a_stalled_regraft() {
        let harness = Harness::with_config(fixed_jitter(Duration::from_secs(1)));
        let (mut remote_in, mut remote_out, join) =
            harness.spawn_session_with_outbound(PeerId::random(), duplex_pair_with_capacity(32));

        remote_in.send(hello(&["a"])).await.unwrap();
        remote_out.next().await.unwrap().unwrap();

        // The remote stops reading, so this re-graft blocks while holding the outbound stream
        let topic = "x".repeat(100);
        remote_in.send(prune(&topic, 0, vec![])).await.unwrap();
        time::sleep(Duration::from_secs(2)).await;

        let closed_at = Instant::now();
        drop(remote_in);
        let outcome = join.await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::Closed));
        assert!(closed_at.elapsed() < Duration::from_secs(1));
    }
}
