//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

//! Deduplicating sink for harvested peer records.
//!
//! Every record that survives verification and is newer than anything seen before for its subject is written as one
//! JSON line. The highest accepted sequence number per subject is kept in memory for the lifetime of the process and
//! is shared by every identity.

use std::{
    collections::HashMap,
    io,
    io::Write,
    sync::{Mutex, MutexGuard, PoisonError},
};

use libp2p::core::{signed_envelope::ReadPayloadError, SignedEnvelope};
use log::*;
use quick_protobuf::{BytesReader, MessageRead};
use serde::Serialize;
use spook_network::{Multiaddr, PeerId};

use crate::proto;

const LOG_TARGET: &str = "spook::record_log";

/// Signing domain of a `libp2p-peer-record` envelope
pub const PEER_RECORD_DOMAIN: &str = "libp2p-peer-record";
/// Multicodec of the peer record payload
pub const PEER_RECORD_PAYLOAD_TYPE: [u8; 2] = [0x03, 0x01];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { seq: u64 },
    Rejected(RejectReason),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("envelope could not be decoded or its signature is invalid")]
    InvalidEnvelope,
    #[error("envelope payload is not a peer record")]
    UnexpectedPayloadType,
    #[error("record is not signed by its subject")]
    ForeignSigner,
    #[error("record subject differs from the peer it was delivered for")]
    SubjectMismatch,
    #[error("record is not newer than the one already logged")]
    Stale,
}

/// One output line
#[derive(Debug, Serialize)]
struct LogEntry {
    #[serde(rename = "PeerID")]
    peer_id: String,
    #[serde(rename = "Addrs")]
    addrs: Vec<String>,
    #[serde(rename = "Seq")]
    seq: u64,
}

impl From<&SignedPeerRecord> for LogEntry {
    fn from(record: &SignedPeerRecord) -> Self {
        Self {
            peer_id: record.peer_id.to_string(),
            addrs: record.addresses.iter().map(ToString::to_string).collect(),
            seq: record.seq,
        }
    }
}

/// The contents of an envelope that passed verification
#[derive(Debug)]
struct SignedPeerRecord {
    peer_id: PeerId,
    seq: u64,
    addresses: Vec<Multiaddr>,
}

struct Inner {
    known: HashMap<PeerId, u64>,
    writer: Box<dyn Write + Send>,
}

pub struct PeerRecordLog {
    inner: Mutex<Inner>,
}

impl PeerRecordLog {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Mutex::new(Inner {
                known: HashMap::new(),
                writer: Box::new(writer),
            }),
        }
    }

    /// Verifies `envelope` and logs the record it carries if it is the newest seen for its subject.
    ///
    /// `claimed` is the peer the record was delivered for. Records whose signed subject differs are rejected. This
    /// never fails: rejections are reported in the outcome and logged, and output errors are logged only.
    pub fn submit(&self, claimed: &PeerId, envelope: &[u8]) -> SubmitOutcome {
        let record = match open_peer_record(envelope) {
            Ok(record) => record,
            Err(reason) => {
                warn!(target: LOG_TARGET, "Ignoring record delivered for {}: {}", claimed, reason);
                return SubmitOutcome::Rejected(reason);
            },
        };

        let subject = record.peer_id;
        if subject != *claimed {
            warn!(
                target: LOG_TARGET,
                "Ignoring record for {} delivered as {}: subject mismatch", subject, claimed
            );
            return SubmitOutcome::Rejected(RejectReason::SubjectMismatch);
        }

        let seq = record.seq;
        let mut inner = self.inner();
        if let Some(known) = inner.known.get(&subject) {
            if *known >= seq {
                debug!(
                    target: LOG_TARGET,
                    "Ignoring record for {} with seq {} (have {})", subject, seq, known
                );
                return SubmitOutcome::Rejected(RejectReason::Stale);
            }
        }
        inner.known.insert(subject, seq);

        if let Err(err) = write_entry(&mut inner.writer, &LogEntry::from(&record)) {
            error!(target: LOG_TARGET, "Failed to write record for {}: {}", subject, err);
        }
        debug!(
            target: LOG_TARGET,
            "Logged record for {} seq {} with {} address(es)",
            subject,
            seq,
            record.addresses.len()
        );

        SubmitOutcome::Accepted { seq }
    }

    /// Number of distinct peers logged so far
    pub fn known_peers(&self) -> usize {
        self.inner().known.len()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Opens a `libp2p-peer-record` envelope. The signature must verify and the signing key must belong to the peer the
/// record describes.
fn open_peer_record(envelope: &[u8]) -> Result<SignedPeerRecord, RejectReason> {
    let envelope = SignedEnvelope::from_protobuf_encoding(envelope).map_err(|err| {
        debug!(target: LOG_TARGET, "Undecodable envelope: {}", err);
        RejectReason::InvalidEnvelope
    })?;
    let (payload, signing_key) = envelope
        .payload_and_signing_key(PEER_RECORD_DOMAIN.to_string(), &PEER_RECORD_PAYLOAD_TYPE)
        .map_err(|err| match err {
            ReadPayloadError::UnexpectedPayloadType { got, .. } => {
                debug!(target: LOG_TARGET, "Envelope carries payload type {:02x?}", got);
                RejectReason::UnexpectedPayloadType
            },
            err => {
                debug!(target: LOG_TARGET, "Invalid peer record envelope: {}", err);
                RejectReason::InvalidEnvelope
            },
        })?;

    let record = proto::PeerRecord::from_reader(&mut BytesReader::from_bytes(payload), payload).map_err(|err| {
        debug!(target: LOG_TARGET, "Undecodable peer record: {}", err);
        RejectReason::InvalidEnvelope
    })?;
    let peer_id = PeerId::from_bytes(&record.peer_id).map_err(|err| {
        debug!(target: LOG_TARGET, "Peer record with invalid peer id: {}", err);
        RejectReason::InvalidEnvelope
    })?;
    if signing_key.to_peer_id() != peer_id {
        return Err(RejectReason::ForeignSigner);
    }
    let addresses = record
        .addresses
        .into_iter()
        .map(|info| Multiaddr::try_from(info.multiaddr))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| {
            debug!(target: LOG_TARGET, "Peer record for {} with invalid address: {}", peer_id, err);
            RejectReason::InvalidEnvelope
        })?;

    Ok(SignedPeerRecord {
        peer_id,
        seq: record.seq,
        addresses,
    })
}

fn write_entry(writer: &mut dyn Write, entry: &LogEntry) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, entry)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
