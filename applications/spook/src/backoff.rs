//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use spook_network::PeerId;
use tokio::time::Instant;

/// Earliest instant at which each remote peer may be grafted again, as dictated by its last PRUNE.
#[derive(Debug)]
pub struct BackoffTracker {
    next_graft: Mutex<HashMap<PeerId, Instant>>,
    max_backoff: Duration,
    grace: Duration,
}

impl BackoffTracker {
    pub fn new(max_backoff: Duration, grace: Duration) -> Self {
        Self {
            next_graft: Mutex::new(HashMap::new()),
            max_backoff,
            grace,
        }
    }

    /// Records a PRUNE from `peer_id` advertising a backoff of `backoff_secs`. Returns the backoff that was applied
    /// after clamping.
    pub fn record_prune(&self, peer_id: PeerId, backoff_secs: u64) -> Duration {
        let backoff = Duration::from_secs(backoff_secs).min(self.max_backoff);
        self.next_graft_map().insert(peer_id, Instant::now() + backoff);
        backoff
    }

    pub fn next_graft(&self, peer_id: &PeerId) -> Option<Instant> {
        self.next_graft_map().get(peer_id).copied()
    }

    /// How long to wait before grafting `peer_id`, or None if it can be grafted now. The wait includes the grace
    /// margin.
    pub fn solicit_delay(&self, peer_id: &PeerId) -> Option<Duration> {
        let now = Instant::now();
        let next = self.next_graft(peer_id)?;
        if next <= now {
            return None;
        }
        Some((next - now).min(self.max_backoff) + self.grace)
    }

    fn next_graft_map(&self) -> MutexGuard<'_, HashMap<PeerId, Instant>> {
        self.next_graft.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn it_waits_out_the_backoff_plus_grace() {
        let tracker = BackoffTracker::new(Duration::from_secs(3600), Duration::from_secs(1));
        let peer_id = PeerId::random();
        assert_eq!(tracker.solicit_delay(&peer_id), None);

        assert_eq!(tracker.record_prune(peer_id, 60), Duration::from_secs(60));
        assert_eq!(tracker.solicit_delay(&peer_id), Some(Duration::from_secs(61)));

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(tracker.solicit_delay(&peer_id), Some(Duration::from_secs(41)));

        tokio::time::advance(Duration::from_secs(40)).await;
        assert_eq!(tracker.solicit_delay(&peer_id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn it_clamps_huge_backoffs() {
        let tracker = BackoffTracker::new(Duration::from_secs(3600), Duration::from_secs(1));
        let peer_id = PeerId::random();
        assert_eq!(tracker.record_prune(peer_id, u64::MAX), Duration::from_secs(3600));
        assert_eq!(tracker.solicit_delay(&peer_id), Some(Duration::from_secs(3601)));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_backoff_allows_immediate_graft() {
        let tracker = BackoffTracker::new(Duration::from_secs(3600), Duration::from_secs(1));
        let peer_id = PeerId::random();
        tracker.record_prune(peer_id, 0);
        assert_eq!(tracker.solicit_delay(&peer_id), None);
        assert!(tracker.next_graft(&peer_id).is_some());
    }
}
