//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

//! Gossipsub wire messages and the peer record payload carried in their peer exchange.

mod peer_record;
mod rpc;

pub use peer_record::{mod_PeerRecord, PeerRecord};
pub use rpc::{mod_RPC::SubOpts, ControlGraft, ControlMessage, ControlPrune, PeerInfo, RPC as Rpc};

impl Rpc {
    /// An RPC carrying nothing but a GRAFT for each of `topics`.
    pub fn graft<I: IntoIterator<Item = String>>(topics: I) -> Self {
        Self {
            subscriptions: Vec::new(),
            control: Some(ControlMessage {
                graft: topics
                    .into_iter()
                    .map(|topic| ControlGraft { topic_id: Some(topic) })
                    .collect(),
                prune: Vec::new(),
            }),
        }
    }

    /// Topics the sender announced a subscription to, in order of first appearance. Explicit unsubscribes and
    /// entries without a topic are left out.
    pub fn subscribed_topics(&self) -> Vec<String> {
        let mut topics = Vec::with_capacity(self.subscriptions.len());
        for sub in &self.subscriptions {
            if sub.subscribe == Some(false) {
                continue;
            }
            let Some(topic) = sub.topic_id.as_ref() else {
                continue;
            };
            if !topics.contains(topic) {
                topics.push(topic.clone());
            }
        }
        topics
    }

    pub fn grafted_topics(&self) -> Vec<&str> {
        self.control
            .iter()
            .flat_map(|c| c.graft.iter())
            .filter_map(|g| g.topic_id.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(topic: &str, subscribe: Option<bool>) -> SubOpts {
        SubOpts {
            subscribe,
            topic_id: Some(topic.to_string()),
        }
    }

    #[test]
    fn it_collects_unique_subscribed_topics_in_order() {
        let hello = Rpc {
            subscriptions: vec![
                sub("t1", Some(true)),
                sub("t2", None),
                sub("t1", Some(true)),
                sub("t3", Some(false)),
                SubOpts::default(),
            ],
            control: None,
        };
        assert_eq!(hello.subscribed_topics(), vec!["t1".to_string(), "t2".to_string()]);
    }

    #[test]
    fn graft_only_carries_grafts() {
        let rpc = Rpc::graft(["a".to_string(), "b".to_string()]);
        assert!(rpc.subscriptions.is_empty());
        assert_eq!(rpc.grafted_topics(), vec!["a", "b"]);
        assert!(rpc.control.unwrap().prune.is_empty());
    }
}
