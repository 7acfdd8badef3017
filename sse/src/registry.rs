use crate::bridge::BridgeState;
use crate::session::SessionId;
use broker::{GroupId, Topic};
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::watch;

/// Topic, consumer group and live bridge state of one registered session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub topic: Topic,
    pub group_id: GroupId,
    pub state: watch::Receiver<BridgeState>,
}

/// Registry of live sessions with dual indices for O(1) lookups
pub struct SessionRegistry {
    /// Primary storage: lookup by session_id for registration/cleanup - O(1)
    sessions: DashMap<SessionId, SessionInfo>,

    /// Secondary index: sessions currently streaming each topic - O(1)
    topic_index: DashMap<Topic, HashSet<SessionId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            topic_index: DashMap::new(),
        }
    }

    /// Register a new session - O(1)
    pub fn register(&self, session_id: SessionId, info: SessionInfo) {
        self.topic_index
            .entry(info.topic.clone())
            .or_default()
            .insert(session_id.clone());

        self.sessions.insert(session_id, info);
    }

    /// Unregister a session - O(1)
    pub fn unregister(&self, session_id: &SessionId) {
        if let Some((_, info)) = self.sessions.remove(session_id) {
            let topic = info.topic;

            if let Some(mut entry) = self.topic_index.get_mut(&topic) {
                entry.remove(session_id);

                // Clean up empty topic entries
                if entry.is_empty() {
                    drop(entry); // Release lock before removal
                    self.topic_index.remove(&topic);
                }
            }
        }
    }

    pub fn get(&self, session_id: &SessionId) -> Option<SessionInfo> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of live sessions on `topic` - O(1)
    pub fn count_for_topic(&self, topic: &Topic) -> usize {
        self.topic_index
            .get(topic)
            .map(|ids| ids.len())
            .unwrap_or(0)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(topic: &str) -> (SessionInfo, watch::Sender<BridgeState>) {
        let (tx, rx) = watch::channel(BridgeState::Streaming);
        (
            SessionInfo {
                topic: Topic::parse(topic).unwrap(),
                group_id: GroupId::new(),
                state: rx,
            },
            tx,
        )
    }

    #[test]
    fn register_and_unregister_keep_indices_in_sync() {
        let registry = SessionRegistry::new();
        let orders = Topic::parse("orders").unwrap();
        let (first_info, _first_tx) = info("orders");
        let (second_info, _second_tx) = info("orders");
        let (audit_info, _audit_tx) = info("audit");
        let first = SessionId::new();
        let second = SessionId::new();
        let audit = SessionId::new();

        registry.register(first.clone(), first_info);
        registry.register(second.clone(), second_info);
        registry.register(audit.clone(), audit_info);

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.count_for_topic(&orders), 2);

        registry.unregister(&first);
        assert_eq!(registry.count_for_topic(&orders), 1);
        assert!(registry.get(&first).is_none());
        assert!(registry.get(&second).is_some());

        registry.unregister(&second);
        registry.unregister(&audit);
        assert!(registry.is_empty());
        assert_eq!(registry.count_for_topic(&orders), 0);
        assert!(registry.topic_index.is_empty());
    }

    #[test]
    fn unregistering_unknown_session_is_a_no_op() {
        let registry = SessionRegistry::new();
        registry.unregister(&SessionId::new());
        assert!(registry.is_empty());
    }
}
