use crate::bridge::{Bridge, BridgeConfig, BridgeState};
use crate::registry::{SessionInfo, SessionRegistry};
use crate::retry::RetryPolicy;
use crate::session::{Session, SessionId};
use async_stream::stream;
use axum::response::sse::Event;
use broker::{Connector, StartPolicy, Topic};
use futures::stream::{BoxStream, StreamExt};
use log::*;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Limits applied to every session.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub start: StartPolicy,
    pub max_lifetime: Duration,
    pub outbound_buffer: usize,
    pub flush_timeout: Duration,
    pub retry: RetryPolicy,
    pub keep_alive: Duration,
}

impl SessionPolicy {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            retry: self.retry,
            flush_timeout: self.flush_timeout,
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            start: StartPolicy::default(),
            max_lifetime: Duration::from_secs(3600),
            outbound_buffer: 16,
            flush_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            keep_alive: Duration::from_secs(15),
        }
    }
}

/// Events pushed to one client, ending when its session closes.
pub type EventStream = BoxStream<'static, Result<Event, Infallible>>;

pub struct Manager {
    registry: Arc<SessionRegistry>,
    policy: SessionPolicy,
    shutdown: CancellationToken,
}

impl Manager {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            policy,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Attaches to `topic` and starts a bridge for it.
    ///
    /// Attachment failures are returned before anything is streamed, so the caller can
    /// still answer with an error status. On success the returned stream yields one event
    /// per broker message; dropping it cancels the session.
    pub async fn open(
        &self,
        connector: &dyn Connector,
        topic: &str,
    ) -> Result<(SessionId, EventStream), broker::Error> {
        let attachment = connector.attach(topic, self.policy.start).await?;
        let subscription = attachment.subscription().clone();

        let session = Session::start(&self.shutdown, self.policy.max_lifetime);
        let session_id = session.id().clone();
        let disconnect = session.disconnect_guard();

        let (tx, mut rx) = mpsc::channel(self.policy.outbound_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(BridgeState::Starting);

        self.registry.register(
            session_id.clone(),
            SessionInfo {
                topic: subscription.topic().clone(),
                group_id: subscription.group_id().clone(),
                state: state_rx,
            },
        );
        info!(
            "Opened SSE session {} on topic {} (group {})",
            session_id,
            subscription.topic(),
            subscription.group_id()
        );

        let bridge = Bridge::new(
            attachment,
            session,
            tx,
            self.policy.bridge_config(),
            state_tx,
        );
        self.supervise(session_id.clone(), bridge);

        let stream = stream! {
            // Dropped together with the stream when the client goes away.
            let _disconnect = disconnect;
            while let Some(event) = rx.recv().await {
                yield event;
            }
        };

        Ok((session_id, stream.boxed()))
    }

    /// Runs the bridge on its own task and contains any panic to this session.
    fn supervise(&self, session_id: SessionId, bridge: Bridge) {
        let registry = Arc::clone(&self.registry);
        let task = tokio::spawn(bridge.run());

        tokio::spawn(async move {
            match task.await {
                Ok(outcome) => info!(
                    "Closed SSE session {} after {} event(s): {:?}",
                    session_id, outcome.delivered, outcome.reason
                ),
                Err(e) => error!("SSE session {} bridge task failed: {e}", session_id),
            }
            registry.unregister(&session_id);
        });
    }

    /// Cancels every session. Used when the process shuts down.
    pub fn shutdown(&self) {
        info!(
            "Shutting down {} active SSE session(s)",
            self.registry.len()
        );
        self.shutdown.cancel();
    }

    pub fn active_sessions(&self) -> usize {
        self.registry.len()
    }

    pub fn sessions_for_topic(&self, topic: &Topic) -> usize {
        self.registry.count_for_topic(topic)
    }

    /// Subscribes to the bridge state of a live session.
    pub fn watch(&self, session_id: &SessionId) -> Option<watch::Receiver<BridgeState>> {
        self.registry.get(session_id).map(|info| info.state)
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new(SessionPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker::mock::{MockConnector, Step};
    use broker::ErrorKind;

    async fn closed(manager: &Manager, session_id: &SessionId) {
        if let Some(mut state) = manager.watch(session_id) {
            let _ = state.wait_for(|s| *s == BridgeState::Closed).await;
        }
    }

    #[tokio::test]
    async fn invalid_topic_opens_nothing() {
        let manager = Manager::default();
        let connector = MockConnector::new();

        let err = manager.open(&connector, "").await.err().unwrap();

        assert_eq!(err.kind(), &ErrorKind::InvalidTopic);
        assert_eq!(connector.open_count(), 0);
        assert_eq!(manager.active_sessions(), 0);
    }

    #[tokio::test]
    async fn attach_failure_is_reported_before_streaming() {
        let manager = Manager::default();
        let connector = MockConnector::new().failing(ErrorKind::AuthFailed);

        let err = manager.open(&connector, "orders").await.err().unwrap();

        assert_eq!(err.kind(), &ErrorKind::AuthFailed);
        assert_eq!(manager.active_sessions(), 0);
    }

    #[tokio::test]
    async fn concurrent_sessions_on_one_topic_are_isolated() {
        let manager = Manager::default();
        let connector = MockConnector::new()
            .with_script(vec![Step::message("first")])
            .with_script(vec![
                Step::message("second"),
                Step::Wait(Duration::from_millis(50)),
                Step::message("after cancel"),
            ]);
        let orders = Topic::parse("orders").unwrap();

        let (first_id, first_stream) = manager.open(&connector, "orders").await.unwrap();
        let (second_id, mut second_stream) = manager.open(&connector, "orders").await.unwrap();

        let opened = connector.opened();
        assert_ne!(first_id, second_id);
        assert_ne!(opened[0].group_id(), opened[1].group_id());
        assert_eq!(manager.sessions_for_topic(&orders), 2);

        // Client of the first session disconnects.
        drop(first_stream);
        closed(&manager, &first_id).await;

        assert!(second_stream.next().await.unwrap().is_ok());
        assert!(second_stream.next().await.unwrap().is_ok());
        assert_eq!(
            manager.watch(&second_id).map(|state| *state.borrow()),
            Some(BridgeState::Streaming)
        );
        assert_eq!(connector.release_calls(), 1);
    }

    #[tokio::test]
    async fn client_disconnect_closes_and_releases_once() {
        let manager = Manager::default();
        let connector = MockConnector::new();

        let (session_id, stream) = manager.open(&connector, "orders").await.unwrap();
        let mut state = manager.watch(&session_id).unwrap();
        state
            .wait_for(|s| *s == BridgeState::Streaming)
            .await
            .unwrap();

        drop(stream);

        tokio::time::timeout(Duration::from_secs(1), closed(&manager, &session_id))
            .await
            .expect("session should close promptly after disconnect");
        assert_eq!(connector.release_calls(), 1);
    }

    #[tokio::test]
    async fn shutdown_closes_every_session() {
        let manager = Manager::default();
        let connector = MockConnector::new();

        let (first_id, mut first_stream) = manager.open(&connector, "orders").await.unwrap();
        let (second_id, mut second_stream) = manager.open(&connector, "audit").await.unwrap();

        manager.shutdown();
        closed(&manager, &first_id).await;
        closed(&manager, &second_id).await;

        // Both response streams end once their bridges close.
        assert_eq!(first_stream.next().await.map(|_| ()), None);
        assert_eq!(second_stream.next().await.map(|_| ()), None);
        assert_eq!(connector.release_calls(), 2);
    }
}
