//! Broker-side building blocks for the Kafka SSE bridge.
//!
//! - `endpoint`: process-wide connection settings (address, SASL credentials, TLS)
//! - `subscription`: topic validation, per-session group identity and start policy
//! - `connector`: the `Connector` / `Attachment` seams the bridge is written against
//! - `kafka`: librdkafka-backed implementation of those seams
//! - `error`: error kinds shared by every layer above

pub mod connector;
pub mod endpoint;
pub mod error;
pub mod kafka;
pub mod message;
pub mod subscription;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use connector::{Attachment, Connector};
pub use endpoint::{BrokerEndpoint, SaslMechanism, TransportSecurity};
pub use error::{Error, ErrorKind};
pub use kafka::KafkaConnector;
pub use message::InboundMessage;
pub use subscription::{GroupId, StartPolicy, Subscription, Topic};

#[cfg(test)]
mod tests {
    use super::mock::{MockConnector, Step};
    use super::*;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn attach_rejects_empty_topic_before_opening() {
        let connector = MockConnector::new();

        let err = connector
            .attach("", StartPolicy::default())
            .await
            .err()
            .expect("empty topic must be rejected");

        assert_eq!(err.kind(), &ErrorKind::InvalidTopic);
        assert_eq!(connector.open_count(), 0);
    }

    #[tokio::test]
    async fn attach_gives_every_call_a_fresh_group() {
        let connector = MockConnector::new();

        let first = connector.attach("orders", StartPolicy::default()).await.unwrap();
        let second = connector.attach("orders", StartPolicy::default()).await.unwrap();

        assert_eq!(first.subscription().topic().as_str(), "orders");
        assert_ne!(
            first.subscription().group_id(),
            second.subscription().group_id()
        );
        assert_eq!(connector.open_count(), 2);
    }

    #[tokio::test]
    async fn next_unblocks_when_cancelled() {
        let connector = MockConnector::new().with_script(vec![Step::message("A")]);
        let mut attachment = connector.attach("orders", StartPolicy::default()).await.unwrap();
        let cancel = CancellationToken::new();

        let message = attachment.next(&cancel).await.unwrap();
        assert_eq!(message.payload, b"A");

        cancel.cancel();
        let err = attachment.next(&cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
