//! Kafka implementation of the connector and attachment traits, backed by librdkafka.

use crate::connector::{Attachment, Connector};
use crate::endpoint::BrokerEndpoint;
use crate::error::{cancelled, Error, ErrorKind, Result};
use crate::message::InboundMessage;
use crate::subscription::{StartPolicy, Subscription};
use async_trait::async_trait;
use log::*;
use rdkafka::consumer::{BaseConsumer, Consumer, StreamConsumer};
use rdkafka::error::RDKafkaErrorCode;
use rdkafka::{Offset, TopicPartitionList};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Builds authenticated consumers for sessions. Shared read-only across all sessions.
pub struct KafkaConnector {
    endpoint: Arc<BrokerEndpoint>,
    metadata_timeout: Duration,
}

impl KafkaConnector {
    pub fn new(endpoint: Arc<BrokerEndpoint>, metadata_timeout: Duration) -> Self {
        Self {
            endpoint,
            metadata_timeout,
        }
    }

    /// Connects once and fetches cluster metadata so bad credentials or an unreachable
    /// cluster are found at startup rather than on the first client request.
    pub async fn verify(&self) -> Result<()> {
        let mut config = self.endpoint.client_config();
        config.set("group.id", format!("{}-probe", uuid::Uuid::new_v4()));
        let probe: BaseConsumer = config.create()?;
        let timeout = self.metadata_timeout;

        let (brokers, topics) = tokio::task::spawn_blocking(move || {
            let metadata = probe.fetch_metadata(None, timeout)?;
            Ok::<_, Error>((metadata.brokers().len(), metadata.topics().len()))
        })
        .await
        .map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Transport,
        })??;

        info!(
            "Connected to broker {} ({brokers} broker(s), {topics} topic(s) visible)",
            self.endpoint.address()
        );
        Ok(())
    }
}

#[async_trait]
impl Connector for KafkaConnector {
    async fn open(&self, subscription: Subscription) -> Result<Box<dyn Attachment>> {
        let mut config = self.endpoint.client_config();
        config
            .set("group.id", subscription.group_id().as_str())
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "false")
            .set("auto.offset.reset", "latest");
        let consumer: StreamConsumer = config.create()?;

        // Metadata lookups block the calling thread inside librdkafka.
        let topic = subscription.topic().to_string();
        let timeout = self.metadata_timeout;
        let (consumer, partitions) = tokio::task::spawn_blocking(move || {
            let partitions = partitions_of(&consumer, &topic, timeout)?;
            Ok::<_, Error>((consumer, partitions))
        })
        .await
        .map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Transport,
        })??;

        let offset = match subscription.start() {
            StartPolicy::Tail { window: 0 } => Offset::End,
            StartPolicy::Tail { window } => Offset::OffsetTail(i64::from(window)),
        };
        let mut assignment = TopicPartitionList::new();
        for partition in &partitions {
            assignment.add_partition_offset(subscription.topic().as_str(), *partition, offset)?;
        }
        consumer.assign(&assignment)?;

        debug!(
            "Attached group {} to topic {} ({} partition(s), start {:?})",
            subscription.group_id(),
            subscription.topic(),
            partitions.len(),
            offset
        );

        Ok(Box::new(KafkaAttachment {
            subscription,
            consumer: Some(consumer),
        }))
    }
}

/// Looks up the partitions of `topic`, mapping broker-side topic errors.
fn partitions_of(consumer: &StreamConsumer, topic: &str, timeout: Duration) -> Result<Vec<i32>> {
    let metadata = consumer.fetch_metadata(Some(topic), timeout)?;
    let Some(topic_metadata) = metadata.topics().iter().find(|t| t.name() == topic) else {
        return Err(Error::new(
            ErrorKind::UnknownTopic,
            &format!("broker returned no metadata for topic {topic}"),
        ));
    };

    if let Some(err) = topic_metadata.error() {
        let code = RDKafkaErrorCode::from(err);
        let error_kind = match code {
            RDKafkaErrorCode::TopicAuthorizationFailed => ErrorKind::AuthFailed,
            RDKafkaErrorCode::InvalidTopic => ErrorKind::InvalidTopic,
            RDKafkaErrorCode::UnknownTopicOrPartition | RDKafkaErrorCode::UnknownTopic => {
                ErrorKind::UnknownTopic
            }
            _ => ErrorKind::Transport,
        };
        return Err(Error::new(error_kind, &format!("topic {topic}: {code}")));
    }

    let partitions: Vec<i32> = topic_metadata.partitions().iter().map(|p| p.id()).collect();
    if partitions.is_empty() {
        return Err(Error::new(
            ErrorKind::UnknownTopic,
            &format!("topic {topic} has no partitions"),
        ));
    }
    Ok(partitions)
}

/// A manually assigned consumer. It never joins the group protocol and never commits,
/// so no consumer-group state is left on the broker once it is released.
pub struct KafkaAttachment {
    subscription: Subscription,
    consumer: Option<StreamConsumer>,
}

#[async_trait]
impl Attachment for KafkaAttachment {
    fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    async fn next(&mut self, cancel: &CancellationToken) -> Result<InboundMessage> {
        let Some(consumer) = self.consumer.as_ref() else {
            return Err(Error::new(ErrorKind::Cancelled, "attachment already released"));
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(cancelled()),
            received = consumer.recv() => match received {
                Ok(message) => Ok(InboundMessage::from_kafka(&message)),
                Err(e) => Err(Error::from(e)),
            },
        }
    }

    fn release(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            if let Err(e) = consumer.unassign() {
                warn!(
                    "Failed to unassign group {}: {e}",
                    self.subscription.group_id()
                );
            }
            drop(consumer);
            debug!(
                "Released group {} on topic {}",
                self.subscription.group_id(),
                self.subscription.topic()
            );
        }
    }
}

impl Drop for KafkaAttachment {
    fn drop(&mut self) {
        self.release();
    }
}
