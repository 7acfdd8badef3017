//! Error types for the `broker` crate.
//!
//! Follows the same pattern as the other layers: a root `Error` struct holding an
//! `error_kind` plus the optional source that caused it.

use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Top-level error type for broker operations.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Categories of failures that can occur while talking to the broker.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Missing or unusable connection settings. Fatal at process start.
    Config,
    /// The requested topic name is empty or not a legal topic name.
    InvalidTopic,
    /// The broker does not know the requested topic.
    UnknownTopic,
    /// The broker rejected the configured credentials.
    AuthFailed,
    /// Network or broker-side failure that may succeed on a later attempt.
    Transport,
    /// The session was cancelled while a read was in flight.
    Cancelled,
}

impl ErrorKind {
    /// Whether a read that failed with this kind may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transport)
    }
}

impl Error {
    pub fn new(error_kind: ErrorKind, message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn is_retryable(&self) -> bool {
        self.error_kind.is_retryable()
    }

    pub fn is_cancelled(&self) -> bool {
        self.error_kind == ErrorKind::Cancelled
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let prefix = match self.error_kind {
            ErrorKind::Config => "broker configuration error",
            ErrorKind::InvalidTopic => "invalid topic",
            ErrorKind::UnknownTopic => "unknown topic",
            ErrorKind::AuthFailed => "broker authentication failed",
            ErrorKind::Transport => "broker transport error",
            ErrorKind::Cancelled => "session cancelled",
        };
        match &self.source {
            Some(source) => write!(f, "{prefix}: {source}"),
            None => write!(f, "{prefix}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// Translate librdkafka failures into the kinds the bridge reasons about.
impl From<KafkaError> for Error {
    fn from(err: KafkaError) -> Self {
        let error_kind = match err.rdkafka_error_code() {
            Some(
                RDKafkaErrorCode::Authentication
                | RDKafkaErrorCode::SaslAuthenticationFailed
                | RDKafkaErrorCode::TopicAuthorizationFailed
                | RDKafkaErrorCode::GroupAuthorizationFailed
                | RDKafkaErrorCode::ClusterAuthorizationFailed,
            ) => ErrorKind::AuthFailed,
            Some(
                RDKafkaErrorCode::UnknownTopicOrPartition
                | RDKafkaErrorCode::UnknownTopic
                | RDKafkaErrorCode::UnknownPartition,
            ) => ErrorKind::UnknownTopic,
            Some(RDKafkaErrorCode::InvalidTopic) => ErrorKind::InvalidTopic,
            _ => match err {
                KafkaError::ClientConfig(..) | KafkaError::ClientCreation(_) => ErrorKind::Config,
                _ => ErrorKind::Transport,
            },
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create the error returned by a read that observed cancellation.
pub fn cancelled() -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(ErrorKind::Transport.is_retryable());
        assert!(!ErrorKind::AuthFailed.is_retryable());
        assert!(!ErrorKind::InvalidTopic.is_retryable());
        assert!(!ErrorKind::UnknownTopic.is_retryable());
        assert!(!ErrorKind::Config.is_retryable());
        assert!(!ErrorKind::Cancelled.is_retryable());
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = Error::new(ErrorKind::InvalidTopic, "topic is not provided");
        assert_eq!(err.to_string(), "invalid topic: topic is not provided");
        assert_eq!(cancelled().to_string(), "session cancelled");
    }

    #[test]
    fn kafka_authentication_errors_map_to_auth_failed() {
        let err: Error =
            KafkaError::MetadataFetch(RDKafkaErrorCode::SaslAuthenticationFailed).into();
        assert_eq!(err.kind(), &ErrorKind::AuthFailed);
    }

    #[test]
    fn kafka_unknown_topic_maps_to_unknown_topic() {
        let err: Error =
            KafkaError::MetadataFetch(RDKafkaErrorCode::UnknownTopicOrPartition).into();
        assert_eq!(err.kind(), &ErrorKind::UnknownTopic);
    }

    #[test]
    fn kafka_network_errors_map_to_retryable_transport() {
        let err: Error =
            KafkaError::MessageConsumption(RDKafkaErrorCode::BrokerTransportFailure).into();
        assert_eq!(err.kind(), &ErrorKind::Transport);
        assert!(err.is_retryable());
    }

    #[test]
    fn kafka_client_creation_maps_to_config() {
        let err: Error = KafkaError::ClientCreation("bad settings".to_string()).into();
        assert_eq!(err.kind(), &ErrorKind::Config);
    }
}
