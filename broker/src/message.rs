use rdkafka::message::Message;

/// A message read from the broker, owned so it can outlive the consumer borrow.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub payload: Vec<u8>,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Milliseconds since the Unix epoch, when the broker supplied one.
    pub timestamp: Option<i64>,
}

impl InboundMessage {
    /// Copies the fields the bridge needs out of a borrowed Kafka message.
    /// A message without a payload is treated as an empty one.
    pub fn from_kafka<M: Message>(message: &M) -> Self {
        Self {
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            timestamp: message.timestamp().to_millis(),
        }
    }
}
