use crate::error::Result;
use crate::message::InboundMessage;
use crate::subscription::{StartPolicy, Subscription, Topic};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Opens consumer attachments against a broker. One instance is shared by all sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Binds a fully formed subscription to live broker state.
    async fn open(&self, subscription: Subscription) -> Result<Box<dyn Attachment>>;

    /// Validates `topic` and attaches a new consumer with its own group identity.
    ///
    /// Topic validation happens before any network call, so an invalid topic never
    /// allocates broker resources.
    async fn attach(&self, topic: &str, start: StartPolicy) -> Result<Box<dyn Attachment>> {
        let topic = Topic::parse(topic)?;
        self.open(Subscription::new(topic, start)).await
    }
}

/// A live consumer bound to one subscription.
///
/// Reads are sequential: `next` takes `&mut self`, so a second read cannot be issued
/// while one is in flight.
#[async_trait]
pub trait Attachment: Send {
    fn subscription(&self) -> &Subscription;

    /// Waits for the next message. Returns a `Cancelled` error as soon as `cancel`
    /// fires, and a retryable `Transport` error for transient broker failures.
    async fn next(&mut self, cancel: &CancellationToken) -> Result<InboundMessage>;

    /// Closes the consumer. Calling it again is a no-op.
    fn release(&mut self);
}
