//! Scripted in-memory connector for tests of the layers above the broker.

use crate::connector::{Attachment, Connector};
use crate::error::{cancelled, Error, ErrorKind, Result};
use crate::message::InboundMessage;
use crate::subscription::Subscription;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One scripted outcome of `Attachment::next`.
#[derive(Debug, Clone)]
pub enum Step {
    /// Deliver a message with this payload.
    Message(Vec<u8>),
    /// Fail the read with an error of this kind.
    Fail(ErrorKind),
    /// Stay quiet for a while before moving on to the next step.
    Wait(Duration),
}

impl Step {
    pub fn message(payload: &str) -> Self {
        Step::Message(payload.as_bytes().to_vec())
    }
}

/// Hands out `MockAttachment`s that replay scripts in the order they were queued.
/// Once a script runs out, reads block until the session is cancelled.
#[derive(Default)]
pub struct MockConnector {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    open_error: Mutex<Option<ErrorKind>>,
    opened: Mutex<Vec<Subscription>>,
    release_calls: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the script for the next attachment this connector opens.
    pub fn with_script(self, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .expect("mock scripts lock poisoned")
            .push_back(steps);
        self
    }

    /// Makes every `open` fail with `kind`.
    pub fn failing(self, kind: ErrorKind) -> Self {
        *self.open_error.lock().expect("mock error lock poisoned") = Some(kind);
        self
    }

    /// Subscriptions of every attachment opened so far.
    pub fn opened(&self) -> Vec<Subscription> {
        self.opened.lock().expect("mock opened lock poisoned").clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened().len()
    }

    /// Total number of `release` calls made on attachments from this connector.
    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    /// Total number of `next` calls made on attachments from this connector.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, subscription: Subscription) -> Result<Box<dyn Attachment>> {
        if let Some(kind) = self
            .open_error
            .lock()
            .expect("mock error lock poisoned")
            .clone()
        {
            return Err(Error::new(kind, "scripted open failure"));
        }

        let steps = self
            .scripts
            .lock()
            .expect("mock scripts lock poisoned")
            .pop_front()
            .unwrap_or_default();
        self.opened
            .lock()
            .expect("mock opened lock poisoned")
            .push(subscription.clone());

        Ok(Box::new(MockAttachment {
            subscription,
            steps: steps.into(),
            next_offset: 0,
            released: false,
            release_calls: Arc::clone(&self.release_calls),
            reads: Arc::clone(&self.reads),
        }))
    }
}

pub struct MockAttachment {
    subscription: Subscription,
    steps: VecDeque<Step>,
    next_offset: i64,
    released: bool,
    release_calls: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

#[async_trait]
impl Attachment for MockAttachment {
    fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    async fn next(&mut self, cancel: &CancellationToken) -> Result<InboundMessage> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.released {
            return Err(Error::new(ErrorKind::Cancelled, "attachment already released"));
        }

        loop {
            match self.steps.pop_front() {
                Some(Step::Message(payload)) => {
                    let offset = self.next_offset;
                    self.next_offset += 1;
                    return Ok(InboundMessage {
                        payload,
                        topic: self.subscription.topic().to_string(),
                        partition: 0,
                        offset,
                        timestamp: None,
                    });
                }
                Some(Step::Fail(kind)) => return Err(Error::new(kind, "scripted read failure")),
                Some(Step::Wait(duration)) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(cancelled()),
                        _ = tokio::time::sleep(duration) => {}
                    }
                }
                None => {
                    cancel.cancelled().await;
                    return Err(cancelled());
                }
            }
        }
    }

    fn release(&mut self) {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.released = true;
    }
}
