//! The per-session pull/push loop between a broker attachment and one SSE client.

use crate::event;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::session::{Session, Termination};
use axum::response::sse::Event;
use broker::{Attachment, ErrorKind};
use log::*;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Outbound half of the bounded channel feeding the client's response stream.
pub type Outbound = mpsc::Sender<Result<Event, Infallible>>;

/// Lifecycle of one bridge. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BridgeState {
    Starting,
    Streaming,
    Draining,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloseReason {
    /// The session hit its maximum lifetime.
    Expired,
    /// The client disconnected or the process is shutting down.
    Cancelled,
    /// The response stream was gone when an event was pushed.
    ClientGone,
    /// The client did not take an event within the flush timeout.
    SlowClient,
    /// A read failed and could not (or could no longer) be retried.
    ReadFailed(ErrorKind),
}

impl From<Termination> for CloseReason {
    fn from(termination: Termination) -> Self {
        match termination {
            Termination::Cancelled => CloseReason::Cancelled,
            Termination::Expired => CloseReason::Expired,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeOutcome {
    pub reason: CloseReason,
    /// Events handed to the client stream.
    pub delivered: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct BridgeConfig {
    pub retry: RetryPolicy,
    /// Longest a single push may wait for room in the outbound buffer.
    pub flush_timeout: Duration,
}

pub struct Bridge {
    attachment: Box<dyn Attachment>,
    session: Session,
    outbound: Outbound,
    config: BridgeConfig,
    state: watch::Sender<BridgeState>,
}

impl Bridge {
    /// Takes ownership of an established attachment. The bridge is the only party that
    /// reads from it and the only party that releases it.
    pub fn new(
        attachment: Box<dyn Attachment>,
        session: Session,
        outbound: Outbound,
        config: BridgeConfig,
        state: watch::Sender<BridgeState>,
    ) -> Self {
        state.send_replace(BridgeState::Starting);
        Self {
            attachment,
            session,
            outbound,
            config,
            state,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Streams until the session ends, then releases the attachment exactly once.
    pub async fn run(mut self) -> BridgeOutcome {
        self.transition(BridgeState::Streaming);
        let (reason, delivered) = self.stream().await;

        self.transition(BridgeState::Draining);
        // Stops anything else still tied to this session.
        self.session.cancel();
        self.attachment.release();

        let Bridge {
            outbound, state, ..
        } = self;
        // Buffered events still reach the client; the stream ends once they are read.
        drop(outbound);
        state.send_replace(BridgeState::Closed);

        BridgeOutcome { reason, delivered }
    }

    fn transition(&self, next: BridgeState) {
        let previous = self.state.send_replace(next);
        debug_assert!(previous < next, "bridge moved from {previous:?} to {next:?}");
        trace!(
            "Session {} bridge {:?} -> {:?}",
            self.session.id(),
            previous,
            next
        );
    }

    async fn stream(&mut self) -> (CloseReason, u64) {
        let mut delivered = 0;
        let mut failures = 0;

        loop {
            let started = Instant::now();
            let read = tokio::select! {
                biased;
                termination = self.session.terminated() => return (termination.into(), delivered),
                read = self.attachment.next(self.session.token()) => read,
            };

            match read {
                Ok(message) => {
                    failures = 0;
                    if let Err(reason) = self.push(event::encode(&message)).await {
                        return (reason, delivered);
                    }
                    delivered += 1;
                }
                Err(e) if e.is_cancelled() => return (CloseReason::Cancelled, delivered),
                Err(e) => {
                    // A read that blocked before failing means the previous retry recovered.
                    if started.elapsed() > self.config.retry.delay() {
                        failures = 0;
                    }
                    let decision = if e.is_retryable() {
                        self.config.retry.should_retry(failures)
                    } else {
                        RetryDecision::DoNotRetry
                    };

                    match decision {
                        RetryDecision::Retry { after } => {
                            failures += 1;
                            warn!(
                                "Session {} read failed (attempt {}/{}), retrying: {e}",
                                self.session.id(),
                                failures,
                                self.config.retry.max_retries()
                            );
                            tokio::select! {
                                biased;
                                termination = self.session.terminated() => {
                                    return (termination.into(), delivered)
                                }
                                _ = tokio::time::sleep(after) => {}
                            }
                        }
                        RetryDecision::DoNotRetry => {
                            error!("Session {} read failed, closing: {e}", self.session.id());
                            return (CloseReason::ReadFailed(e.kind().clone()), delivered);
                        }
                    }
                }
            }
        }
    }

    async fn push(&mut self, event: Event) -> Result<(), CloseReason> {
        tokio::select! {
            biased;
            termination = self.session.terminated() => Err(termination.into()),
            sent = tokio::time::timeout(self.config.flush_timeout, self.outbound.send(Ok(event))) => {
                match sent {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(_)) => Err(CloseReason::ClientGone),
                    Err(_) => {
                        warn!(
                            "Session {} client did not read for {:?}, closing",
                            self.session.id(),
                            self.config.flush_timeout
                        );
                        Err(CloseReason::SlowClient)
                    }
                }
            }
        }
    }
}
