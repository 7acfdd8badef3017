//! Server-Sent Events (SSE) bridge between broker topics and HTTP clients.
//!
//! Every client request for a topic becomes one session: a private broker attachment,
//! a bridge task that pulls messages from it and pushes them to the client, and a
//! lifecycle that guarantees the attachment is released exactly once.
//!
//! # Architecture
//!
//! - **One attachment per session**: Sessions never share broker consumption state,
//!   even when they stream the same topic.
//! - **Single source of termination**: Each session owns a cancellation token (a child
//!   of the process shutdown token) plus a hard deadline. Client disconnect, expiry and
//!   shutdown all end the session through it.
//! - **Bounded output**: Events travel through a bounded channel; a client that stops
//!   reading for longer than the flush timeout ends its session instead of growing memory.
//! - **Forward-only state machine**: `Starting -> Streaming -> Draining -> Closed`.
//!
//! # Message Flow
//!
//! 1. `Manager::open` validates the topic and attaches a consumer (`Starting`).
//!    Failures are returned before any response bytes are written.
//! 2. A bridge task reads one message at a time and pushes it to the client (`Streaming`).
//! 3. On cancellation, expiry, slow client or exhausted retries the bridge releases the
//!    attachment (`Draining`) and drops its end of the channel so buffered events still
//!    flush before the response ends (`Closed`).
//!
//! # Modules
//!
//! - `bridge`: the pull/push loop and its state machine
//! - `event`: wire encoding of broker messages
//! - `manager`: session creation, supervision and shutdown
//! - `registry`: live sessions indexed by id and by topic
//! - `retry`: bounded retry policy for transient read failures
//! - `session`: cancellation scope and deadline of one session

pub mod bridge;
pub mod event;
pub mod manager;
pub mod registry;
pub mod retry;
pub mod session;

pub use bridge::{BridgeState, CloseReason};
pub use manager::{EventStream, Manager, SessionPolicy};
pub use retry::RetryPolicy;
pub use session::SessionId;
