use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Unique identifier for a session (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The client went away or the process is shutting down.
    Cancelled,
    /// The session reached its maximum lifetime.
    Expired,
}

/// Cancellation scope and deadline of one client connection.
///
/// The token is a child of the process shutdown token, so shutting down cancels every
/// session while cancelling one session leaves all others alone.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    token: CancellationToken,
    deadline: Instant,
}

impl Session {
    pub fn start(parent: &CancellationToken, max_lifetime: Duration) -> Self {
        Self {
            id: SessionId::new(),
            token: parent.child_token(),
            deadline: Instant::now() + max_lifetime,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels the session when dropped. Owned by the client-facing response stream,
    /// which the HTTP server drops as soon as the client disconnects.
    pub fn disconnect_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves once the session is cancelled or its deadline passes.
    pub async fn terminated(&self) -> Termination {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Termination::Cancelled,
            _ = tokio::time::sleep_until(self.deadline) => Termination::Expired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn session_expires_at_deadline() {
        let shutdown = CancellationToken::new();
        let session = Session::start(&shutdown, Duration::from_secs(3600));

        let started = Instant::now();
        assert_eq!(session.terminated().await, Termination::Expired);
        assert!(started.elapsed() >= Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn dropping_the_guard_cancels_the_session() {
        let shutdown = CancellationToken::new();
        let session = Session::start(&shutdown, Duration::from_secs(3600));

        drop(session.disconnect_guard());

        assert_eq!(session.terminated().await, Termination::Cancelled);
        assert!(!shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn shutdown_cancels_every_session() {
        let shutdown = CancellationToken::new();
        let first = Session::start(&shutdown, Duration::from_secs(3600));
        let second = Session::start(&shutdown, Duration::from_secs(3600));

        shutdown.cancel();

        assert_eq!(first.terminated().await, Termination::Cancelled);
        assert_eq!(second.terminated().await, Termination::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_one_session_leaves_others_running() {
        let shutdown = CancellationToken::new();
        let first = Session::start(&shutdown, Duration::from_secs(3600));
        let second = Session::start(&shutdown, Duration::from_secs(3600));

        first.cancel();

        assert!(first.token().is_cancelled());
        assert!(!second.token().is_cancelled());
        assert_ne!(first.id(), second.id());
    }
}
