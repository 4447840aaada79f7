//! Outbound session maintenance.

use std::time::Duration;

use tokio::sync::Mutex;

use wirelink_core::{Message, RetryPolicy};
use wirelink_session::{ConnectionState, HeaderMap, Recv, Session};

/// Maintains one outbound [`Session`] to a configured address.
///
/// `start` performs exactly one connect call (which internally retries per
/// policy); the dialer never auto-reconnects after a later disconnect —
/// call `start` again for a fresh session. The inner session sits behind
/// an async mutex so a shared dialer can be driven from several tasks
/// without racing the `(state, handle)` pair across suspension points.
pub struct Dialer {
    target: String,
    headers: Option<HeaderMap>,
    session: Mutex<Session>,
}

impl Dialer {
    /// Create a dialer for `target` (a `ws://host:port` URI).
    #[must_use]
    pub fn new(target: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            target: target.into(),
            headers: None,
            session: Mutex::new(Session::new(retry)),
        }
    }

    /// Attach headers to the initial handshake.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Target address this dialer connects to.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Connect once, retrying internally per the session's policy.
    ///
    /// Exhaustion is not an error here either: the outcome is observable
    /// through [`Self::state`] and the logs.
    pub async fn start(&self) {
        self.session
            .lock()
            .await
            .connect(&self.target, self.headers.as_ref())
            .await;
    }

    /// Disconnect the session. Idempotent.
    pub async fn stop(&self) {
        self.session.lock().await.disconnect().await;
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.session.lock().await.state()
    }

    /// Send one message, optionally bounded by `timeout`.
    pub async fn send(&self, message: Message, timeout: Option<Duration>) {
        self.session.lock().await.send(message, timeout).await;
    }

    /// Receive the next message, optionally bounded by `timeout`.
    ///
    /// Logs the decoded payload when non-empty; purely observability, the
    /// outcome is returned unchanged.
    pub async fn receive(&self, timeout: Option<Duration>) -> Recv {
        let recv = self.session.lock().await.receive(timeout).await;

        if let Recv::Message(message) = &recv {
            if !message.is_empty() {
                tracing::info!(payload = %message, "received from server");
            }
        }

        recv
    }

    /// Lazy pull: the next message, or `None` once the session yields
    /// nothing within one poll or has disconnected.
    pub async fn next_message(&self) -> Option<Message> {
        self.session.lock().await.next_message().await
    }
}
