//! The session state machine: connect with bounded retry, timeout-bounded
//! send/receive, error observation, lazy pull-based consumption.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Error as WsError;

use wirelink_core::{Message, RetryPolicy, SessionError};

use crate::transport::{self, BoxTransport, HeaderMap};

/// Upper bound on a single dial attempt within the retry loop.
const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval used by the lazy pull (`next_message`).
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Connection lifecycle state, owned exclusively by one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Typed receive outcome.
///
/// Distinguishes "nothing arrived in time" from "peer hung up" — callers
/// no longer need to inspect session state to tell the two apart.
#[derive(Debug)]
pub enum Recv {
    /// One inbound message.
    Message(Message),
    /// The timeout elapsed with no data frame; the session stays connected.
    TimedOut,
    /// The peer closed cleanly, or the session was not connected.
    Closed,
    /// A transport error, already routed through the error observer.
    Failed(SessionError),
}

impl Recv {
    /// The message, if one arrived.
    #[must_use]
    pub fn into_message(self) -> Option<Message> {
        match self {
            Self::Message(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Observes session errors; the polymorphic recovery hook.
///
/// The default observer logs. Roles or application code may install their
/// own to add custom recovery.
pub trait ErrorObserver: Send + Sync {
    fn on_error(&self, error: &SessionError);
}

/// Default observer: logs the error and continues.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ErrorObserver for LogObserver {
    fn on_error(&self, error: &SessionError) {
        tracing::error!(%error, "session error");
    }
}

/// A resilient session over one exclusively owned transport handle.
///
/// Both roles compose a `Session`: the dialer drives `connect`, the
/// listener attaches each accepted stream via `attach`. All failure modes
/// are observe-and-continue — nothing here panics or escalates.
pub struct Session {
    state: ConnectionState,
    transport: Option<BoxTransport>,
    retry: RetryPolicy,
    observer: Arc<dyn ErrorObserver>,
}

enum FrameOutcome {
    Message(Message),
    TimedOut,
    Closed,
    Failed(WsError),
}

impl Session {
    /// Create a disconnected session with the given retry policy.
    #[must_use]
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            transport: None,
            retry,
            observer: Arc::new(LogObserver),
        }
    }

    /// Replace the error observer.
    pub fn set_error_observer(&mut self, observer: Arc<dyn ErrorObserver>) {
        self.observer = observer;
    }

    /// Current connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the session currently holds a live transport.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected)
    }

    /// Retry policy supplied at construction.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Route an error through the observer hook.
    pub fn handle_error(&self, error: &SessionError) {
        self.observer.on_error(error);
    }

    /// Dial `target`, retrying up to the policy's attempt bound with a
    /// fixed delay between attempts.
    ///
    /// Never returns an error: exhaustion leaves the session
    /// `Disconnected`, observable through [`Self::state`] and the logs.
    pub async fn connect(&mut self, target: &str, headers: Option<&HeaderMap>) {
        if self.is_connected() {
            tracing::debug!(url = target, "connect skipped: already connected");
            return;
        }

        self.state = ConnectionState::Connecting;
        let max = self.retry.max_attempts();

        for attempt in 1..=max {
            tracing::info!(url = target, attempt, max, "connecting");

            match tokio::time::timeout(DIAL_TIMEOUT, transport::dial(target, headers)).await {
                Ok(Ok(stream)) => {
                    self.transport = Some(stream);
                    self.state = ConnectionState::Connected;
                    tracing::info!(url = target, attempt, "connected");
                    return;
                }
                Ok(Err(err)) => {
                    let err = classify(&err);
                    tracing::warn!(url = target, attempt, max, %err, "connect attempt failed");
                }
                Err(_) => {
                    let err = SessionError::ConnectTimeout(DIAL_TIMEOUT);
                    tracing::warn!(url = target, attempt, max, %err, "connect attempt failed");
                }
            }

            if attempt < max {
                tokio::time::sleep(self.retry.delay()).await;
            }
        }

        self.state = ConnectionState::Disconnected;
        tracing::warn!(url = target, attempts = max, "failed to connect after maximum retries");
    }

    /// Take ownership of an already-established transport (server role).
    ///
    /// A session holds at most one live handle; any prior handle is closed
    /// first rather than silently overwritten.
    pub async fn attach(&mut self, transport: BoxTransport) {
        if self.transport.is_some() {
            tracing::warn!("attaching over a live transport, closing the old one");
            self.disconnect().await;
        }
        self.transport = Some(transport);
        self.state = ConnectionState::Connected;
    }

    /// Close the transport and return to `Disconnected`. Idempotent.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            // Close errors at teardown carry no information worth acting on.
            let _ = transport.close().await;
            tracing::info!("disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Write one message to the transport, optionally bounded by `timeout`.
    ///
    /// A logged no-op when not connected. A timeout or write failure is
    /// routed through the error observer and swallowed; sends are never
    /// retried.
    pub async fn send(&mut self, message: Message, timeout: Option<Duration>) {
        if !self.is_connected() {
            tracing::warn!("send skipped: not connected");
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        let frame = transport::into_frame(message);
        let written = match timeout {
            Some(bound) => match tokio::time::timeout(bound, transport.send(frame)).await {
                Ok(result) => result,
                Err(_) => {
                    let err = SessionError::SendTimeout(bound);
                    tracing::warn!(%err, "send timed out");
                    self.handle_error(&err);
                    return;
                }
            },
            None => transport.send(frame).await,
        };

        if let Err(ws_err) = written {
            let err = classify(&ws_err);
            self.handle_error(&err);
            self.drop_transport();
        }
    }

    /// Await the next inbound message, optionally bounded by `timeout`.
    ///
    /// Control frames are skipped within the timeout window. A clean peer
    /// close or a transport error transitions the session to
    /// `Disconnected`; errors are routed through the observer before being
    /// returned.
    pub async fn receive(&mut self, timeout: Option<Duration>) -> Recv {
        if !self.is_connected() {
            tracing::debug!("receive skipped: not connected");
            return Recv::Closed;
        }

        let outcome = {
            let Some(transport) = self.transport.as_mut() else {
                return Recv::Closed;
            };
            let deadline = timeout.map(|bound| tokio::time::Instant::now() + bound);

            loop {
                let frame = match deadline {
                    Some(deadline) => {
                        match tokio::time::timeout_at(deadline, transport.next()).await {
                            Ok(frame) => frame,
                            Err(_) => break FrameOutcome::TimedOut,
                        }
                    }
                    None => transport.next().await,
                };

                match frame {
                    Some(Ok(ws_frame)) => {
                        if ws_frame.is_close() {
                            break FrameOutcome::Closed;
                        }
                        if let Some(message) = transport::from_frame(ws_frame) {
                            break FrameOutcome::Message(message);
                        }
                        // Ping/pong keepalive, keep polling.
                    }
                    Some(Err(err)) => break FrameOutcome::Failed(err),
                    None => break FrameOutcome::Closed,
                }
            }
        };

        match outcome {
            FrameOutcome::Message(message) => Recv::Message(message),
            FrameOutcome::TimedOut => {
                if let Some(bound) = timeout {
                    tracing::debug!(err = %SessionError::ReceiveTimeout(bound), "receive timed out");
                }
                Recv::TimedOut
            }
            FrameOutcome::Closed => {
                tracing::info!("connection closed by peer");
                self.drop_transport();
                Recv::Closed
            }
            FrameOutcome::Failed(ws_err) => {
                let err = classify(&ws_err);
                self.handle_error(&err);
                self.drop_transport();
                Recv::Failed(err)
            }
        }
    }

    /// Lazy pull: the next message, polling at [`POLL_INTERVAL`].
    ///
    /// Returns `None` once nothing arrives within one poll, the peer
    /// closes, or the session is disconnected. The resulting sequence is
    /// finite once disconnected and not restartable — a fresh `connect`
    /// (or `attach`) is required to produce more messages.
    pub async fn next_message(&mut self) -> Option<Message> {
        if !self.is_connected() {
            return None;
        }
        self.receive(Some(POLL_INTERVAL)).await.into_message()
    }

    fn drop_transport(&mut self) {
        self.transport = None;
        self.state = ConnectionState::Disconnected;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Map a transport error onto the session error taxonomy.
fn classify(err: &WsError) -> SessionError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => SessionError::ConnectionClosed,
        WsError::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            SessionError::ConnectionRefused(io.to_string())
        }
        other => SessionError::Transport(other.to_string()),
    }
}
