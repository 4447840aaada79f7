//! Error taxonomy for session I/O.

use std::time::Duration;

use thiserror::Error;

/// Errors observed while establishing or using a session.
///
/// None of these are process-fatal: connect failures are retried per
/// policy and then reflected in session state, send/receive failures are
/// routed through the session's error observer and surfaced to callers as
/// a no-op or a typed receive outcome.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection refused: {0}")]
    ConnectionRefused(String),
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("send timed out after {0:?}")]
    SendTimeout(Duration),
    #[error("receive timed out after {0:?}")]
    ReceiveTimeout(Duration),
    #[error("handler failed: {0}")]
    Handler(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl SessionError {
    /// Wrap an arbitrary handler failure.
    #[must_use]
    pub fn handler<E: std::fmt::Display>(err: E) -> Self {
        Self::Handler(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SessionError::SendTimeout(Duration::from_secs(3));
        assert_eq!(err.to_string(), "send timed out after 3s");

        let err = SessionError::handler("bad payload");
        assert_eq!(err.to_string(), "handler failed: bad payload");
    }
}
