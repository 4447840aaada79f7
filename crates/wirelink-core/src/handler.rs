//! Pluggable inbound-message handlers.

use serde_json::json;

use crate::{Message, SessionError};

/// Maps every inbound message to the reply sent back on the same session.
///
/// Handlers are late-bound: a listener may swap its handler while serving,
/// and the swap takes effect starting with the next inbound message. A
/// returned error terminates that connection's dispatch loop (the listener
/// itself keeps serving).
pub trait MessageHandler: Send + Sync {
    /// Produce the reply for one inbound message.
    ///
    /// # Errors
    /// Returns `SessionError::Handler` when the payload cannot be processed.
    fn handle(&self, message: &Message) -> Result<Message, SessionError>;
}

impl<F> MessageHandler for F
where
    F: Fn(&Message) -> Result<Message, SessionError> + Send + Sync,
{
    fn handle(&self, message: &Message) -> Result<Message, SessionError> {
        self(message)
    }
}

/// Default handler: uppercases the payload and wraps it as
/// `{"processed": <UPPER>}`, encoded as UTF-8 JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl MessageHandler for DefaultHandler {
    fn handle(&self, message: &Message) -> Result<Message, SessionError> {
        let payload = message
            .as_text()
            .ok_or_else(|| SessionError::Handler("payload is not UTF-8".into()))?;

        Ok(Message::Text(
            json!({ "processed": payload.to_uppercase() }).to_string(),
        ))
    }
}
