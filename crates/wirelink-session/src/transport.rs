//! Object-safe transport abstraction over WebSocket streams.
//!
//! Both roles hand their stream to a `Session` behind the same trait: the
//! client side boxes the stream returned by `connect_async`, the server
//! side boxes each stream produced by `accept_async`.

use futures::{Sink, Stream};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

use wirelink_core::Message;

pub use tokio_tungstenite::tungstenite::http::HeaderMap;

/// A full-duplex, ordered frame transport.
///
/// Blanket-implemented for every `WebSocketStream` flavour.
pub trait Transport:
    Stream<Item = Result<WsMessage, WsError>> + Sink<WsMessage, Error = WsError> + Send + Unpin
{
}

impl<T> Transport for T where
    T: Stream<Item = Result<WsMessage, WsError>> + Sink<WsMessage, Error = WsError> + Send + Unpin
{
}

/// Exclusively owned transport handle. Exactly one live handle per session.
pub type BoxTransport = Box<dyn Transport>;

/// Dial a WebSocket endpoint, applying optional handshake headers.
///
/// # Errors
/// Returns the underlying handshake or I/O error; the session's retry loop
/// decides what to do with it.
pub async fn dial(target: &str, headers: Option<&HeaderMap>) -> Result<BoxTransport, WsError> {
    let mut request = target.into_client_request()?;
    if let Some(headers) = headers {
        for (name, value) in headers {
            request.headers_mut().insert(name, value.clone());
        }
    }

    let (stream, _response) = connect_async(request).await?;
    Ok(Box::new(stream))
}

/// Convert a logical message into one outbound frame.
pub(crate) fn into_frame(message: Message) -> WsMessage {
    match message {
        Message::Text(text) => WsMessage::text(text),
        Message::Binary(bytes) => WsMessage::Binary(bytes.into()),
    }
}

/// Convert one inbound data frame into a logical message.
///
/// Control frames have no logical payload and yield `None`.
pub(crate) fn from_frame(frame: WsMessage) -> Option<Message> {
    match frame {
        WsMessage::Text(text) => Some(Message::Text(text.to_string())),
        WsMessage::Binary(bytes) => Some(Message::Binary(bytes.to_vec())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip_text() {
        let frame = into_frame(Message::text("hi"));
        assert_eq!(from_frame(frame), Some(Message::text("hi")));
    }

    #[test]
    fn test_control_frames_have_no_payload() {
        assert_eq!(from_frame(WsMessage::Ping(vec![1].into())), None);
        assert_eq!(from_frame(WsMessage::Pong(vec![].into())), None);
    }
}
