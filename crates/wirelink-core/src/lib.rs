//! Core abstractions for wirelink sessions.
//!
//! This crate provides the fundamental building blocks:
//! - `Message` - Opaque text/binary payload, one per transport frame
//! - `RetryPolicy` - Bounded retry count + fixed inter-attempt delay
//! - `MessageHandler` - Pluggable inbound-message mapping
//! - `SessionError` - Error taxonomy shared by both roles

pub mod error;
pub mod handler;
pub mod message;
pub mod retry;

pub use error::SessionError;
pub use handler::{DefaultHandler, MessageHandler};
pub use message::Message;
pub use retry::RetryPolicy;
