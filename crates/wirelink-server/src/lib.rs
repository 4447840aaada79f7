//! Listener role: accepts inbound sessions on a host:port and dispatches
//! every inbound message through a swappable handler.

pub mod listener;

pub use listener::{Listener, ListenerError};
