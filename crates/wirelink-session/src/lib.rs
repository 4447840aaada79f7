//! Resilient bidirectional session over a persistent, ordered, full-duplex
//! WebSocket transport.
//!
//! Provides:
//! - `Session` - Connection lifecycle, timeout-bounded I/O, lazy pull
//! - `Recv` - Typed receive outcome (message / timed out / closed / failed)
//! - `Transport` - Object-safe abstraction over both dialed and accepted
//!   WebSocket streams

pub mod session;
pub mod transport;

pub use session::{ConnectionState, ErrorObserver, LogObserver, Recv, Session};
pub use transport::{BoxTransport, HeaderMap, Transport, dial};
