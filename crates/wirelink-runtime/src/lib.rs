//! Runtime harness for wirelink roles.
//!
//! Owns what the session abstraction deliberately does not: OS signal
//! wiring, orderly shutdown across roles, and configuration loading.

pub mod config;
pub mod harness;
pub mod shutdown;

pub use config::LinkConfig;
pub use harness::{Harness, HarnessError, Role};
pub use shutdown::ShutdownCoordinator;
