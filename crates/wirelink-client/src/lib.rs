//! Dialer role: establishes and maintains one outbound session.

pub mod dialer;

pub use dialer::Dialer;
