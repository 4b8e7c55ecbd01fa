//! tinysa-test-harness: Test utilities and mock transports for tinysa.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the console framer and command gateway without requiring an analyzer on
//! the bench.

pub mod mock_serial;

pub use mock_serial::{MockTransport, SentLog};
