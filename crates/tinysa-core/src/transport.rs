//! Transport trait for instrument communication.
//!
//! The [`Transport`] trait abstracts over the physical link to the analyzer.
//! The serial implementation lives in `tinysa-transport`; a scripted mock
//! for tests lives in `tinysa-test-harness`.
//!
//! The console framer in `tinysa-console` operates on a `Transport` rather
//! than directly on a serial port, so prompt detection and echo stripping
//! can be tested deterministically without hardware.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level duplex channel to the instrument.
///
/// Implementations handle buffering and error mapping at the physical layer.
/// Response framing (echo, payload, `ch>` prompt) is handled by the framer
/// that consumes this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the instrument.
    ///
    /// Implementations should wait until all bytes have been handed to the
    /// underlying link (serial TX buffer).
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the instrument into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Waits up to `timeout` for
    /// data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing arrived within the deadline. A timeout here only means "no
    /// data yet" to the framer.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Number of bytes that can be read right now without waiting.
    ///
    /// This never blocks. A return of `0` is normal while the instrument is
    /// still producing its response.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
