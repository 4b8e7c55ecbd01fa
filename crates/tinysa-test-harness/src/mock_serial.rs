//! Mock transport for deterministic testing of the console framer and
//! command gateway.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. On top of the plain request/response queue it can
//! reproduce the awkward parts of a real USB console: responses that trickle
//! in a few bytes at a time, polls that see nothing yet, a link that drops in
//! the middle of an exchange, and an echoing console for demo runs.
//!
//! # Example
//!
//! ```
//! use tinysa_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the framer sends this request, return this response.
//! mock.expect(b"version\r\n", b"version\r\ntinySA4_v1.4\r\nch> ");
//! mock.set_chunk_size(1);
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tinysa_core::error::{Error, Result};
use tinysa_core::transport::Transport;

/// Upper bound on how long an empty `receive()` waits, so polling loops
/// always yield to the runtime without slowing tests down.
const IDLE_WAIT: Duration = Duration::from_millis(1);

/// What the mock does after accepting a request.
#[derive(Debug, Clone)]
enum Reply {
    /// Stream these bytes back.
    Bytes(Vec<u8>),
    /// Accept the write, then fail every read with `ConnectionLost`.
    Drop,
}

/// Shared record of every `send()` made on a [`MockTransport`].
#[derive(Debug, Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<Vec<u8>>>>);

impl SentLog {
    /// Each element is the byte slice from one `send()` call.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn push(&self, data: &[u8]) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data.to_vec());
    }
}

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    reply: Reply,
}

/// A mock [`Transport`] for testing without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation. The
/// corresponding response is then handed out by subsequent `receive()`
/// calls, at most [`set_chunk_size`](Self::set_chunk_size) bytes at a time.
///
/// If no expectation matches or the queue is exhausted, `send()` returns an
/// error, unless console mode is on (see [`console`](Self::console)).
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// Bytes waiting to be read.
    pending: VecDeque<u8>,
    /// Set once a `Reply::Drop` request has been written.
    dropped: bool,
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: SentLog,
    /// Maximum bytes returned per `receive()` call.
    chunk_size: usize,
    /// Idle polls to serve after each send before any data shows up.
    idle_polls: usize,
    idle_remaining: usize,
    /// Fail the next `receive()` with `ConnectionLost`.
    fail_next_receive: bool,
    /// Echo unmatched requests like the instrument console does.
    console: bool,
    console_replies: HashMap<String, Vec<u8>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            pending: VecDeque::new(),
            dropped: false,
            connected: true,
            sent_log: SentLog::default(),
            chunk_size: usize::MAX,
            idle_polls: 0,
            idle_remaining: 0,
            fail_next_receive: false,
            console: false,
            console_replies: HashMap::new(),
        }
    }

    /// Create a mock that behaves like an idle instrument console.
    ///
    /// Every request is echoed back followed by the payload registered with
    /// [`console_reply`](Self::console_reply) (empty if none) and the `ch> `
    /// prompt. Queued expectations still take priority.
    pub fn console() -> Self {
        MockTransport {
            console: true,
            ..Self::new()
        }
    }

    /// Register the payload the console returns for `command`.
    ///
    /// The payload comes back from the framer unchanged.
    pub fn console_reply(&mut self, command: &str, payload: &[u8]) {
        self.console_replies
            .insert(command.to_string(), payload.to_vec());
    }

    /// Add an expected request/response pair.
    ///
    /// When `send()` is called with data matching `request`, subsequent
    /// `receive()` calls will return `response`.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            reply: Reply::Bytes(response.to_vec()),
        });
    }

    /// Expect `request`, accept it, then behave like a device that dropped
    /// off the bus: every later read fails with `ConnectionLost`.
    pub fn expect_disconnect(&mut self, request: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            reply: Reply::Drop,
        });
    }

    /// Cap the number of bytes a single `receive()` returns.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size.max(1);
    }

    /// Report "nothing yet" for the first `polls` reads after every send.
    pub fn set_idle_polls(&mut self, polls: usize) {
        self.idle_polls = polls;
    }

    /// Make the next `receive()` fail with [`Error::ConnectionLost`].
    pub fn fail_next_receive(&mut self) {
        self.fail_next_receive = true;
    }

    /// Return a reference to all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.sent_log.writes()
    }

    /// Number of `send()` calls made so far.
    pub fn write_count(&self) -> usize {
        self.sent_log.count()
    }

    /// A handle on the write log that stays valid after the mock has been
    /// boxed and handed to a framer.
    pub fn sent_log(&self) -> SentLog {
        self.sent_log.clone()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    fn console_response(&self, request: &[u8]) -> Vec<u8> {
        let line = String::from_utf8_lossy(request);
        let name = line.split_whitespace().next().unwrap_or_default();
        let payload = self
            .console_replies
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut out = request.to_vec();
        if !request.ends_with(b"\r\n") {
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(payload);
        out.extend_from_slice(b"\nch> ");
        out
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.sent_log.push(data);

        let reply = match self.expectations.pop_front() {
            Some(expectation) => {
                if data != expectation.request.as_slice() {
                    return Err(Error::Protocol(format!(
                        "unexpected send data: expected {:?}, got {:?}",
                        String::from_utf8_lossy(&expectation.request),
                        String::from_utf8_lossy(data)
                    )));
                }
                expectation.reply
            }
            None if self.console => Reply::Bytes(self.console_response(data)),
            None => {
                return Err(Error::Protocol(
                    "no more expectations in mock transport".into(),
                ));
            }
        };

        match reply {
            Reply::Bytes(bytes) => self.pending.extend(bytes),
            Reply::Drop => self.dropped = true,
        }
        self.idle_remaining = self.idle_polls;
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        if self.fail_next_receive || self.dropped {
            self.fail_next_receive = false;
            return Err(Error::ConnectionLost);
        }

        if self.idle_remaining > 0 || self.pending.is_empty() {
            self.idle_remaining = self.idle_remaining.saturating_sub(1);
            tokio::time::sleep(timeout.min(IDLE_WAIT)).await;
            return Err(Error::Timeout);
        }

        let n = self.pending.len().min(buf.len()).min(self.chunk_size);
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.idle_remaining > 0 || self.dropped {
            return Ok(0);
        }
        Ok(self.pending.len().min(self.chunk_size))
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn basic_send_receive() {
        let mut mock = MockTransport::new();
        let response = b"version\r\ntinySA4_v1.4\r\nch> ";
        mock.expect(b"version\r\n", response);

        mock.send(b"version\r\n").await.unwrap();
        assert_eq!(mock.bytes_available().unwrap(), response.len());

        let mut buf = [0u8; 64];
        let n = mock.receive(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], response);
    }

    #[tokio::test]
    async fn tracks_sent_data() {
        let mut mock = MockTransport::new();
        mock.expect(b"pause\r\n", b"pause\r\nch> ");
        mock.expect(b"resume\r\n", b"resume\r\nch> ");

        mock.send(b"pause\r\n").await.unwrap();
        mock.send(b"resume\r\n").await.unwrap();

        assert_eq!(mock.write_count(), 2);
        assert_eq!(mock.sent_data()[0], b"pause\r\n");
        assert_eq!(mock.sent_data()[1], b"resume\r\n");
        assert_eq!(mock.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn sent_log_survives_boxing() {
        let mut mock = MockTransport::new();
        mock.expect(b"pause\r\n", b"pause\r\nch> ");
        let log = mock.sent_log();

        let mut boxed: Box<dyn Transport> = Box::new(mock);
        boxed.send(b"pause\r\n").await.unwrap();

        assert_eq!(log.count(), 1);
        assert_eq!(log.writes()[0], b"pause\r\n");
    }

    #[tokio::test]
    async fn wrong_data_errors() {
        let mut mock = MockTransport::new();
        mock.expect(b"pause\r\n", b"");

        let result = mock.send(b"resume\r\n").await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
    }

    #[tokio::test]
    async fn no_expectations_errors() {
        let mut mock = MockTransport::new();
        let result = mock.send(b"info\r\n").await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
    }

    #[tokio::test]
    async fn receive_without_send_times_out() {
        let mut mock = MockTransport::new();
        let mut buf = [0u8; 64];
        let result = mock.receive(&mut buf, SHORT).await;
        assert!(matches!(result.unwrap_err(), Error::Timeout));
    }

    #[tokio::test]
    async fn chunked_receive() {
        let mut mock = MockTransport::new();
        mock.expect(b"a\r\n", b"abcd");
        mock.set_chunk_size(3);
        mock.send(b"a\r\n").await.unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(mock.bytes_available().unwrap(), 3);
        let n = mock.receive(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"abc");
        let n = mock.receive(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"d");
        assert_eq!(mock.bytes_available().unwrap(), 0);
    }

    #[tokio::test]
    async fn idle_polls_precede_data() {
        let mut mock = MockTransport::new();
        mock.expect(b"a\r\n", b"xy");
        mock.set_idle_polls(2);
        mock.send(b"a\r\n").await.unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(mock.bytes_available().unwrap(), 0);
        assert!(matches!(
            mock.receive(&mut buf, SHORT).await.unwrap_err(),
            Error::Timeout
        ));
        assert!(matches!(
            mock.receive(&mut buf, SHORT).await.unwrap_err(),
            Error::Timeout
        ));
        let n = mock.receive(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"xy");
    }

    #[tokio::test]
    async fn injected_receive_failure() {
        let mut mock = MockTransport::new();
        mock.expect(b"a\r\n", b"xy");
        mock.send(b"a\r\n").await.unwrap();
        mock.fail_next_receive();

        let mut buf = [0u8; 16];
        assert!(matches!(
            mock.receive(&mut buf, SHORT).await.unwrap_err(),
            Error::ConnectionLost
        ));
        // Only the next read fails.
        let n = mock.receive(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"xy");
    }

    #[tokio::test]
    async fn expect_disconnect_drops_reads() {
        let mut mock = MockTransport::new();
        mock.expect_disconnect(b"reset\r\n");
        mock.send(b"reset\r\n").await.unwrap();

        let mut buf = [0u8; 16];
        assert!(matches!(
            mock.receive(&mut buf, SHORT).await.unwrap_err(),
            Error::ConnectionLost
        ));
        assert!(matches!(
            mock.receive(&mut buf, SHORT).await.unwrap_err(),
            Error::ConnectionLost
        ));
    }

    #[tokio::test]
    async fn console_mode_echoes_with_prompt() {
        let mut mock = MockTransport::console();
        mock.console_reply("version", b"tinySA4_v1.4");

        mock.send(b"version\r\n").await.unwrap();
        let mut buf = [0u8; 64];
        let n = mock.receive(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"version\r\ntinySA4_v1.4\nch> ");

        mock.send(b"pause\r\n").await.unwrap();
        let n = mock.receive(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"pause\r\n\nch> ");
    }

    #[tokio::test]
    async fn disconnect() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.close().await.unwrap();
        assert!(!mock.is_connected());

        let result = mock.send(b"info\r\n").await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));
        assert!(matches!(
            mock.bytes_available().unwrap_err(),
            Error::NotConnected
        ));
    }

    #[tokio::test]
    async fn set_connected() {
        let mut mock = MockTransport::new();
        mock.set_connected(false);

        let mut buf = [0u8; 8];
        let result = mock.receive(&mut buf, SHORT).await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));
    }
}
