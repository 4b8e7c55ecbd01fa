//! The request/response framer.
//!
//! A [`Framer`] owns the transport and turns one request line into one
//! clean payload. It writes the request, then keeps reading until the first
//! `>` shows up in its accumulation buffer. "No data yet" is the normal state
//! while the instrument is busy sweeping, so per-read timeouts are swallowed;
//! only hard transport faults end the loop early. The whole exchange is
//! bounded by [`FramerConfig::response_timeout`] and can be cancelled with a
//! [`CancellationToken`].
//!
//! A frame only counts when it opens with the echo of the request just
//! written. An exchange that timed out or was cancelled can still be
//! answered later; that late frame is dropped and reading continues, so the
//! next request never receives the previous one's payload.
//!
//! The framer is not safe for overlapping exchanges: the wire format has no
//! correlation IDs. Callers that share one framer put it behind a lock (the
//! command gateway holds it in a `tokio::sync::Mutex`).

use std::time::Duration;

use bytes::BytesMut;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use tinysa_core::error::{Error, Result};
use tinysa_core::transport::Transport;

use crate::protocol::{self, FrameScan};

/// Size of the scratch buffer handed to each `receive()` call.
const READ_CHUNK: usize = 4096;

/// Framer timing and size limits.
#[derive(Debug, Clone)]
pub struct FramerConfig {
    /// Timeout for a single transport read. Expiry only means "no data yet".
    pub read_timeout: Duration,
    /// Upper bound on a whole exchange, `None` to wait forever.
    pub response_timeout: Option<Duration>,
    /// Largest frame accepted before the exchange fails.
    ///
    /// Screen captures are the biggest responses (480x320 RGB565 is about
    /// 300 KiB), so the default leaves a wide margin.
    pub max_frame_len: usize,
}

impl Default for FramerConfig {
    fn default() -> Self {
        FramerConfig {
            read_timeout: Duration::from_secs(1),
            response_timeout: Some(Duration::from_secs(10)),
            max_frame_len: 4 * 1024 * 1024,
        }
    }
}

/// Prompt-delimited request/response engine over a [`Transport`].
pub struct Framer {
    transport: Box<dyn Transport>,
    config: FramerConfig,
    /// Accumulation buffer, reset at the start of every exchange.
    buf: BytesMut,
    chunk: Vec<u8>,
    /// The request of the exchange in progress; frames must echo it.
    request: Vec<u8>,
}

impl Framer {
    /// Create a framer that takes ownership of `transport`.
    pub fn new(transport: Box<dyn Transport>, config: FramerConfig) -> Self {
        Framer {
            transport,
            config,
            buf: BytesMut::new(),
            chunk: vec![0u8; READ_CHUNK],
            request: Vec::new(),
        }
    }

    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    /// Whether the underlying transport reports itself connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Swap in a new transport, returning the old one.
    pub fn replace_transport(&mut self, transport: Box<dyn Transport>) -> Box<dyn Transport> {
        self.buf.clear();
        std::mem::replace(&mut self.transport, transport)
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> Result<()> {
        self.buf.clear();
        self.transport.close().await
    }

    /// Consume the framer and hand back its transport.
    pub fn into_transport(self) -> Box<dyn Transport> {
        self.transport
    }

    /// Run one exchange: write `request`, return the cleaned payload.
    ///
    /// `request` must already carry its CRLF terminator.
    pub async fn send_and_receive(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        self.write_request(request).await?;
        self.read_response(self.config.response_timeout).await
    }

    /// Like [`send_and_receive`](Self::send_and_receive), but gives up with
    /// [`Error::Cancelled`] as soon as `cancel` fires.
    pub async fn send_and_receive_with_cancel(
        &mut self,
        request: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("exchange cancelled");
                Err(Error::Cancelled)
            }

            result = self.send_and_receive(request) => result,
        }
    }

    /// Start an exchange: reset the accumulation buffer, discard stale
    /// input left over from an earlier exchange, and write `request`.
    pub async fn write_request(&mut self, request: &[u8]) -> Result<()> {
        self.buf.clear();
        self.discard_stale_input().await?;
        self.request.clear();
        self.request.extend_from_slice(request);

        trace!(
            bytes = request.len(),
            request = ?String::from_utf8_lossy(request),
            "writing request"
        );
        self.transport.send(request).await
    }

    /// Finish an exchange started with [`write_request`](Self::write_request).
    ///
    /// `limit` bounds the whole read; `None` waits until the prompt shows
    /// up or the transport fails.
    pub async fn read_response(&mut self, limit: Option<Duration>) -> Result<Vec<u8>> {
        let frame = match limit {
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, self.read_frame()).await;
                match outcome {
                    Ok(frame) => frame?,
                    Err(_) => {
                        debug!(
                            timeout_ms = limit.as_millis(),
                            buffered = self.buf.len(),
                            "no prompt before response deadline"
                        );
                        return Err(Error::Timeout);
                    }
                }
            }
            None => self.read_frame().await?,
        };
        Ok(protocol::clean_return(&frame))
    }

    /// Read until the first `>` and return the raw frame through it.
    async fn read_frame(&mut self) -> Result<BytesMut> {
        loop {
            let available = self.transport.bytes_available()?;
            let want = match available {
                0 => self.chunk.len(),
                n => n.min(self.chunk.len()),
            };

            match self
                .transport
                .receive(&mut self.chunk[..want], self.config.read_timeout)
                .await
            {
                Ok(0) => tokio::task::yield_now().await,
                Ok(n) => {
                    self.buf.extend_from_slice(&self.chunk[..n]);

                    while let FrameScan::Complete { len } = protocol::scan_frame(&self.buf) {
                        let frame = self.buf.split_to(len);
                        if !self.request.is_empty()
                            && !protocol::echo_matches(&frame, &self.request)
                        {
                            debug!(
                                frame_len = frame.len(),
                                "dropping frame that answers an earlier request"
                            );
                            continue;
                        }
                        if !self.buf.is_empty() {
                            trace!(discarded = self.buf.len(), "dropping bytes after prompt");
                            self.buf.clear();
                        }
                        debug!(frame_len = frame.len(), "response frame complete");
                        return Ok(frame);
                    }

                    if self.buf.len() > self.config.max_frame_len {
                        warn!(
                            len = self.buf.len(),
                            max = self.config.max_frame_len,
                            "response exceeded frame limit"
                        );
                        self.buf.clear();
                        return Err(Error::Protocol(format!(
                            "response exceeded {} bytes without a prompt",
                            self.config.max_frame_len
                        )));
                    }
                }
                Err(Error::Timeout) => {
                    trace!(buffered = self.buf.len(), "no data yet");
                }
                Err(e) => {
                    warn!(error = %e, "transport read failed");
                    return Err(e);
                }
            }
        }
    }

    /// Drain whatever the device sent after the previous prompt.
    async fn discard_stale_input(&mut self) -> Result<()> {
        let mut discarded = 0usize;
        loop {
            let available = self.transport.bytes_available()?;
            if available == 0 {
                break;
            }
            let want = available.min(self.chunk.len());
            match self
                .transport
                .receive(&mut self.chunk[..want], self.config.read_timeout)
                .await
            {
                Ok(0) | Err(Error::Timeout) => break,
                Ok(n) => discarded += n,
                Err(e) => return Err(e),
            }
        }
        if discarded > 0 {
            debug!(bytes = discarded, "discarded stale input");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinysa_test_harness::MockTransport;

    fn framer(mock: MockTransport) -> Framer {
        let config = FramerConfig {
            read_timeout: Duration::from_millis(5),
            response_timeout: Some(Duration::from_secs(2)),
            ..FramerConfig::default()
        };
        Framer::new(Box::new(mock), config)
    }

    fn synthetic(request: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut out = request.to_vec();
        out.extend_from_slice(payload);
        out.extend_from_slice(b"Xch> ");
        out
    }

    #[tokio::test]
    async fn returns_payload_in_one_chunk() {
        let req = b"info\r\n";
        let mut mock = MockTransport::new();
        mock.expect(req, &synthetic(req, b"tinySA ULTRA\r\nHW Version:V0.4.5.1\r\n"));

        let mut f = framer(mock);
        let payload = f.send_and_receive(req).await.unwrap();
        assert_eq!(payload, b"tinySA ULTRA\r\nHW Version:V0.4.5.1\r\n".to_vec());
    }

    #[tokio::test]
    async fn payload_is_independent_of_chunking() {
        let req = b"data 0\r\n";
        let payload = b"-8.1e+01\r\n-7.9e+01\r\n-:.000000e+01\r\n";
        for chunk in [1, 2, 3, 7, 64] {
            let mut mock = MockTransport::new();
            mock.expect(req, &synthetic(req, payload));
            mock.set_chunk_size(chunk);

            let mut f = framer(mock);
            let got = f.send_and_receive(req).await.unwrap();
            assert_eq!(got, payload.to_vec(), "chunk size {chunk}");
        }
    }

    #[tokio::test]
    async fn idle_polls_do_not_error() {
        let req = b"version\r\n";
        let mut mock = MockTransport::new();
        mock.expect(req, &synthetic(req, b"tinySA4_v1.4-143"));
        mock.set_idle_polls(5);

        let mut f = framer(mock);
        let got = f.send_and_receive(req).await.unwrap();
        assert_eq!(got, b"tinySA4_v1.4-143".to_vec());
    }

    #[tokio::test]
    async fn malformed_tokens_pass_through() {
        let req = b"data 0\r\n";
        let mut mock = MockTransport::new();
        mock.expect(req, &synthetic(req, b"-:.000000e+01\r\n"));

        let mut f = framer(mock);
        assert_eq!(
            f.send_and_receive(req).await.unwrap(),
            b"-:.000000e+01\r\n".to_vec()
        );
    }

    #[tokio::test]
    async fn bytes_after_prompt_are_not_carried_over() {
        let mut mock = MockTransport::new();
        let mut first = synthetic(b"pause\r\n", b"");
        first.extend_from_slice(b"junk");
        mock.expect(b"pause\r\n", &first);
        mock.expect(b"resume\r\n", &synthetic(b"resume\r\n", b"ok"));

        let mut f = framer(mock);
        assert!(f.send_and_receive(b"pause\r\n").await.unwrap().is_empty());
        assert_eq!(f.send_and_receive(b"resume\r\n").await.unwrap(), b"ok".to_vec());
    }

    #[tokio::test]
    async fn late_answer_after_timeout_is_skipped() {
        for chunk in [1, 4, usize::MAX] {
            let mut mock = MockTransport::new();
            mock.expect(b"scan 1 2\r\n", b"scan 1 2\r\n-80.0\r\nch> ");
            mock.expect(b"version\r\n", b"version\r\ntinySA4_v1.4\r\nch> ");
            mock.set_chunk_size(chunk);
            // Keeps the first answer back until after the second write.
            mock.set_idle_polls(40);
            let mut f = framer(mock);

            f.write_request(b"scan 1 2\r\n").await.unwrap();
            let err = f
                .read_response(Some(Duration::from_millis(10)))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Timeout));

            f.write_request(b"version\r\n").await.unwrap();
            let payload = f.read_response(Some(Duration::from_secs(2))).await.unwrap();
            assert_eq!(payload, b"tinySA4_v1.4\r".to_vec(), "chunk size {chunk}");
        }
    }

    #[tokio::test]
    async fn late_answer_after_cancel_is_skipped() {
        let mut mock = MockTransport::new();
        mock.expect(b"sweep\r\n", &synthetic(b"sweep\r\n", b"start 0"));
        mock.expect(b"info\r\n", &synthetic(b"info\r\n", b"ok"));
        mock.set_idle_polls(40);
        let mut f = framer(mock);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });
        let err = f
            .send_and_receive_with_cancel(b"sweep\r\n", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));

        assert_eq!(f.send_and_receive(b"info\r\n").await.unwrap(), b"ok".to_vec());
    }

    #[tokio::test]
    async fn transport_error_is_not_retried() {
        let req = b"info\r\n";
        let mut mock = MockTransport::new();
        mock.expect(req, &synthetic(req, b"x"));
        mock.fail_next_receive();

        let mut f = framer(mock);
        let err = f.send_and_receive(req).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionLost));
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let mut mock = MockTransport::new();
        mock.set_connected(false);

        let mut f = framer(mock);
        let err = f.send_and_receive(b"info\r\n").await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn missing_prompt_hits_response_deadline() {
        let req = b"scan 1 2\r\n";
        let mut mock = MockTransport::new();
        mock.expect(req, b"scan 1 2\r\n-80.0\r\n");

        let config = FramerConfig {
            read_timeout: Duration::from_millis(5),
            response_timeout: Some(Duration::from_millis(50)),
            ..FramerConfig::default()
        };
        let mut f = Framer::new(Box::new(mock), config);
        let err = f.send_and_receive(req).await.unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[tokio::test]
    async fn cancellation_ends_a_hung_exchange() {
        let req = b"sweep\r\n";
        let mut mock = MockTransport::new();
        mock.expect(req, b"sweep\r\n");

        let config = FramerConfig {
            read_timeout: Duration::from_millis(5),
            response_timeout: None,
            ..FramerConfig::default()
        };
        let mut f = Framer::new(Box::new(mock), config);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let err = f.send_and_receive_with_cancel(req, &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn oversized_frame_is_a_protocol_error() {
        let req = b"capture\r\n";
        let mut response = req.to_vec();
        response.extend(std::iter::repeat_n(0u8, 64));
        let mut mock = MockTransport::new();
        mock.expect(req, &response);

        let config = FramerConfig {
            read_timeout: Duration::from_millis(5),
            response_timeout: Some(Duration::from_secs(1)),
            max_frame_len: 32,
        };
        let mut f = Framer::new(Box::new(mock), config);
        let err = f.send_and_receive(req).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn replace_transport_swaps_link() {
        let mut dead = MockTransport::new();
        dead.set_connected(false);
        let mut f = framer(dead);
        assert!(!f.is_connected());

        let mut fresh = MockTransport::new();
        fresh.expect(b"info\r\n", &synthetic(b"info\r\n", b"ok"));
        let old = f.replace_transport(Box::new(fresh));
        assert!(!old.is_connected());
        assert!(f.is_connected());
        assert_eq!(f.send_and_receive(b"info\r\n").await.unwrap(), b"ok".to_vec());
    }
}
