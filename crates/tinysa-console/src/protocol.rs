//! Console line protocol: request encoding and response frame cleanup.
//!
//! The analyzer runs an interactive shell on its USB serial port. Every
//! exchange looks like this on the wire:
//!
//! ```text
//! host -> device:  <command> [args...]\r\n
//! device -> host:  <echo of the command line>\r\n
//!                  <payload lines...>
//!                  <one boundary byte>ch>
//! ```
//!
//! There is no length prefix. A frame ends at the first `>` byte in the
//! stream; whatever follows it (normally the space after the prompt) belongs
//! to the idle shell and is thrown away.
//!
//! [`clean_return`] turns one complete frame into the payload by dropping
//! the echoed command line and the trailing prompt. The firmware always puts
//! one extra byte in front of `ch>`, so four bytes are removed, not three.

use bytes::{BufMut, BytesMut};

/// Byte that terminates every response frame.
pub const FRAME_END: u8 = b'>';

/// The shell prompt that closes a response.
pub const PROMPT: &[u8] = b"ch>";

/// Bytes removed from the end of a frame that closes with [`PROMPT`].
pub const PROMPT_STRIP_LEN: usize = 4;

/// Line terminator for requests and echoed lines.
pub const LINE_END: &[u8] = b"\r\n";

/// Result of scanning an accumulation buffer for a frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameScan {
    /// A frame is complete. `len` counts bytes up to and including the `>`.
    Complete { len: usize },
    /// No `>` yet. More data is needed.
    Incomplete,
}

/// Scan `buf` for the first [`FRAME_END`] byte.
///
/// # Example
///
/// ```
/// use tinysa_console::protocol::{scan_frame, FrameScan};
///
/// assert_eq!(scan_frame(b"info\r\n"), FrameScan::Incomplete);
/// assert_eq!(scan_frame(b"info\r\nok\nch> "), FrameScan::Complete { len: 12 });
/// ```
pub fn scan_frame(buf: &[u8]) -> FrameScan {
    match buf.iter().position(|&b| b == FRAME_END) {
        Some(pos) => FrameScan::Complete { len: pos + 1 },
        None => FrameScan::Incomplete,
    }
}

/// Strip the echoed command line and the trailing prompt from a frame.
///
/// Everything up to and including the first CRLF is dropped. If what
/// remains ends with `ch>`, the last four bytes are dropped as well. A frame
/// without a CRLF keeps its leading bytes.
///
/// ```
/// use tinysa_console::protocol::clean_return;
///
/// assert_eq!(clean_return(b"version\r\ntinySA4_v1.4\r\nch>"), b"tinySA4_v1.4\r");
/// assert_eq!(clean_return(b"pause\r\nch>"), b"");
/// ```
pub fn clean_return(frame: &[u8]) -> Vec<u8> {
    let body = match frame.windows(LINE_END.len()).position(|w| w == LINE_END) {
        Some(pos) => &frame[pos + LINE_END.len()..],
        None => frame,
    };

    let body = if body.ends_with(PROMPT) {
        &body[..body.len().saturating_sub(PROMPT_STRIP_LEN)]
    } else {
        body
    };

    body.to_vec()
}

/// Encode a console command line ready for transmission.
///
/// The command name and each argument are separated by single spaces and
/// the line is terminated with CRLF.
///
/// ```
/// use tinysa_console::protocol::encode_command;
///
/// assert_eq!(encode_command("attenuate", &["auto"]), b"attenuate auto\r\n");
/// assert_eq!(encode_command::<&str>("pause", &[]), b"pause\r\n");
/// ```
pub fn encode_command<S: AsRef<str>>(name: &str, args: &[S]) -> Vec<u8> {
    let capacity = name.len()
        + args.iter().map(|a| a.as_ref().len() + 1).sum::<usize>()
        + LINE_END.len();
    let mut buf = BytesMut::with_capacity(capacity);
    buf.put_slice(name.as_bytes());
    for arg in args {
        buf.put_u8(b' ');
        buf.put_slice(arg.as_ref().as_bytes());
    }
    buf.put_slice(LINE_END);
    buf.to_vec()
}

/// Whether `frame` opens with the shell's echo of `request`.
///
/// The echo is everything before the first CRLF. Leading and trailing
/// whitespace is ignored on both sides, since the space that follows a
/// prompt can arrive at the front of the next frame. A frame without a CRLF
/// carries no echo and never matches.
///
/// ```
/// use tinysa_console::protocol::echo_matches;
///
/// assert!(echo_matches(b"version\r\ntinySA4_v1.4\r\nch>", b"version\r\n"));
/// assert!(!echo_matches(b"scan 1 2\r\n-80.0\r\nch>", b"version\r\n"));
/// ```
pub fn echo_matches(frame: &[u8], request: &[u8]) -> bool {
    match frame.windows(LINE_END.len()).position(|w| w == LINE_END) {
        Some(pos) => frame[..pos].trim_ascii() == request.trim_ascii(),
        None => false,
    }
}

/// Whether `text` breaks into several shell lines once trailing line
/// endings are ignored.
pub fn has_embedded_line_break(text: &str) -> bool {
    text.trim_end_matches(['\r', '\n']).contains(['\r', '\n'])
}

/// Encode free-form console text as one request line.
///
/// Any trailing CR/LF already present is replaced by a single CRLF. Line
/// breaks inside `text` are copied as they are and would start a second
/// shell command whose answer nobody reads; check with
/// [`has_embedded_line_break`] first.
pub fn encode_raw(text: &str) -> Vec<u8> {
    let line = text.trim_end_matches(['\r', '\n']);
    let mut buf = BytesMut::with_capacity(line.len() + LINE_END.len());
    buf.put_slice(line.as_bytes());
    buf.put_slice(LINE_END);
    buf.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_incomplete_without_boundary() {
        assert_eq!(scan_frame(b""), FrameScan::Incomplete);
        assert_eq!(scan_frame(b"scan 1 2\r\n-8.0e+01\r\n"), FrameScan::Incomplete);
    }

    #[test]
    fn scan_stops_at_first_boundary() {
        let buf = b"a\r\nX ch> ch> ";
        assert_eq!(scan_frame(buf), FrameScan::Complete { len: 8 });
    }

    #[test]
    fn clean_return_drops_echo_and_prompt() {
        let frame = b"info\r\nline one\r\nline two\r\nch>";
        assert_eq!(clean_return(frame), b"line one\r\nline two\r".to_vec());
    }

    #[test]
    fn clean_return_drops_boundary_byte() {
        let frame = b"freq 100000000\r\nPAYLOADXch>";
        assert_eq!(clean_return(frame), b"PAYLOAD".to_vec());
    }

    #[test]
    fn clean_return_echo_only() {
        assert_eq!(clean_return(b"resume\r\nch>"), Vec::<u8>::new());
    }

    #[test]
    fn clean_return_short_prompt_saturates() {
        // Nothing before the prompt: the strip cannot go below zero.
        assert_eq!(clean_return(b"x\r\nch>"), Vec::<u8>::new());
    }

    #[test]
    fn clean_return_without_prompt_keeps_tail() {
        let frame = b"capture\r\n\x01\x02>";
        assert_eq!(clean_return(frame), b"\x01\x02>".to_vec());
    }

    #[test]
    fn clean_return_without_crlf_keeps_head() {
        assert_eq!(clean_return(b"abc"), b"abc".to_vec());
    }

    #[test]
    fn encode_command_joins_with_spaces() {
        assert_eq!(
            encode_command("scan", &["100000000", "200000000", "290"]),
            b"scan 100000000 200000000 290\r\n".to_vec()
        );
        let owned = vec![String::from("on")];
        assert_eq!(encode_command("lna", &owned), b"lna on\r\n".to_vec());
    }

    #[test]
    fn encode_raw_normalizes_line_end() {
        assert_eq!(encode_raw("nonexistent_cmd"), b"nonexistent_cmd\r\n".to_vec());
        assert_eq!(encode_raw("sweep 1 2\r\n"), b"sweep 1 2\r\n".to_vec());
        assert_eq!(encode_raw("marker 1\n"), b"marker 1\r\n".to_vec());
    }

    #[test]
    fn echo_must_match_request_line() {
        assert!(echo_matches(b"info\r\nok\nch>", b"info\r\n"));
        assert!(echo_matches(b" info\r\nok\nch>", b"info\r\n"));
        assert!(echo_matches(b"\r\nch>", b"\r\n"));
        assert!(!echo_matches(b"info 1\r\nok\nch>", b"info\r\n"));
        assert!(!echo_matches(b" ch>", b"info\r\n"));
    }

    #[test]
    fn embedded_line_breaks() {
        assert!(!has_embedded_line_break("sweep start 100M"));
        assert!(!has_embedded_line_break("sweep start 100M\r\n"));
        assert!(has_embedded_line_break("pause\r\nresume"));
        assert!(has_embedded_line_break("pause\nresume\n"));
    }
}
