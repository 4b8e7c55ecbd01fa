//! tinysa-console: framing for the analyzer's prompt-delimited serial shell.
//!
//! [`protocol`] holds the pure wire helpers (request encoding, frame
//! boundary scan, echo and prompt stripping). [`framer`] drives one
//! request/response exchange over a [`Transport`](tinysa_core::Transport).

pub mod framer;
pub mod protocol;

pub use framer::{Framer, FramerConfig};
pub use protocol::{
    FrameScan, clean_return, echo_matches, encode_command, encode_raw, has_embedded_line_break,
    scan_frame,
};
