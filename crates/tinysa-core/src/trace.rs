//! Post-processing helpers for trace payloads.
//!
//! The framer returns payload bytes untouched. Applications that want
//! numbers out of `data`, `scan`, `frequencies` or `scanraw` responses use
//! these helpers, choosing their own policy for the malformed tokens the
//! firmware is known to emit.

use crate::error::{Error, Result};

/// Corrupted token prefix seen in streamed scan data (`-:.000000e+01`).
pub const MALFORMED_TOKEN: &[u8] = b"-:.0";

/// Default replacement for [`MALFORMED_TOKEN`]; places the point near the
/// noise floor.
pub const DEFAULT_REPLACEMENT: &[u8] = b"-10.0";

/// Replace every occurrence of [`MALFORMED_TOKEN`] with `replacement`.
///
/// ```
/// use tinysa_core::trace::{repair_malformed_tokens, DEFAULT_REPLACEMENT};
///
/// let fixed = repair_malformed_tokens(b"-:.000000e+01\r\n", DEFAULT_REPLACEMENT);
/// assert_eq!(fixed, b"-10.000000e+01\r\n");
/// ```
pub fn repair_malformed_tokens(payload: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len());
    let mut i = 0;
    while i < payload.len() {
        if payload[i..].starts_with(MALFORMED_TOKEN) {
            out.extend_from_slice(replacement);
            i += MALFORMED_TOKEN.len();
        } else {
            out.push(payload[i]);
            i += 1;
        }
    }
    out
}

/// Parse the first whitespace-separated column of every non-blank line.
///
/// Lines are split on `\n`; a trailing `\r` is ignored.
pub fn parse_values(payload: &[u8]) -> Result<Vec<f64>> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| Error::Protocol(format!("trace payload is not UTF-8: {e}")))?;

    text.lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| Error::Protocol(format!("invalid numeric token: {tok:?}")))
        })
        .collect()
}

/// Parse a `frequencies` response into hertz values.
///
/// Negative or non-finite values are a protocol error.
pub fn parse_frequencies(payload: &[u8]) -> Result<Vec<u64>> {
    parse_values(payload)?
        .into_iter()
        .map(|v| {
            if v.is_finite() && v >= 0.0 && v <= u64::MAX as f64 {
                Ok(v.round() as u64)
            } else {
                Err(Error::Protocol(format!("invalid frequency: {v}")))
            }
        })
        .collect()
}

/// Decode a binary `scanraw` payload into dBm values.
///
/// The payload starts with `{`, followed by `points` records of three bytes
/// each: the marker `x` and a little-endian 16-bit sample. Each sample maps
/// to `sample / 32 - offset_db` dBm. Trailing bytes (the closing `}`) are
/// ignored.
pub fn decode_scanraw(payload: &[u8], points: usize, offset_db: f64) -> Result<Vec<f64>> {
    let body = match payload.split_first() {
        Some((b'{', rest)) => rest,
        _ => {
            return Err(Error::Protocol(
                "scanraw payload does not start with '{'".into(),
            ));
        }
    };

    let needed = points.checked_mul(3).ok_or_else(|| {
        Error::Protocol(format!("scanraw point count {points} is out of range"))
    })?;
    if body.len() < needed {
        return Err(Error::Protocol(format!(
            "scanraw payload too short: {} points need {needed} bytes, got {}",
            points,
            body.len()
        )));
    }

    Ok(body[..needed]
        .chunks_exact(3)
        .map(|rec| {
            let raw = u16::from_le_bytes([rec[1], rec[2]]);
            f64::from(raw) / 32.0 - offset_db
        })
        .collect())
}

/// Evenly spaced sweep frequencies from `start_hz` to `stop_hz` inclusive.
pub fn linear_frequencies(start_hz: u64, stop_hz: u64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start_hz as f64],
        n => {
            let step = (stop_hz as f64 - start_hz as f64) / (n - 1) as f64;
            (0..n).map(|i| start_hz as f64 + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repair_replaces_every_occurrence() {
        let raw = b"-:.000000e+01\r\n-8.5e+01\r\n-:.000000e+01\r\n";
        let fixed = repair_malformed_tokens(raw, DEFAULT_REPLACEMENT);
        assert_eq!(
            fixed,
            b"-10.000000e+01\r\n-8.5e+01\r\n-10.000000e+01\r\n".to_vec()
        );
    }

    #[test]
    fn repair_custom_replacement() {
        let fixed = repair_malformed_tokens(b"-:.0e+01", b"-12.0");
        assert_eq!(fixed, b"-12.0e+01".to_vec());
    }

    #[test]
    fn repair_leaves_clean_payload_alone() {
        let raw = b"1.0\r\n2.0\r\n";
        assert_eq!(repair_malformed_tokens(raw, DEFAULT_REPLACEMENT), raw.to_vec());
    }

    #[test]
    fn parse_values_first_column() {
        let v = parse_values(b"-8.1e+01 0\r\n-7.5e+01 1\r\n\r\n").unwrap();
        assert_eq!(v, vec![-81.0, -75.0]);
    }

    #[test]
    fn parse_values_rejects_malformed_token() {
        let err = parse_values(b"-:.000000e+01\r\n").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn parse_values_after_repair() {
        let fixed = repair_malformed_tokens(b"-:.000000e+01\r\n", DEFAULT_REPLACEMENT);
        let v = parse_values(&fixed).unwrap();
        assert_eq!(v, vec![-100.0]);
    }

    #[test]
    fn parse_frequencies_rounds_to_hz() {
        let f = parse_frequencies(b"100000000\r\n150000000\r\n").unwrap();
        assert_eq!(f, vec![100_000_000, 150_000_000]);
    }

    #[test]
    fn parse_frequencies_rejects_negative() {
        let err = parse_frequencies(b"100000000\r\n-5\r\n").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        let err = parse_frequencies(b"inf\r\n").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn decode_scanraw_absurd_point_count() {
        let err = decode_scanraw(b"{x\x00\x00}", usize::MAX, 174.0).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn decode_scanraw_two_points() {
        // 0x0C80 = 3200 -> 100 - 128 = -28
        // 0x0A00 = 2560 -> 80 - 128 = -48
        let payload = [b'{', b'x', 0x80, 0x0C, b'x', 0x00, 0x0A, b'}'];
        let v = decode_scanraw(&payload, 2, 128.0).unwrap();
        assert_eq!(v, vec![-28.0, -48.0]);
    }

    #[test]
    fn decode_scanraw_missing_brace() {
        let err = decode_scanraw(b"x\x00\x00", 1, 174.0).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn decode_scanraw_too_short() {
        let err = decode_scanraw(b"{x\x00", 1, 174.0).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn linear_frequencies_endpoints() {
        let f = linear_frequencies(100, 200, 3);
        assert_eq!(f, vec![100.0, 150.0, 200.0]);
        assert!(linear_frequencies(1, 2, 0).is_empty());
        assert_eq!(linear_frequencies(5, 9, 1), vec![5.0]);
    }
}
