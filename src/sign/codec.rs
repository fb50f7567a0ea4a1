//! Byte-level percent-encoding and hex helpers.
//!
//! Everything here works on `&[u8]` and appends into caller-owned buffers so
//! the verification hot path never allocates once its pools are warm.

use std::borrow::Cow;

use crate::sign::error::SignError;

const UPPER_HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Converts an ASCII hex digit into its value (0-15).
#[inline]
pub fn from_hex(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Returns `true` if `src` contains a `%` or `+` and must be decoded.
#[inline]
pub fn needs_decode(src: &[u8]) -> bool {
    src.iter().any(|&b| b == b'%' || b == b'+')
}

/// Percent-decodes `src` (query-string flavour) and appends the result to `dst`.
///
/// `+` becomes a space and `%XX` becomes the byte `0xXX`. A `%` that is not
/// followed by two hex digits is rejected. On error `dst` may contain a
/// partially decoded prefix; callers discard it.
pub fn percent_decode_into(src: &[u8], dst: &mut Vec<u8>) -> Result<(), SignError> {
    let mut i = 0;
    while i < src.len() {
        match src[i] {
            b'%' => {
                let (Some(&hi), Some(&lo)) = (src.get(i + 1), src.get(i + 2)) else {
                    return Err(SignError::MalformedInput("truncated percent escape"));
                };
                let (Some(hi), Some(lo)) = (from_hex(hi), from_hex(lo)) else {
                    return Err(SignError::MalformedInput("invalid percent escape"));
                };
                dst.push((hi << 4) | lo);
                i += 3;
            }
            b'+' => {
                dst.push(b' ');
                i += 1;
            }
            b => {
                dst.push(b);
                i += 1;
            }
        }
    }
    Ok(())
}

/// Percent-decodes `src`, borrowing it unchanged when there is nothing to decode.
///
/// # Example
///
/// ```rust
/// use launch_sign::codec::percent_decode;
/// use std::borrow::Cow;
///
/// assert!(matches!(percent_decode(b"plain").unwrap(), Cow::Borrowed(_)));
/// assert_eq!(percent_decode(b"a%26b+c").unwrap().as_ref(), b"a&b c");
/// assert!(percent_decode(b"100%").is_err());
/// ```
pub fn percent_decode(src: &[u8]) -> Result<Cow<'_, [u8]>, SignError> {
    if !needs_decode(src) {
        return Ok(Cow::Borrowed(src));
    }
    let mut out = Vec::with_capacity(src.len());
    percent_decode_into(src, &mut out)?;
    Ok(Cow::Owned(out))
}

/// Percent-encodes `src` into `dst`, keeping only the RFC 3986 unreserved set.
///
/// Letters, digits, `-`, `_`, `.` and `~` are copied through; every other
/// byte (including space) is written as an upper-case `%XX` escape.
pub fn percent_encode_into(dst: &mut Vec<u8>, src: &[u8]) {
    for &c in src {
        if c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b'.' | b'~') {
            dst.push(c);
        } else {
            dst.extend_from_slice(&[b'%', UPPER_HEX[(c >> 4) as usize], UPPER_HEX[(c & 15) as usize]]);
        }
    }
}

/// Decodes a hex string into a fixed-size buffer.
///
/// The encoded length must be exactly twice `dst.len()`; anything else,
/// including a non-hex character, is a [`SignError::SignatureFormat`].
pub fn decode_hex_into(src: &[u8], dst: &mut [u8]) -> Result<(), SignError> {
    if src.len() != dst.len() * 2 {
        return Err(SignError::SignatureFormat);
    }
    hex::decode_to_slice(src, dst).map_err(|_| SignError::SignatureFormat)
}
