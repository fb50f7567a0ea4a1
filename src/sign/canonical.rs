//! Canonical string construction.
//!
//! The canonical string is the exact byte sequence a host platform signs:
//! the parameters sorted by key and joined according to the protocol.

use crate::sign::codec;

/// How sorted pairs are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalFormat {
    /// Byte placed between consecutive `key=value` entries, if any.
    pub separator: Option<u8>,
    /// Whether keys and values are percent-encoded again before joining.
    pub escape: bool,
}

impl CanonicalFormat {
    /// `k1=v1\nk2=v2`
    pub const NEWLINE: Self = Self {
        separator: Some(b'\n'),
        escape: false,
    };

    /// `k1=v1&k2=v2` with RFC 3986 escaping of keys and values.
    pub const ESCAPED_QUERY: Self = Self {
        separator: Some(b'&'),
        escape: true,
    };

    /// `k1=v1k2=v2`
    pub const CONCATENATED: Self = Self {
        separator: None,
        escape: false,
    };
}

/// Stable insertion sort by byte-lexicographic key.
///
/// Pair lists hold tens of entries, where insertion sort beats the general
/// purpose sort and, unlike it, never allocates.
pub(crate) fn sort_by_key<'a, P>(pairs: &mut [P], key: impl Fn(&P) -> &'a [u8]) {
    for i in 1..pairs.len() {
        let mut j = i;
        while j > 0 && key(&pairs[j - 1]) > key(&pairs[j]) {
            pairs.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Sorts `pairs` and writes their canonical form into `out`.
///
/// Pairs whose key equals `exclude_key` are left out. Ties between equal
/// keys keep their original relative order. `out` is appended to, not
/// cleared.
///
/// # Example
///
/// ```rust
/// use launch_sign::canonical::{CanonicalFormat, canonicalize};
///
/// let mut pairs = [
///     (&b"b"[..], &b"2"[..]),
///     (&b"hash"[..], &b"ignored"[..]),
///     (&b"a"[..], &b"x y"[..]),
/// ];
/// let mut out = Vec::new();
/// canonicalize(&mut pairs, b"hash", |p| *p, CanonicalFormat::NEWLINE, &mut out);
/// assert_eq!(out, b"a=x y\nb=2");
///
/// out.clear();
/// canonicalize(&mut pairs, b"hash", |p| *p, CanonicalFormat::ESCAPED_QUERY, &mut out);
/// assert_eq!(out, b"a=x%20y&b=2");
/// ```
pub fn canonicalize<'a, P>(
    pairs: &mut [P],
    exclude_key: &[u8],
    resolve: impl Fn(&P) -> (&'a [u8], &'a [u8]),
    format: CanonicalFormat,
    out: &mut Vec<u8>,
) {
    sort_by_key(pairs, |p| resolve(p).0);

    let mut first = true;
    for pair in pairs.iter() {
        let (key, value) = resolve(pair);
        if key == exclude_key {
            continue;
        }
        if !first {
            if let Some(separator) = format.separator {
                out.push(separator);
            }
        }
        first = false;

        if format.escape {
            codec::percent_encode_into(out, key);
            out.push(b'=');
            codec::percent_encode_into(out, value);
        } else {
            out.extend_from_slice(key);
            out.push(b'=');
            out.extend_from_slice(value);
        }
    }
}
