//! Query-string tokenizer.
//!
//! [`Tokenizer`] walks a raw query once, left to right, yielding the byte
//! ranges of each `key=value` token without copying. Percent-decoding is a
//! separate step ([`decode_span`]) so that plain tokens never touch the
//! scratch arena.

use std::ops::Range;

use crate::sign::codec;
use crate::sign::error::SignError;

/// What to do with a token that has no `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Fail the whole verification.
    Reject,
    /// Ignore the token and keep scanning.
    Skip,
}

/// Byte ranges of one raw (still percent-encoded) `key=value` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub key: Range<usize>,
    pub value: Range<usize>,
}

impl Token {
    /// The raw key bytes within `input`.
    pub fn raw_key<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        &input[self.key.clone()]
    }

    /// The raw value bytes within `input`.
    pub fn raw_value<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        &input[self.value.clone()]
    }
}

/// Lazy, non-allocating iterator over the tokens of a query string.
///
/// Tokens are separated by `&` and split at their first `=`. A single
/// trailing `&` ends the input; any other empty segment (a leading or doubled
/// `&`) counts as a token without `=` and follows the policy. `key=` produces
/// an empty value. After an error the iterator is exhausted.
///
/// # Example
///
/// ```rust
/// use launch_sign::tokenizer::{MalformedPolicy, Tokenizer};
///
/// let raw = b"a=1&flag&b=";
/// let keys: Vec<_> = Tokenizer::new(raw, MalformedPolicy::Skip)
///     .map(|token| token.unwrap().raw_key(raw).to_vec())
///     .collect();
/// assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
///
/// assert!(Tokenizer::new(raw, MalformedPolicy::Reject).any(|token| token.is_err()));
/// ```
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    input: &'a [u8],
    pos: usize,
    policy: MalformedPolicy,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a [u8], policy: MalformedPolicy) -> Self {
        Self {
            input,
            pos: 0,
            policy,
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, SignError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.input.len() {
            let start = self.pos;
            let end = self.input[start..]
                .iter()
                .position(|&b| b == b'&')
                .map_or(self.input.len(), |offset| start + offset);
            self.pos = end + 1;

            match self.input[start..end].iter().position(|&b| b == b'=') {
                Some(offset) => {
                    let eq = start + offset;
                    return Some(Ok(Token {
                        key: start..eq,
                        value: eq + 1..end,
                    }));
                }
                None => match self.policy {
                    MalformedPolicy::Skip => continue,
                    MalformedPolicy::Reject => {
                        self.pos = self.input.len();
                        return Some(Err(SignError::MalformedInput("token without '='")));
                    }
                },
            }
        }
        None
    }
}

/// Location of decoded bytes: inside the raw input or inside the scratch arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Span {
    Input { start: usize, end: usize },
    Scratch { start: usize, end: usize },
}

impl Span {
    #[inline]
    pub(crate) fn resolve<'a>(self, input: &'a [u8], scratch: &'a [u8]) -> &'a [u8] {
        match self {
            Span::Input { start, end } => &input[start..end],
            Span::Scratch { start, end } => &scratch[start..end],
        }
    }
}

/// A decoded key/value pair whose bytes live in the input or the scratch arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pair {
    pub(crate) key: Span,
    pub(crate) value: Span,
}

/// Percent-decodes one raw range of `input`.
///
/// Plain ranges are returned as-is. Escaped ranges are appended to
/// `scratch`, which only grows during a call, so spans handed out earlier
/// stay valid.
pub(crate) fn decode_span(
    input: &[u8],
    range: Range<usize>,
    scratch: &mut Vec<u8>,
) -> Result<Span, SignError> {
    let raw = &input[range.clone()];
    if !codec::needs_decode(raw) {
        return Ok(Span::Input {
            start: range.start,
            end: range.end,
        });
    }

    let start = scratch.len();
    codec::percent_decode_into(raw, scratch)?;
    Ok(Span::Scratch {
        start,
        end: scratch.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8], policy: MalformedPolicy) -> Result<Vec<(Vec<u8>, Vec<u8>)>, SignError> {
        Tokenizer::new(input, policy)
            .map(|token| {
                token.map(|t| (t.raw_key(input).to_vec(), t.raw_value(input).to_vec()))
            })
            .collect()
    }

    fn pair(k: &str, v: &str) -> (Vec<u8>, Vec<u8>) {
        (k.as_bytes().to_vec(), v.as_bytes().to_vec())
    }

    #[test]
    fn test_tokenize_preserves_order() {
        let got = tokens(b"b=2&a=1&c=3", MalformedPolicy::Reject).unwrap();
        assert_eq!(got, vec![pair("b", "2"), pair("a", "1"), pair("c", "3")]);
    }

    #[test]
    fn test_tokenize_empty_values_and_trailing_separator() {
        let got = tokens(b"a=&b=2&", MalformedPolicy::Reject).unwrap();
        assert_eq!(got, vec![pair("a", ""), pair("b", "2")]);

        let got = tokens(b"&&a=1&&", MalformedPolicy::Skip).unwrap();
        assert_eq!(got, vec![pair("a", "1")]);

        assert!(tokens(b"", MalformedPolicy::Reject).unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_splits_on_first_equals() {
        let got = tokens(b"user={\"a\"=1}", MalformedPolicy::Reject).unwrap();
        assert_eq!(got, vec![pair("user", "{\"a\"=1}")]);
    }

    #[test]
    fn test_malformed_policy() {
        let input = b"a=1&broken&b=2";

        let skipped = tokens(input, MalformedPolicy::Skip).unwrap();
        assert_eq!(skipped, vec![pair("a", "1"), pair("b", "2")]);

        let rejected = tokens(input, MalformedPolicy::Reject);
        assert!(matches!(rejected, Err(SignError::MalformedInput(_))));
    }

    #[test]
    fn test_reject_only_tolerates_final_separator() {
        assert!(tokens(b"a=1&", MalformedPolicy::Reject).is_ok());

        for input in [&b"&a=1"[..], b"a=1&&b=2", b"a=1&&", b"&"] {
            assert!(
                matches!(tokens(input, MalformedPolicy::Reject), Err(SignError::MalformedInput(_))),
                "{:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_reject_stops_iteration() {
        let mut it = Tokenizer::new(b"broken&a=1", MalformedPolicy::Reject);
        assert!(matches!(it.next(), Some(Err(_))));
        assert!(it.next().is_none());
    }

    #[test]
    fn test_decode_span_fast_path_and_arena() {
        let input = b"plain=andr%26oid";
        let mut scratch = Vec::new();

        let key = decode_span(input, 0..5, &mut scratch).unwrap();
        assert_eq!(key, Span::Input { start: 0, end: 5 });
        assert!(scratch.is_empty());

        let first = decode_span(input, 6..16, &mut scratch).unwrap();
        let second = decode_span(b"x+y", 0..3, &mut scratch).unwrap();
        assert_eq!(first.resolve(input, &scratch), b"andr&oid");
        assert_eq!(second.resolve(b"x+y", &scratch), b"x y");
    }

    #[test]
    fn test_decode_span_rejects_bad_escape() {
        let mut scratch = Vec::new();
        let result = decode_span(b"a%2", 0..3, &mut scratch);
        assert!(matches!(result, Err(SignError::MalformedInput(_))));
    }
}
