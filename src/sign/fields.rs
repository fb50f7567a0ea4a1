//! Handing verified pairs to record builders.

use serde::{Deserialize, Serialize};

/// Receives verified parameters, one call per pair in sorted key order.
///
/// Platform record types implement this to map keys onto typed fields.
/// By convention unknown keys are ignored and values that fail to parse
/// leave the field at its default.
///
/// Closures taking `(&str, &str)` are sinks too:
///
/// ```rust
/// use launch_sign::FieldSink;
///
/// let mut seen = Vec::new();
/// let mut sink = |key: &str, value: &str| seen.push(format!("{key}={value}"));
/// sink.set("a", "1");
/// assert_eq!(seen, ["a=1"]);
/// ```
pub trait FieldSink {
    fn set(&mut self, key: &str, value: &str);

    /// Called once before the first `set` with the number of pairs to come.
    fn reserve(&mut self, _additional: usize) {}
}

impl<F> FieldSink for F
where
    F: FnMut(&str, &str),
{
    fn set(&mut self, key: &str, value: &str) {
        self(key, value)
    }
}

/// Verified parameters in canonical (sorted) order.
///
/// The signature field is never included. Duplicate keys are kept in the
/// order they appeared in the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedParams {
    pairs: Vec<(String, String)>,
}

impl ParsedParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the first value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Replays every pair into another sink, in order.
    pub fn apply_to<S: FieldSink + ?Sized>(&self, sink: &mut S) {
        for (key, value) in self.iter() {
            sink.set(key, value);
        }
    }

    pub fn into_vec(self) -> Vec<(String, String)> {
        self.pairs
    }
}

impl FieldSink for ParsedParams {
    fn set(&mut self, key: &str, value: &str) {
        self.pairs.push((key.to_owned(), value.to_owned()));
    }

    fn reserve(&mut self, additional: usize) {
        self.pairs.reserve_exact(additional);
    }
}
