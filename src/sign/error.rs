use thiserror::Error;

/// Error types that can occur while verifying signed launch parameters.
///
/// These errors are internal diagnostics. The public verification entry
/// points collapse every variant into a single invalid outcome so that a
/// caller forwarding the result cannot be used as a validation oracle; the
/// cause is only emitted through `tracing` and [`FailureKind`].
///
/// # Error Categories
///
/// - **Caller Errors**: `Configuration`
/// - **Input Errors**: `MalformedInput`, `MissingField`, `UnknownPrincipal`
/// - **Signature Errors**: `SignatureFormat`, `SignatureMismatch`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    /// No secret (or an empty secret map) was supplied.
    ///
    /// Checked before the query is examined at all.
    #[error("No secret configured")]
    Configuration,

    /// The query could not be tokenized or percent-decoded.
    ///
    /// # When This Occurs
    ///
    /// - A `%` is not followed by two hex digits
    /// - A token has no `=` and the protocol rejects such tokens
    #[error("Malformed input: {0}")]
    MalformedInput(&'static str),

    /// A required field (signature or application id) is absent or empty.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The application id does not map to any known secret.
    #[error("Unknown application id")]
    UnknownPrincipal,

    /// The supplied signature has the wrong length or alphabet.
    #[error("Signature format error")]
    SignatureFormat,

    /// The computed digest does not match the supplied signature.
    #[error("Signature mismatch")]
    SignatureMismatch,
}

impl SignError {
    /// Returns the coarse category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            SignError::Configuration => FailureKind::Configuration,
            SignError::MalformedInput(_) => FailureKind::MalformedInput,
            SignError::MissingField(_) => FailureKind::MissingField,
            SignError::UnknownPrincipal => FailureKind::UnknownPrincipal,
            SignError::SignatureFormat => FailureKind::SignatureFormat,
            SignError::SignatureMismatch => FailureKind::SignatureMismatch,
        }
    }
}

/// Coarse failure category kept on a failed [`Verification`](crate::Verification).
///
/// Intended for server-side logging and metrics only. Do not echo it back to
/// the client that sent the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Configuration,
    MalformedInput,
    MissingField,
    UnknownPrincipal,
    SignatureFormat,
    SignatureMismatch,
}

impl FailureKind {
    /// Short stable identifier, suitable as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Configuration => "configuration",
            FailureKind::MalformedInput => "malformed_input",
            FailureKind::MissingField => "missing_field",
            FailureKind::UnknownPrincipal => "unknown_principal",
            FailureKind::SignatureFormat => "signature_format",
            FailureKind::SignatureMismatch => "signature_mismatch",
        }
    }
}
