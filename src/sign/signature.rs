//! Digest computation and constant-time signature comparison.
//!
//! Three signature shapes are supported:
//!
//! - HMAC-SHA256, lowercase hex
//! - HMAC-SHA256, base64 (URL alphabet, no padding)
//! - MD5 over the canonical string with the secret appended, lowercase hex
//!
//! Hex signatures are decoded to raw bytes before comparison, which also
//! validates their shape. Every final comparison goes through
//! [`constant_time_eq`], so its timing does not depend on where the computed
//! and supplied values first differ.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::Mac;
use subtle::ConstantTimeEq;

use crate::sign::codec;
use crate::sign::error::SignError;
use crate::sign::pool::HmacSha256;

/// Length of an HMAC-SHA256 tag in bytes.
pub const SHA256_LEN: usize = 32;

/// Length of an MD5 digest in bytes.
pub const MD5_LEN: usize = 16;

/// Length of a SHA-256 tag in unpadded base64.
pub const SHA256_BASE64_LEN: usize = 43;

/// Hash function behind a protocol's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// Keyed HMAC-SHA256 over the canonical string.
    HmacSha256,
    /// Unkeyed MD5 over the canonical string followed by the secret.
    Md5,
}

/// Text encoding of the supplied signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureEncoding {
    Hex,
    Base64UrlNoPad,
}

/// Compares two byte strings in constant time.
///
/// Slices of different lengths never match; the length itself is public.
pub fn constant_time_eq(computed: &[u8], supplied: &[u8]) -> Result<(), SignError> {
    if computed.len() != supplied.len() {
        return Err(SignError::SignatureMismatch);
    }
    if bool::from(computed.ct_eq(supplied)) {
        Ok(())
    } else {
        Err(SignError::SignatureMismatch)
    }
}

/// Verifies an HMAC-SHA256 signature over `message`.
///
/// The signature shape is validated before anything is hashed. `mac` must
/// be freshly keyed or reset; it is left reset on return.
pub(crate) fn verify_hmac(
    mac: &mut HmacSha256,
    message: &[u8],
    signature: &[u8],
    encoding: SignatureEncoding,
) -> Result<(), SignError> {
    match encoding {
        SignatureEncoding::Hex => {
            let mut supplied = [0u8; SHA256_LEN];
            codec::decode_hex_into(signature, &mut supplied)?;

            mac.update(message);
            let computed = mac.finalize_reset().into_bytes();
            constant_time_eq(&computed, &supplied)
        }
        SignatureEncoding::Base64UrlNoPad => {
            if signature.len() != SHA256_BASE64_LEN {
                return Err(SignError::SignatureFormat);
            }

            mac.update(message);
            let computed = mac.finalize_reset().into_bytes();
            let mut expected = [0u8; SHA256_BASE64_LEN];
            URL_SAFE_NO_PAD
                .encode_slice(computed, &mut expected)
                .map_err(|_| SignError::SignatureFormat)?;
            constant_time_eq(&expected, signature)
        }
    }
}

/// Verifies a hex MD5 signature over `message`, which already ends with the secret.
pub(crate) fn verify_md5(message: &[u8], signature: &[u8]) -> Result<(), SignError> {
    use md5::{Digest, Md5};

    let mut supplied = [0u8; MD5_LEN];
    codec::decode_hex_into(signature, &mut supplied)?;

    let computed = Md5::digest(message);
    constant_time_eq(&computed, &supplied)
}
