//! The three supported launch-parameter protocols.
//!
//! Each protocol is a static [`ProtocolRules`] record; the verifier has a
//! single code path driven by these records instead of one hand-written
//! parser per platform.

use serde::{Deserialize, Serialize};

use crate::sign::canonical::CanonicalFormat;
use crate::sign::pool::KeySchedule;
use crate::sign::signature::{DigestAlgorithm, SignatureEncoding};
use crate::sign::tokenizer::MalformedPolicy;

/// A host platform signature protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Chat-bot mini-app init data (`hash`, hex HMAC-SHA256 under a derived key).
    InitData,
    /// Social-network mini-app launch parameters (`sign`, base64url HMAC-SHA256).
    LaunchParams,
    /// Payment notifications (`sig`, hex MD5 with the secret appended).
    Payment,
}

impl Protocol {
    /// All protocols, in declaration order.
    pub const ALL: [Protocol; 3] = [Protocol::InitData, Protocol::LaunchParams, Protocol::Payment];

    /// The verification rules for this protocol.
    pub fn rules(self) -> &'static ProtocolRules {
        match self {
            Protocol::InitData => &INIT_DATA,
            Protocol::LaunchParams => &LAUNCH_PARAMS,
            Protocol::Payment => &PAYMENT,
        }
    }

    /// Short stable identifier, suitable for logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        self.rules().name
    }
}

/// Everything that differs between protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolRules {
    pub name: &'static str,
    /// Query key carrying the signature. Never part of the canonical string.
    pub signature_field: &'static str,
    /// Query key selecting the secret, for multi-tenant protocols.
    pub principal_field: Option<&'static str>,
    /// Only keys with this prefix are signed; others are ignored.
    pub signed_prefix: Option<&'static str>,
    pub format: CanonicalFormat,
    pub digest: DigestAlgorithm,
    pub encoding: SignatureEncoding,
    pub key_schedule: KeySchedule,
    pub malformed: MalformedPolicy,
}

impl ProtocolRules {
    /// Whether a decoded key takes part in the canonical string.
    #[inline]
    pub fn is_signed_key(&self, key: &[u8]) -> bool {
        match self.signed_prefix {
            Some(prefix) => key.starts_with(prefix.as_bytes()),
            None => true,
        }
    }
}

static INIT_DATA: ProtocolRules = ProtocolRules {
    name: "init_data",
    signature_field: "hash",
    principal_field: None,
    signed_prefix: None,
    format: CanonicalFormat::NEWLINE,
    digest: DigestAlgorithm::HmacSha256,
    encoding: SignatureEncoding::Hex,
    key_schedule: KeySchedule::WebAppData,
    malformed: MalformedPolicy::Reject,
};

static LAUNCH_PARAMS: ProtocolRules = ProtocolRules {
    name: "launch_params",
    signature_field: "sign",
    principal_field: Some("vk_app_id"),
    signed_prefix: Some("vk_"),
    format: CanonicalFormat::ESCAPED_QUERY,
    digest: DigestAlgorithm::HmacSha256,
    encoding: SignatureEncoding::Base64UrlNoPad,
    key_schedule: KeySchedule::Raw,
    malformed: MalformedPolicy::Skip,
};

static PAYMENT: ProtocolRules = ProtocolRules {
    name: "payment",
    signature_field: "sig",
    principal_field: Some("app_id"),
    signed_prefix: None,
    format: CanonicalFormat::CONCATENATED,
    digest: DigestAlgorithm::Md5,
    encoding: SignatureEncoding::Hex,
    key_schedule: KeySchedule::Raw,
    malformed: MalformedPolicy::Skip,
};
