//! # Launch Sign
//!
//! A Rust library for verifying the signed launch parameters that mini-app
//! host platforms hand to an embedded web application.
//!
//! A host passes launch context (user id, platform, language, ...) to the
//! mini-app as a URL query string, signed with a secret shared between the
//! host and the application's backend. Before trusting any of it, the
//! backend must recompute the signature over a canonical form of the
//! parameters and compare it with the one supplied.
//!
//! ## Features
//!
//! - **Three Protocols**: chat-bot init data (`hash`), social-network launch
//!   parameters (`sign`) and payment notifications (`sig`)
//! - **Allocation-Light**: percent-decoding happens only where needed and all
//!   working buffers are pooled across calls
//! - **Keyed-Hash Pooling**: HMAC instances are keyed once per secret and
//!   reused
//! - **Constant-Time Comparison**: signatures are compared with `subtle`
//! - **Oracle-Free Results**: every failure collapses into one invalid
//!   outcome; the cause only reaches `tracing` and server-side diagnostics
//! - **Thread-Safe**: a single [`Verifier`] serves any number of threads
//!
//! ## Quick Start
//!
//! ### Free Functions
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! let secrets = HashMap::from([("6736218".to_string(), "wvl68m4dR1UpLrVRli".to_string())]);
//! let query = "vk_user_id=494075&vk_app_id=6736218&vk_is_app_user=1\
//!     &vk_are_notifications_enabled=1&vk_language=ru&vk_access_token_settings=\
//!     &vk_platform=andr%26oid&sign=gAgvKPEe3wJiC9ZdT16XuZ65_KSH5WkGSeDp_CQofws";
//!
//! let result = launch_sign::launch_params::verify(query, &secrets);
//! assert!(result.is_valid());
//! assert_eq!(result.params().unwrap().get("vk_platform"), Some("andr&oid"));
//! ```
//!
//! ### Populating Your Own Record
//!
//! ```rust
//! use launch_sign::{FieldSink, Protocol, SingleSecret, Verifier};
//!
//! #[derive(Default)]
//! struct Launch {
//!     auth_date: u64,
//!     chat_type: String,
//! }
//!
//! impl FieldSink for Launch {
//!     fn set(&mut self, key: &str, value: &str) {
//!         match key {
//!             "auth_date" => self.auth_date = value.parse().unwrap_or_default(),
//!             "chat_type" => self.chat_type = value.to_string(),
//!             _ => {}
//!         }
//!     }
//! }
//!
//! let verifier = Verifier::new();
//! let mut launch = Launch::default();
//! let valid = verifier.verify_into(
//!     Protocol::InitData,
//!     "auth_date=1&chat_type=private&hash=00",
//!     &SingleSecret(b"123:token"),
//!     &mut launch,
//! );
//! assert!(!valid);
//! assert_eq!(launch.auth_date, 0, "nothing is written unless the signature matches");
//! ```
//!
//! ## Configuration
//!
//! Buffer and pool sizes come from [`SignConfig`], whose `Default` honours
//! these environment variables:
//!
//! ```bash
//! export LAUNCH_SIGN_CANONICAL_CAPACITY=2048
//! export LAUNCH_SIGN_SCRATCH_CAPACITY=256
//! export LAUNCH_SIGN_PAIR_CAPACITY=56
//! export LAUNCH_SIGN_MAX_IDLE=64
//! ```
//!
//! ## Architecture
//!
//! - **[`tokenizer`]**: splits the raw query into `key=value` byte ranges
//! - **[`codec`]**: percent-decoding and re-encoding
//! - **[`canonical`]**: sorts pairs and builds the signed byte string
//! - **[`signature`]**: HMAC-SHA256 / MD5 digests and constant-time comparison
//! - **[`pool`]**: pooled buffers and per-secret keyed-hash pools
//! - **[`Verifier`]**: drives the stages above from a per-[`Protocol`] rule table

pub mod sign;

// Re-export commonly used types
pub use sign::{
    ConfigPreset, FailureKind, FieldSink, ParsedParams, Protocol, SecretSource, SignConfig,
    SignError, SingleSecret, Verification, Verifier,
};
pub use sign::{default_verifier, init_data, launch_params, payment};
pub use sign::{canonical, codec, pool, signature, tokenizer};
pub use sign::PoolStats;

#[cfg(feature = "metrics")]
pub use sign::metrics;
