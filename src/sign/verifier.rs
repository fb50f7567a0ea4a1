//! The verification entry point.
//!
//! [`Verifier`] tokenizes a raw query, resolves the secret, builds the
//! canonical string and compares signatures, all driven by the protocol's
//! [`ProtocolRules`]. Every failure collapses into an invalid
//! [`Verification`].

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
#[cfg(feature = "metrics")]
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::sign::canonical;
use crate::sign::config::SignConfig;
use crate::sign::error::{FailureKind, SignError};
use crate::sign::fields::{FieldSink, ParsedParams};
use crate::sign::pool::{BufferPools, MacPools, PoolStats};
use crate::sign::protocol::{Protocol, ProtocolRules};
use crate::sign::signature::{self, DigestAlgorithm};
use crate::sign::tokenizer::{self, Pair, Span, Tokenizer};

#[cfg(feature = "metrics")]
use crate::sign::metrics::{MetricEvent, MetricsCollector, NoOpMetricsCollector};

/// Where the verifier finds the secret for a query.
///
/// Multi-tenant protocols look the secret up by the application id found in
/// the query; single-secret protocols ignore the id.
pub trait SecretSource {
    /// `true` if no secret could ever be returned.
    fn is_empty(&self) -> bool;

    /// The secret for `principal`, if known.
    fn lookup(&self, principal: &str) -> Option<&[u8]>;
}

/// A single secret used regardless of application id.
#[derive(Debug, Clone, Copy)]
pub struct SingleSecret<'a>(pub &'a [u8]);

impl SecretSource for SingleSecret<'_> {
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn lookup(&self, _principal: &str) -> Option<&[u8]> {
        Some(self.0)
    }
}

impl<S: BuildHasher> SecretSource for HashMap<String, String, S> {
    fn is_empty(&self) -> bool {
        HashMap::is_empty(self)
    }

    fn lookup(&self, principal: &str) -> Option<&[u8]> {
        self.get(principal).map(String::as_bytes)
    }
}

impl SecretSource for BTreeMap<String, String> {
    fn is_empty(&self) -> bool {
        BTreeMap::is_empty(self)
    }

    fn lookup(&self, principal: &str) -> Option<&[u8]> {
        self.get(principal).map(String::as_bytes)
    }
}

/// Outcome of verifying one query.
///
/// Parameters are only available when the signature is valid. The failure
/// category is kept for server-side logging; it must not be returned to the
/// client that sent the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    params: Option<ParsedParams>,
    failure: Option<FailureKind>,
}

impl Verification {
    fn valid(params: ParsedParams) -> Self {
        Self {
            params: Some(params),
            failure: None,
        }
    }

    fn invalid(error: &SignError) -> Self {
        Self {
            params: None,
            failure: Some(error.kind()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.params.is_some()
    }

    /// The verified parameters, or `None` if verification failed.
    pub fn params(&self) -> Option<&ParsedParams> {
        self.params.as_ref()
    }

    pub fn into_params(self) -> Option<ParsedParams> {
        self.params
    }

    /// Why verification failed, for diagnostics only.
    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }
}

/// Signature verifier for all supported protocols.
///
/// A verifier owns the pools its calls borrow from. It is `Send + Sync` and
/// meant to be created once and shared (for example in an `Arc` or a
/// `static`); the free functions in [`init_data`](crate::init_data),
/// [`launch_params`](crate::launch_params) and [`payment`](crate::payment)
/// use a process-wide instance.
///
/// # Example
///
/// ```rust
/// use launch_sign::Verifier;
/// use std::collections::HashMap;
///
/// let verifier = Verifier::new();
/// let secrets = HashMap::from([("52333469".to_string(), "5STCdDl55VezBzYt0AUA".to_string())]);
///
/// let query = "app_id=52333469&item=Subscribtion_Item_NoAd30&lang=ru_RU\
///     &notification_type=get_item_test&order_id=2256399&receiver_id=262959639\
///     &user_id=262959639&sig=871447748e3803be83acb30dec37b5e5";
/// let result = verifier.verify_payment(query, &secrets);
/// assert!(result.is_valid());
/// assert_eq!(result.params().unwrap().get("order_id"), Some("2256399"));
/// ```
pub struct Verifier {
    config: SignConfig,
    buffers: BufferPools,
    macs: MacPools,
    #[cfg(feature = "metrics")]
    metrics: Arc<dyn MetricsCollector>,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Verifier {
    /// Creates a verifier sized by [`SignConfig::default`].
    pub fn new() -> Self {
        Self::with_config(SignConfig::default())
    }

    pub fn with_config(config: SignConfig) -> Self {
        for warning in config.validate() {
            tracing::warn!(%warning, "questionable verifier configuration");
        }
        Self {
            buffers: BufferPools::new(&config),
            macs: MacPools::new(&config),
            config,
            #[cfg(feature = "metrics")]
            metrics: Arc::new(NoOpMetricsCollector::new()),
        }
    }

    /// Sets the collector that receives one event per verification.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, collector: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = collector;
        self
    }

    pub fn config(&self) -> &SignConfig {
        &self.config
    }

    /// Current pool occupancy.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats::collect(&self.buffers, &self.macs)
    }

    /// Drops every keyed-hash pool. The next call per secret rebuilds its pool.
    ///
    /// Keyed pools are never evicted on their own; services that verify
    /// against caller-chosen bot tokens can call this periodically to bound
    /// memory.
    pub fn clear_keyed_pools(&self) {
        self.macs.clear();
    }

    /// Verifies chat-bot init data signed with `bot_token`.
    pub fn verify_init_data(&self, raw_query: &str, bot_token: &str) -> Verification {
        self.verify(Protocol::InitData, raw_query, &SingleSecret(bot_token.as_bytes()))
    }

    /// Verifies social-network launch parameters; `secrets` maps `vk_app_id` to secret.
    pub fn verify_launch_params<S>(&self, raw_query: &str, secrets: &S) -> Verification
    where
        S: SecretSource + ?Sized,
    {
        self.verify(Protocol::LaunchParams, raw_query, secrets)
    }

    /// Verifies a payment notification; `secrets` maps `app_id` to secret.
    pub fn verify_payment<S>(&self, raw_query: &str, secrets: &S) -> Verification
    where
        S: SecretSource + ?Sized,
    {
        self.verify(Protocol::Payment, raw_query, secrets)
    }

    /// Verifies `raw_query` under `protocol` and collects the verified pairs.
    ///
    /// The secret comes from `secrets`: multi-tenant protocols look it up by
    /// the application id in the query. [`Protocol::InitData`] has no id and
    /// asks for the secret under the empty key, which a [`SingleSecret`]
    /// always answers but an id map normally does not; such calls fail with
    /// [`FailureKind::Configuration`]. Prefer
    /// [`verify_init_data`](Self::verify_init_data) for that protocol.
    pub fn verify<S>(&self, protocol: Protocol, raw_query: &str, secrets: &S) -> Verification
    where
        S: SecretSource + ?Sized,
    {
        // Empty until the signature has passed; failures allocate nothing here.
        let mut params = ParsedParams::new();
        match self.run(protocol, raw_query, secrets, &mut params) {
            Ok(()) => Verification::valid(params),
            Err(error) => Verification::invalid(&error),
        }
    }

    /// Verifies `raw_query` and, only if valid, feeds every pair to `sink`.
    ///
    /// `sink` receives one `set` call per pair in sorted key order and is not
    /// touched at all when verification fails.
    pub fn verify_into<S, F>(
        &self,
        protocol: Protocol,
        raw_query: &str,
        secrets: &S,
        sink: &mut F,
    ) -> bool
    where
        S: SecretSource + ?Sized,
        F: FieldSink + ?Sized,
    {
        self.run(protocol, raw_query, secrets, sink).is_ok()
    }

    fn run<S, F>(
        &self,
        protocol: Protocol,
        raw_query: &str,
        secrets: &S,
        sink: &mut F,
    ) -> Result<(), SignError>
    where
        S: SecretSource + ?Sized,
        F: FieldSink + ?Sized,
    {
        #[cfg(feature = "metrics")]
        let started = Instant::now();

        let result = self.check(protocol.rules(), raw_query.as_bytes(), secrets, sink);
        if let Err(ref error) = result {
            tracing::debug!(protocol = protocol.as_str(), %error, "launch parameters rejected");
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_event(MetricEvent::Verification {
            protocol,
            duration: started.elapsed(),
            failure: result.as_ref().err().map(SignError::kind),
        });

        result
    }

    fn check<S, F>(
        &self,
        rules: &ProtocolRules,
        input: &[u8],
        secrets: &S,
        sink: &mut F,
    ) -> Result<(), SignError>
    where
        S: SecretSource + ?Sized,
        F: FieldSink + ?Sized,
    {
        if secrets.is_empty() {
            return Err(SignError::Configuration);
        }

        let mut pairs = self.buffers.pairs.acquire();
        let mut scratch = self.buffers.scratch.acquire();
        let fields = collect_pairs(rules, input, &mut pairs, &mut scratch)?;
        let scratch: &[u8] = &scratch;

        let signature = fields
            .signature
            .map(|span| span.resolve(input, scratch))
            .filter(|s| !s.is_empty())
            .ok_or(SignError::MissingField(rules.signature_field))?;

        let secret = match rules.principal_field {
            Some(field) => {
                let principal = fields
                    .principal
                    .map(|span| span.resolve(input, scratch))
                    .filter(|p| !p.is_empty())
                    .ok_or(SignError::MissingField(field))?;
                let principal =
                    std::str::from_utf8(principal).map_err(|_| SignError::UnknownPrincipal)?;
                secrets.lookup(principal).ok_or(SignError::UnknownPrincipal)?
            }
            None => secrets.lookup("").ok_or(SignError::Configuration)?,
        };

        let mut canonical = self.buffers.canonical.acquire();
        canonical::canonicalize(
            &mut pairs[..],
            rules.signature_field.as_bytes(),
            |pair: &Pair| (pair.key.resolve(input, scratch), pair.value.resolve(input, scratch)),
            rules.format,
            &mut canonical,
        );

        match rules.digest {
            DigestAlgorithm::HmacSha256 => {
                let pool = self.macs.pool_for(rules.key_schedule, secret)?;
                let mut mac = pool.acquire();
                signature::verify_hmac(&mut mac, &canonical, signature, rules.encoding)?;
            }
            DigestAlgorithm::Md5 => {
                canonical.extend_from_slice(secret);
                signature::verify_md5(&canonical, signature)?;
            }
        }

        // The signature covers raw bytes; sinks get text, with invalid
        // sequences replaced, and validity is already settled.
        sink.reserve(pairs.len());
        for pair in pairs.iter() {
            let key = String::from_utf8_lossy(pair.key.resolve(input, scratch));
            let value = String::from_utf8_lossy(pair.value.resolve(input, scratch));
            sink.set(&key, &value);
        }

        Ok(())
    }
}

/// Signature and principal spans found while collecting pairs.
#[derive(Debug, Default)]
struct SpecialFields {
    signature: Option<Span>,
    principal: Option<Span>,
}

/// Tokenizes and decodes `input`, pushing every signed pair onto `pairs`.
///
/// The signature pair is set aside and never enters the list. The principal
/// pair is recorded and, being a signed key, also kept. Later occurrences of
/// either field replace earlier ones.
fn collect_pairs(
    rules: &ProtocolRules,
    input: &[u8],
    pairs: &mut Vec<Pair>,
    scratch: &mut Vec<u8>,
) -> Result<SpecialFields, SignError> {
    let mut fields = SpecialFields::default();

    for token in Tokenizer::new(input, rules.malformed) {
        let token = token?;
        let key = tokenizer::decode_span(input, token.key, scratch)?;
        let value = tokenizer::decode_span(input, token.value, scratch)?;
        let key_bytes = key.resolve(input, scratch);

        if key_bytes == rules.signature_field.as_bytes() {
            fields.signature = Some(value);
            continue;
        }
        if rules
            .principal_field
            .is_some_and(|field| key_bytes == field.as_bytes())
        {
            fields.principal = Some(value);
        }
        if rules.is_signed_key(key_bytes) {
            pairs.push(Pair { key, value });
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::config::ConfigPreset;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use hmac::{Hmac, Mac};
    use md5::{Digest, Md5};
    use sha2::Sha256;

    fn hmac(key: &[u8], message: &[u8]) -> Vec<u8> {
        let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }

    fn init_data_hash(bot_token: &str, canonical: &str) -> String {
        let key = hmac(b"WebAppData", bot_token.as_bytes());
        hex::encode(hmac(&key, canonical.as_bytes()))
    }

    fn secrets(id: &str, secret: &str) -> HashMap<String, String> {
        HashMap::from([(id.to_string(), secret.to_string())])
    }

    fn verifier() -> Verifier {
        Verifier::with_config(SignConfig::from(ConfigPreset::Production))
    }

    #[test]
    fn test_init_data_scenario() {
        let hash = init_data_hash("secret", "a=1\nauth_date=1\nb=2");
        let query = format!("a=1&b=2&auth_date=1&hash={hash}");

        let result = verifier().verify_init_data(&query, "secret");
        assert!(result.is_valid());
        let params = result.params().unwrap();
        assert_eq!(
            params.iter().collect::<Vec<_>>(),
            vec![("a", "1"), ("auth_date", "1"), ("b", "2")]
        );
        assert_eq!(params.get("hash"), None);
    }

    #[test]
    fn test_init_data_wrong_token_or_tampering() {
        let hash = init_data_hash("secret", "a=1\nauth_date=1\nb=2");
        let v = verifier();

        let query = format!("a=1&b=2&auth_date=1&hash={hash}");
        let result = v.verify_init_data(&query, "other");
        assert!(!result.is_valid());
        assert_eq!(result.failure(), Some(FailureKind::SignatureMismatch));

        let tampered = format!("a=1&b=3&auth_date=1&hash={hash}");
        assert!(!v.verify_init_data(&tampered, "secret").is_valid());
    }

    #[test]
    fn test_init_data_decodes_before_signing() {
        let user = r#"{"id":1,"first_name":"A B"}"#;
        let hash = init_data_hash("token", &format!("auth_date=7\nuser={user}"));
        let query = format!(
            "user=%7B%22id%22%3A1%2C%22first_name%22%3A%22A+B%22%7D&auth_date=7&hash={hash}"
        );

        let result = verifier().verify_init_data(&query, "token");
        assert!(result.is_valid());
        assert_eq!(result.params().unwrap().get("user"), Some(user));
    }

    #[test]
    fn test_init_data_rejects_token_without_equals() {
        let hash = init_data_hash("secret", "a=1");
        let query = format!("a=1&flag&hash={hash}");

        let result = verifier().verify_init_data(&query, "secret");
        assert_eq!(result.failure(), Some(FailureKind::MalformedInput));
    }

    #[test]
    fn test_failure_order() {
        let v = verifier();
        let empty: HashMap<String, String> = HashMap::new();

        // Empty secrets win over any query problem.
        assert_eq!(
            v.verify_payment("%zz", &empty).failure(),
            Some(FailureKind::Configuration)
        );
        assert_eq!(
            v.verify_init_data("%zz", "").failure(),
            Some(FailureKind::Configuration)
        );

        let map = secrets("1", "S");
        assert_eq!(
            v.verify_payment("app_id=1&x=%4", &map).failure(),
            Some(FailureKind::MalformedInput)
        );
        assert_eq!(
            v.verify_payment("app_id=1&x=1", &map).failure(),
            Some(FailureKind::MissingField)
        );
        assert_eq!(
            v.verify_payment("x=1&sig=00", &map).failure(),
            Some(FailureKind::MissingField)
        );
        assert_eq!(
            v.verify_payment("app_id=2&sig=00", &map).failure(),
            Some(FailureKind::UnknownPrincipal)
        );
        assert_eq!(
            v.verify_payment("app_id=1&sig=00", &map).failure(),
            Some(FailureKind::SignatureFormat)
        );
        assert_eq!(
            v.verify_payment("app_id=1&sig=00000000000000000000000000000000", &map)
                .failure(),
            Some(FailureKind::SignatureMismatch)
        );
        assert_eq!(v.verify_init_data("", "secret").failure(), Some(FailureKind::MissingField));
    }

    #[test]
    fn test_launch_params_scenario() {
        let sign = URL_SAFE_NO_PAD.encode(hmac(b"S", b"vk_app_id=1&vk_user_id=2"));
        let query = format!("vk_app_id=1&vk_user_id=2&sign={sign}");
        let map = secrets("1", "S");
        let v = verifier();

        assert!(v.verify_launch_params(&query, &map).is_valid());

        let changed = format!("vk_app_id=1&vk_user_id=3&sign={sign}");
        assert!(!v.verify_launch_params(&changed, &map).is_valid());
    }

    #[test]
    fn test_launch_params_ignores_unsigned_keys_and_bare_tokens() {
        let sign = URL_SAFE_NO_PAD.encode(hmac(b"S", b"vk_app_id=1&vk_user_id=2"));
        let query = format!("q=1&vk_user_id=2&stray&vk_app_id=1&sign={sign}");

        let result = verifier().verify_launch_params(&query, &secrets("1", "S"));
        assert!(result.is_valid());
        let params = result.into_params().unwrap();
        assert_eq!(params.get("q"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_payment_scenario() {
        let sig = hex::encode(Md5::digest(b"app_id=1user_id=2secret"));
        let query = format!("app_id=1&user_id=2&sig={sig}");
        let map = secrets("1", "secret");
        let v = verifier();

        assert!(v.verify_payment(&query, &map).is_valid());

        let short = format!("app_id=1&user_id=2&sig={}", &sig[..31]);
        assert_eq!(
            v.verify_payment(&short, &map).failure(),
            Some(FailureKind::SignatureFormat)
        );
    }

    #[test]
    fn test_verify_into_only_populates_on_success() {
        let sig = hex::encode(Md5::digest(b"app_id=1b=2a=1secret"));
        let map = secrets("1", "secret");
        let v = verifier();

        let mut seen = Vec::new();
        let ok = v.verify_into(
            Protocol::Payment,
            &format!("b=2&app_id=1&a=1&sig={sig}"),
            &map,
            &mut |k: &str, val: &str| seen.push(format!("{k}={val}")),
        );
        // Signed in query order, not sorted order.
        assert!(!ok);
        assert!(seen.is_empty());

        let sig = hex::encode(Md5::digest(b"a=1app_id=1b=2secret"));
        let ok = v.verify_into(
            Protocol::Payment,
            &format!("b=2&app_id=1&a=1&sig={sig}"),
            &map,
            &mut |k: &str, val: &str| seen.push(format!("{k}={val}")),
        );
        assert!(ok);
        assert_eq!(seen, ["a=1", "app_id=1", "b=2"]);
    }

    #[test]
    fn test_non_utf8_values_keep_a_valid_signature() {
        let sig = hex::encode(Md5::digest(b"app_id=1x=\xffsecret"));
        let query = format!("app_id=1&x=%FF&sig={sig}");

        let result = verifier().verify_payment(&query, &secrets("1", "secret"));
        assert!(result.is_valid());
        assert_eq!(result.params().unwrap().get("x"), Some("\u{FFFD}"));

        let forged = format!("app_id=1&x=%FE&sig={sig}");
        assert_eq!(
            verifier().verify_payment(&forged, &secrets("1", "secret")).failure(),
            Some(FailureKind::SignatureMismatch)
        );
    }

    #[test]
    fn test_empty_segments_reject_init_data() {
        let hash = init_data_hash("secret", "a=1\nb=2");
        let v = verifier();

        assert!(v.verify_init_data(&format!("a=1&b=2&hash={hash}&"), "secret").is_valid());
        for query in [
            format!("a=1&&b=2&hash={hash}"),
            format!("&a=1&b=2&hash={hash}"),
            format!("a=1&b=2&hash={hash}&&"),
        ] {
            assert_eq!(
                v.verify_init_data(&query, "secret").failure(),
                Some(FailureKind::MalformedInput),
                "{query}"
            );
        }
    }

    #[test]
    fn test_generic_init_data_needs_single_secret() {
        let hash = init_data_hash("secret", "a=1");
        let query = format!("a=1&hash={hash}");
        let v = verifier();

        let by_map = v.verify(Protocol::InitData, &query, &secrets("1", "secret"));
        assert_eq!(by_map.failure(), Some(FailureKind::Configuration));
        assert!(v.verify(Protocol::InitData, &query, &SingleSecret(b"secret")).is_valid());
    }

    #[derive(Default)]
    struct Recording {
        reserved: Vec<usize>,
        pairs: usize,
    }

    impl FieldSink for Recording {
        fn set(&mut self, _key: &str, _value: &str) {
            self.pairs += 1;
        }

        fn reserve(&mut self, additional: usize) {
            self.reserved.push(additional);
        }
    }

    #[test]
    fn test_sink_is_sized_only_after_signature_passes() {
        let sig = hex::encode(Md5::digest(b"a=1app_id=1b=2secret"));
        let map = secrets("1", "secret");
        let v = verifier();

        let mut sink = Recording::default();
        let forged = format!("app_id=1&a=1&b=3&sig={sig}");
        assert!(!v.verify_into(Protocol::Payment, &forged, &map, &mut sink));
        assert!(sink.reserved.is_empty());

        let genuine = format!("app_id=1&a=1&b=2&sig={sig}");
        assert!(v.verify_into(Protocol::Payment, &genuine, &map, &mut sink));
        assert_eq!(sink.reserved, [3]);
        assert_eq!(sink.pairs, 3);

        assert!(v.verify(Protocol::Payment, &forged, &map).params().is_none());
    }

    #[test]
    fn test_clearing_keyed_pools() {
        let v = verifier();
        let wrong = format!("a=1&hash={}", "0".repeat(64));
        for token in ["1:a", "2:b", "3:c"] {
            assert!(!v.verify_init_data(&wrong, token).is_valid());
        }
        assert_eq!(v.pool_stats().keyed_secrets, 3);

        v.clear_keyed_pools();
        assert_eq!(v.pool_stats().keyed_secrets, 0);

        let hash = init_data_hash("1:a", "a=1");
        assert!(v.verify_init_data(&format!("a=1&hash={hash}"), "1:a").is_valid());
        assert_eq!(v.pool_stats().keyed_secrets, 1);
    }

    #[test]
    fn test_buffers_return_to_pools() {
        let v = verifier();
        let map = secrets("1", "S");

        // Early failure after all three buffers were borrowed.
        let _ = v.verify_launch_params("vk_app_id=1&sign=short", &map);
        // Early failure before hashing.
        let _ = v.verify_launch_params("vk_app_id=1&x=%g", &map);

        let stats = v.pool_stats();
        assert_eq!(stats.idle_pair_lists, 1);
        assert_eq!(stats.idle_scratch_buffers, 1);
        assert_eq!(stats.idle_canonical_buffers, 1);
    }

    #[test]
    fn test_repeated_calls_are_idempotent() {
        let hash = init_data_hash("secret", "a=x y\nb=%");
        let good = format!("b=%25&a=x+y&hash={hash}");
        let bad = format!("b=%25&a=x+z&hash={hash}");
        let v = verifier();

        for _ in 0..5 {
            assert!(v.verify_init_data(&good, "secret").is_valid());
            assert!(!v.verify_init_data(&bad, "secret").is_valid());
        }
        assert_eq!(v.pool_stats().keyed_secrets, 1);
    }
}
