//! Free functions backed by a process-wide [`Verifier`].
//!
//! The shared verifier is built on first use from [`SignConfig::default`],
//! so the `LAUNCH_SIGN_*` environment variables are read once.

use std::sync::LazyLock;

use crate::sign::config::SignConfig;
use crate::sign::verifier::Verifier;

static DEFAULT: LazyLock<Verifier> = LazyLock::new(|| {
    let config = SignConfig::default();
    tracing::debug!(config = %config.summary(), "initialized default verifier");
    Verifier::with_config(config)
});

/// The verifier behind the free functions.
pub fn default_verifier() -> &'static Verifier {
    &DEFAULT
}

/// Chat-bot mini-app init data (`hash` signature).
pub mod init_data {
    use super::DEFAULT;
    use crate::sign::fields::FieldSink;
    use crate::sign::protocol::Protocol;
    use crate::sign::verifier::{SingleSecret, Verification};

    /// Verifies `raw_query` against `bot_token`.
    ///
    /// ```rust
    /// let result = launch_sign::init_data::verify("auth_date=1&hash=00", "123:token");
    /// assert!(!result.is_valid());
    /// ```
    pub fn verify(raw_query: &str, bot_token: &str) -> Verification {
        DEFAULT.verify_init_data(raw_query, bot_token)
    }

    /// Verifies `raw_query` and feeds the pairs to `sink` if valid.
    pub fn verify_into<F>(raw_query: &str, bot_token: &str, sink: &mut F) -> bool
    where
        F: FieldSink + ?Sized,
    {
        DEFAULT.verify_into(
            Protocol::InitData,
            raw_query,
            &SingleSecret(bot_token.as_bytes()),
            sink,
        )
    }
}

/// Social-network mini-app launch parameters (`sign` signature, keyed by `vk_app_id`).
pub mod launch_params {
    use super::DEFAULT;
    use crate::sign::fields::FieldSink;
    use crate::sign::protocol::Protocol;
    use crate::sign::verifier::{SecretSource, Verification};

    pub fn verify<S>(raw_query: &str, secrets: &S) -> Verification
    where
        S: SecretSource + ?Sized,
    {
        DEFAULT.verify_launch_params(raw_query, secrets)
    }

    pub fn verify_into<S, F>(raw_query: &str, secrets: &S, sink: &mut F) -> bool
    where
        S: SecretSource + ?Sized,
        F: FieldSink + ?Sized,
    {
        DEFAULT.verify_into(Protocol::LaunchParams, raw_query, secrets, sink)
    }
}

/// Payment notifications (`sig` signature, keyed by `app_id`).
pub mod payment {
    use super::DEFAULT;
    use crate::sign::fields::FieldSink;
    use crate::sign::protocol::Protocol;
    use crate::sign::verifier::{SecretSource, Verification};

    pub fn verify<S>(raw_query: &str, secrets: &S) -> Verification
    where
        S: SecretSource + ?Sized,
    {
        DEFAULT.verify_payment(raw_query, secrets)
    }

    pub fn verify_into<S, F>(raw_query: &str, secrets: &S, sink: &mut F) -> bool
    where
        S: SecretSource + ?Sized,
        F: FieldSink + ?Sized,
    {
        DEFAULT.verify_into(Protocol::Payment, raw_query, secrets, sink)
    }
}
