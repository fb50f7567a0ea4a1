// Core architecture components
mod config;
mod error;
mod facade;
mod fields;
mod protocol;
mod verifier;

// Parsing and hashing stages
pub mod canonical;
pub mod codec;
pub mod pool;
pub mod signature;
pub mod tokenizer;

// Metrics (optional feature)
#[cfg(feature = "metrics")]
pub mod metrics;

// Core components exports
pub use config::{ConfigPreset, SignConfig};
pub use error::{FailureKind, SignError};
pub use facade::{default_verifier, init_data, launch_params, payment};
pub use fields::{FieldSink, ParsedParams};
pub use protocol::{Protocol, ProtocolRules};
pub use verifier::{SecretSource, SingleSecret, Verification, Verifier};

// Stage exports
pub use canonical::CanonicalFormat;
pub use pool::{KeySchedule, PoolStats};
pub use signature::{DigestAlgorithm, SignatureEncoding};
pub use tokenizer::MalformedPolicy;

// Metrics exports (optional feature)
#[cfg(feature = "metrics")]
pub use metrics::{
    ErrorMetrics, InMemoryMetricsCollector, MetricEvent, MetricsCollector, NoOpMetricsCollector,
    PerformanceMetrics, ProtocolMetrics, SignMetrics,
};
