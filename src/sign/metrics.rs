//! Monitoring and metrics collection for signature verification.
//!
//! This module provides a pluggable metrics system for tracking verification
//! volume, outcome and latency per protocol. Metrics collection is optional
//! and can be enabled via the `metrics` feature.
//!
//! Collectors are called synchronously on the verification path, so
//! implementations should only touch atomics or hand events off to a
//! background channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::sign::error::FailureKind;
use crate::sign::protocol::Protocol;

/// Core metrics tracked by the verifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignMetrics {
    /// Total number of verification attempts
    pub verification_attempts: u64,
    /// Number of successful verifications
    pub verification_successes: u64,
    /// Number of failed verifications
    pub verification_failures: u64,
    /// Attempts broken down by protocol
    pub per_protocol: ProtocolMetrics,
    /// Failures by category
    pub error_counts: ErrorMetrics,
    /// Performance metrics
    pub performance: PerformanceMetrics,
}

/// Attempt counts per protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolMetrics {
    pub init_data: u64,
    pub launch_params: u64,
    pub payment: u64,
}

/// Failure counts by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMetrics {
    pub configuration: u64,
    pub malformed_input: u64,
    pub missing_field: u64,
    pub unknown_principal: u64,
    pub signature_format: u64,
    pub signature_mismatch: u64,
}

/// Performance timing metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerformanceMetrics {
    /// Average time per verification (nanoseconds)
    pub avg_verification_time_ns: u64,
    /// Number of samples used for the average
    pub sample_count: u64,
}

/// Events that can be tracked by the metrics system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricEvent {
    /// A verification call finished
    Verification {
        protocol: Protocol,
        /// Time spent inside the verifier
        duration: Duration,
        /// `None` on success
        failure: Option<FailureKind>,
    },
}

/// Trait for metrics collection backends.
///
/// # Thread Safety
///
/// All methods must be thread-safe as they are called concurrently from
/// every thread that verifies.
pub trait MetricsCollector: Send + Sync {
    /// Record a metric event.
    fn record_event(&self, event: MetricEvent);

    /// Get current metrics snapshot.
    fn get_metrics(&self) -> SignMetrics;

    /// Reset all metrics to zero.
    fn reset_metrics(&self);
}

/// Simple in-memory metrics collector based on atomic counters.
///
/// # Example
///
/// ```rust
/// use launch_sign::metrics::{InMemoryMetricsCollector, MetricEvent, MetricsCollector};
/// use launch_sign::Protocol;
/// use std::time::Duration;
///
/// let collector = InMemoryMetricsCollector::new();
/// collector.record_event(MetricEvent::Verification {
///     protocol: Protocol::Payment,
///     duration: Duration::from_micros(3),
///     failure: None,
/// });
///
/// let metrics = collector.get_metrics();
/// assert_eq!(metrics.verification_successes, 1);
/// assert_eq!(metrics.per_protocol.payment, 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryMetricsCollector {
    verification_attempts: AtomicU64,
    verification_successes: AtomicU64,
    verification_failures: AtomicU64,

    init_data_attempts: AtomicU64,
    launch_params_attempts: AtomicU64,
    payment_attempts: AtomicU64,

    // Error counts
    configuration_errors: AtomicU64,
    malformed_input_errors: AtomicU64,
    missing_field_errors: AtomicU64,
    unknown_principal_errors: AtomicU64,
    signature_format_errors: AtomicU64,
    signature_mismatch_errors: AtomicU64,

    // Performance tracking
    verification_time_total: AtomicU64,
    verification_samples: AtomicU64,
}

impl InMemoryMetricsCollector {
    /// Create a new in-memory metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self) -> [&AtomicU64; 14] {
        [
            &self.verification_attempts,
            &self.verification_successes,
            &self.verification_failures,
            &self.init_data_attempts,
            &self.launch_params_attempts,
            &self.payment_attempts,
            &self.configuration_errors,
            &self.malformed_input_errors,
            &self.missing_field_errors,
            &self.unknown_principal_errors,
            &self.signature_format_errors,
            &self.signature_mismatch_errors,
            &self.verification_time_total,
            &self.verification_samples,
        ]
    }
}

impl MetricsCollector for InMemoryMetricsCollector {
    fn record_event(&self, event: MetricEvent) {
        match event {
            MetricEvent::Verification {
                protocol,
                duration,
                failure,
            } => {
                self.verification_attempts.fetch_add(1, Ordering::Relaxed);
                let per_protocol = match protocol {
                    Protocol::InitData => &self.init_data_attempts,
                    Protocol::LaunchParams => &self.launch_params_attempts,
                    Protocol::Payment => &self.payment_attempts,
                };
                per_protocol.fetch_add(1, Ordering::Relaxed);

                match failure {
                    None => {
                        self.verification_successes.fetch_add(1, Ordering::Relaxed);
                    }
                    Some(kind) => {
                        self.verification_failures.fetch_add(1, Ordering::Relaxed);
                        let errors = match kind {
                            FailureKind::Configuration => &self.configuration_errors,
                            FailureKind::MalformedInput => &self.malformed_input_errors,
                            FailureKind::MissingField => &self.missing_field_errors,
                            FailureKind::UnknownPrincipal => &self.unknown_principal_errors,
                            FailureKind::SignatureFormat => &self.signature_format_errors,
                            FailureKind::SignatureMismatch => &self.signature_mismatch_errors,
                        };
                        errors.fetch_add(1, Ordering::Relaxed);
                    }
                }

                self.verification_time_total.fetch_add(
                    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX),
                    Ordering::Relaxed,
                );
                self.verification_samples.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn get_metrics(&self) -> SignMetrics {
        let samples = self.verification_samples.load(Ordering::Relaxed);

        SignMetrics {
            verification_attempts: self.verification_attempts.load(Ordering::Relaxed),
            verification_successes: self.verification_successes.load(Ordering::Relaxed),
            verification_failures: self.verification_failures.load(Ordering::Relaxed),
            per_protocol: ProtocolMetrics {
                init_data: self.init_data_attempts.load(Ordering::Relaxed),
                launch_params: self.launch_params_attempts.load(Ordering::Relaxed),
                payment: self.payment_attempts.load(Ordering::Relaxed),
            },
            error_counts: ErrorMetrics {
                configuration: self.configuration_errors.load(Ordering::Relaxed),
                malformed_input: self.malformed_input_errors.load(Ordering::Relaxed),
                missing_field: self.missing_field_errors.load(Ordering::Relaxed),
                unknown_principal: self.unknown_principal_errors.load(Ordering::Relaxed),
                signature_format: self.signature_format_errors.load(Ordering::Relaxed),
                signature_mismatch: self.signature_mismatch_errors.load(Ordering::Relaxed),
            },
            performance: PerformanceMetrics {
                avg_verification_time_ns: if samples > 0 {
                    self.verification_time_total.load(Ordering::Relaxed) / samples
                } else {
                    0
                },
                sample_count: samples,
            },
        }
    }

    fn reset_metrics(&self) {
        for counter in self.counters() {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// No-op metrics collector that discards all metrics.
#[derive(Debug, Default)]
pub struct NoOpMetricsCollector;

impl NoOpMetricsCollector {
    /// Create a new no-op metrics collector.
    pub fn new() -> Self {
        Self
    }
}

impl MetricsCollector for NoOpMetricsCollector {
    fn record_event(&self, _event: MetricEvent) {}

    fn get_metrics(&self) -> SignMetrics {
        SignMetrics::default()
    }

    fn reset_metrics(&self) {}
}
