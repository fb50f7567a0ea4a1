use serde::{Deserialize, Serialize};

/// Predefined pool sizing presets for common deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Balanced defaults sized for typical launch queries.
    ///
    /// - Canonical buffer: 2048 bytes
    /// - Scratch buffer: 256 bytes
    /// - Pair list: 56 entries
    /// - Idle values per pool: 64
    Production,

    /// Small initial buffers and few idle values, for constrained hosts.
    ///
    /// Buffers still grow on demand; only the retained memory is smaller.
    LowMemory,

    /// Larger buffers and deeper pools for many concurrent callers.
    HighThroughput,

    /// Load configuration from environment variables.
    ///
    /// Reads configuration from:
    /// - `LAUNCH_SIGN_CANONICAL_CAPACITY`: canonical buffer capacity in bytes (default: 2048)
    /// - `LAUNCH_SIGN_SCRATCH_CAPACITY`: decode scratch capacity in bytes (default: 256)
    /// - `LAUNCH_SIGN_PAIR_CAPACITY`: pair list capacity (default: 56)
    /// - `LAUNCH_SIGN_MAX_IDLE`: idle values kept per pool (default: 64)
    FromEnv,
}

/// Sizing of the verifier's reusable buffers and pools.
///
/// None of these settings affect verification results; they only trade
/// retained memory against allocations on the hot path.
///
/// # Environment Variables
///
/// `SignConfig::default()` honours the same variables as
/// [`ConfigPreset::FromEnv`].
///
/// # Example
///
/// ```rust
/// use launch_sign::{ConfigPreset, SignConfig};
///
/// let config = SignConfig::from(ConfigPreset::HighThroughput);
/// assert!(config.validate().is_empty());
///
/// let config = SignConfig {
///     max_idle: 8,
///     ..SignConfig::from(ConfigPreset::Production)
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignConfig {
    /// Initial capacity of canonical-string buffers, in bytes
    pub canonical_capacity: usize,
    /// Initial capacity of percent-decoding scratch buffers, in bytes
    pub scratch_capacity: usize,
    /// Initial capacity of pair lists, in pairs
    pub pair_capacity: usize,
    /// Maximum idle values retained by each pool
    pub max_idle: usize,
}

fn env_or(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for SignConfig {
    fn default() -> Self {
        Self {
            canonical_capacity: env_or("LAUNCH_SIGN_CANONICAL_CAPACITY", 2048),
            scratch_capacity: env_or("LAUNCH_SIGN_SCRATCH_CAPACITY", 256),
            pair_capacity: env_or("LAUNCH_SIGN_PAIR_CAPACITY", 56),
            max_idle: env_or("LAUNCH_SIGN_MAX_IDLE", 64),
        }
    }
}

impl SignConfig {
    /// Validates the configuration and returns any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.max_idle == 0 {
            warnings.push("max_idle is 0: pooling is disabled and every call allocates".to_string());
        }
        if self.max_idle > 4096 {
            warnings.push("Very deep pools (> 4096 idle values) retain a lot of memory".to_string());
        }
        if self.canonical_capacity < 256 {
            warnings.push(
                "Small canonical capacity (< 256 bytes) will grow on typical launch queries"
                    .to_string(),
            );
        }
        if self.pair_capacity < 8 {
            warnings.push("Small pair capacity (< 8) will grow on typical launch queries".to_string());
        }
        if self.scratch_capacity > self.canonical_capacity {
            warnings.push(
                "Scratch capacity exceeds canonical capacity; decoded bytes never outgrow the query"
                    .to_string(),
            );
        }

        warnings
    }

    /// Returns a summary of the current configuration.
    pub fn summary(&self) -> String {
        format!(
            "SignConfig {{ canonical: {}B, scratch: {}B, pairs: {}, max idle: {} }}",
            self.canonical_capacity, self.scratch_capacity, self.pair_capacity, self.max_idle,
        )
    }
}

impl From<ConfigPreset> for SignConfig {
    fn from(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Production => Self {
                canonical_capacity: 2048,
                scratch_capacity: 256,
                pair_capacity: 56,
                max_idle: 64,
            },
            ConfigPreset::LowMemory => Self {
                canonical_capacity: 512,
                scratch_capacity: 64,
                pair_capacity: 16,
                max_idle: 8,
            },
            ConfigPreset::HighThroughput => Self {
                canonical_capacity: 4096,
                scratch_capacity: 512,
                pair_capacity: 64,
                max_idle: 512,
            },
            ConfigPreset::FromEnv => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 4] = [
        "LAUNCH_SIGN_CANONICAL_CAPACITY",
        "LAUNCH_SIGN_SCRATCH_CAPACITY",
        "LAUNCH_SIGN_PAIR_CAPACITY",
        "LAUNCH_SIGN_MAX_IDLE",
    ];

    fn clear_env_vars() {
        for var in VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_production_preset() {
        let config = SignConfig::from(ConfigPreset::Production);
        assert_eq!(config.canonical_capacity, 2048);
        assert_eq!(config.scratch_capacity, 256);
        assert_eq!(config.pair_capacity, 56);
        assert_eq!(config.max_idle, 64);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_low_memory_preset() {
        let config = SignConfig::from(ConfigPreset::LowMemory);
        assert_eq!(config.max_idle, 8);
        assert!(config.validate().is_empty());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env_vars();

        unsafe {
            std::env::set_var("LAUNCH_SIGN_CANONICAL_CAPACITY", "1024");
            std::env::set_var("LAUNCH_SIGN_MAX_IDLE", "3");
            std::env::set_var("LAUNCH_SIGN_PAIR_CAPACITY", "not-a-number");
        }

        let config = SignConfig::from(ConfigPreset::FromEnv);
        assert_eq!(config.canonical_capacity, 1024);
        assert_eq!(config.max_idle, 3);
        assert_eq!(config.pair_capacity, 56, "unparsable values fall back");
        assert_eq!(config.scratch_capacity, 256);

        clear_env_vars();
    }

    #[test]
    fn test_validation_warnings() {
        let config = SignConfig {
            canonical_capacity: 64,
            scratch_capacity: 128,
            pair_capacity: 2,
            max_idle: 0,
        };
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("pooling is disabled")));
        assert!(warnings.iter().any(|w| w.contains("Small canonical capacity")));
        assert!(warnings.iter().any(|w| w.contains("Small pair capacity")));
        assert!(warnings.iter().any(|w| w.contains("Scratch capacity exceeds")));
    }

    #[test]
    fn test_summary() {
        let summary = SignConfig::from(ConfigPreset::Production).summary();
        assert_eq!(
            summary,
            "SignConfig { canonical: 2048B, scratch: 256B, pairs: 56, max idle: 64 }"
        );
    }

    #[test]
    #[serial]
    fn test_partial_deserialization_uses_defaults() {
        clear_env_vars();
        let config: SignConfig = serde_json::from_str(r#"{"max_idle": 5}"#).unwrap();
        assert_eq!(config.max_idle, 5);
        assert_eq!(config.canonical_capacity, 2048);
    }
}
