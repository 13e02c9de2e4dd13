use dotenvy::dotenv;
use std::env;
use std::num::NonZeroU32;

use crate::certification::{CertificationGateConfig, DEFAULT_REQUIRED_CONSECUTIVE};
use crate::error::ConfigError;
use crate::scoring::{
    ScoringConfig, DEFAULT_ACCURACY_TARGET, DEFAULT_MAX_CRITICAL_SEQUENCE_VIOLATIONS,
};

pub const ACCURACY_TARGET_VAR: &str = "SCANNER_SIM_ACCURACY_TARGET";
pub const MAX_CRITICAL_VIOLATIONS_VAR: &str = "SCANNER_SIM_MAX_CRITICAL_VIOLATIONS";
pub const REQUIRED_CONSECUTIVE_VAR: &str = "SCANNER_SIM_REQUIRED_CONSECUTIVE";

/// Scoring and certification thresholds loaded from environment variables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub accuracy_target: f64,
    pub max_critical_sequence_violations: u32,
    pub required_consecutive: NonZeroU32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accuracy_target: DEFAULT_ACCURACY_TARGET,
            max_critical_sequence_violations: DEFAULT_MAX_CRITICAL_SEQUENCE_VIOLATIONS,
            required_consecutive: DEFAULT_REQUIRED_CONSECUTIVE,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from any variable source. Unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let accuracy_target = match lookup(ACCURACY_TARGET_VAR) {
            Some(raw) => parse_accuracy_target(&raw)?,
            None => defaults.accuracy_target,
        };
        let max_critical_sequence_violations = match lookup(MAX_CRITICAL_VIOLATIONS_VAR) {
            Some(raw) => parse_count(MAX_CRITICAL_VIOLATIONS_VAR, &raw)?,
            None => defaults.max_critical_sequence_violations,
        };
        let required_consecutive = match lookup(REQUIRED_CONSECUTIVE_VAR) {
            Some(raw) => parse_threshold(&raw)?,
            None => defaults.required_consecutive,
        };

        let config = Self {
            accuracy_target,
            max_critical_sequence_violations,
            required_consecutive,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that hold however the config was assembled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.accuracy_target) {
            return Err(ConfigError::OutOfRange {
                var: ACCURACY_TARGET_VAR,
                reason: format!("{} is not within 0.0..=1.0", self.accuracy_target),
            });
        }
        Ok(())
    }

    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            accuracy_target: self.accuracy_target,
            max_critical_sequence_violations: self.max_critical_sequence_violations,
        }
    }

    pub fn certification(&self) -> CertificationGateConfig {
        CertificationGateConfig {
            required_consecutive: self.required_consecutive,
            scoring: self.scoring(),
        }
    }
}

fn parse_accuracy_target(raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigError::Malformed {
            var: ACCURACY_TARGET_VAR,
            value: raw.to_string(),
            expected: "number",
        })
}

fn parse_count(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim().parse::<u32>().map_err(|_| ConfigError::Malformed {
        var,
        value: raw.to_string(),
        expected: "non-negative integer",
    })
}

fn parse_threshold(raw: &str) -> Result<NonZeroU32, ConfigError> {
    let count = parse_count(REQUIRED_CONSECUTIVE_VAR, raw)?;
    NonZeroU32::new(count).ok_or_else(|| ConfigError::OutOfRange {
        var: REQUIRED_CONSECUTIVE_VAR,
        reason: "at least one passing session is required".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.scoring(), ScoringConfig::default());
        assert_eq!(config.certification(), CertificationGateConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ACCURACY_TARGET_VAR, "0.9"),
            (MAX_CRITICAL_VIOLATIONS_VAR, " 2 "),
            (REQUIRED_CONSECUTIVE_VAR, "5"),
        ]))
        .unwrap();
        assert_eq!(config.accuracy_target, 0.9);
        assert_eq!(config.max_critical_sequence_violations, 2);
        assert_eq!(config.certification().required_consecutive.get(), 5);
    }

    #[test]
    fn test_malformed_values() {
        let err = EngineConfig::from_lookup(lookup(&[(ACCURACY_TARGET_VAR, "high")])).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { var: ACCURACY_TARGET_VAR, .. }));

        let err =
            EngineConfig::from_lookup(lookup(&[(MAX_CRITICAL_VIOLATIONS_VAR, "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_out_of_range() {
        let err = EngineConfig::from_lookup(lookup(&[(ACCURACY_TARGET_VAR, "1.5")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));

        let err =
            EngineConfig::from_lookup(lookup(&[(REQUIRED_CONSECUTIVE_VAR, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { var: REQUIRED_CONSECUTIVE_VAR, .. }));
    }
}
