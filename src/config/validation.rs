//! Configuration validation.
//!
//! Serde handles syntax; this module checks values that parse but make no
//! sense (zero-length windows, thresholds outside `0..=1`, unparsable bind
//! addresses). Every problem is reported, not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{GuardConfig, RateLimitPolicy};

/// Longest window a policy may declare (one year).
pub const MAX_WINDOW_MS: u64 = 365 * 24 * 60 * 60 * 1000;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: window of {window_ms}ms exceeds the {max}ms maximum")]
    WindowTooLong {
        field: &'static str,
        window_ms: u64,
        max: u64,
    },

    #[error("duplicates.similarity_threshold: {0} is outside 0.0..=1.0")]
    ThresholdOutOfRange(f64),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(
        "listener.bind_address",
        &config.listener.bind_address,
        &mut errors,
    );
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.request_timeout_secs",
        });
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_body_bytes",
        });
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "rate_limit.sweep_interval_secs",
        });
    }
    check_policy("rate_limit.api", &rate_limit.api, &mut errors);
    check_policy("rate_limit.submission", &rate_limit.submission, &mut errors);

    let threshold = config.duplicates.similarity_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        errors.push(ValidationError::ThresholdOutOfRange(threshold));
    }

    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_policy(field: &'static str, policy: &RateLimitPolicy, errors: &mut Vec<ValidationError>) {
    if policy.max_requests == 0 {
        errors.push(ValidationError::Zero { field });
    }
    if policy.window_ms == 0 {
        errors.push(ValidationError::Zero { field });
    } else if policy.window_ms > MAX_WINDOW_MS {
        errors.push(ValidationError::WindowTooLong {
            field,
            window_ms: policy.window_ms,
            max: MAX_WINDOW_MS,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GuardConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GuardConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.rate_limit.api = RateLimitPolicy::new(0, 0);
        config.duplicates.similarity_threshold = 1.5;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ThresholdOutOfRange(1.5)));
        assert!(errors.contains(&ValidationError::Zero {
            field: "rate_limit.api"
        }));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = GuardConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_window_upper_bound() {
        let mut config = GuardConfig::default();
        config.rate_limit.submission = RateLimitPolicy::new(1, MAX_WINDOW_MS + 1);
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::WindowTooLong { .. }));
    }
}
