//! Trace sampling: which iterations get full diagnostic capture.
//!
//! The policy is consulted with the 0-based loop index once per iteration.

use crate::config::{ConfigError, TraceSamplingConfig};

/// A validated sampling function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingPolicy {
    /// Sample when `i % k == 0`.
    Every(u64),
    /// Sample when `i == floor(log_base(i))`. Never samples `i == 0`.
    Log(u64),
}

impl SamplingPolicy {
    /// Function name for [`SamplingPolicy::Every`].
    pub const EVERY: &'static str = "every";
    /// Function name for [`SamplingPolicy::Log`].
    pub const LOG: &'static str = "log";

    /// Validate a sampling configuration.
    ///
    /// `every` accepts any `k >= 1`; `log` accepts any `base >= 2`.
    pub fn validate(config: &TraceSamplingConfig) -> Result<Self, ConfigError> {
        match config.function.as_str() {
            Self::EVERY if config.arg >= 1 => Ok(Self::Every(config.arg)),
            Self::LOG if config.arg >= 2 => Ok(Self::Log(config.arg)),
            Self::EVERY | Self::LOG => Err(ConfigError::SamplingArgument {
                function: config.function.clone(),
                arg: config.arg,
            }),
            other => Err(ConfigError::UnknownSamplingFunction {
                name: other.to_owned(),
            }),
        }
    }

    /// Whether the iteration with 0-based index `i` is traced.
    pub fn sample(self, i: u64) -> bool {
        match self {
            Self::Every(k) => i.checked_rem(k).is_some_and(|r| r == 0),
            Self::Log(base) => i.checked_ilog(base).is_some_and(|l| u64::from(l) == i),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(function: &str, arg: u64) -> TraceSamplingConfig {
        TraceSamplingConfig {
            function: function.to_owned(),
            arg,
        }
    }

    #[test]
    fn every_three() {
        let policy = SamplingPolicy::validate(&config("every", 3)).unwrap();
        let sampled: Vec<u64> = (0..10).filter(|&i| policy.sample(i)).collect();
        assert_eq!(sampled, vec![0, 3, 6, 9]);
    }

    #[test]
    fn every_one_samples_everything() {
        let policy = SamplingPolicy::validate(&config("every", 1)).unwrap();
        assert!((0..20).all(|i| policy.sample(i)));
    }

    #[test]
    fn log_ten_is_false_at_zero() {
        let policy = SamplingPolicy::validate(&config("log", 10)).unwrap();
        assert!(!policy.sample(0));
    }

    #[test]
    fn log_ten_never_matches_its_own_logarithm() {
        let policy = SamplingPolicy::validate(&config("log", 10)).unwrap();
        assert!((0..10_000).all(|i| !policy.sample(i)));
    }

    #[test]
    fn unknown_function_is_rejected() {
        let err = SamplingPolicy::validate(&config("sometimes", 2)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSamplingFunction { name } if name == "sometimes"));
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(matches!(
            SamplingPolicy::validate(&config("every", 0)),
            Err(ConfigError::SamplingArgument { .. })
        ));
        assert!(matches!(
            SamplingPolicy::validate(&config("log", 1)),
            Err(ConfigError::SamplingArgument { .. })
        ));
    }
}
