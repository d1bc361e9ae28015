use thiserror::Error;

/// A configuration value the engine cannot run with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} must be a transition rate in (0, 1], got {value}")]
    RateOutOfRange { field: &'static str, value: f32 },

    #[error("{field} must be a range with 0 <= min < max, got [{min}, {max})")]
    InvalidRange {
        field: &'static str,
        min: f32,
        max: f32,
    },

    #[error("{field} must be a probability in [0, 1], got {value}")]
    InvalidProbability { field: &'static str, value: f32 },

    #[error("gaze up + down probabilities must not exceed 1, got {0}")]
    GlanceProbabilitiesExceedOne(f32),
}
