//! Animation error types

use thiserror::Error;

/// Configuration errors raised at the call site
///
/// These are caller bugs: values are never silently clamped or defaulted.
#[derive(Error, Debug)]
pub enum AnimationError {
    /// A duration or delay is negative or non-finite
    #[error("Invalid {what}: {value} (must be finite and non-negative)")]
    InvalidDuration { what: &'static str, value: f64 },

    /// Spring stiffness, damping or mass is not strictly positive
    #[error(
        "Invalid spring parameters: stiffness={stiffness}, damping={damping}, mass={mass} \
         (all must be finite and positive)"
    )]
    InvalidSpringParameters {
        stiffness: f32,
        damping: f32,
        mass: f32,
    },

    /// Visibility gate asked to observe with no element attached
    #[error("Visibility gate has no element attached")]
    DetachedObserver,

    /// Visibility threshold outside 0.0..=1.0
    #[error("Invalid visibility threshold: {0} (must be within 0.0..=1.0)")]
    InvalidThreshold(f32),

    /// Easing name not recognised
    #[error("Unknown easing: {0}")]
    UnknownEasing(String),

    /// A runtime configuration value is out of range
    #[error("Invalid config value for {field}: {value}")]
    InvalidConfig { field: &'static str, value: f64 },

    /// Runtime configuration failed to parse
    #[error("Failed to parse animation config: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;

/// Check a duration or delay, returning it unchanged when valid
pub(crate) fn check_duration(what: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AnimationError::InvalidDuration { what, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_duration() {
        assert_eq!(check_duration("duration", 0.0).unwrap(), 0.0);
        assert_eq!(check_duration("duration", 250.0).unwrap(), 250.0);

        for bad in [-1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                check_duration("delay", bad),
                Err(AnimationError::InvalidDuration { what: "delay", .. })
            ));
        }
    }

    #[test]
    fn test_messages_name_the_problem() {
        let err = AnimationError::InvalidSpringParameters {
            stiffness: 0.0,
            damping: 10.0,
            mass: 1.0,
        };
        assert!(err.to_string().contains("stiffness=0"));
        assert_eq!(
            AnimationError::DetachedObserver.to_string(),
            "Visibility gate has no element attached"
        );
    }
}
