//! Runtime configuration
//!
//! Defaults shared by every primitive created from one
//! [`AnimationContext`](crate::AnimationContext). Loadable from TOML; any
//! field left out keeps its default.
//!
//! ```toml
//! default_duration_ms = 300.0
//! default_easing = "easeOutCubic"
//! max_frame_dt_ms = 64.0
//! substep_ms = 8.0
//! rest_delta = 0.01
//! rest_velocity = 0.01
//! stage_tick_ms = 50.0
//! ```

use crate::easing::Easing;
use crate::error::{AnimationError, Result};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Tween duration used by
    /// [`AnimationContext::tween_options`](crate::AnimationContext::tween_options)
    pub default_duration_ms: f64,
    pub default_easing: Easing,
    /// Largest frame delta a spring integrates; longer gaps (throttled
    /// background tabs) are clamped to this
    pub max_frame_dt_ms: f64,
    /// Largest single integration step inside one frame
    pub substep_ms: f64,
    /// A spring is at rest once closer than this to its target...
    pub rest_delta: f32,
    /// ...and slower than this (units per second)
    pub rest_velocity: f32,
    /// Stage progress tick length
    pub stage_tick_ms: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: 300.0,
            default_easing: Easing::EaseOutCubic,
            max_frame_dt_ms: 64.0,
            substep_ms: 8.0,
            rest_delta: 0.01,
            rest_velocity: 0.01,
            stage_tick_ms: 50.0,
        }
    }
}

/// Smallest accepted spring sub-step, in milliseconds
const MIN_SUBSTEP_MS: f64 = 0.1;

impl AnimationConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field is in range
    pub fn validate(&self) -> Result<()> {
        fn positive(field: &'static str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(AnimationError::InvalidConfig { field, value })
            }
        }

        if !(self.default_duration_ms.is_finite() && self.default_duration_ms >= 0.0) {
            return Err(AnimationError::InvalidConfig {
                field: "default_duration_ms",
                value: self.default_duration_ms,
            });
        }
        positive("max_frame_dt_ms", self.max_frame_dt_ms)?;
        positive("substep_ms", self.substep_ms)?;
        if self.substep_ms < MIN_SUBSTEP_MS || self.substep_ms > self.max_frame_dt_ms {
            return Err(AnimationError::InvalidConfig {
                field: "substep_ms",
                value: self.substep_ms,
            });
        }
        positive("rest_delta", self.rest_delta as f64)?;
        positive("rest_velocity", self.rest_velocity as f64)?;
        positive("stage_tick_ms", self.stage_tick_ms)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        AnimationConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AnimationConfig::from_toml_str(
            r#"
            default_easing = "ease-in-out-quad"
            stage_tick_ms = 25.0
            "#,
        )
        .unwrap();

        assert!(matches!(config.default_easing, Easing::EaseInOutQuad));
        assert_eq!(config.stage_tick_ms, 25.0);
        assert_eq!(config.max_frame_dt_ms, 64.0);
        assert_eq!(config.default_duration_ms, 300.0);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let err = AnimationConfig::from_toml_str("substep_ms = 0.0").unwrap_err();
        assert!(matches!(
            err,
            AnimationError::InvalidConfig {
                field: "substep_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_substep_must_fit_inside_a_frame() {
        for source in [
            "substep_ms = 100.0",
            "substep_ms = 20.0\nmax_frame_dt_ms = 16.0",
            "substep_ms = 0.001",
        ] {
            assert!(
                matches!(
                    AnimationConfig::from_toml_str(source),
                    Err(AnimationError::InvalidConfig {
                        field: "substep_ms",
                        ..
                    })
                ),
                "accepted {:?}",
                source
            );
        }

        let config = AnimationConfig::from_toml_str("substep_ms = 16.0\nmax_frame_dt_ms = 16.0");
        assert!(config.is_ok());
    }

    #[test]
    fn test_rejects_unknown_easing_and_bad_syntax() {
        assert!(matches!(
            AnimationConfig::from_toml_str("default_easing = \"sproing\""),
            Err(AnimationError::Config(_))
        ));
        assert!(matches!(
            AnimationConfig::from_toml_str("stage_tick_ms = "),
            Err(AnimationError::Config(_))
        ));
    }
}
