//! Easing functions for animations
//!
//! Every curve maps progress in [0, 1] to eased progress with `f(0) = 0` and
//! `f(1) = 1`. Elastic and bounce curves may leave [0, 1] in between.
//! Curves are pure, so any number of animations can share one.

use crate::error::AnimationError;
use serde::{Deserialize, Deserializer};
use std::f32::consts::PI;
use std::str::FromStr;

/// Easing function type
#[derive(Clone, Copy, Debug, Default)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseOutElastic,
    EaseOutBounce,
    CubicBezier(f32, f32, f32, f32),
    /// Caller-supplied curve; must satisfy `f(0) = 0` and `f(1) = 1`
    Custom(fn(f32) -> f32),
}

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    ///
    /// Progress outside [0, 1] is clamped first.
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn | Easing::EaseInCubic => t * t * t,
            Easing::EaseOut | Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut | Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::EaseOutElastic => elastic_out(t),
            Easing::EaseOutBounce => bounce_out(t),
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
            Easing::Custom(f) => f(t),
        }
    }

    /// Check if the curve never decreases (eased values stay between start and target)
    pub fn is_monotonic(&self) -> bool {
        match self {
            Easing::EaseOutElastic | Easing::EaseOutBounce | Easing::Custom(_) => false,
            Easing::CubicBezier(_, y1, _, y2) => {
                (0.0..=1.0).contains(y1) && (0.0..=1.0).contains(y2)
            }
            _ => true,
        }
    }
}

fn elastic_out(t: f32) -> f32 {
    const C4: f32 = (2.0 * PI) / 3.0;
    if t <= 0.0 {
        0.0
    } else if t >= 1.0 {
        1.0
    } else {
        2f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * C4).sin() + 1.0
    }
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// Cubic bezier easing calculation (matches browser implementations of CSS `cubic-bezier()`).
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
/// Computes in f64 internally to avoid f32 precision jitter at 120fps.
fn cubic_bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    // Endpoints are always exact
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let x = t as f64;
    let x1 = x1 as f64;
    let y1 = y1 as f64;
    let x2 = x2 as f64;
    let y2 = y2 as f64;

    let mut p = x;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - x;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2) as f32;
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    // Binary search fallback (always converges)
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = x;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - x).abs() < 1e-7 {
            break;
        }
        if val < x {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2) as f32
}

/// Evaluate cubic bezier at parameter t: B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

impl FromStr for Easing {
    type Err = AnimationError;

    /// Parse a named curve
    ///
    /// Case, `-`, `_` and spaces are ignored, so `easeOutCubic`,
    /// `ease-out-cubic` and `EASE_OUT_CUBIC` are the same curve. `quadOut`
    /// style names are accepted too.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        let easing = match key.as_str() {
            "linear" => Easing::Linear,
            // CSS `ease`
            "ease" => Easing::CubicBezier(0.25, 0.1, 0.25, 1.0),
            "easein" => Easing::EaseIn,
            "easeout" => Easing::EaseOut,
            "easeinout" => Easing::EaseInOut,
            "easeinquad" | "quadin" => Easing::EaseInQuad,
            "easeoutquad" | "quadout" => Easing::EaseOutQuad,
            "easeinoutquad" | "quadinout" => Easing::EaseInOutQuad,
            "easeincubic" | "cubicin" => Easing::EaseInCubic,
            "easeoutcubic" | "cubicout" => Easing::EaseOutCubic,
            "easeinoutcubic" | "cubicinout" => Easing::EaseInOutCubic,
            "easeinquart" | "quartin" => Easing::EaseInQuart,
            "easeoutquart" | "quartout" => Easing::EaseOutQuart,
            "easeinoutquart" | "quartinout" => Easing::EaseInOutQuart,
            "easeoutelastic" | "elasticout" => Easing::EaseOutElastic,
            "easeoutbounce" | "bounceout" => Easing::EaseOutBounce,
            _ => return Err(AnimationError::UnknownEasing(name.to_string())),
        };
        Ok(easing)
    }
}

impl<'de> Deserialize<'de> for Easing {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMED: [Easing; 15] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::EaseInQuad,
        Easing::EaseOutQuad,
        Easing::EaseInOutQuad,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
        Easing::EaseInOutCubic,
        Easing::EaseInQuart,
        Easing::EaseOutQuart,
        Easing::EaseInOutQuart,
        Easing::EaseOutElastic,
        Easing::EaseOutBounce,
    ];

    #[test]
    fn test_endpoints_are_exact() {
        for easing in NAMED {
            assert!(easing.apply(0.0).abs() < 1e-6, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{easing:?} at 1");
        }
        let bezier = Easing::CubicBezier(0.42, 0.0, 0.58, 1.0);
        assert_eq!(bezier.apply(0.0), 0.0);
        assert_eq!(bezier.apply(1.0), 1.0);
    }

    #[test]
    fn test_monotonic_curves_stay_in_unit_range() {
        for easing in NAMED.iter().filter(|e| e.is_monotonic()) {
            let mut prev = 0.0;
            for i in 0..=100 {
                let v = easing.apply(i as f32 / 100.0);
                assert!((-1e-6..=1.0 + 1e-6).contains(&v), "{easing:?} left [0,1]");
                assert!(v + 1e-6 >= prev, "{easing:?} decreased");
                prev = v;
            }
        }
    }

    #[test]
    fn test_elastic_overshoots() {
        let peak = (1..100)
            .map(|i| Easing::EaseOutElastic.apply(i as f32 / 100.0))
            .fold(f32::MIN, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_out_of_range_progress_is_clamped() {
        assert_eq!(Easing::EaseInQuad.apply(-0.5), 0.0);
        assert_eq!(Easing::EaseOutQuad.apply(1.5), 1.0);
    }

    #[test]
    fn test_custom_curve() {
        fn smoothstep(t: f32) -> f32 {
            t * t * (3.0 - 2.0 * t)
        }
        let easing = Easing::Custom(smoothstep);
        assert_eq!(easing.apply(0.5), 0.5);
        assert_eq!(easing.apply(1.0), 1.0);
    }

    #[test]
    fn test_parse_names() {
        assert!(matches!("linear".parse::<Easing>(), Ok(Easing::Linear)));
        assert!(matches!("easeOutCubic".parse::<Easing>(), Ok(Easing::EaseOutCubic)));
        assert!(matches!("ease-in-out-quad".parse::<Easing>(), Ok(Easing::EaseInOutQuad)));
        assert!(matches!("BOUNCE_OUT".parse::<Easing>(), Ok(Easing::EaseOutBounce)));
        assert!(matches!(
            "wobble".parse::<Easing>(),
            Err(AnimationError::UnknownEasing(name)) if name == "wobble"
        ));
    }
}
