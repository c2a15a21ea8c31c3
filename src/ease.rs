use serde::{Deserialize, Serialize};

/// Easing curves, named the way the site's motion designers write them
/// (`"power2.out"`, `"power3.out"`, ...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Ease {
    #[serde(rename = "none", alias = "linear")]
    Linear,
    #[serde(rename = "power1.out")]
    Power1Out,
    #[default]
    #[serde(rename = "power2.out")]
    Power2Out,
    #[serde(rename = "power3.out")]
    Power3Out,
    #[serde(rename = "power2.inOut")]
    Power2InOut,
    /// `cubic-bezier(x1, y1, x2, y2)` as in CSS.
    #[serde(rename = "cubicBezier")]
    CubicBezier(f64, f64, f64, f64),
}

impl Ease {
    /// Map normalized progress `t` in `[0, 1]` to eased progress.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Power1Out => 1.0 - (1.0 - t).powi(2),
            Self::Power2Out => 1.0 - (1.0 - t).powi(3),
            Self::Power3Out => 1.0 - (1.0 - t).powi(4),
            Self::Power2InOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::CubicBezier(x1, y1, x2, y2) => cubic_bezier(x1, y1, x2, y2, t),
        }
    }
}

fn bezier_axis(a1: f64, a2: f64, s: f64) -> f64 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * a1 + 3.0 * inv * s * s * a2 + s * s * s
}

// Solve x(s) = t by bisection, then evaluate y(s). x(s) is monotonic for
// control points with x in [0, 1].
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, t: f64) -> f64 {
    if t <= 0.0 || t >= 1.0 {
        return t;
    }
    let (mut lo, mut hi) = (0.0, 1.0);
    let mut s = t;
    for _ in 0..32 {
        let x = bezier_axis(x1, x2, s);
        if (x - t).abs() < 1e-7 {
            break;
        }
        if x < t {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) / 2.0;
    }
    bezier_axis(y1, y2, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_fixed() {
        for ease in [
            Ease::Linear,
            Ease::Power1Out,
            Ease::Power2Out,
            Ease::Power3Out,
            Ease::Power2InOut,
            Ease::CubicBezier(0.77, 0.0, 0.175, 1.0),
        ] {
            assert_eq!(ease.apply(0.0), 0.0, "{ease:?}");
            assert_eq!(ease.apply(1.0), 1.0, "{ease:?}");
        }
    }

    #[test]
    fn out_curves_are_monotonic() {
        let mut prev = 0.0;
        for i in 0..=100 {
            let v = Ease::Power3Out.apply(i as f64 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn parses_named_curves() {
        let ease: Ease = serde_json::from_str("\"power3.out\"").unwrap();
        assert_eq!(ease, Ease::Power3Out);
        let ease: Ease = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(ease, Ease::Linear);
    }
}
