//! One-shot threshold crossing detection.
//!
//! The usage and reminder engines re-evaluate their conditions on every
//! sample, so a plain `>=` comparison would fire again and again while the
//! value stays high. A crossing only counts on the transition from below to
//! at-or-above; the latch re-arms solely through [`ThresholdLatches::rearm`],
//! which callers invoke on a manual reset or a day rollover.

use serde::{Deserialize, Serialize};

/// Fraction at which the terminal "limit reached" alert fires.
pub const LIMIT_FRACTION: f64 = 1.0;

/// Upward-crossing check.
///
/// Returns `(should_warn, new_above_state)`. `should_warn` is true exactly
/// when `used_fraction >= threshold_fraction` and the previous state was
/// below. Once above, the state stays latched even if the value dips.
pub fn check_crossing(
    used_fraction: f64,
    threshold_fraction: f64,
    previously_above: bool,
) -> (bool, bool) {
    let above = used_fraction >= threshold_fraction;
    let should_warn = above && !previously_above;
    (should_warn, previously_above || above)
}

/// Alert produced by a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdAlert {
    /// Crossed the configurable warning fraction.
    Approaching,
    /// Reached 100% of the limit.
    LimitReached,
}

/// The two independent latches guarding warning and limit alerts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdLatches {
    pub warned: bool,
    pub limit_reached: bool,
}

impl ThresholdLatches {
    /// Evaluate one sample. At most one alert of each kind fires between
    /// re-arms; when a single sample jumps past both, both fire in order.
    pub fn evaluate(&mut self, used_fraction: f64, warn_fraction: f64) -> Vec<ThresholdAlert> {
        let mut alerts = Vec::new();
        if !used_fraction.is_finite() {
            return alerts;
        }

        let (warn, warned) = check_crossing(used_fraction, warn_fraction, self.warned);
        self.warned = warned;
        if warn {
            alerts.push(ThresholdAlert::Approaching);
        }

        let (limit, reached) = check_crossing(used_fraction, LIMIT_FRACTION, self.limit_reached);
        self.limit_reached = reached;
        if limit {
            alerts.push(ThresholdAlert::LimitReached);
        }
        alerts
    }

    pub fn rearm(&mut self) {
        *self = Self::default();
    }
}
