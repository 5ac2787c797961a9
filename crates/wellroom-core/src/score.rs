//! Wellness score aggregation.
//!
//! A pure projection of the habit engines' state into one 10..=100 number.
//!
//! | Component | Weight | Value (0..100) |
//! |-----------|--------|----------------|
//! | Mood | 0.30 | today's mood percent, omitted if none |
//! | Screen time | 0.20 | `100 - (used - target) / target * 100`, inverted |
//! | Meditation | 0.20 | `used / target * 100` |
//! | Water | 0.20 | `used / target * 100` |
//! | Custom activities | 0.10 | completed / total * 100 |
//!
//! With no custom activities the 10% weight is handed out as a flat +2.5
//! bonus to each of the other components (mood only when present). The
//! final score is the rounded sum, floored at 10.

use serde::{Deserialize, Serialize};

pub const MOOD_WEIGHT: f64 = 0.30;
pub const SCREEN_TIME_WEIGHT: f64 = 0.20;
pub const MEDITATION_WEIGHT: f64 = 0.20;
pub const WATER_WEIGHT: f64 = 0.20;
pub const CUSTOM_WEIGHT: f64 = 0.10;

/// Bonus per component when there are no custom activities.
pub const REDISTRIBUTED_BONUS: f64 = 2.5;

/// Lowest score ever reported.
pub const SCORE_FLOOR: u32 = 10;

/// A user-defined daily activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomActivity {
    pub target: f64,
    pub is_completed: bool,
}

/// Read-only snapshot of everything the score depends on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessInputs {
    /// Today's mood, 0..=100. `None` when not logged today.
    pub mood_percent: Option<f64>,
    pub screen_time_used: f64,
    pub screen_time_target: f64,
    pub meditation_used: f64,
    pub meditation_target: f64,
    pub water_used: f64,
    pub water_target: f64,
    #[serde(default)]
    pub custom_activities: Vec<CustomActivity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Mood,
    ScreenTime,
    Meditation,
    Water,
    CustomActivities,
}

/// One weighted term of the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub kind: ComponentKind,
    /// Normalized value before weighting (0..100).
    pub value: f64,
    pub weight: f64,
    /// Redistributed bonus included in `contribution`.
    pub bonus: f64,
    /// `value * weight + bonus`.
    pub contribution: f64,
}

impl ScoreComponent {
    fn new(kind: ComponentKind, value: f64, weight: f64, bonus: f64) -> Self {
        Self {
            kind,
            value,
            weight,
            bonus,
            contribution: value * weight + bonus,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessScore {
    pub score: u32,
    /// Unrounded sum of contributions.
    pub raw: f64,
    pub components: Vec<ScoreComponent>,
}

impl WellnessScore {
    pub fn component(&self, kind: ComponentKind) -> Option<&ScoreComponent> {
        self.components.iter().find(|c| c.kind == kind)
    }
}

fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// `used / target * 100`, clamped; 0 for a non-positive target.
fn progress_pct(used: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    clamp_pct(used / target * 100.0)
}

/// Inverted screen-time value; 0 for a non-positive target.
fn screen_time_pct(used: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    clamp_pct(100.0 - ((used - target) / target * 100.0))
}

/// Combine the inputs into a score.
pub fn wellness_score(inputs: &WellnessInputs) -> WellnessScore {
    let has_custom = !inputs.custom_activities.is_empty();
    let bonus = if has_custom { 0.0 } else { REDISTRIBUTED_BONUS };

    let mut components = Vec::with_capacity(5);

    if let Some(mood) = inputs.mood_percent {
        components.push(ScoreComponent::new(
            ComponentKind::Mood,
            clamp_pct(mood / 100.0 * 100.0),
            MOOD_WEIGHT,
            bonus,
        ));
    }
    components.push(ScoreComponent::new(
        ComponentKind::ScreenTime,
        screen_time_pct(inputs.screen_time_used, inputs.screen_time_target),
        SCREEN_TIME_WEIGHT,
        bonus,
    ));
    components.push(ScoreComponent::new(
        ComponentKind::Meditation,
        progress_pct(inputs.meditation_used, inputs.meditation_target),
        MEDITATION_WEIGHT,
        bonus,
    ));
    components.push(ScoreComponent::new(
        ComponentKind::Water,
        progress_pct(inputs.water_used, inputs.water_target),
        WATER_WEIGHT,
        bonus,
    ));
    if has_custom {
        let total = inputs.custom_activities.len() as f64;
        let completed = inputs
            .custom_activities
            .iter()
            .filter(|a| a.is_completed)
            .count() as f64;
        components.push(ScoreComponent::new(
            ComponentKind::CustomActivities,
            completed / total * 100.0,
            CUSTOM_WEIGHT,
            0.0,
        ));
    }

    let raw: f64 = components.iter().map(|c| c.contribution).sum();
    let score = (raw.round().max(0.0) as u32).max(SCORE_FLOOR);
    WellnessScore {
        score,
        raw,
        components,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn reference_inputs() -> WellnessInputs {
        WellnessInputs {
            mood_percent: Some(80.0),
            screen_time_used: 60.0,
            screen_time_target: 120.0,
            meditation_used: 10.0,
            meditation_target: 10.0,
            water_used: 2000.0,
            water_target: 2000.0,
            custom_activities: Vec::new(),
        }
    }

    #[test]
    fn reference_day_scores_94() {
        let result = wellness_score(&reference_inputs());
        assert_eq!(result.score, 94);
        assert!(approx(result.raw, 94.0));
        let mood = result.component(ComponentKind::Mood).unwrap();
        assert!(approx(mood.contribution, 26.5));
        let screen = result.component(ComponentKind::ScreenTime).unwrap();
        assert!(approx(screen.contribution, 22.5));
        assert!(result.component(ComponentKind::CustomActivities).is_none());
    }

    #[test]
    fn empty_day_is_floored_at_ten() {
        let inputs = WellnessInputs {
            screen_time_used: 500.0,
            screen_time_target: 100.0,
            ..WellnessInputs::default()
        };
        let result = wellness_score(&inputs);
        // Only the three +2.5 bonuses remain.
        assert!(approx(result.raw, 7.5));
        assert_eq!(result.score, 10);
    }

    #[test]
    fn all_zero_without_bonus_floors_too() {
        let inputs = WellnessInputs {
            screen_time_used: 500.0,
            screen_time_target: 100.0,
            custom_activities: vec![CustomActivity {
                target: 1.0,
                is_completed: false,
            }],
            ..WellnessInputs::default()
        };
        let result = wellness_score(&inputs);
        assert!(approx(result.raw, 0.0));
        assert_eq!(result.score, 10);
    }

    #[test]
    fn custom_activities_take_their_own_weight() {
        let inputs = WellnessInputs {
            custom_activities: vec![
                CustomActivity {
                    target: 1.0,
                    is_completed: true,
                },
                CustomActivity {
                    target: 3.0,
                    is_completed: false,
                },
            ],
            ..reference_inputs()
        };
        let result = wellness_score(&inputs);
        // 24 + 20 + 20 + 20 + 5
        assert!(approx(result.raw, 89.0));
        assert_eq!(result.score, 89);
        let custom = result.component(ComponentKind::CustomActivities).unwrap();
        assert!(approx(custom.value, 50.0));
    }

    #[test]
    fn no_mood_gets_no_mood_bonus() {
        let inputs = WellnessInputs {
            mood_percent: None,
            ..reference_inputs()
        };
        let result = wellness_score(&inputs);
        assert!(approx(result.raw, 67.5));
        assert_eq!(result.score, 68);
    }

    #[test]
    fn screen_time_over_target_degrades_linearly() {
        let inputs = WellnessInputs {
            screen_time_used: 150.0,
            screen_time_target: 100.0,
            ..reference_inputs()
        };
        let screen = wellness_score(&inputs);
        let screen = screen.component(ComponentKind::ScreenTime).unwrap();
        assert!(approx(screen.value, 50.0));
    }

    #[test]
    fn non_positive_targets_contribute_only_bonus() {
        let inputs = WellnessInputs {
            mood_percent: None,
            screen_time_used: 10.0,
            screen_time_target: 0.0,
            meditation_used: 10.0,
            meditation_target: -1.0,
            water_used: 100.0,
            water_target: 0.0,
            custom_activities: Vec::new(),
        };
        let result = wellness_score(&inputs);
        for c in &result.components {
            assert!(approx(c.value, 0.0));
        }
        assert_eq!(result.score, 10);
    }

    #[test]
    fn progress_is_capped_at_full() {
        let inputs = WellnessInputs {
            meditation_used: 40.0,
            water_used: 5000.0,
            ..reference_inputs()
        };
        assert_eq!(wellness_score(&inputs).score, 94);
    }
}
