use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::PomodoroMode;

/// Which habit engine produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Meditation,
    Hydration,
    ScreenTime,
    Pomodoro,
    Score,
}

/// Every state change in the system produces an Event.
/// The host UI renders them; the dashboard uses them to decide when to
/// recompute the wellness score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    CountdownStarted {
        feature: Feature,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    CountdownPaused {
        feature: Feature,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    CountdownCompleted {
        feature: Feature,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    CountdownReset {
        feature: Feature,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    DurationChanged {
        feature: Feature,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    ReminderActivated {
        interval_minutes: u32,
        at: DateTime<Utc>,
    },
    ReminderDeactivated {
        at: DateTime<Utc>,
    },
    ReminderFired {
        interval_minutes: u32,
        at: DateTime<Utc>,
    },
    ReminderIntervalChanged {
        interval_minutes: u32,
        at: DateTime<Utc>,
    },
    IntakeRecorded {
        amount_ml: u32,
        total_ml: u32,
        at: DateTime<Utc>,
    },
    TrackingToggled {
        tracking: bool,
        at: DateTime<Utc>,
    },
    UsageWarning {
        minutes_used: f64,
        limit_minutes: f64,
        at: DateTime<Utc>,
    },
    UsageLimitReached {
        minutes_used: f64,
        limit_minutes: f64,
        at: DateTime<Utc>,
    },
    UsageReset {
        at: DateTime<Utc>,
    },
    UsageLimitChanged {
        limit_minutes: f64,
        at: DateTime<Utc>,
    },
    /// A day-scoped record noticed the calendar day changed.
    DayRolledOver {
        feature: Feature,
        day: String,
        at: DateTime<Utc>,
    },
    PomodoroPhaseChanged {
        from: PomodoroMode,
        to: PomodoroMode,
        round: u32,
        completed_intervals: u32,
        at: DateTime<Utc>,
    },
    PomodoroCycleComplete {
        rounds: u32,
        at: DateTime<Utc>,
    },
    PomodoroCycleReset {
        at: DateTime<Utc>,
    },
    ScoreUpdated {
        score: u32,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Events after which a persisted setting or score input has changed.
    pub fn is_settings_change(&self) -> bool {
        matches!(
            self,
            Event::CountdownCompleted {
                feature: Feature::Meditation,
                ..
            } | Event::DurationChanged { .. }
                | Event::ReminderActivated { .. }
                | Event::ReminderDeactivated { .. }
                | Event::ReminderIntervalChanged { .. }
                | Event::IntakeRecorded { .. }
                | Event::TrackingToggled { .. }
                | Event::UsageReset { .. }
                | Event::UsageLimitChanged { .. }
                | Event::DayRolledOver { .. }
        )
    }

    pub fn feature(&self) -> Feature {
        match self {
            Event::CountdownStarted { feature, .. }
            | Event::CountdownPaused { feature, .. }
            | Event::CountdownCompleted { feature, .. }
            | Event::CountdownReset { feature, .. }
            | Event::DurationChanged { feature, .. }
            | Event::DayRolledOver { feature, .. } => *feature,
            Event::ReminderActivated { .. }
            | Event::ReminderDeactivated { .. }
            | Event::ReminderFired { .. }
            | Event::ReminderIntervalChanged { .. }
            | Event::IntakeRecorded { .. } => Feature::Hydration,
            Event::TrackingToggled { .. }
            | Event::UsageWarning { .. }
            | Event::UsageLimitReached { .. }
            | Event::UsageReset { .. }
            | Event::UsageLimitChanged { .. } => Feature::ScreenTime,
            Event::PomodoroPhaseChanged { .. }
            | Event::PomodoroCycleComplete { .. }
            | Event::PomodoroCycleReset { .. } => Feature::Pomodoro,
            Event::ScoreUpdated { .. } => Feature::Score,
        }
    }
}
