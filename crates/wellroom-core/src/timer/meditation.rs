//! Meditation timer: a persisted countdown plus a day-scoped tally of
//! completed minutes, which feeds the wellness score.

use serde::{Deserialize, Serialize};

use super::countdown::{Countdown, CountdownState};
use crate::error::ValidationError;
use crate::events::{Event, Feature};
use crate::notify::{Alerts, Cue, Notification};
use crate::scheduler::Scheduler;
use crate::storage::{keys, Storage};

/// Minutes of meditation completed on `day_stamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeditationLog {
    pub minutes_today: f64,
    pub day_stamp: String,
}

pub struct MeditationTimer {
    user_id: String,
    storage: Storage,
    alerts: Alerts,
    countdown: Countdown,
    log: MeditationLog,
}

impl MeditationTimer {
    /// Load the timer for `user_id`, seeding the duration with
    /// `default_minutes` when nothing is stored yet.
    pub fn load(
        user_id: &str,
        storage: Storage,
        scheduler: Scheduler,
        alerts: Alerts,
        default_minutes: u32,
    ) -> Result<Self, ValidationError> {
        ValidationError::require_positive("default_minutes", f64::from(default_minutes))?;
        let countdown = Countdown::persisted(
            Feature::Meditation,
            storage.clone(),
            keys::meditation_duration(user_id),
            u64::from(default_minutes) * 60,
            scheduler,
        )?;
        let today = storage.day_stamp();
        let log = storage
            .load::<MeditationLog>(&keys::meditation_log(user_id))
            .filter(|log| log.day_stamp == today && log.minutes_today.is_finite())
            .unwrap_or(MeditationLog {
                minutes_today: 0.0,
                day_stamp: today,
            });
        Ok(Self {
            user_id: user_id.to_string(),
            storage,
            alerts,
            countdown,
            log,
        })
    }

    pub fn state(&self) -> CountdownState {
        self.countdown.state()
    }

    pub fn progress(&self) -> f64 {
        self.countdown.progress()
    }

    pub fn is_ticking(&self) -> bool {
        self.countdown.is_ticking()
    }

    /// Minutes completed today.
    pub fn minutes_today(&self) -> f64 {
        if self.log.day_stamp == self.storage.day_stamp() {
            self.log.minutes_today
        } else {
            0.0
        }
    }

    pub fn set_minutes(&mut self, minutes: u32) -> Result<Event, ValidationError> {
        ValidationError::require_positive("duration_minutes", f64::from(minutes))?;
        self.countdown.configure(u64::from(minutes) * 60)
    }

    pub fn start(&mut self) -> Option<Event> {
        self.countdown.start()
    }

    pub fn pause(&mut self) -> Option<Event> {
        self.countdown.pause()
    }

    pub fn toggle(&mut self) -> Option<Event> {
        self.countdown.toggle()
    }

    pub fn reset(&mut self) -> Event {
        let event = self.countdown.reset();
        self.alerts
            .acknowledge(&Notification::new("Timer reset", "Meditation timer was reset"));
        event
    }

    /// Advance by one tick. Exposed for hosts that drive ticks themselves.
    pub fn tick(&mut self) -> Vec<Event> {
        let completed = self.countdown.tick();
        self.after_tick(completed)
    }

    pub fn poll(&mut self) -> Vec<Event> {
        let completed = self.countdown.poll();
        self.after_tick(completed)
    }

    fn after_tick(&mut self, completed: Option<Event>) -> Vec<Event> {
        let Some(event) = completed else {
            return Vec::new();
        };
        let mut events = Vec::with_capacity(2);
        if let Some(rolled) = self.roll_day() {
            events.push(rolled);
        }
        let minutes = self.countdown.state().total_duration_seconds as f64 / 60.0;
        self.log.minutes_today += minutes;
        self.storage
            .save_or_warn(&keys::meditation_log(&self.user_id), &self.log);
        self.alerts.cue(Cue::SessionComplete);
        self.alerts.dispatch(&Notification::new(
            "Meditation complete",
            format!("{minutes:.0} minute session finished"),
        ));
        events.push(event);
        events
    }

    fn roll_day(&mut self) -> Option<Event> {
        let today = self.storage.day_stamp();
        if self.log.day_stamp == today {
            return None;
        }
        self.log = MeditationLog {
            minutes_today: 0.0,
            day_stamp: today.clone(),
        };
        Some(Event::DayRolledOver {
            feature: Feature::Meditation,
            day: today,
            at: self.storage.clock().now_utc(),
        })
    }
}

impl std::fmt::Debug for MeditationTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeditationTimer")
            .field("user_id", &self.user_id)
            .field("countdown", &self.countdown)
            .field("log", &self.log)
            .finish()
    }
}
