//! Hydration reminder cycle.
//!
//! A recurring interval with "fire and restart" semantics. Unlike the
//! countdown, the remaining time is derived from the wall-clock delta since
//! the last trigger, so it self-corrects after the host throttles ticks.
//!
//! The elapsed check is level-triggered: it runs on every tick. Firing
//! restarts the window in the same call that detected the zero crossing,
//! which is what keeps a single crossing from producing two reminders.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::{Event, Feature};
use crate::notify::{Alerts, Cue, Notification, Permission};
use crate::scheduler::{Scheduler, TickSource};
use crate::storage::{keys, Storage};

const TICK: Duration = Duration::from_secs(1);

/// Persisted reminder cycle record.
///
/// Invariant: `interval_minutes > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderCycleState {
    #[serde(rename = "reminderInterval")]
    pub interval_minutes: u32,
    #[serde(rename = "lastReminderTime")]
    pub last_trigger_ms: u64,
    #[serde(rename = "isReminderActive")]
    pub active: bool,
    #[serde(rename = "dayStamp")]
    pub day_stamp: String,
}

/// Water logged on `day_stamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrationLog {
    pub intake_ml: u32,
    pub day_stamp: String,
}

pub struct HydrationReminder {
    user_id: String,
    storage: Storage,
    scheduler: Scheduler,
    alerts: Alerts,
    state: ReminderCycleState,
    log: HydrationLog,
    ticker: Option<TickSource>,
}

impl HydrationReminder {
    /// Load the reminder for `user_id`. An active persisted reminder resumes
    /// ticking immediately; a record from an earlier day restarts its window.
    pub fn load(
        user_id: &str,
        storage: Storage,
        scheduler: Scheduler,
        alerts: Alerts,
        default_interval_minutes: u32,
    ) -> Result<Self, ValidationError> {
        ValidationError::require_positive(
            "interval_minutes",
            f64::from(default_interval_minutes),
        )?;
        let now = storage.now_ms();
        let today = storage.day_stamp();

        let mut state = storage
            .load::<ReminderCycleState>(&keys::reminder_cycle(user_id))
            .filter(|s| s.interval_minutes > 0)
            .unwrap_or(ReminderCycleState {
                interval_minutes: default_interval_minutes,
                last_trigger_ms: now,
                active: false,
                day_stamp: today.clone(),
            });
        if state.day_stamp != today {
            state.last_trigger_ms = now;
            state.day_stamp = today.clone();
            storage.save_or_warn(&keys::reminder_cycle(user_id), &state);
        }

        let log = storage
            .load::<HydrationLog>(&keys::hydration_log(user_id))
            .filter(|log| log.day_stamp == today)
            .unwrap_or(HydrationLog {
                intake_ml: 0,
                day_stamp: today,
            });

        let ticker = state.active.then(|| scheduler.every(TICK));
        Ok(Self {
            user_id: user_id.to_string(),
            storage,
            scheduler,
            alerts,
            state,
            log,
            ticker,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &ReminderCycleState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    fn interval_ms(&self) -> u64 {
        u64::from(self.state.interval_minutes) * 60_000
    }

    fn remaining_ms(&self) -> u64 {
        let elapsed = self
            .storage
            .now_ms()
            .saturating_sub(self.state.last_trigger_ms);
        self.interval_ms().saturating_sub(elapsed)
    }

    /// Seconds until the next reminder, or `None` while paused.
    pub fn time_remaining_secs(&self) -> Option<u64> {
        self.state
            .active
            .then(|| self.remaining_ms().div_ceil(1000))
    }

    /// Epoch ms at which the next reminder is due, or `None` while paused.
    pub fn next_due_at_ms(&self) -> Option<u64> {
        self.state
            .active
            .then(|| self.state.last_trigger_ms.saturating_add(self.interval_ms()))
    }

    /// Water logged today.
    pub fn intake_today_ml(&self) -> u32 {
        if self.log.day_stamp == self.storage.day_stamp() {
            self.log.intake_ml
        } else {
            0
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the reminder cycle now. No-op while already active.
    pub fn activate(&mut self) -> Option<Event> {
        if self.state.active {
            return None;
        }
        let permission = self.alerts.request_permission();
        if permission != Permission::Granted {
            tracing::debug!(?permission, "native reminders unavailable, toasts only");
        }
        self.state.active = true;
        self.state.last_trigger_ms = self.storage.now_ms();
        self.ticker = Some(self.scheduler.every(TICK));
        self.persist();
        Some(Event::ReminderActivated {
            interval_minutes: self.state.interval_minutes,
            at: self.storage.clock().now_utc(),
        })
    }

    pub fn deactivate(&mut self) -> Option<Event> {
        if !self.state.active {
            return None;
        }
        self.state.active = false;
        self.ticker = None;
        self.persist();
        Some(Event::ReminderDeactivated {
            at: self.storage.clock().now_utc(),
        })
    }

    pub fn toggle(&mut self) -> Option<Event> {
        if self.state.active {
            self.deactivate()
        } else {
            self.activate()
        }
    }

    /// Change the interval. Never fires a reminder by itself.
    pub fn set_interval(&mut self, minutes: u32) -> Result<Event, ValidationError> {
        ValidationError::require_positive("interval_minutes", f64::from(minutes))?;
        self.state.interval_minutes = minutes;
        self.persist();
        Ok(Event::ReminderIntervalChanged {
            interval_minutes: minutes,
            at: self.storage.clock().now_utc(),
        })
    }

    /// The user acted on their own; restart the window like a fired reminder.
    pub fn record_manual_action(&mut self) {
        self.state.last_trigger_ms = self.storage.now_ms();
        self.persist();
    }

    /// Log water intake, which also restarts the reminder window.
    pub fn record_intake(&mut self, amount_ml: u32) -> Result<Vec<Event>, ValidationError> {
        ValidationError::require_positive("amount_ml", f64::from(amount_ml))?;
        let mut events = Vec::with_capacity(2);
        events.extend(self.roll_day());
        self.log.intake_ml = self.log.intake_ml.saturating_add(amount_ml);
        self.storage
            .save_or_warn(&keys::hydration_log(&self.user_id), &self.log);
        self.record_manual_action();
        events.push(Event::IntakeRecorded {
            amount_ml,
            total_ml: self.log.intake_ml,
            at: self.storage.clock().now_utc(),
        });
        Ok(events)
    }

    /// Zero today's intake.
    pub fn reset_intake(&mut self) {
        self.log = HydrationLog {
            intake_ml: 0,
            day_stamp: self.storage.day_stamp(),
        };
        self.storage
            .save_or_warn(&keys::hydration_log(&self.user_id), &self.log);
    }

    /// Check the interval if the tick source fired.
    pub fn poll(&mut self) -> Vec<Event> {
        let fired = self.ticker.as_mut().is_some_and(TickSource::poll);
        if !fired {
            return Vec::new();
        }
        let mut events: Vec<Event> = self.roll_day().into_iter().collect();
        events.extend(self.on_interval_elapsed());
        events
    }

    /// Fire and restart if the window has run out.
    pub fn on_interval_elapsed(&mut self) -> Option<Event> {
        if !self.state.active || self.remaining_ms() > 0 {
            return None;
        }
        self.state.last_trigger_ms = self.storage.now_ms();
        self.persist();
        tracing::info!(interval = self.state.interval_minutes, "hydration reminder fired");
        self.alerts.cue(Cue::Reminder);
        self.alerts.dispatch(&Notification::new(
            "Time to hydrate",
            "Drink a glass of water",
        ));
        Some(Event::ReminderFired {
            interval_minutes: self.state.interval_minutes,
            at: self.storage.clock().now_utc(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn roll_day(&mut self) -> Option<Event> {
        let today = self.storage.day_stamp();
        if self.state.day_stamp == today && self.log.day_stamp == today {
            return None;
        }
        self.state.day_stamp = today.clone();
        self.persist();
        if self.log.day_stamp != today {
            self.log = HydrationLog {
                intake_ml: 0,
                day_stamp: today.clone(),
            };
            self.storage
                .save_or_warn(&keys::hydration_log(&self.user_id), &self.log);
        }
        Some(Event::DayRolledOver {
            feature: Feature::Hydration,
            day: today,
            at: self.storage.clock().now_utc(),
        })
    }

    fn persist(&self) {
        self.storage
            .save_or_warn(&keys::reminder_cycle(&self.user_id), &self.state);
    }
}

impl std::fmt::Debug for HydrationReminder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HydrationReminder")
            .field("user_id", &self.user_id)
            .field("state", &self.state)
            .field("log", &self.log)
            .field("ticking", &self.ticker.is_some())
            .finish()
    }
}
