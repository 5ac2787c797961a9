//! Screen-time usage accumulator.
//!
//! Credits time in 10-second samples while tracking is on. Each sample
//! credits the gap since the later of the last activity signal and the last
//! sample, whether or not the user did anything in between. Only a gap of
//! 60 seconds or more is dropped, which covers a host that slept or was
//! throttled for minutes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::{Event, Feature};
use crate::notify::{Alerts, Notification};
use crate::scheduler::{Scheduler, TickSource};
use crate::storage::{keys, Storage};
use crate::threshold::{ThresholdAlert, ThresholdLatches};

/// Sampling cadence while tracking.
pub const SAMPLE_PERIOD: Duration = Duration::from_secs(10);

/// Gaps at or above this are treated as absence.
pub const ACTIVE_CEILING_MS: u64 = 60_000;

/// User-activity events that mark the user as present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySignal {
    PointerDown,
    KeyDown,
    TouchStart,
    Scroll,
}

/// Observable usage state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageState {
    pub minutes_used: f64,
    pub limit_minutes: f64,
    pub tracking: bool,
    pub last_activity_ms: u64,
    pub day_stamp: String,
}

/// Persisted usage record. The limit lives under its own key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageRecord {
    time_used: f64,
    is_tracking: bool,
    day_stamp: String,
    #[serde(default)]
    alerts: ThresholdLatches,
}

/// Warning settings for the approaching-limit alert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageAlertSettings {
    pub enabled: bool,
    pub warn_at_percent: u32,
}

impl Default for UsageAlertSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            warn_at_percent: 80,
        }
    }
}

impl UsageAlertSettings {
    /// Warning threshold as a fraction of the limit.
    pub fn warn_fraction(&self) -> f64 {
        f64::from(self.warn_at_percent) / 100.0
    }
}

pub struct ScreenTimeTracker {
    user_id: String,
    storage: Storage,
    scheduler: Scheduler,
    alerts: Alerts,
    state: UsageState,
    latches: ThresholdLatches,
    alert_settings: UsageAlertSettings,
    ticker: Option<TickSource>,
}

impl ScreenTimeTracker {
    /// Load the tracker for `user_id`.
    ///
    /// `default_limit_minutes` and `default_alerts` only apply when nothing
    /// is stored yet. A record from an earlier day loads as zero usage.
    pub fn load(
        user_id: &str,
        storage: Storage,
        scheduler: Scheduler,
        alerts: Alerts,
        default_limit_minutes: f64,
        default_alerts: UsageAlertSettings,
    ) -> Result<Self, ValidationError> {
        ValidationError::require_positive("limit_minutes", default_limit_minutes)?;
        validate_warn_percent(default_alerts.warn_at_percent)?;

        let now = storage.now_ms();
        let today = storage.day_stamp();

        let limit_minutes = storage
            .load::<f64>(&keys::usage_limit(user_id))
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(default_limit_minutes);
        let alert_settings = storage
            .load::<UsageAlertSettings>(&keys::usage_alerts(user_id))
            .filter(|s| validate_warn_percent(s.warn_at_percent).is_ok())
            .unwrap_or(default_alerts);

        let record = storage.load::<UsageRecord>(&keys::usage(user_id));
        let (minutes_used, tracking, latches) = match record {
            Some(r) if r.day_stamp == today && r.time_used.is_finite() && r.time_used >= 0.0 => {
                (r.time_used, r.is_tracking, r.alerts)
            }
            Some(r) => (0.0, r.is_tracking, ThresholdLatches::default()),
            None => (0.0, false, ThresholdLatches::default()),
        };

        let ticker = tracking.then(|| scheduler.every(SAMPLE_PERIOD));
        Ok(Self {
            user_id: user_id.to_string(),
            storage,
            scheduler,
            alerts,
            state: UsageState {
                minutes_used,
                limit_minutes,
                tracking,
                last_activity_ms: now,
                day_stamp: today,
            },
            latches,
            alert_settings,
            ticker,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &UsageState {
        &self.state
    }

    pub fn alert_settings(&self) -> UsageAlertSettings {
        self.alert_settings
    }

    pub fn latches(&self) -> ThresholdLatches {
        self.latches
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// Minutes used today. Reads zero once the stored day is stale.
    pub fn minutes_used(&self) -> f64 {
        if self.state.day_stamp == self.storage.day_stamp() {
            self.state.minutes_used
        } else {
            0.0
        }
    }

    pub fn used_fraction(&self) -> f64 {
        self.minutes_used() / self.state.limit_minutes
    }

    pub fn remaining_minutes(&self) -> f64 {
        (self.state.limit_minutes - self.minutes_used()).max(0.0)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn toggle_tracking(&mut self) -> Event {
        self.state.tracking = !self.state.tracking;
        if self.state.tracking {
            self.state.last_activity_ms = self.storage.now_ms();
            if self.ticker.is_none() {
                self.ticker = Some(self.scheduler.every(SAMPLE_PERIOD));
            }
        } else {
            self.ticker = None;
        }
        self.persist();
        Event::TrackingToggled {
            tracking: self.state.tracking,
            at: self.storage.clock().now_utc(),
        }
    }

    /// Mark the user as present. Adds no time by itself.
    pub fn on_activity_signal(&mut self, signal: ActivitySignal) {
        tracing::trace!(?signal, "activity");
        self.state.last_activity_ms = self.storage.now_ms();
    }

    /// Credit the time since the last activity if it is under the ceiling.
    pub fn sample(&mut self) -> Vec<Event> {
        if !self.state.tracking {
            return Vec::new();
        }
        let mut events: Vec<Event> = self.roll_day().into_iter().collect();

        let now = self.storage.now_ms();
        let elapsed = now.saturating_sub(self.state.last_activity_ms);
        if elapsed < ACTIVE_CEILING_MS {
            self.state.minutes_used += elapsed as f64 / 60_000.0;
            tracing::debug!(elapsed_ms = elapsed, minutes = self.state.minutes_used, "usage credited");
        } else {
            tracing::debug!(elapsed_ms = elapsed, "idle gap not credited");
        }
        self.state.last_activity_ms = now;

        events.extend(self.check_thresholds());
        self.persist();
        events
    }

    /// Sample if the tick source fired.
    pub fn poll(&mut self) -> Vec<Event> {
        let fired = self.ticker.as_mut().is_some_and(TickSource::poll);
        if fired {
            self.sample()
        } else {
            Vec::new()
        }
    }

    /// Zero the counter and re-arm both alerts.
    pub fn reset_counter(&mut self) -> Event {
        self.state.minutes_used = 0.0;
        self.state.day_stamp = self.storage.day_stamp();
        self.latches.rearm();
        self.persist();
        Event::UsageReset {
            at: self.storage.clock().now_utc(),
        }
    }

    /// Change the daily limit. Alerts are not re-armed by this.
    pub fn set_limit(&mut self, minutes: f64) -> Result<Event, ValidationError> {
        ValidationError::require_positive("limit_minutes", minutes)?;
        self.state.limit_minutes = minutes;
        self.storage
            .save_or_warn(&keys::usage_limit(&self.user_id), &minutes);
        Ok(Event::UsageLimitChanged {
            limit_minutes: minutes,
            at: self.storage.clock().now_utc(),
        })
    }

    pub fn set_alert_settings(&mut self, settings: UsageAlertSettings) -> Result<(), ValidationError> {
        validate_warn_percent(settings.warn_at_percent)?;
        self.alert_settings = settings;
        self.storage
            .save_or_warn(&keys::usage_alerts(&self.user_id), &settings);
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn check_thresholds(&mut self) -> Vec<Event> {
        if !self.alert_settings.enabled {
            return Vec::new();
        }
        let fired = self
            .latches
            .evaluate(self.used_fraction(), self.alert_settings.warn_fraction());
        let at = self.storage.clock().now_utc();
        let minutes_used = self.state.minutes_used;
        let limit_minutes = self.state.limit_minutes;

        fired
            .into_iter()
            .map(|alert| match alert {
                ThresholdAlert::Approaching => {
                    tracing::info!(minutes_used, limit_minutes, "screen time approaching limit");
                    self.alerts.dispatch(&Notification::new(
                        "Screen time warning",
                        format!(
                            "You've used {:.0} of {:.0} minutes today",
                            minutes_used, limit_minutes
                        ),
                    ));
                    Event::UsageWarning {
                        minutes_used,
                        limit_minutes,
                        at,
                    }
                }
                ThresholdAlert::LimitReached => {
                    tracing::info!(minutes_used, limit_minutes, "screen time limit reached");
                    self.alerts.dispatch(&Notification::new(
                        "Screen time limit reached",
                        format!("You've reached your {:.0} minute limit", limit_minutes),
                    ));
                    Event::UsageLimitReached {
                        minutes_used,
                        limit_minutes,
                        at,
                    }
                }
            })
            .collect()
    }

    fn roll_day(&mut self) -> Option<Event> {
        let today = self.storage.day_stamp();
        if self.state.day_stamp == today {
            return None;
        }
        self.state.minutes_used = 0.0;
        self.state.day_stamp = today.clone();
        self.latches.rearm();
        Some(Event::DayRolledOver {
            feature: Feature::ScreenTime,
            day: today,
            at: self.storage.clock().now_utc(),
        })
    }

    fn persist(&self) {
        let record = UsageRecord {
            time_used: self.state.minutes_used,
            is_tracking: self.state.tracking,
            day_stamp: self.state.day_stamp.clone(),
            alerts: self.latches,
        };
        self.storage.save_or_warn(&keys::usage(&self.user_id), &record);
    }
}

fn validate_warn_percent(percent: u32) -> Result<(), ValidationError> {
    if (1..=100).contains(&percent) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: "warn_at_percent",
            value: f64::from(percent),
            min: 1.0,
            max: 100.0,
        })
    }
}

impl std::fmt::Debug for ScreenTimeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenTimeTracker")
            .field("user_id", &self.user_id)
            .field("state", &self.state)
            .field("latches", &self.latches)
            .field("ticking", &self.ticker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, DAY_MS};
    use crate::notify::{Permission, RecordingNotifier};
    use std::sync::Arc;

    struct Fixture {
        clock: Arc<ManualClock>,
        storage: Storage,
        scheduler: Scheduler,
        notifier: Arc<RecordingNotifier>,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::at_date("2024-05-01"));
            Self {
                storage: Storage::in_memory(clock.clone()),
                scheduler: Scheduler::new(clock.clone()),
                notifier: Arc::new(RecordingNotifier::new(Permission::Denied)),
                clock,
            }
        }

        fn tracker(&self, limit: f64) -> ScreenTimeTracker {
            ScreenTimeTracker::load(
                "u1",
                self.storage.clone(),
                self.scheduler.clone(),
                Alerts::new(self.notifier.clone()),
                limit,
                UsageAlertSettings::default(),
            )
            .unwrap()
        }

        /// Poll every 10 s for `minutes` of virtual time.
        fn run_minutes(&self, tracker: &mut ScreenTimeTracker, minutes: u64) -> Vec<Event> {
            let mut events = Vec::new();
            for _ in 0..minutes * 6 {
                self.clock.advance_secs(10);
                events.extend(tracker.poll());
            }
            events
        }
    }

    fn count(events: &[Event], pred: fn(&Event) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn credits_time_while_tracking() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker(120.0);
        tracker.toggle_tracking();
        fx.run_minutes(&mut tracker, 5);
        assert!((tracker.minutes_used() - 5.0).abs() < 1e-9);
        assert!((tracker.remaining_minutes() - 115.0).abs() < 1e-9);
    }

    #[test]
    fn idle_gap_over_ceiling_is_not_credited() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker(120.0);
        tracker.toggle_tracking();
        fx.clock.advance_secs(300);
        tracker.sample();
        assert_eq!(tracker.minutes_used(), 0.0);
        // Next regular sample credits again.
        fx.clock.advance_secs(10);
        tracker.sample();
        assert!((tracker.minutes_used() - 10.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn activity_signal_moves_window_without_adding_time() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker(120.0);
        tracker.toggle_tracking();
        fx.clock.advance_secs(90);
        tracker.on_activity_signal(ActivitySignal::KeyDown);
        assert_eq!(tracker.minutes_used(), 0.0);
        fx.clock.advance_secs(5);
        tracker.sample();
        assert!((tracker.minutes_used() - 5.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn enabling_tracking_starts_window_at_toggle_time() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker(120.0);
        fx.clock.advance_secs(30);
        tracker.toggle_tracking();
        fx.clock.advance_secs(10);
        tracker.sample();
        assert!((tracker.minutes_used() - 10.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn warn_fraction_follows_percent() {
        let settings = UsageAlertSettings {
            enabled: true,
            warn_at_percent: 50,
        };
        assert_eq!(settings.warn_fraction(), 0.5);
        assert_eq!(UsageAlertSettings::default().warn_fraction(), 0.8);
    }

    #[test]
    fn not_tracking_samples_nothing() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker(120.0);
        assert!(!tracker.is_ticking());
        fx.clock.advance_secs(10);
        assert!(tracker.sample().is_empty());
        assert_eq!(tracker.minutes_used(), 0.0);
    }

    #[test]
    fn toggling_keeps_one_tick_source() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker(120.0);
        tracker.toggle_tracking();
        assert_eq!(fx.scheduler.live_sources(), 1);
        tracker.toggle_tracking();
        assert_eq!(fx.scheduler.live_sources(), 0);
        tracker.toggle_tracking();
        assert_eq!(fx.scheduler.live_sources(), 1);
    }

    #[test]
    fn warning_and_limit_fire_once_each() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker(10.0);
        tracker.toggle_tracking();
        let events = fx.run_minutes(&mut tracker, 20);
        assert_eq!(count(&events, |e| matches!(e, Event::UsageWarning { .. })), 1);
        assert_eq!(count(&events, |e| matches!(e, Event::UsageLimitReached { .. })), 1);
        assert_eq!(fx.notifier.toasts().len(), 2);
    }

    #[test]
    fn reset_rearms_alerts() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker(10.0);
        tracker.toggle_tracking();
        fx.run_minutes(&mut tracker, 9);
        tracker.reset_counter();
        assert_eq!(tracker.minutes_used(), 0.0);
        let events = fx.run_minutes(&mut tracker, 9);
        assert_eq!(count(&events, |e| matches!(e, Event::UsageWarning { .. })), 1);
    }

    #[test]
    fn raising_limit_does_not_rearm() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker(10.0);
        tracker.toggle_tracking();
        fx.run_minutes(&mut tracker, 9);
        tracker.set_limit(100.0).unwrap();
        let events = fx.run_minutes(&mut tracker, 80);
        assert_eq!(count(&events, |e| matches!(e, Event::UsageWarning { .. })), 0);
    }

    #[test]
    fn latches_survive_reload() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker(10.0);
        tracker.toggle_tracking();
        fx.run_minutes(&mut tracker, 9);
        drop(tracker);

        let mut reloaded = fx.tracker(10.0);
        assert!(reloaded.state().tracking);
        assert!(reloaded.latches().warned);
        let events = fx.run_minutes(&mut reloaded, 1);
        assert_eq!(count(&events, |e| matches!(e, Event::UsageWarning { .. })), 0);
    }

    #[test]
    fn stale_day_record_loads_as_zero() {
        let fx = Fixture::new();
        fx.storage
            .save(
                &keys::usage("u1"),
                &serde_json::json!({"timeUsed": 95.0, "isTracking": true, "dayStamp": "2024-04-30"}),
            )
            .unwrap();
        let tracker = fx.tracker(120.0);
        assert_eq!(tracker.minutes_used(), 0.0);
        assert!(tracker.state().tracking);
        assert_eq!(tracker.latches(), ThresholdLatches::default());
    }

    #[test]
    fn rollover_while_tracking_resets_and_rearms() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker(10.0);
        tracker.toggle_tracking();
        fx.run_minutes(&mut tracker, 11);
        fx.clock.advance_ms(DAY_MS);
        assert_eq!(tracker.minutes_used(), 0.0);
        let events = tracker.sample();
        assert!(matches!(events[0], Event::DayRolledOver { .. }));
        assert_eq!(tracker.latches(), ThresholdLatches::default());
    }

    #[test]
    fn limit_and_alert_settings_persist_and_validate() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker(120.0);
        tracker.set_limit(45.0).unwrap();
        assert!(tracker.set_limit(0.0).is_err());
        assert!(tracker.set_limit(-5.0).is_err());
        assert!(tracker
            .set_alert_settings(UsageAlertSettings {
                enabled: true,
                warn_at_percent: 0
            })
            .is_err());
        tracker
            .set_alert_settings(UsageAlertSettings {
                enabled: false,
                warn_at_percent: 50,
            })
            .unwrap();
        drop(tracker);

        let reloaded = fx.tracker(120.0);
        assert_eq!(reloaded.state().limit_minutes, 45.0);
        assert!(!reloaded.alert_settings().enabled);
        assert_eq!(reloaded.alert_settings().warn_at_percent, 50);
    }
}
