//! Per-user dashboard.
//!
//! Owns one instance of every habit engine for a user, drives them from a
//! single `pump()` call, and keeps the wellness score current. Dropping the
//! dashboard drops every tick source it holds.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::{Event, Feature};
use crate::notify::{Alerts, Notifier};
use crate::reminder::HydrationReminder;
use crate::scheduler::{Scheduler, TickSource};
use crate::score::{wellness_score, CustomActivity, WellnessInputs, WellnessScore};
use crate::storage::{keys, Config, Storage};
use crate::timer::{MeditationTimer, PomodoroCycle};
use crate::usage::{ScreenTimeTracker, UsageAlertSettings};

/// Score recompute cadence when nothing else changed.
pub const SCORE_PERIOD: Duration = Duration::from_secs(60);

/// Host callbacks. Fire-and-forget, invoked synchronously during `record`.
pub trait HostHooks: Send + Sync {
    /// A countdown finished.
    fn on_complete(&self, _feature: Feature) {}

    /// A persisted setting or score input changed.
    fn on_settings_change(&self, _feature: Feature) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl HostHooks for NoHooks {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Mood {
    percent: f64,
    day_stamp: String,
}

pub struct Dashboard {
    user_id: String,
    storage: Storage,
    scheduler: Scheduler,
    hooks: Arc<dyn HostHooks>,
    meditation: MeditationTimer,
    hydration: HydrationReminder,
    screen_time: ScreenTimeTracker,
    pomodoro: PomodoroCycle,
    meditation_target: f64,
    water_target: f64,
    mood: Option<Mood>,
    custom_activities: Vec<CustomActivity>,
    score_ticker: TickSource,
    last_score: Option<WellnessScore>,
}

impl Dashboard {
    /// Build every engine for `user_id`, loading persisted state and falling
    /// back to `config` for anything not yet stored.
    pub fn new(
        user_id: &str,
        config: &Config,
        storage: Storage,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ValidationError> {
        if user_id.trim().is_empty() {
            return Err(ValidationError::Empty("user_id"));
        }
        config.validate()?;

        let scheduler = Scheduler::new(storage.clock().clone());
        let alerts = Alerts::new(notifier).with_native(config.notifications.native_enabled);

        let meditation = MeditationTimer::load(
            user_id,
            storage.clone(),
            scheduler.clone(),
            alerts.clone(),
            config.meditation.default_minutes,
        )?;
        let hydration = HydrationReminder::load(
            user_id,
            storage.clone(),
            scheduler.clone(),
            alerts.clone(),
            config.hydration.interval_minutes,
        )?;
        let screen_time = ScreenTimeTracker::load(
            user_id,
            storage.clone(),
            scheduler.clone(),
            alerts.clone(),
            f64::from(config.screen_time.limit_minutes),
            UsageAlertSettings {
                enabled: true,
                warn_at_percent: config.screen_time.warn_at_percent,
            },
        )?;
        let pomodoro = PomodoroCycle::new(config.pomodoro_settings(), scheduler.clone(), alerts)?;
        let score_ticker = scheduler.every(SCORE_PERIOD);
        let mood = storage.load::<Mood>(&keys::mood(user_id));

        let mut dashboard = Self {
            user_id: user_id.to_string(),
            storage,
            scheduler,
            hooks: Arc::new(NoHooks),
            meditation,
            hydration,
            screen_time,
            pomodoro,
            meditation_target: f64::from(config.targets.meditation_minutes),
            water_target: f64::from(config.targets.water_ml),
            mood,
            custom_activities: Vec::new(),
            score_ticker,
            last_score: None,
        };
        dashboard.last_score = Some(dashboard.score());
        Ok(dashboard)
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn HostHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    // ── Engines ──────────────────────────────────────────────────────

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn meditation(&self) -> &MeditationTimer {
        &self.meditation
    }

    pub fn meditation_mut(&mut self) -> &mut MeditationTimer {
        &mut self.meditation
    }

    pub fn hydration(&self) -> &HydrationReminder {
        &self.hydration
    }

    pub fn hydration_mut(&mut self) -> &mut HydrationReminder {
        &mut self.hydration
    }

    pub fn screen_time(&self) -> &ScreenTimeTracker {
        &self.screen_time
    }

    pub fn screen_time_mut(&mut self) -> &mut ScreenTimeTracker {
        &mut self.screen_time
    }

    pub fn pomodoro(&self) -> &PomodoroCycle {
        &self.pomodoro
    }

    pub fn pomodoro_mut(&mut self) -> &mut PomodoroCycle {
        &mut self.pomodoro
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    // ── Score inputs ─────────────────────────────────────────────────

    /// Log today's mood (0..=100), or clear it with `None`.
    pub fn set_mood(&mut self, percent: Option<f64>) -> Result<Vec<Event>, ValidationError> {
        if let Some(p) = percent {
            if !(0.0..=100.0).contains(&p) {
                return Err(ValidationError::OutOfRange {
                    field: "mood_percent",
                    value: p,
                    min: 0.0,
                    max: 100.0,
                });
            }
        }
        self.mood = percent.map(|percent| Mood {
            percent,
            day_stamp: self.storage.day_stamp(),
        });
        let key = keys::mood(&self.user_id);
        match &self.mood {
            Some(mood) => self.storage.save_or_warn(&key, mood),
            None => {
                if let Err(e) = self.storage.remove(&key) {
                    tracing::warn!(error = %e, "failed to clear mood");
                }
            }
        }
        Ok(self.refresh_score(false))
    }

    pub fn set_custom_activities(&mut self, activities: Vec<CustomActivity>) -> Vec<Event> {
        self.custom_activities = activities;
        self.refresh_score(false)
    }

    /// Snapshot of every score input.
    pub fn inputs(&self) -> WellnessInputs {
        let today = self.storage.day_stamp();
        WellnessInputs {
            mood_percent: self
                .mood
                .as_ref()
                .filter(|m| m.day_stamp == today)
                .map(|m| m.percent),
            screen_time_used: self.screen_time.minutes_used(),
            screen_time_target: self.screen_time.state().limit_minutes,
            meditation_used: self.meditation.minutes_today(),
            meditation_target: self.meditation_target,
            water_used: f64::from(self.hydration.intake_today_ml()),
            water_target: self.water_target,
            custom_activities: self.custom_activities.clone(),
        }
    }

    pub fn score(&self) -> WellnessScore {
        wellness_score(&self.inputs())
    }

    pub fn last_score(&self) -> Option<&WellnessScore> {
        self.last_score.as_ref()
    }

    // ── Driving ──────────────────────────────────────────────────────

    /// Poll every engine once and return what happened.
    pub fn pump(&mut self) -> Vec<Event> {
        let mut events = self.meditation.poll();
        events.extend(self.hydration.poll());
        events.extend(self.screen_time.poll());
        events.extend(self.pomodoro.poll());
        let cadence = self.score_ticker.poll();
        self.record_with(events, cadence)
    }

    /// Pass events from host-initiated engine calls through the hooks and
    /// the score refresh.
    pub fn record(&mut self, events: impl IntoIterator<Item = Event>) -> Vec<Event> {
        self.record_with(events.into_iter().collect(), false)
    }

    fn record_with(&mut self, mut events: Vec<Event>, force_score: bool) -> Vec<Event> {
        let mut settings_changed = false;
        for event in &events {
            if let Event::CountdownCompleted { feature, .. } = event {
                self.hooks.on_complete(*feature);
            }
            if event.is_settings_change() {
                settings_changed = true;
                self.hooks.on_settings_change(event.feature());
            }
        }
        events.extend(self.refresh_score(force_score || settings_changed));
        events
    }

    /// Recompute and emit `ScoreUpdated` if the score moved, or always when
    /// `force` is set.
    fn refresh_score(&mut self, force: bool) -> Vec<Event> {
        let score = self.score();
        let changed = self
            .last_score
            .as_ref()
            .map_or(true, |last| last.score != score.score);
        let value = score.score;
        self.last_score = Some(score);
        if changed || force {
            tracing::debug!(user = %self.user_id, score = value, "wellness score updated");
            vec![Event::ScoreUpdated {
                score: value,
                at: self.storage.clock().now_utc(),
            }]
        } else {
            Vec::new()
        }
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("user_id", &self.user_id)
            .field("meditation", &self.meditation)
            .field("hydration", &self.hydration)
            .field("screen_time", &self.screen_time)
            .field("pomodoro", &self.pomodoro)
            .field("last_score", &self.last_score.as_ref().map(|s| s.score))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, DAY_MS};
    use crate::notify::{Permission, RecordingNotifier};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHooks {
        completed: Mutex<Vec<Feature>>,
        changed: Mutex<Vec<Feature>>,
    }

    impl HostHooks for RecordingHooks {
        fn on_complete(&self, feature: Feature) {
            self.completed.lock().unwrap().push(feature);
        }

        fn on_settings_change(&self, feature: Feature) {
            self.changed.lock().unwrap().push(feature);
        }
    }

    fn dashboard(clock: &Arc<ManualClock>) -> Dashboard {
        let mut config = Config::default();
        config.meditation.default_minutes = 1;
        Dashboard::new(
            "u1",
            &config,
            Storage::in_memory(clock.clone()),
            Arc::new(RecordingNotifier::new(Permission::Granted)),
        )
        .unwrap()
    }

    fn score_of(events: &[Event]) -> Option<u32> {
        events.iter().rev().find_map(|e| match e {
            Event::ScoreUpdated { score, .. } => Some(*score),
            _ => None,
        })
    }

    #[test]
    fn empty_user_is_rejected() {
        let clock = Arc::new(ManualClock::at_date("2024-05-01"));
        let err = Dashboard::new(
            "  ",
            &Config::default(),
            Storage::in_memory(clock),
            Arc::new(RecordingNotifier::new(Permission::Granted)),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::Empty("user_id"));
    }

    #[test]
    fn fresh_dashboard_holds_only_the_score_ticker() {
        let clock = Arc::new(ManualClock::at_date("2024-05-01"));
        let dash = dashboard(&clock);
        assert_eq!(dash.scheduler().live_sources(), 1);
        // Full screen-time component plus the meditation and water bonuses.
        assert_eq!(dash.last_score().map(|s| s.score), Some(28));
    }

    #[test]
    fn mood_out_of_range_is_rejected() {
        let clock = Arc::new(ManualClock::at_date("2024-05-01"));
        let mut dash = dashboard(&clock);
        assert!(dash.set_mood(Some(101.0)).is_err());
        assert!(dash.set_mood(Some(-1.0)).is_err());
        assert_eq!(dash.inputs().mood_percent, None);
    }

    #[test]
    fn mood_only_counts_for_the_day_it_was_logged() {
        let clock = Arc::new(ManualClock::at_date("2024-05-01"));
        let mut dash = dashboard(&clock);
        let events = dash.set_mood(Some(80.0)).unwrap();
        assert!(score_of(&events).is_some());
        assert_eq!(dash.inputs().mood_percent, Some(80.0));
        clock.advance_ms(DAY_MS);
        assert_eq!(dash.inputs().mood_percent, None);
    }

    #[test]
    fn mood_survives_reload_for_the_same_day() {
        let clock = Arc::new(ManualClock::at_date("2024-05-01"));
        let storage = Storage::in_memory(clock.clone());
        let open = || {
            Dashboard::new(
                "u1",
                &Config::default(),
                storage.clone(),
                Arc::new(RecordingNotifier::new(Permission::Granted)),
            )
            .unwrap()
        };
        open().set_mood(Some(60.0)).unwrap();
        assert_eq!(open().inputs().mood_percent, Some(60.0));

        open().set_mood(None).unwrap();
        assert_eq!(open().inputs().mood_percent, None);
    }

    #[test]
    fn dotted_user_id_does_not_touch_another_users_limit() {
        let clock = Arc::new(ManualClock::at_date("2024-05-01"));
        let storage = Storage::in_memory(clock.clone());
        let open = |user: &str| {
            Dashboard::new(
                user,
                &Config::default(),
                storage.clone(),
                Arc::new(RecordingNotifier::new(Permission::Granted)),
            )
            .unwrap()
        };
        open("bob").screen_time_mut().set_limit(45.0).unwrap();
        open("limit.bob").screen_time_mut().toggle_tracking();

        assert_eq!(open("bob").screen_time().state().limit_minutes, 45.0);
        assert!(!open("bob").screen_time().state().tracking);
    }

    #[test]
    fn completing_meditation_runs_hooks_and_updates_score() {
        let clock = Arc::new(ManualClock::at_date("2024-05-01"));
        let hooks = Arc::new(RecordingHooks::default());
        let mut dash = dashboard(&clock).with_hooks(hooks.clone());

        let started = dash.meditation_mut().start();
        dash.record(started);
        let mut events = Vec::new();
        for _ in 0..60 {
            clock.advance_secs(1);
            events.extend(dash.pump());
        }

        assert!(events
            .iter()
            .any(|e| matches!(e, Event::CountdownCompleted { .. })));
        assert_eq!(*hooks.completed.lock().unwrap(), vec![Feature::Meditation]);
        assert!(hooks
            .changed
            .lock()
            .unwrap()
            .contains(&Feature::Meditation));
        assert_eq!(dash.inputs().meditation_used, 1.0);
        assert_eq!(score_of(&events), Some(dash.score().score));
    }

    #[test]
    fn reference_day_scores_94() {
        let clock = Arc::new(ManualClock::at_date("2024-05-01"));
        let mut dash = dashboard(&clock);

        dash.meditation_mut().set_minutes(10).unwrap();
        let started = dash.meditation_mut().start();
        dash.record(started);
        let tracking = dash.screen_time_mut().toggle_tracking();
        dash.record([tracking]);
        for _ in 0..600 {
            clock.advance_secs(1);
            dash.pump();
        }
        let intake = dash.hydration_mut().record_intake(2000).unwrap();
        dash.record(intake);
        let events = dash.set_mood(Some(80.0)).unwrap();

        let inputs = dash.inputs();
        assert_eq!(inputs.meditation_used, 10.0);
        assert_eq!(inputs.water_used, 2000.0);
        assert!((inputs.screen_time_used - 10.0).abs() < 1e-6);
        assert_eq!(score_of(&events), Some(94));
    }

    #[test]
    fn score_cadence_emits_even_without_changes() {
        let clock = Arc::new(ManualClock::at_date("2024-05-01"));
        let mut dash = dashboard(&clock);
        assert!(dash.pump().is_empty());
        clock.advance_ms(SCORE_PERIOD.as_millis() as u64);
        let events = dash.pump();
        assert_eq!(score_of(&events), Some(28));
    }

    #[test]
    fn unchanged_score_is_not_reemitted_on_host_calls() {
        let clock = Arc::new(ManualClock::at_date("2024-05-01"));
        let mut dash = dashboard(&clock);
        let paused = dash.pomodoro_mut().pause();
        assert!(dash.record(paused).is_empty());
    }

    #[test]
    fn dropping_the_dashboard_releases_every_tick_source() {
        let clock = Arc::new(ManualClock::at_date("2024-05-01"));
        let mut dash = dashboard(&clock);
        dash.meditation_mut().start();
        dash.pomodoro_mut().start();
        dash.hydration_mut().activate();
        dash.screen_time_mut().toggle_tracking();
        let scheduler = dash.scheduler().clone();
        assert_eq!(scheduler.live_sources(), 5);

        drop(dash);
        assert_eq!(scheduler.live_sources(), 0);
    }
}
