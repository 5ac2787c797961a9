//! Countdown timer engine.
//!
//! A tick-count driven countdown shared by the meditation timer and the
//! pomodoro cycle. The caller is responsible for calling `poll()` often
//! enough; each elapsed second of the owned [`TickSource`] removes exactly
//! one second from the remaining time.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused | Completed) -> Idle (via reset/configure)
//! ```
//!
//! Remaining time deliberately follows the discrete tick count rather than
//! the wall-clock delta. A throttled host that delivers fewer ticks simply
//! lets the countdown run late; it never skips straight past zero, so the
//! completion event is emitted exactly once.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::{Event, Feature};
use crate::scheduler::{Scheduler, TickSource};
use crate::storage::Storage;

const TICK: Duration = Duration::from_secs(1);

/// Observable countdown state.
///
/// Invariant: `remaining_seconds <= total_duration_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownState {
    pub total_duration_seconds: u64,
    pub remaining_seconds: u64,
    pub running: bool,
}

/// One-shot countdown with an optional persisted duration.
pub struct Countdown {
    feature: Feature,
    state: CountdownState,
    scheduler: Scheduler,
    ticker: Option<TickSource>,
    persist: Option<(Storage, String)>,
}

impl Countdown {
    /// Create a countdown that is not persisted.
    pub fn new(
        feature: Feature,
        duration_secs: u64,
        scheduler: Scheduler,
    ) -> Result<Self, ValidationError> {
        ValidationError::require_positive("duration_seconds", duration_secs as f64)?;
        Ok(Self {
            feature,
            state: CountdownState {
                total_duration_seconds: duration_secs,
                remaining_seconds: duration_secs,
                running: false,
            },
            scheduler,
            ticker: None,
            persist: None,
        })
    }

    /// Create a countdown whose duration is loaded from and saved to `key`.
    ///
    /// A missing, malformed or non-positive stored duration falls back to
    /// `default_secs`.
    pub fn persisted(
        feature: Feature,
        storage: Storage,
        key: String,
        default_secs: u64,
        scheduler: Scheduler,
    ) -> Result<Self, ValidationError> {
        let duration = storage
            .load::<u64>(&key)
            .filter(|secs| *secs > 0)
            .unwrap_or(default_secs);
        let mut countdown = Self::new(feature, duration, scheduler)?;
        countdown.persist = Some((storage, key));
        Ok(countdown)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn feature(&self) -> Feature {
        self.feature
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Whether a tick source is currently held.
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// 0.0 .. 1.0 progress through the current run.
    pub fn progress(&self) -> f64 {
        let total = self.state.total_duration_seconds;
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.state.remaining_seconds as f64 / total as f64)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Set a new total duration. Resets the remaining time unless running.
    pub fn configure(&mut self, duration_secs: u64) -> Result<Event, ValidationError> {
        ValidationError::require_positive("duration_seconds", duration_secs as f64)?;
        self.state.total_duration_seconds = duration_secs;
        if self.state.running {
            self.state.remaining_seconds = self.state.remaining_seconds.min(duration_secs);
        } else {
            self.state.remaining_seconds = duration_secs;
        }
        if let Some((storage, key)) = &self.persist {
            storage.save_or_warn(key, &duration_secs);
        }
        Ok(Event::DurationChanged {
            feature: self.feature,
            total_secs: duration_secs,
            at: self.scheduler.clock().now_utc(),
        })
    }

    /// Start ticking. No-op while already running.
    ///
    /// Starting a finished countdown rewinds it to the full duration first.
    pub fn start(&mut self) -> Option<Event> {
        if self.state.running {
            return None;
        }
        if self.state.remaining_seconds == 0 {
            self.state.remaining_seconds = self.state.total_duration_seconds;
        }
        self.state.running = true;
        self.ticker = Some(self.scheduler.every(TICK));
        tracing::debug!(feature = ?self.feature, remaining = self.state.remaining_seconds, "countdown started");
        Some(Event::CountdownStarted {
            feature: self.feature,
            remaining_secs: self.state.remaining_seconds,
            at: self.scheduler.clock().now_utc(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if !self.state.running {
            return None;
        }
        self.state.running = false;
        self.ticker = None;
        Some(Event::CountdownPaused {
            feature: self.feature,
            remaining_secs: self.state.remaining_seconds,
            at: self.scheduler.clock().now_utc(),
        })
    }

    pub fn toggle(&mut self) -> Option<Event> {
        if self.state.running {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Remove one second. Returns `Some(CountdownCompleted)` on reaching zero.
    ///
    /// Ignored unless running, so ticks past zero cannot complete twice.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.running {
            return None;
        }
        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds > 0 {
            return None;
        }
        self.state.running = false;
        self.ticker = None;
        tracing::info!(feature = ?self.feature, total = self.state.total_duration_seconds, "countdown completed");
        Some(Event::CountdownCompleted {
            feature: self.feature,
            total_secs: self.state.total_duration_seconds,
            at: self.scheduler.clock().now_utc(),
        })
    }

    /// Drive the countdown from its tick source.
    pub fn poll(&mut self) -> Option<Event> {
        let fired = self.ticker.as_mut().is_some_and(TickSource::poll);
        if fired {
            self.tick()
        } else {
            None
        }
    }

    /// Stop and rewind to the full duration.
    pub fn reset(&mut self) -> Event {
        self.state.running = false;
        self.ticker = None;
        self.state.remaining_seconds = self.state.total_duration_seconds;
        Event::CountdownReset {
            feature: self.feature,
            total_secs: self.state.total_duration_seconds,
            at: self.scheduler.clock().now_utc(),
        }
    }
}

impl std::fmt::Debug for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("feature", &self.feature)
            .field("state", &self.state)
            .field("ticking", &self.ticker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn setup(secs: u64) -> (Arc<ManualClock>, Scheduler, Countdown) {
        let clock = Arc::new(ManualClock::new(0));
        let scheduler = Scheduler::new(clock.clone());
        let countdown = Countdown::new(Feature::Meditation, secs, scheduler.clone()).unwrap();
        (clock, scheduler, countdown)
    }

    fn completions(events: &[Option<Event>]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, Some(Event::CountdownCompleted { .. })))
            .count()
    }

    #[test]
    fn start_pause_resume() {
        let (_clock, scheduler, mut countdown) = setup(60);
        assert!(countdown.start().is_some());
        assert!(countdown.is_running());
        assert_eq!(scheduler.live_sources(), 1);

        assert!(countdown.pause().is_some());
        assert!(!countdown.is_running());
        assert_eq!(scheduler.live_sources(), 0);

        assert!(countdown.toggle().is_some());
        assert!(countdown.is_running());
    }

    #[test]
    fn double_start_keeps_one_tick_source() {
        let (_clock, scheduler, mut countdown) = setup(60);
        countdown.start();
        assert!(countdown.start().is_none());
        assert!(countdown.start().is_none());
        assert_eq!(scheduler.live_sources(), 1);
    }

    #[test]
    fn poll_ticks_once_per_elapsed_second() {
        let (clock, _scheduler, mut countdown) = setup(3);
        countdown.start();
        assert!(countdown.poll().is_none());
        clock.advance_secs(1);
        assert!(countdown.poll().is_none());
        assert_eq!(countdown.state().remaining_seconds, 2);
        clock.advance_secs(1);
        countdown.poll();
        clock.advance_secs(1);
        assert!(matches!(
            countdown.poll(),
            Some(Event::CountdownCompleted { total_secs: 3, .. })
        ));
        assert!(!countdown.is_ticking());
    }

    #[test]
    fn throttled_host_does_not_skip_to_zero() {
        let (clock, _scheduler, mut countdown) = setup(10);
        countdown.start();
        clock.advance_secs(120);
        assert!(countdown.poll().is_none());
        assert_eq!(countdown.state().remaining_seconds, 9);
    }

    #[test]
    fn configure_while_running_keeps_remaining_within_total() {
        let (_clock, _scheduler, mut countdown) = setup(600);
        countdown.start();
        for _ in 0..10 {
            countdown.tick();
        }
        countdown.configure(300).unwrap();
        assert_eq!(countdown.state().remaining_seconds, 300);
        countdown.configure(900).unwrap();
        assert_eq!(countdown.state().remaining_seconds, 300);
        assert!(countdown.is_running());
    }

    #[test]
    fn configure_rejects_zero_and_keeps_previous() {
        let (_clock, _scheduler, mut countdown) = setup(60);
        assert!(countdown.configure(0).is_err());
        assert_eq!(countdown.state().total_duration_seconds, 60);
        assert!(Countdown::new(Feature::Meditation, 0, countdown.scheduler.clone()).is_err());
    }

    #[test]
    fn reset_is_idempotent() {
        let (_clock, scheduler, mut countdown) = setup(60);
        countdown.start();
        countdown.tick();
        countdown.reset();
        let once = countdown.state();
        countdown.reset();
        assert_eq!(countdown.state(), once);
        assert_eq!(
            once,
            CountdownState {
                total_duration_seconds: 60,
                remaining_seconds: 60,
                running: false
            }
        );
        assert_eq!(scheduler.live_sources(), 0);
    }

    #[test]
    fn start_after_completion_rewinds() {
        let (_clock, _scheduler, mut countdown) = setup(2);
        countdown.start();
        countdown.tick();
        countdown.tick();
        assert_eq!(countdown.state().remaining_seconds, 0);
        assert!(countdown.start().is_some());
        assert_eq!(countdown.state().remaining_seconds, 2);
    }

    #[test]
    fn persisted_duration_survives_reload() {
        let clock = Arc::new(ManualClock::new(0));
        let scheduler = Scheduler::new(clock.clone());
        let storage = Storage::in_memory(clock);
        let key = "wellroom.meditation.duration/u1".to_string();

        let mut first =
            Countdown::persisted(Feature::Meditation, storage.clone(), key.clone(), 600, scheduler.clone())
                .unwrap();
        assert_eq!(first.state().total_duration_seconds, 600);
        first.configure(900).unwrap();

        let second =
            Countdown::persisted(Feature::Meditation, storage, key, 600, scheduler).unwrap();
        assert_eq!(second.state().total_duration_seconds, 900);
        assert_eq!(second.state().remaining_seconds, 900);
    }

    proptest! {
        #[test]
        fn configure_sets_total_and_remaining(d in 1u64..100_000) {
            let (_clock, _scheduler, mut countdown) = setup(60);
            countdown.configure(d).unwrap();
            prop_assert_eq!(countdown.state().total_duration_seconds, d);
            prop_assert_eq!(countdown.state().remaining_seconds, d);
        }

        #[test]
        fn ticks_below_total_subtract(total in 2u64..500, frac in 0.0f64..1.0) {
            let n = ((total - 1) as f64 * frac) as u64;
            let (_clock, _scheduler, mut countdown) = setup(total);
            countdown.start();
            let events: Vec<_> = (0..n).map(|_| countdown.tick()).collect();
            prop_assert_eq!(completions(&events), 0);
            prop_assert_eq!(countdown.state().remaining_seconds, total - n);
            prop_assert!(countdown.is_running());
        }

        #[test]
        fn ticks_past_total_complete_once(total in 1u64..300, extra in 0u64..300) {
            let (_clock, scheduler, mut countdown) = setup(total);
            countdown.start();
            let events: Vec<_> = (0..total + extra).map(|_| countdown.tick()).collect();
            prop_assert_eq!(completions(&events), 1);
            prop_assert_eq!(countdown.state().remaining_seconds, 0);
            prop_assert!(!countdown.is_running());
            prop_assert_eq!(scheduler.live_sources(), 0);
        }
    }
}
