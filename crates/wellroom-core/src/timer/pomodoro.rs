//! Pomodoro cycle state machine.
//!
//! Sequences focus sessions and breaks on top of a [`Countdown`]:
//!
//! ```text
//! Focus -> ShortBreak -> Focus -> ... -> Focus -> LongBreak -> Focus
//!                                  (every long_break_interval-th focus)
//! ```
//!
//! A long break closes a round. When the round counter passes
//! `total_rounds` the machine parks in a cycle-complete state that only
//! `reset_cycle()` leaves.

use serde::{Deserialize, Serialize};

use super::countdown::Countdown;
use crate::error::ValidationError;
use crate::events::{Event, Feature};
use crate::notify::{Alerts, Cue, Notification};
use crate::scheduler::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PomodoroMode {
    Focus,
    ShortBreak,
    LongBreak,
}

impl PomodoroMode {
    pub fn is_break(self) -> bool {
        !matches!(self, PomodoroMode::Focus)
    }

    pub fn label(self) -> &'static str {
        match self {
            PomodoroMode::Focus => "Focus",
            PomodoroMode::ShortBreak => "Short Break",
            PomodoroMode::LongBreak => "Long Break",
        }
    }
}

/// Durations and round structure, supplied by the settings collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroSettings {
    pub focus_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
    /// Focus sessions per long break.
    pub long_break_interval: u32,
    pub total_rounds: u32,
    /// Start the next phase automatically after a transition.
    pub auto_start_next: bool,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            focus_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
            long_break_interval: 4,
            total_rounds: 4,
            auto_start_next: true,
        }
    }
}

impl PomodoroSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::require_positive("focus_secs", self.focus_secs as f64)?;
        ValidationError::require_positive("short_break_secs", self.short_break_secs as f64)?;
        ValidationError::require_positive("long_break_secs", self.long_break_secs as f64)?;
        ValidationError::require_positive(
            "long_break_interval",
            f64::from(self.long_break_interval),
        )?;
        ValidationError::require_positive("total_rounds", f64::from(self.total_rounds))
    }

    pub fn duration_for(&self, mode: PomodoroMode) -> u64 {
        match mode {
            PomodoroMode::Focus => self.focus_secs,
            PomodoroMode::ShortBreak => self.short_break_secs,
            PomodoroMode::LongBreak => self.long_break_secs,
        }
    }
}

/// Observable pomodoro state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroState {
    pub mode: PomodoroMode,
    pub remaining_seconds: u64,
    pub running: bool,
    pub completed_intervals_in_cycle: u32,
    pub current_round: u32,
    pub cycle_complete: bool,
}

pub struct PomodoroCycle {
    settings: PomodoroSettings,
    mode: PomodoroMode,
    countdown: Countdown,
    completed_intervals: u32,
    current_round: u32,
    cycle_complete: bool,
    scheduler: Scheduler,
    alerts: Alerts,
}

impl PomodoroCycle {
    pub fn new(
        settings: PomodoroSettings,
        scheduler: Scheduler,
        alerts: Alerts,
    ) -> Result<Self, ValidationError> {
        settings.validate()?;
        let countdown = Countdown::new(Feature::Pomodoro, settings.focus_secs, scheduler.clone())?;
        Ok(Self {
            settings,
            mode: PomodoroMode::Focus,
            countdown,
            completed_intervals: 0,
            current_round: 1,
            cycle_complete: false,
            scheduler,
            alerts,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> PomodoroState {
        let countdown = self.countdown.state();
        PomodoroState {
            mode: self.mode,
            remaining_seconds: if self.cycle_complete {
                0
            } else {
                countdown.remaining_seconds
            },
            running: countdown.running,
            completed_intervals_in_cycle: self.completed_intervals,
            current_round: self.current_round,
            cycle_complete: self.cycle_complete,
        }
    }

    pub fn settings(&self) -> &PomodoroSettings {
        &self.settings
    }

    pub fn mode(&self) -> PomodoroMode {
        self.mode
    }

    pub fn is_cycle_complete(&self) -> bool {
        self.cycle_complete
    }

    pub fn is_ticking(&self) -> bool {
        self.countdown.is_ticking()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.cycle_complete {
            return None;
        }
        self.countdown.start()
    }

    pub fn pause(&mut self) -> Option<Event> {
        self.countdown.pause()
    }

    pub fn toggle(&mut self) -> Option<Event> {
        if self.countdown.is_running() {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Rewind the current phase without changing mode or counters.
    pub fn reset_phase(&mut self) -> Event {
        self.countdown.reset()
    }

    /// Leave any state (including cycle-complete) for round 1, focus mode.
    pub fn reset_cycle(&mut self) -> Vec<Event> {
        self.cycle_complete = false;
        self.completed_intervals = 0;
        self.current_round = 1;
        self.mode = PomodoroMode::Focus;
        self.countdown.reset();
        let mut events = Vec::with_capacity(2);
        if let Ok(event) = self.countdown.configure(self.settings.focus_secs) {
            events.push(event);
        }
        events.push(Event::PomodoroCycleReset {
            at: self.scheduler.clock().now_utc(),
        });
        events
    }

    /// Swap in new settings; the current phase picks up its new duration.
    pub fn update_settings(&mut self, settings: PomodoroSettings) -> Result<(), ValidationError> {
        settings.validate()?;
        let duration = settings.duration_for(self.mode);
        self.settings = settings;
        self.countdown.configure(duration)?;
        Ok(())
    }

    /// Finish the current phase now, applying the normal transition.
    pub fn skip(&mut self) -> Vec<Event> {
        if self.cycle_complete {
            return Vec::new();
        }
        let was_running = self.countdown.is_running();
        self.countdown.pause();
        self.transition(was_running)
    }

    pub fn tick(&mut self) -> Vec<Event> {
        match self.countdown.tick() {
            Some(done) => self.complete_phase(done),
            None => Vec::new(),
        }
    }

    pub fn poll(&mut self) -> Vec<Event> {
        match self.countdown.poll() {
            Some(done) => self.complete_phase(done),
            None => Vec::new(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete_phase(&mut self, done: Event) -> Vec<Event> {
        let mut events = vec![done];
        events.extend(self.transition(true));
        events
    }

    fn transition(&mut self, was_running: bool) -> Vec<Event> {
        let from = self.mode;
        let at = self.scheduler.clock().now_utc();
        let mut events = Vec::new();

        let to = match from {
            PomodoroMode::Focus => {
                let next = self.completed_intervals + 1;
                if next >= self.settings.long_break_interval {
                    self.completed_intervals = 0;
                    self.current_round += 1;
                    PomodoroMode::LongBreak
                } else {
                    self.completed_intervals = next;
                    PomodoroMode::ShortBreak
                }
            }
            PomodoroMode::ShortBreak | PomodoroMode::LongBreak => PomodoroMode::Focus,
        };

        self.alerts.cue(if from.is_break() {
            Cue::BreakComplete
        } else {
            Cue::SessionComplete
        });

        if self.current_round > self.settings.total_rounds {
            self.cycle_complete = true;
            self.mode = PomodoroMode::Focus;
            self.countdown.reset();
            tracing::info!(rounds = self.settings.total_rounds, "pomodoro cycle complete");
            self.alerts.dispatch(&Notification::new(
                "Pomodoro cycle complete",
                format!("All {} rounds finished", self.settings.total_rounds),
            ));
            events.push(Event::PomodoroCycleComplete {
                rounds: self.settings.total_rounds,
                at,
            });
            return events;
        }

        self.mode = to;
        if let Err(e) = self.countdown.configure(self.settings.duration_for(to)) {
            tracing::warn!(error = %e, "invalid phase duration");
        }
        tracing::info!(from = ?from, to = ?to, round = self.current_round, "pomodoro transition");
        self.alerts.dispatch(&Notification::new(
            format!("{} finished", from.label()),
            format!("Next up: {}", to.label()),
        ));
        events.push(Event::PomodoroPhaseChanged {
            from,
            to,
            round: self.current_round,
            completed_intervals: self.completed_intervals,
            at,
        });
        if was_running && self.settings.auto_start_next {
            events.extend(self.countdown.start());
        }
        events
    }
}

impl std::fmt::Debug for PomodoroCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PomodoroCycle")
            .field("state", &self.state())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::{Permission, RecordingNotifier};
    use std::sync::Arc;

    fn quick_settings() -> PomodoroSettings {
        PomodoroSettings {
            focus_secs: 3,
            short_break_secs: 1,
            long_break_secs: 2,
            long_break_interval: 4,
            total_rounds: 2,
            auto_start_next: true,
        }
    }

    fn cycle(settings: PomodoroSettings) -> (Scheduler, Arc<RecordingNotifier>, PomodoroCycle) {
        let clock = Arc::new(ManualClock::new(0));
        let scheduler = Scheduler::new(clock);
        let notifier = Arc::new(RecordingNotifier::new(Permission::Denied));
        let cycle =
            PomodoroCycle::new(settings, scheduler.clone(), Alerts::new(notifier.clone())).unwrap();
        (scheduler, notifier, cycle)
    }

    /// Tick until the current phase ends, returning the transition events.
    fn finish_phase(cycle: &mut PomodoroCycle) -> Vec<Event> {
        cycle.start();
        loop {
            let events = cycle.tick();
            if !events.is_empty() {
                return events;
            }
        }
    }

    fn break_after_focus(cycle: &mut PomodoroCycle) -> PomodoroMode {
        assert_eq!(cycle.mode(), PomodoroMode::Focus);
        finish_phase(cycle);
        let mode = cycle.mode();
        finish_phase(cycle);
        mode
    }

    #[test]
    fn four_focus_sessions_yield_three_short_then_long() {
        let (_s, _n, mut cycle) = cycle(quick_settings());
        let breaks: Vec<_> = (0..4).map(|_| break_after_focus(&mut cycle)).collect();
        assert_eq!(
            breaks,
            vec![
                PomodoroMode::ShortBreak,
                PomodoroMode::ShortBreak,
                PomodoroMode::ShortBreak,
                PomodoroMode::LongBreak,
            ]
        );
        assert_eq!(cycle.state().current_round, 2);
        assert_eq!(cycle.state().completed_intervals_in_cycle, 0);
    }

    #[test]
    fn round_increments_once_per_cycle() {
        let (_s, _n, mut cycle) = cycle(PomodoroSettings {
            total_rounds: 5,
            ..quick_settings()
        });
        let mut rounds = Vec::new();
        for _ in 0..8 {
            break_after_focus(&mut cycle);
            rounds.push(cycle.state().current_round);
        }
        assert_eq!(rounds, vec![1, 1, 1, 2, 2, 2, 2, 3]);
    }

    #[test]
    fn transition_loads_new_duration_and_auto_starts() {
        let (scheduler, notifier, mut cycle) = cycle(quick_settings());
        let events = finish_phase(&mut cycle);
        assert!(matches!(events[0], Event::CountdownCompleted { .. }));
        assert!(matches!(
            events[1],
            Event::PomodoroPhaseChanged {
                from: PomodoroMode::Focus,
                to: PomodoroMode::ShortBreak,
                ..
            }
        ));
        assert!(matches!(events[2], Event::CountdownStarted { remaining_secs: 1, .. }));
        assert!(cycle.state().running);
        assert_eq!(scheduler.live_sources(), 1);
        assert_eq!(notifier.cues(), vec![Cue::SessionComplete]);
    }

    #[test]
    fn manual_mode_waits_after_transition() {
        let (scheduler, _n, mut cycle) = cycle(PomodoroSettings {
            auto_start_next: false,
            ..quick_settings()
        });
        finish_phase(&mut cycle);
        assert_eq!(cycle.mode(), PomodoroMode::ShortBreak);
        assert!(!cycle.state().running);
        assert_eq!(cycle.state().remaining_seconds, 1);
        assert_eq!(scheduler.live_sources(), 0);
    }

    #[test]
    fn cycle_completes_after_total_rounds_and_only_reset_leaves() {
        let (scheduler, _n, mut cycle) = cycle(PomodoroSettings {
            long_break_interval: 2,
            total_rounds: 2,
            ..quick_settings()
        });
        // Round 1: focus, short, focus, long. Round 2: focus, short, focus.
        for _ in 0..6 {
            finish_phase(&mut cycle);
        }
        let events = finish_phase(&mut cycle);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::PomodoroCycleComplete { rounds: 2, .. })));
        assert!(cycle.is_cycle_complete());
        assert_eq!(cycle.state().remaining_seconds, 0);
        assert_eq!(scheduler.live_sources(), 0);

        assert!(cycle.start().is_none());
        assert!(cycle.skip().is_empty());

        cycle.reset_cycle();
        let state = cycle.state();
        assert!(!state.cycle_complete);
        assert_eq!(state.current_round, 1);
        assert_eq!(state.mode, PomodoroMode::Focus);
        assert_eq!(state.remaining_seconds, 3);
    }

    #[test]
    fn skip_applies_normal_transition() {
        let (_s, _n, mut cycle) = cycle(quick_settings());
        let events = cycle.skip();
        assert!(matches!(events[0], Event::PomodoroPhaseChanged { .. }));
        assert_eq!(cycle.mode(), PomodoroMode::ShortBreak);
        assert_eq!(cycle.state().completed_intervals_in_cycle, 1);
        assert!(!cycle.state().running);
    }

    #[test]
    fn update_settings_validates() {
        let (_s, _n, mut cycle) = cycle(quick_settings());
        let bad = PomodoroSettings {
            long_break_interval: 0,
            ..quick_settings()
        };
        assert!(cycle.update_settings(bad).is_err());
        assert_eq!(cycle.settings().long_break_interval, 4);

        let longer = PomodoroSettings {
            focus_secs: 10,
            ..quick_settings()
        };
        cycle.update_settings(longer).unwrap();
        assert_eq!(cycle.state().remaining_seconds, 10);
    }
}
