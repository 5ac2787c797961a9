//! # Wellroom Core Library
//!
//! Habit timers and the daily wellness score. Every engine is driven by an
//! injected clock and persists through a key-value store, so the same code
//! runs under the CLI, a desktop shell, or a test with a manual clock.
//!
//! ## Architecture
//!
//! - **Timers**: a shared countdown behind the meditation timer and the
//!   pomodoro cycle
//! - **Hydration reminder**: a restartable interval with a daily intake log
//! - **Screen time**: an activity-gated usage accumulator with one-shot
//!   threshold alerts
//! - **Score**: a pure function over the engines' state
//! - **Storage**: SQLite or in-memory key-value records plus TOML config
//!
//! ## Key Components
//!
//! - [`Dashboard`]: all engines for one user, driven by `pump()`
//! - [`Storage`]: clock plus key-value store
//! - [`Scheduler`]: hands out clock-driven tick sources
//! - [`Config`]: application configuration management

pub mod clock;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod notify;
pub mod reminder;
pub mod scheduler;
pub mod score;
pub mod storage;
pub mod threshold;
pub mod timer;
pub mod usage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dashboard::{Dashboard, HostHooks, NoHooks};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::{Event, Feature};
pub use notify::{Alerts, Notification, NotificationChannel, Notifier, Permission};
pub use reminder::{HydrationReminder, ReminderCycleState};
pub use scheduler::{Scheduler, TickSource};
pub use score::{wellness_score, CustomActivity, WellnessInputs, WellnessScore};
pub use storage::{Config, KvStore, MemoryStore, SqliteStore, Storage};
pub use threshold::{check_crossing, ThresholdLatches};
pub use timer::{
    Countdown, CountdownState, MeditationTimer, PomodoroCycle, PomodoroMode, PomodoroSettings,
    PomodoroState,
};
pub use usage::{ActivitySignal, ScreenTimeTracker, UsageAlertSettings, UsageState};
