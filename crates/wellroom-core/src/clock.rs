//! Wall-clock abstraction.
//!
//! Every engine reads time through a [`Clock`] so tests can drive virtual
//! time with [`ManualClock`] instead of sleeping. All timestamps are
//! milliseconds since the Unix epoch.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local, Utc};

/// Source of "now" and of the calendar day used for day-scoped records.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;

    /// Calendar day string (`YYYY-MM-DD`) for the current instant.
    fn day_stamp(&self) -> String {
        day_stamp_local(self.now_ms())
    }

    /// Current instant as a UTC datetime, for event timestamps.
    fn now_utc(&self) -> DateTime<Utc> {
        to_utc(self.now_ms())
    }
}

/// Real system clock. Day stamps follow the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Virtual clock for tests and simulations.
///
/// Day stamps are computed in UTC so results do not depend on the host
/// time zone.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    /// Start at midnight UTC of the given date (`YYYY-MM-DD`).
    ///
    /// Falls back to the epoch if the date does not parse.
    pub fn at_date(date: &str) -> Self {
        let ms = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis().max(0) as u64)
            .unwrap_or(0);
        Self::new(ms)
    }

    pub fn advance_ms(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs.saturating_mul(1000));
    }

    pub fn set_ms(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn day_stamp(&self) -> String {
        to_utc(self.now_ms()).format("%Y-%m-%d").to_string()
    }
}

/// Convert epoch milliseconds into a UTC datetime (epoch on overflow).
pub fn to_utc(ms: u64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms as i64).unwrap_or_default()
}

fn day_stamp_local(ms: u64) -> String {
    to_utc(ms)
        .with_timezone(&Local)
        .format("%Y-%m-%d")
        .to_string()
}

/// Milliseconds in one day.
pub const DAY_MS: u64 = 24 * 60 * 60 * 1000;
