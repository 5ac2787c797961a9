//! Periodic tick sources over an injectable clock.
//!
//! A [`TickSource`] is the Rust counterpart of a browser interval: it is
//! acquired when an engine starts, polled by the host loop, and released by
//! dropping it. Missed periods coalesce into a single tick, the same way a
//! throttled background tab delivers one late callback instead of a burst.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;

/// Hands out tick sources and counts the ones still alive.
#[derive(Clone)]
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    live: Arc<AtomicUsize>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Acquire a source that fires once per `period`, first after one full
    /// period has elapsed.
    pub fn every(&self, period: Duration) -> TickSource {
        self.live.fetch_add(1, Ordering::SeqCst);
        let period_ms = (period.as_millis() as u64).max(1);
        TickSource {
            clock: self.clock.clone(),
            period_ms,
            next_due_ms: self.clock.now_ms().saturating_add(period_ms),
            live: self.live.clone(),
        }
    }

    /// Number of sources acquired and not yet dropped.
    pub fn live_sources(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("live_sources", &self.live_sources())
            .finish()
    }
}

/// One periodic subscription. Released on drop.
pub struct TickSource {
    clock: Arc<dyn Clock>,
    period_ms: u64,
    next_due_ms: u64,
    live: Arc<AtomicUsize>,
}

impl TickSource {
    /// Returns `true` if at least one period elapsed since the last tick.
    ///
    /// However many periods were missed, one call yields at most one tick
    /// and the next one is scheduled a full period from now.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now_ms();
        if now < self.next_due_ms {
            return false;
        }
        self.next_due_ms = now.saturating_add(self.period_ms);
        true
    }

    /// Milliseconds until the next tick is due (0 if overdue).
    pub fn due_in_ms(&self) -> u64 {
        self.next_due_ms.saturating_sub(self.clock.now_ms())
    }
}

impl Drop for TickSource {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for TickSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickSource")
            .field("period_ms", &self.period_ms)
            .field("next_due_ms", &self.next_due_ms)
            .finish()
    }
}
