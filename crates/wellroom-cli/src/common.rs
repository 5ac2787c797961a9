//! Shared plumbing for the subcommands.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use wellroom_core::notify::{Cue, Notification, Notifier, NotifyError, Permission};
use wellroom_core::{Config, CoreError, Dashboard, Event, SqliteStore, Storage, SystemClock};

pub type CliResult<T = ()> = wellroom_core::error::Result<T>;

/// How often the foreground loop pumps the dashboard.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Terminal notifier. There is no native channel, so everything is a toast
/// on stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn permission(&self) -> Permission {
        Permission::Unsupported
    }

    fn native(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Unavailable)
    }

    fn toast(&self, notification: &Notification) {
        eprintln!("[{}] {}", notification.title, notification.body);
    }

    fn cue(&self, cue: Cue) {
        tracing::debug!(?cue, "cue");
        eprint!("\x07");
    }
}

/// Load config and open the user's dashboard on the on-disk store.
pub fn open_dashboard(user: &str) -> CliResult<(Config, Dashboard)> {
    let config = Config::load_or_default();
    let store = SqliteStore::open()?;
    let storage = Storage::new(Arc::new(SystemClock), Arc::new(store));
    let dashboard = Dashboard::new(user, &config, storage, Arc::new(ConsoleNotifier))?;
    Ok((config, dashboard))
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One compact JSON object per line.
pub fn print_events(events: &[Event]) -> CliResult {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

/// Pump `dashboard` until `step` returns true, `limit` elapses, or Ctrl-C.
pub fn run_foreground<F>(dashboard: &mut Dashboard, limit: Option<Duration>, mut step: F) -> CliResult
where
    F: FnMut(&mut Dashboard) -> CliResult<bool>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let deadline = limit.map(|d| tokio::time::Instant::now() + d);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if step(dashboard)? {
                        break;
                    }
                    if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
                        break;
                    }
                }
                _ = &mut ctrl_c => {
                    tracing::info!("interrupted");
                    break;
                }
            }
        }
        Ok::<(), CoreError>(())
    })
}
