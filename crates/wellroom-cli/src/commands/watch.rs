use std::time::Duration;

use clap::Args;
use wellroom_core::ActivitySignal;

use crate::common::{open_dashboard, print_events, run_foreground, CliResult};

#[derive(Args)]
pub struct WatchArgs {
    /// Treat the user as present on every poll, so tracked screen time
    /// accrues while the watcher runs
    #[arg(long)]
    present: bool,
    /// Stop after this many seconds
    #[arg(long)]
    seconds: Option<u64>,
}

/// Drive reminders, usage sampling and the score cadence, printing every
/// event as a JSON line.
pub fn run(user: &str, args: WatchArgs) -> CliResult {
    let (_config, mut dashboard) = open_dashboard(user)?;
    tracing::info!(
        user,
        hydration = dashboard.hydration().is_active(),
        screen_time = dashboard.screen_time().state().tracking,
        "watching"
    );

    let limit = args.seconds.map(Duration::from_secs);
    run_foreground(&mut dashboard, limit, |dashboard| {
        if args.present {
            dashboard
                .screen_time_mut()
                .on_activity_signal(ActivitySignal::KeyDown);
        }
        print_events(&dashboard.pump())?;
        Ok(false)
    })
}
