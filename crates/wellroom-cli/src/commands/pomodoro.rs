use clap::Subcommand;
use wellroom_core::Event;

use crate::common::{open_dashboard, print_events, print_json, run_foreground, CliResult};

#[derive(Subcommand)]
pub enum PomodoroAction {
    /// Run a full cycle in the foreground
    Run,
    /// Print the configured cycle settings as JSON
    Settings,
}

pub fn run(user: &str, action: PomodoroAction) -> CliResult {
    let (_config, mut dashboard) = open_dashboard(user)?;

    match action {
        PomodoroAction::Run => {
            let started = dashboard.pomodoro_mut().start();
            print_events(&dashboard.record(started))?;
            run_foreground(&mut dashboard, None, |dashboard| {
                let events = dashboard.pump();
                print_events(&events)?;
                if events
                    .iter()
                    .any(|e| matches!(e, Event::PomodoroCycleComplete { .. }))
                {
                    return Ok(true);
                }
                // With pomodoro.auto_start_next off nothing ticks after a phase ends.
                if !dashboard.pomodoro().is_ticking() {
                    tracing::info!(mode = dashboard.pomodoro().mode().label(), "phase finished, not auto-starting");
                    return Ok(true);
                }
                Ok(false)
            })?;
        }
        PomodoroAction::Settings => {
            print_json(dashboard.pomodoro().settings())?;
        }
    }
    Ok(())
}
