use clap::Subcommand;
use serde_json::json;
use wellroom_core::{Event, Feature};

use crate::common::{open_dashboard, print_events, print_json, run_foreground, CliResult};

#[derive(Subcommand)]
pub enum MeditateAction {
    /// Print the countdown and today's tally as JSON
    Status,
    /// Set the session length
    Set {
        /// Minutes per session
        minutes: u32,
    },
    /// Run a session in the foreground until it completes
    Start,
    /// Rewind the countdown
    Reset,
}

pub fn run(user: &str, action: MeditateAction) -> CliResult {
    let (_config, mut dashboard) = open_dashboard(user)?;

    match action {
        MeditateAction::Status => {
            let timer = dashboard.meditation();
            print_json(&json!({
                "countdown": timer.state(),
                "progress": timer.progress(),
                "minutesToday": timer.minutes_today(),
            }))?;
        }
        MeditateAction::Set { minutes } => {
            let event = dashboard.meditation_mut().set_minutes(minutes)?;
            print_events(&dashboard.record([event]))?;
        }
        MeditateAction::Start => {
            let started = dashboard.meditation_mut().start();
            print_events(&dashboard.record(started))?;
            run_foreground(&mut dashboard, None, |dashboard| {
                let events = dashboard.pump();
                print_events(&events)?;
                Ok(events.iter().any(|e| {
                    matches!(
                        e,
                        Event::CountdownCompleted {
                            feature: Feature::Meditation,
                            ..
                        }
                    )
                }))
            })?;
        }
        MeditateAction::Reset => {
            let event = dashboard.meditation_mut().reset();
            print_events(&dashboard.record([event]))?;
        }
    }
    Ok(())
}
