use clap::Subcommand;
use serde_json::json;

use crate::common::{open_dashboard, print_events, print_json, CliResult};

#[derive(Subcommand)]
pub enum WaterAction {
    /// Print the reminder cycle and today's intake as JSON
    Status,
    /// Turn reminders on
    On,
    /// Turn reminders off
    Off,
    /// Change the reminder interval
    Interval {
        /// Minutes between reminders
        minutes: u32,
    },
    /// Log a drink; restarts the reminder window
    Drink {
        /// Amount in ml (defaults to hydration.glass_ml)
        #[arg(long)]
        ml: Option<u32>,
    },
    /// Zero today's intake
    Reset,
}

pub fn run(user: &str, action: WaterAction) -> CliResult {
    let (config, mut dashboard) = open_dashboard(user)?;

    match action {
        WaterAction::Status => {
            let reminder = dashboard.hydration();
            print_json(&json!({
                "cycle": reminder.state(),
                "timeRemainingSecs": reminder.time_remaining_secs(),
                "intakeTodayMl": reminder.intake_today_ml(),
            }))?;
        }
        WaterAction::On => {
            let event = dashboard.hydration_mut().activate();
            print_events(&dashboard.record(event))?;
        }
        WaterAction::Off => {
            let event = dashboard.hydration_mut().deactivate();
            print_events(&dashboard.record(event))?;
        }
        WaterAction::Interval { minutes } => {
            let event = dashboard.hydration_mut().set_interval(minutes)?;
            print_events(&dashboard.record([event]))?;
        }
        WaterAction::Drink { ml } => {
            let amount = ml.unwrap_or(config.hydration.glass_ml);
            let events = dashboard.hydration_mut().record_intake(amount)?;
            print_events(&dashboard.record(events))?;
        }
        WaterAction::Reset => {
            dashboard.hydration_mut().reset_intake();
            print_events(&dashboard.record(std::iter::empty()))?;
        }
    }
    Ok(())
}
