use clap::Subcommand;
use serde_json::json;
use wellroom_core::UsageAlertSettings;

use crate::common::{open_dashboard, print_events, print_json, CliResult};

#[derive(Subcommand)]
pub enum ScreenAction {
    /// Print today's usage as JSON
    Status,
    /// Toggle tracking on or off
    Track,
    /// Change the daily limit
    Limit {
        /// Limit in minutes
        minutes: f64,
    },
    /// Zero today's counter and re-arm alerts
    Reset,
    /// Configure the approaching-limit warning
    Alerts {
        #[arg(long)]
        enabled: Option<bool>,
        /// Percentage of the limit that triggers the warning
        #[arg(long)]
        warn_at: Option<u32>,
    },
}

pub fn run(user: &str, action: ScreenAction) -> CliResult {
    let (_config, mut dashboard) = open_dashboard(user)?;

    match action {
        ScreenAction::Status => {
            let tracker = dashboard.screen_time();
            print_json(&json!({
                "usage": tracker.state(),
                "minutesUsed": tracker.minutes_used(),
                "remainingMinutes": tracker.remaining_minutes(),
                "usedFraction": tracker.used_fraction(),
                "alerts": tracker.alert_settings(),
            }))?;
        }
        ScreenAction::Track => {
            let event = dashboard.screen_time_mut().toggle_tracking();
            print_events(&dashboard.record([event]))?;
        }
        ScreenAction::Limit { minutes } => {
            let event = dashboard.screen_time_mut().set_limit(minutes)?;
            print_events(&dashboard.record([event]))?;
        }
        ScreenAction::Reset => {
            let event = dashboard.screen_time_mut().reset_counter();
            print_events(&dashboard.record([event]))?;
        }
        ScreenAction::Alerts { enabled, warn_at } => {
            let current = dashboard.screen_time().alert_settings();
            let next = UsageAlertSettings {
                enabled: enabled.unwrap_or(current.enabled),
                warn_at_percent: warn_at.unwrap_or(current.warn_at_percent),
            };
            dashboard.screen_time_mut().set_alert_settings(next)?;
            print_json(&next)?;
        }
    }
    Ok(())
}
