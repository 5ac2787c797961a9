use clap::Args;
use serde_json::json;
use wellroom_core::{CoreError, CustomActivity};

use crate::common::{open_dashboard, print_json, CliResult};

#[derive(Args)]
pub struct ScoreArgs {
    /// Today's mood, 0-100
    #[arg(long)]
    mood: Option<f64>,
    /// Custom activities completed today
    #[arg(long, default_value_t = 0)]
    done: usize,
    /// Custom activities planned for today
    #[arg(long)]
    total: Option<usize>,
}

pub fn run(user: &str, args: ScoreArgs) -> CliResult {
    let (_config, mut dashboard) = open_dashboard(user)?;

    if args.mood.is_some() {
        dashboard.set_mood(args.mood)?;
    }
    if let Some(total) = args.total {
        if args.done > total {
            return Err(CoreError::Custom(format!(
                "--done ({}) exceeds --total ({total})",
                args.done
            )));
        }
        let activities = (0..total)
            .map(|i| CustomActivity {
                target: 1.0,
                is_completed: i < args.done,
            })
            .collect();
        dashboard.set_custom_activities(activities);
    }

    let score = dashboard.score();
    print_json(&json!({
        "score": score.score,
        "raw": score.raw,
        "components": score.components,
        "inputs": dashboard.inputs(),
    }))
}
