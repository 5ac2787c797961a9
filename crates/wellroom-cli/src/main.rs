use clap::{Parser, Subcommand};

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "wellroom-cli", version, about = "Wellroom CLI")]
struct Cli {
    /// User whose records are read and written
    #[arg(long, global = true, env = "WELLROOM_USER", default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Meditation countdown
    Meditate {
        #[command(subcommand)]
        action: commands::meditate::MeditateAction,
    },
    /// Hydration reminder and intake log
    Water {
        #[command(subcommand)]
        action: commands::water::WaterAction,
    },
    /// Screen-time tracking
    Screen {
        #[command(subcommand)]
        action: commands::screen::ScreenAction,
    },
    /// Pomodoro cycle
    Pomodoro {
        #[command(subcommand)]
        action: commands::pomodoro::PomodoroAction,
    },
    /// Print today's wellness score
    Score(commands::score::ScoreArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Drive every engine in the foreground
    Watch(commands::watch::WatchArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wellroom_core=warn,wellroom_cli=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let user = cli.user.as_str();
    let result = match cli.command {
        Commands::Meditate { action } => commands::meditate::run(user, action),
        Commands::Water { action } => commands::water::run(user, action),
        Commands::Screen { action } => commands::screen::run(user, action),
        Commands::Pomodoro { action } => commands::pomodoro::run(user, action),
        Commands::Score(args) => commands::score::run(user, args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Watch(args) => commands::watch::run(user, args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
