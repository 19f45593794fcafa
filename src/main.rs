mod cli;

use clap::Parser;
use cli::{Args, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data_dir = args.data_dir;

    let result = match args.command {
        Commands::Suggest => cli::handle_suggest(data_dir),
        Commands::Feedback { outcome } => cli::handle_feedback(&outcome, data_dir),
        Commands::Checkin { categories } => cli::handle_checkin(&categories, data_dir),
        Commands::Mood { mood } => cli::handle_mood(&mood, data_dir),
        Commands::Say { text } => cli::handle_say(&text, data_dir),
        Commands::Summary => cli::handle_summary(data_dir),
        Commands::Badges => cli::handle_badges(data_dir),
        Commands::Leaderboard => cli::handle_leaderboard(data_dir),
        Commands::Consent { command } => cli::handle_consent(command, data_dir),
        Commands::Settings {
            suggestions,
            badges,
            leaderboard,
        } => cli::handle_settings(suggestions, badges, leaderboard, data_dir),
        Commands::Profile => cli::handle_profile(data_dir),
    };

    if let Err(e) = result {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}
