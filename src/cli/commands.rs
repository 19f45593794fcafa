use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ecohabit")]
#[command(about = "Gentle eco-habit coach that adapts to how your days are going")]
#[command(version)]
pub struct Args {
    /// Data directory (defaults to the user config dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the next suggestion
    Suggest,
    /// Tell the coach how the last suggestion went (success, skip, overwhelmed)
    Feedback {
        outcome: String,
    },
    /// Check in today's habits and count it as a success
    Checkin {
        #[arg(required = true)]
        categories: Vec<String>,
    },
    /// Record today's mood
    Mood {
        mood: String,
    },
    /// Free-text check-in, answered by the coach. With consent the
    /// conversation carries over to the next `say`.
    Say {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Today's check-ins and lifetime totals
    Summary,
    /// Private badges
    Badges,
    /// Your strongest days on this device
    Leaderboard,
    /// Data-collection consent
    Consent {
        #[command(subcommand)]
        command: ConsentCommands,
    },
    /// Show or change feature toggles
    Settings {
        #[arg(long)]
        suggestions: Option<Toggle>,
        #[arg(long)]
        badges: Option<Toggle>,
        #[arg(long)]
        leaderboard: Option<Toggle>,
    },
    /// Show the coach's adaptive profile
    Profile,
}

#[derive(Subcommand)]
pub enum ConsentCommands {
    /// Allow storing data on this device
    Accept,
    /// Keep everything in memory only
    Decline,
    /// Show the current answer
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        matches!(self, Toggle::On)
    }
}
