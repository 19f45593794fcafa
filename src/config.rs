use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};

use crate::core::coach::CoachPolicy;
use crate::progress::{DEFAULT_BADGE_THRESHOLD, DEFAULT_LEADERBOARD_SIZE};

/// Longest overwhelm cooldown a config file can ask for (one year)
pub const MAX_COOLDOWN_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub cooldown_hours: i64,
    pub promote_after: u32,
    pub demote_after: u32,
    pub badge_threshold: u32,
    pub leaderboard_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::new(),
            cooldown_hours: 48,
            promote_after: 3,
            demote_after: 2,
            badge_threshold: DEFAULT_BADGE_THRESHOLD,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
        }
    }
}

impl Config {
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ecohabit")
        });

        // Ensure data directory exists
        std::fs::create_dir_all(&data_dir)
            .context("Failed to create data directory")?;

        let config_path = data_dir.join("config.json");

        if config_path.exists() {
            let config_str = std::fs::read_to_string(&config_path)
                .context("Failed to read config.json")?;

            if config_str.trim().is_empty() {
                tracing::warn!("config file is empty, recreating defaults");
            } else {
                match serde_json::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        config.data_dir = data_dir;
                        return Ok(config);
                    }
                    Err(e) => {
                        // Keep the user's file; just run on defaults
                        tracing::warn!(error = %e, "failed to parse config.json, using defaults");
                        return Ok(Config {
                            data_dir,
                            ..Config::default()
                        });
                    }
                }
            }
        }

        let config = Config {
            data_dir,
            ..Config::default()
        };
        config.save()?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = self.data_dir.join("config.json");
        let json_str = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(&config_path, json_str)
            .context("Failed to write config.json")?;
        Ok(())
    }

    pub fn storage_file(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }

    pub fn coach_policy(&self) -> CoachPolicy {
        CoachPolicy {
            cooldown: chrono::Duration::hours(self.cooldown_hours.clamp(0, MAX_COOLDOWN_HOURS)),
            promote_after: self.promote_after.max(1),
            demote_after: self.demote_after.max(1),
        }
    }
}
