use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::bank::Category;
use crate::habits::{DayRecord, HabitTotals};
use crate::settings::Settings;

pub const DEFAULT_BADGE_THRESHOLD: u32 = 3;
pub const DEFAULT_LEADERBOARD_SIZE: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub key: &'static str,
    pub emoji: &'static str,
    pub title: &'static str,
    pub category: Category,
}

pub const BADGES: [Badge; 3] = [
    Badge {
        key: "water_saver",
        emoji: "🌱",
        title: "Water Saver",
        category: Category::Water,
    },
    Badge {
        key: "plastic_reducer",
        emoji: "🌍",
        title: "Plastic Reducer",
        category: Category::Plastic,
    },
    Badge {
        key: "food_hero",
        emoji: "🍽",
        title: "Food Hero",
        category: Category::Food,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeStatus {
    pub badge: Badge,
    pub earned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "badges", rename_all = "snake_case")]
pub enum BadgeBoard {
    Disabled,
    Shown(Vec<BadgeStatus>),
}

/// Badges whose category total has reached `threshold`
pub fn earned_badges(totals: &HabitTotals, threshold: u32) -> Vec<Badge> {
    BADGES
        .iter()
        .filter(|b| totals.get(b.category).map_or(0, |c| c.count) >= threshold)
        .copied()
        .collect()
}

pub fn badge_board(settings: &Settings, totals: &HabitTotals, threshold: u32) -> BadgeBoard {
    if !settings.badges_enabled {
        return BadgeBoard::Disabled;
    }

    let earned = earned_badges(totals, threshold);
    BadgeBoard::Shown(
        BADGES
            .iter()
            .map(|b| BadgeStatus {
                badge: *b,
                earned: earned.contains(b),
            })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub day: String,
    pub score: u8,
}

impl LeaderboardRow {
    pub fn label(&self) -> &'static str {
        match self.score {
            3 => "full day",
            2 => "two habits",
            _ => "one habit",
        }
    }

    pub fn medal(&self) -> Option<&'static str> {
        match self.rank {
            1 => Some("🥇"),
            2 => Some("🥈"),
            3 => Some("🥉"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "rows", rename_all = "snake_case")]
pub enum Leaderboard {
    Disabled,
    NoData,
    Ranked(Vec<LeaderboardRow>),
}

/// Strongest days first; ties go to the more recent day.
pub fn leaderboard(
    settings: &Settings,
    daily: &BTreeMap<String, DayRecord>,
    size: usize,
) -> Leaderboard {
    if !settings.leaderboard_enabled {
        return Leaderboard::Disabled;
    }

    let mut scored: Vec<(&String, u8)> = daily
        .iter()
        .map(|(day, record)| (day, record.score()))
        .filter(|(_, score)| *score > 0)
        .collect();

    if scored.is_empty() {
        return Leaderboard::NoData;
    }

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(a.0)));

    Leaderboard::Ranked(
        scored
            .into_iter()
            .take(size)
            .enumerate()
            .map(|(i, (day, score))| LeaderboardRow {
                rank: i + 1,
                day: day.clone(),
                score,
            })
            .collect(),
    )
}
