use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::CoachError;

pub const MAX_LEVEL: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Water,
    Plastic,
    Food,
    Soften,
}

impl Category {
    /// Categories with leveled suggestions (and trackable habits)
    pub const HABITS: [Category; 3] = [Category::Water, Category::Plastic, Category::Food];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Water => "water",
            Category::Plastic => "plastic",
            Category::Food => "food",
            Category::Soften => "soften",
        }
    }

    /// Exact lowercase key, as persisted
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "water" => Some(Category::Water),
            "plastic" => Some(Category::Plastic),
            "food" => Some(Category::Food),
            "soften" => Some(Category::Soften),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Category::from_key(&key)
            .ok_or_else(|| CoachError::InvalidInput(format!("unknown category: {}", key)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionEntry {
    pub id: &'static str,
    pub text: &'static str,
}

/// A suggestion chosen for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub id: String,
    pub text: String,
    pub category: Category,
    pub level: u8,
}

impl Suggestion {
    pub fn from_entry(entry: &SuggestionEntry, category: Category, level: u8) -> Self {
        Self {
            id: entry.id.to_string(),
            text: entry.text.to_string(),
            category,
            level,
        }
    }
}

const fn entry(id: &'static str, text: &'static str) -> SuggestionEntry {
    SuggestionEntry { id, text }
}

const SOFTEN: [SuggestionEntry; 3] = [
    entry("soft-notice", "Just notice one eco-choice you make today, with zero pressure."),
    entry("soft-one-kind", "Do one small kind thing for the planet today\u{2014}any one thing counts."),
    entry("soft-breathe", "Take a slow breath and pick one tiny eco-action that feels easy today."),
];

const WATER: [[SuggestionEntry; 3]; 3] = [
    [
        entry("w-0-1", "Turn off the tap while brushing your teeth today."),
        entry("w-0-2", "Keep your shower one minute shorter today."),
        entry("w-0-3", "Run water only when you actually need it today."),
    ],
    [
        entry("w-1-1", "Choose one water-saving moment today and repeat it once more."),
        entry("w-1-2", "Try a quick shower timer today and stop when it rings."),
        entry("w-1-3", "Wash dishes with the tap off between rinses today."),
    ],
    [
        entry("w-2-1", "Pick one daily water habit and make it your default for a week."),
        entry("w-2-2", "Do a two-minute \u{201c}leak check\u{201d} on one faucet today."),
        entry("w-2-3", "Use a bucket/bowl once today instead of running water continuously."),
    ],
];

const PLASTIC: [[SuggestionEntry; 3]; 3] = [
    [
        entry("p-0-1", "Refuse one single-use plastic item today."),
        entry("p-0-2", "Carry a reusable bottle today if you can."),
        entry("p-0-3", "Say \u{201c}no bag\u{201d} once today if you don\u{2019}t need it."),
    ],
    [
        entry("p-1-1", "Choose one purchase today and pick the lower-plastic option."),
        entry("p-1-2", "Keep a reusable bag by the door today for next time."),
        entry("p-1-3", "Swap one snack for a less-packaged option today."),
    ],
    [
        entry("p-2-1", "Make one \u{201c}reusables kit\u{201d} item part of your daily carry today."),
        entry("p-2-2", "Avoid plastic for one item today, even if it\u{2019}s slightly inconvenient."),
        entry("p-2-3", "Choose one refill/reuse option today instead of buying new plastic."),
    ],
];

const FOOD: [[SuggestionEntry; 3]; 3] = [
    [
        entry("f-0-1", "Save one leftover portion today for tomorrow."),
        entry("f-0-2", "Check your fridge once today before buying more food."),
        entry("f-0-3", "Eat the most perishable item you have today."),
    ],
    [
        entry("f-1-1", "Plan one meal today around what you already have."),
        entry("f-1-2", "Freeze one item today that you might not finish in time."),
        entry("f-1-3", "Make one \u{201c}use-it-up\u{201d} snack today from leftovers or scraps."),
    ],
    [
        entry("f-2-1", "Create one simple rule today that prevents food waste for you."),
        entry("f-2-2", "Do a two-minute pantry check today and note what to finish first."),
        entry("f-2-3", "Use a \u{201c}leftovers first\u{201d} lunch today and make it a habit."),
    ],
];

/// Read-only suggestion catalogue.
///
/// `soften` is a flat pool; the habit categories are pooled per level.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionBank {
    soften: &'static [SuggestionEntry],
    water: &'static [[SuggestionEntry; 3]; 3],
    plastic: &'static [[SuggestionEntry; 3]; 3],
    food: &'static [[SuggestionEntry; 3]; 3],
}

impl Default for SuggestionBank {
    fn default() -> Self {
        Self::standard()
    }
}

impl SuggestionBank {
    pub fn standard() -> Self {
        Self {
            soften: &SOFTEN,
            water: &WATER,
            plastic: &PLASTIC,
            food: &FOOD,
        }
    }

    pub fn soften(&self) -> &'static [SuggestionEntry] {
        self.soften
    }

    /// Pool for a habit category at `level` (clamped to the top level).
    /// `Soften` ignores the level.
    pub fn pool(&self, category: Category, level: u8) -> &'static [SuggestionEntry] {
        let level = usize::from(level.min(MAX_LEVEL));
        match category {
            Category::Water => &self.water[level],
            Category::Plastic => &self.plastic[level],
            Category::Food => &self.food[level],
            Category::Soften => self.soften,
        }
    }

    /// Look up any entry by id
    pub fn find(&self, id: &str) -> Option<(Category, u8, &'static SuggestionEntry)> {
        if let Some(e) = self.soften.iter().find(|e| e.id == id) {
            return Some((Category::Soften, 0, e));
        }
        for category in Category::HABITS {
            for level in 0..=MAX_LEVEL {
                if let Some(e) = self.pool(category, level).iter().find(|e| e.id == id) {
                    return Some((category, level, e));
                }
            }
        }
        None
    }
}
