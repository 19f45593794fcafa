use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::core::bank::Category;
use crate::core::clock::Clock;
use crate::core::coach::HabitSummaryProvider;
use crate::core::error::{CoachError, Result};
use crate::core::store::{KeyValueStore, HABIT_DATA_KEY};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitCount {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub last_tracked_day: Option<String>,
}

/// Lifetime totals per habit category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitTotals {
    #[serde(default)]
    pub water: HabitCount,
    #[serde(default)]
    pub plastic: HabitCount,
    #[serde(default)]
    pub food: HabitCount,
}

impl HabitTotals {
    pub fn get(&self, category: Category) -> Option<&HabitCount> {
        match category {
            Category::Water => Some(&self.water),
            Category::Plastic => Some(&self.plastic),
            Category::Food => Some(&self.food),
            Category::Soften => None,
        }
    }

    fn get_mut(&mut self, category: Category) -> Option<&mut HabitCount> {
        match category {
            Category::Water => Some(&mut self.water),
            Category::Plastic => Some(&mut self.plastic),
            Category::Food => Some(&mut self.food),
            Category::Soften => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverwhelmSignal {
    pub signal: String,
    pub at: DateTime<Utc>,
}

/// What happened on one day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    #[serde(default)]
    pub water: bool,
    #[serde(default)]
    pub plastic: bool,
    #[serde(default)]
    pub food: bool,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub overwhelm_signals: Vec<OverwhelmSignal>,
}

impl DayRecord {
    /// Number of habit categories completed that day (0-3)
    pub fn score(&self) -> u8 {
        [self.water, self.plastic, self.food]
            .iter()
            .filter(|done| **done)
            .count() as u8
    }

    fn flag_mut(&mut self, category: Category) -> Option<&mut bool> {
        match category {
            Category::Water => Some(&mut self.water),
            Category::Plastic => Some(&mut self.plastic),
            Category::Food => Some(&mut self.food),
            Category::Soften => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayFlags {
    pub water: bool,
    pub plastic: bool,
    pub food: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodaySummary {
    pub day: String,
    pub categories: DayFlags,
    pub mood: Option<String>,
    pub overwhelm_signals: Vec<OverwhelmSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyProgress {
    pub completed: u8,
    pub total: u8,
    pub percentage: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HabitData {
    #[serde(default)]
    habits: HabitTotals,
    #[serde(default)]
    daily: BTreeMap<String, DayRecord>,
}

/// Habit counts and per-day check-ins, persisted under `habitData`
pub struct HabitTracker {
    data: HabitData,
    storage: Rc<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
    persist: bool,
}

impl HabitTracker {
    pub fn load(
        storage: Rc<dyn KeyValueStore>,
        clock: Rc<dyn Clock>,
        data_collection_enabled: bool,
    ) -> Self {
        let data = if data_collection_enabled {
            Self::read_data(storage.as_ref())
        } else {
            HabitData::default()
        };

        let mut tracker = Self {
            data,
            storage,
            clock,
            persist: data_collection_enabled,
        };
        tracker.ensure_today();
        tracker
    }

    fn read_data(storage: &dyn KeyValueStore) -> HabitData {
        let Some(raw) = storage.get(HABIT_DATA_KEY) else {
            return HabitData::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "malformed habit data, starting fresh");
            HabitData::default()
        })
    }

    fn ensure_today(&mut self) -> String {
        let today = self.clock.today_key();
        self.data.daily.entry(today.clone()).or_default();
        today
    }

    fn save(&self) {
        if !self.persist {
            return;
        }
        let result = serde_json::to_string(&self.data)
            .map_err(CoachError::from)
            .and_then(|json| self.storage.set(HABIT_DATA_KEY, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist habit data");
        }
    }

    /// Count one completed habit for today. Only water/plastic/food track.
    pub fn track(&mut self, category: Category) -> bool {
        let today = self.ensure_today();

        let Some(total) = self.data.habits.get_mut(category) else {
            return false;
        };
        total.count = total.count.saturating_add(1);
        total.last_tracked_day = Some(today.clone());

        if let Some(flag) = self
            .data
            .daily
            .get_mut(&today)
            .and_then(|d| d.flag_mut(category))
        {
            *flag = true;
        }

        tracing::debug!(%category, day = %today, "habit tracked");
        self.save();
        true
    }

    pub fn set_mood(&mut self, mood: &str) -> bool {
        let today = self.ensure_today();
        if mood.is_empty() {
            return false;
        }
        if let Some(day) = self.data.daily.get_mut(&today) {
            day.mood = Some(mood.to_string());
        }
        self.save();
        true
    }

    pub fn add_overwhelm_signal(&mut self, signal: &str) -> bool {
        let today = self.ensure_today();
        if signal.is_empty() {
            return false;
        }
        let at = self.clock.now();
        if let Some(day) = self.data.daily.get_mut(&today) {
            day.overwhelm_signals.push(OverwhelmSignal {
                signal: signal.to_string(),
                at,
            });
        }
        self.save();
        true
    }

    pub fn today_summary(&self) -> TodaySummary {
        let day = self.clock.today_key();
        let record = self.data.daily.get(&day).cloned().unwrap_or_default();
        TodaySummary {
            categories: DayFlags {
                water: record.water,
                plastic: record.plastic,
                food: record.food,
            },
            mood: record.mood,
            overwhelm_signals: record.overwhelm_signals,
            day,
        }
    }

    pub fn light_totals(&self) -> HabitTotals {
        self.data.habits.clone()
    }

    pub fn daily_progress(&self) -> DailyProgress {
        let completed = self
            .data
            .daily
            .get(&self.clock.today_key())
            .map(DayRecord::score)
            .unwrap_or(0);
        let total = Category::HABITS.len() as u8;
        let percentage = (f64::from(completed) / f64::from(total) * 100.0).round() as u8;
        DailyProgress {
            completed,
            total,
            percentage,
        }
    }

    pub fn daily_history(&self) -> &BTreeMap<String, DayRecord> {
        &self.data.daily
    }
}

impl HabitSummaryProvider for HabitTracker {
    fn today_summary(&self) -> Option<TodaySummary> {
        Some(HabitTracker::today_summary(self))
    }

    fn add_overwhelm_signal(&mut self, signal: &str) -> Result<()> {
        if HabitTracker::add_overwhelm_signal(self, signal) {
            Ok(())
        } else {
            Err(CoachError::InvalidInput("empty overwhelm signal".to_string()))
        }
    }

    fn set_mood(&mut self, mood: &str) -> Result<()> {
        if HabitTracker::set_mood(self, mood) {
            Ok(())
        } else {
            Err(CoachError::InvalidInput("empty mood".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::core::store::MemoryStorage;
    use chrono::TimeZone;

    fn setup() -> (Rc<MemoryStorage>, Rc<FixedClock>, HabitTracker) {
        let storage = Rc::new(MemoryStorage::new());
        let clock = Rc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap(),
        ));
        let tracker = HabitTracker::load(storage.clone(), clock.clone(), true);
        (storage, clock, tracker)
    }

    #[test]
    fn test_track_counts_and_flags() {
        let (_, _, mut tracker) = setup();
        assert!(tracker.track(Category::Water));
        assert!(tracker.track(Category::Water));
        assert!(!tracker.track(Category::Soften));

        let totals = tracker.light_totals();
        assert_eq!(totals.water.count, 2);
        assert_eq!(totals.water.last_tracked_day.as_deref(), Some("2026-10-18"));
        assert_eq!(totals.food.count, 0);

        let summary = tracker.today_summary();
        assert!(summary.categories.water);
        assert!(!summary.categories.plastic);
    }

    #[test]
    fn test_track_saturates_stored_count() {
        let storage = Rc::new(MemoryStorage::new());
        storage
            .set(HABIT_DATA_KEY, r#"{"habits":{"water":{"count":4294967295}}}"#)
            .unwrap();
        let clock = Rc::new(FixedClock::new(Utc::now()));
        let mut tracker = HabitTracker::load(storage, clock, true);

        assert!(tracker.track(Category::Water));
        assert_eq!(tracker.light_totals().water.count, u32::MAX);
        assert!(tracker.today_summary().categories.water);
    }

    #[test]
    fn test_mood_is_stored_as_given() {
        let (_, _, mut tracker) = setup();
        assert!(tracker.set_mood(" Calm "));
        assert_eq!(tracker.today_summary().mood.as_deref(), Some(" Calm "));
    }

    #[test]
    fn test_daily_progress_rounds() {
        let (_, _, mut tracker) = setup();
        assert_eq!(tracker.daily_progress().percentage, 0);
        tracker.track(Category::Food);
        assert_eq!(tracker.daily_progress().percentage, 33);
        tracker.track(Category::Plastic);
        assert_eq!(tracker.daily_progress().percentage, 67);
        tracker.track(Category::Water);
        let progress = tracker.daily_progress();
        assert_eq!((progress.completed, progress.total, progress.percentage), (3, 3, 100));
    }

    #[test]
    fn test_mood_and_signals() {
        let (_, _, mut tracker) = setup();
        assert!(!tracker.set_mood(""));
        assert!(tracker.set_mood("tired"));
        assert!(!tracker.add_overwhelm_signal(""));
        assert!(tracker.add_overwhelm_signal("too_much"));

        let summary = tracker.today_summary();
        assert_eq!(summary.mood.as_deref(), Some("tired"));
        assert_eq!(summary.overwhelm_signals.len(), 1);
        assert_eq!(summary.overwhelm_signals[0].signal, "too_much");
    }

    #[test]
    fn test_new_day_starts_clean() {
        let (_, clock, mut tracker) = setup();
        tracker.track(Category::Water);
        tracker.set_mood("stressed");

        clock.advance(chrono::Duration::days(1));
        let summary = tracker.today_summary();
        assert_eq!(summary.day, "2026-10-19");
        assert!(!summary.categories.water);
        assert_eq!(summary.mood, None);

        tracker.track(Category::Food);
        assert_eq!(tracker.daily_history().len(), 2);
    }

    #[test]
    fn test_persists_and_reloads() {
        let (storage, clock, mut tracker) = setup();
        tracker.track(Category::Plastic);

        let reloaded = HabitTracker::load(storage, clock, true);
        assert_eq!(reloaded.light_totals().plastic.count, 1);
        assert!(reloaded.today_summary().categories.plastic);
    }

    #[test]
    fn test_memory_only_without_consent() {
        let storage = Rc::new(MemoryStorage::new());
        let clock = Rc::new(FixedClock::new(Utc::now()));
        let mut tracker = HabitTracker::load(storage.clone(), clock, false);
        tracker.track(Category::Water);
        assert!(storage.get(HABIT_DATA_KEY).is_none());
    }

    #[test]
    fn test_malformed_data_is_ignored() {
        let storage = Rc::new(MemoryStorage::new());
        storage.set(HABIT_DATA_KEY, "[oops").unwrap();
        let clock = Rc::new(FixedClock::new(Utc::now()));
        let tracker = HabitTracker::load(storage, clock, true);
        assert_eq!(tracker.light_totals(), HabitTotals::default());
    }

    #[test]
    fn test_provider_rejects_empty_mood() {
        let (_, _, mut tracker) = setup();
        let provider: &mut dyn HabitSummaryProvider = &mut tracker;
        assert!(provider.set_mood("").is_err());
        assert!(provider.set_mood("calm").is_ok());
        assert_eq!(provider.today_summary().unwrap().mood.as_deref(), Some("calm"));
    }
}
