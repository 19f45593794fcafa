use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::convert::Infallible;
use std::rc::Rc;
use std::str::FromStr;

use super::bank::{Category, Suggestion, SuggestionBank, SuggestionEntry, MAX_LEVEL};
use super::clock::Clock;
use super::error::{CoachError, Result};
use super::profile::{BehavioralProfile, ProfileStore, MAX_SOFT_MODE};
use super::store::KeyValueStore;
use crate::habits::TodaySummary;
use crate::settings::Settings;

/// Signal logged on the habit side when the user says it's too much
pub const OVERWHELM_SIGNAL: &str = "user_marked_overwhelmed";

const HEAVY_MOODS: [&str; 3] = ["overwhelmed", "stressed", "tired"];

/// The coach's view of the habit tracker
pub trait HabitSummaryProvider {
    fn today_summary(&self) -> Option<TodaySummary>;
    fn add_overwhelm_signal(&mut self, signal: &str) -> Result<()>;
    fn set_mood(&mut self, mood: &str) -> Result<()>;
}

/// Stand-in when no tracker is wired up
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHabitData;

impl HabitSummaryProvider for NoHabitData {
    fn today_summary(&self) -> Option<TodaySummary> {
        None
    }

    fn add_overwhelm_signal(&mut self, _signal: &str) -> Result<()> {
        Err(CoachError::InvalidInput("no habit tracker".to_string()))
    }

    fn set_mood(&mut self, _mood: &str) -> Result<()> {
        Err(CoachError::InvalidInput("no habit tracker".to_string()))
    }
}

/// User feedback on the displayed suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Skip,
    Overwhelmed,
}

impl FromStr for Outcome {
    type Err = Infallible;

    /// Unknown outcomes are skips.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "success" => Outcome::Success,
            "overwhelmed" => Outcome::Overwhelmed,
            _ => Outcome::Skip,
        })
    }
}

/// Tunables for the feedback state machine
#[derive(Debug, Clone, Copy)]
pub struct CoachPolicy {
    pub cooldown: Duration,
    pub promote_after: u32,
    pub demote_after: u32,
}

impl Default for CoachPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::hours(48),
            promote_after: 3,
            demote_after: 2,
        }
    }
}

/// 0-3: +2 for a heavy mood today, +1 if any overwhelm signal was logged.
pub fn overwhelm_score(summary: Option<&TodaySummary>) -> u8 {
    let Some(summary) = summary else {
        return 0;
    };

    let mut score = 0;
    let mood = summary.mood.as_deref().unwrap_or("").to_lowercase();
    if HEAVY_MOODS.contains(&mood.as_str()) {
        score += 2;
    }
    if !summary.overwhelm_signals.is_empty() {
        score += 1;
    }
    score
}

/// `now + cooldown`, or the default 48h when that is out of range
fn cooldown_end(now: DateTime<Utc>, cooldown: Duration) -> DateTime<Utc> {
    now.checked_add_signed(cooldown)
        .or_else(|| now.checked_add_signed(CoachPolicy::default().cooldown))
        .unwrap_or(now)
}

/// Uniform pick from `pool`, avoiding `exclude_id` unless that leaves nothing.
pub fn pick<'a, R: Rng + ?Sized>(
    pool: &'a [SuggestionEntry],
    exclude_id: Option<&str>,
    rng: &mut R,
) -> Option<&'a SuggestionEntry> {
    let filtered: Vec<&SuggestionEntry> = match exclude_id {
        Some(id) => pool.iter().filter(|e| e.id != id).collect(),
        None => pool.iter().collect(),
    };

    if filtered.is_empty() {
        pool.choose(rng)
    } else {
        filtered.choose(rng).copied()
    }
}

/// Any habit category except the one shown last
pub fn pick_category<R: Rng + ?Sized>(last: Option<Category>, rng: &mut R) -> Category {
    let options: Vec<Category> = Category::HABITS
        .into_iter()
        .filter(|c| Some(*c) != last)
        .collect();
    options.choose(rng).copied().unwrap_or(Category::Water)
}

/// Adaptive suggestion engine.
///
/// Owns the behavioural profile for the session; every mutation is written
/// straight back through the [`ProfileStore`].
pub struct Coach<H: HabitSummaryProvider, R: Rng> {
    store: ProfileStore,
    profile: BehavioralProfile,
    storage: Rc<dyn KeyValueStore>,
    data_collection_enabled: bool,
    bank: SuggestionBank,
    habits: H,
    clock: Rc<dyn Clock>,
    rng: R,
    policy: CoachPolicy,
    current: Option<Suggestion>,
}

impl<H: HabitSummaryProvider, R: Rng> Coach<H, R> {
    pub fn new(
        storage: Rc<dyn KeyValueStore>,
        data_collection_enabled: bool,
        habits: H,
        clock: Rc<dyn Clock>,
        rng: R,
    ) -> Self {
        let store = ProfileStore::new(storage.clone(), data_collection_enabled);
        let profile = store.normalize(store.load());
        store.save(&profile);

        Self {
            store,
            profile,
            storage,
            data_collection_enabled,
            bank: SuggestionBank::standard(),
            habits,
            clock,
            rng,
            policy: CoachPolicy::default(),
            current: None,
        }
    }

    pub fn with_policy(mut self, policy: CoachPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn profile(&self) -> &BehavioralProfile {
        &self.profile
    }

    pub fn bank(&self) -> &SuggestionBank {
        &self.bank
    }

    pub fn habits(&self) -> &H {
        &self.habits
    }

    pub fn habits_mut(&mut self) -> &mut H {
        &mut self.habits
    }

    pub fn current_suggestion(&self) -> Option<&Suggestion> {
        self.current.as_ref()
    }

    pub fn overwhelm_score(&self) -> u8 {
        overwhelm_score(self.habits.today_summary().as_ref())
    }

    pub fn should_soften(&self) -> bool {
        self.profile.in_cooldown(self.clock.now())
            || self.profile.soft_mode > 0
            || self.overwhelm_score() >= 2
    }

    pub fn suggestions_enabled(&self) -> bool {
        Settings::load(self.storage.as_ref(), self.data_collection_enabled).suggestions_enabled
    }

    /// Choose the next suggestion and remember it as last shown.
    pub fn select_suggestion(&mut self) -> Option<Suggestion> {
        let last_id = self.profile.last_suggestion_id.clone();

        let suggestion = if self.should_soften() {
            let entry = pick(self.bank.soften(), last_id.as_deref(), &mut self.rng)?;
            Suggestion::from_entry(entry, Category::Soften, 0)
        } else {
            let category = pick_category(self.profile.last_category, &mut self.rng);
            let level = self.profile.level.min(MAX_LEVEL);
            let entry = pick(
                self.bank.pool(category, level),
                last_id.as_deref(),
                &mut self.rng,
            )?;
            Suggestion::from_entry(entry, category, level)
        };

        tracing::debug!(
            id = %suggestion.id,
            category = %suggestion.category,
            level = suggestion.level,
            "suggestion selected"
        );

        self.profile.last_category = Some(suggestion.category);
        self.profile.last_suggestion_id = Some(suggestion.id.clone());
        self.store.save(&self.profile);
        self.current = Some(suggestion.clone());
        Some(suggestion)
    }

    /// Selection behind the suggestions toggle. `None` when switched off.
    pub fn next_suggestion(&mut self) -> Option<Suggestion> {
        if !self.suggestions_enabled() {
            tracing::debug!("suggestions disabled");
            return None;
        }
        self.select_suggestion()
    }

    /// Update the profile for `outcome`, persist it and move on to a fresh suggestion.
    pub fn apply_feedback(&mut self, outcome: Outcome) -> Option<Suggestion> {
        let p = &mut self.profile;

        match outcome {
            Outcome::Overwhelmed => {
                p.level = 0;
                p.soft_mode = (p.soft_mode + 2).min(MAX_SOFT_MODE);
                p.success_streak = 0;
                p.skip_streak = 0;
                p.overwhelm_cooldown_until =
                    Some(cooldown_end(self.clock.now(), self.policy.cooldown));

                if let Err(e) = self.habits.add_overwhelm_signal(OVERWHELM_SIGNAL) {
                    tracing::warn!(error = %e, "could not log overwhelm signal");
                }
                if let Err(e) = self.habits.set_mood("overwhelmed") {
                    tracing::warn!(error = %e, "could not set mood");
                }
            }
            Outcome::Success => {
                p.success_streak = p.success_streak.saturating_add(1);
                p.skip_streak = 0;
                p.soft_mode = p.soft_mode.saturating_sub(1);
                if p.success_streak >= self.policy.promote_after {
                    p.level = (p.level + 1).min(MAX_LEVEL);
                    p.success_streak = 0;
                }
            }
            Outcome::Skip => {
                p.skip_streak = p.skip_streak.saturating_add(1);
                p.success_streak = 0;
                p.soft_mode = (p.soft_mode + 1).min(MAX_SOFT_MODE);
                if p.skip_streak >= self.policy.demote_after {
                    p.level = p.level.saturating_sub(1);
                    p.skip_streak = 0;
                }
            }
        }

        tracing::debug!(
            ?outcome,
            level = self.profile.level,
            soft_mode = self.profile.soft_mode,
            success_streak = self.profile.success_streak,
            skip_streak = self.profile.skip_streak,
            "feedback applied"
        );

        self.store.save(&self.profile);
        self.next_suggestion()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::core::store::{MemoryStorage, PROFILE_KEY};
    use crate::habits::{DayFlags, OverwhelmSignal};
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FakeHabits {
        summary: Option<TodaySummary>,
        signals: Vec<String>,
        fail_writes: bool,
    }

    impl FakeHabits {
        fn with_mood(mood: Option<&str>) -> Self {
            Self {
                summary: Some(TodaySummary {
                    day: "2026-10-18".to_string(),
                    categories: DayFlags::default(),
                    mood: mood.map(str::to_string),
                    overwhelm_signals: vec![],
                }),
                signals: vec![],
                fail_writes: false,
            }
        }
    }

    impl HabitSummaryProvider for FakeHabits {
        fn today_summary(&self) -> Option<TodaySummary> {
            self.summary.clone()
        }

        fn add_overwhelm_signal(&mut self, signal: &str) -> Result<()> {
            if self.fail_writes {
                return Err(CoachError::Storage("boom".to_string()));
            }
            self.signals.push(signal.to_string());
            Ok(())
        }

        fn set_mood(&mut self, mood: &str) -> Result<()> {
            if self.fail_writes {
                return Err(CoachError::Storage("boom".to_string()));
            }
            if let Some(s) = self.summary.as_mut() {
                s.mood = Some(mood.to_string());
            }
            Ok(())
        }
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
    }

    fn coach_with<H: HabitSummaryProvider>(habits: H) -> (Rc<MemoryStorage>, Rc<FixedClock>, Coach<H, StdRng>) {
        let storage = Rc::new(MemoryStorage::new());
        let clock = Rc::new(FixedClock::new(now()));
        let coach = Coach::new(
            storage.clone(),
            true,
            habits,
            clock.clone(),
            StdRng::seed_from_u64(7),
        );
        (storage, clock, coach)
    }

    #[test]
    fn test_outcome_parse_defaults_to_skip() {
        assert_eq!("success".parse::<Outcome>().unwrap(), Outcome::Success);
        assert_eq!("Overwhelmed".parse::<Outcome>().unwrap(), Outcome::Overwhelmed);
        assert_eq!("skip".parse::<Outcome>().unwrap(), Outcome::Skip);
        assert_eq!("meh".parse::<Outcome>().unwrap(), Outcome::Skip);
        assert_eq!("".parse::<Outcome>().unwrap(), Outcome::Skip);
    }

    #[test]
    fn test_overwhelm_score() {
        assert_eq!(overwhelm_score(None), 0);

        let mut summary = FakeHabits::with_mood(Some("Stressed")).summary.unwrap();
        assert_eq!(overwhelm_score(Some(&summary)), 2);

        summary.overwhelm_signals.push(OverwhelmSignal {
            signal: "x".to_string(),
            at: now(),
        });
        assert_eq!(overwhelm_score(Some(&summary)), 3);

        summary.mood = Some("happy".to_string());
        assert_eq!(overwhelm_score(Some(&summary)), 1);
    }

    #[test]
    fn test_pick_excludes_last_id() {
        let bank = SuggestionBank::standard();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let e = pick(bank.soften(), Some("soft-notice"), &mut rng).unwrap();
            assert_ne!(e.id, "soft-notice");
        }
    }

    #[test]
    fn test_pick_falls_back_to_whole_pool() {
        let pool = [SuggestionEntry { id: "only", text: "t" }];
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick(&pool, Some("only"), &mut rng).unwrap().id, "only");
        assert!(pick(&[], None, &mut rng).is_none());
    }

    #[test]
    fn test_pick_category_rotates() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert_ne!(pick_category(Some(Category::Food), &mut rng), Category::Food);
        }
    }

    #[test]
    fn test_fresh_profile_gives_level_zero_habit_suggestion() {
        let (storage, _, mut coach) = coach_with(FakeHabits::with_mood(None));
        let s = coach.select_suggestion().unwrap();
        assert_ne!(s.category, Category::Soften);
        assert_eq!(s.level, 0);

        assert_eq!(coach.profile().last_category, Some(s.category));
        assert_eq!(coach.profile().last_suggestion_id.as_deref(), Some(s.id.as_str()));
        assert_eq!(coach.current_suggestion(), Some(&s));
        assert!(storage.get(PROFILE_KEY).unwrap().contains(&s.id));
    }

    #[test]
    fn test_heavy_mood_softens() {
        let (_, _, mut coach) = coach_with(FakeHabits::with_mood(Some("tired")));
        let s = coach.select_suggestion().unwrap();
        assert_eq!(s.category, Category::Soften);
        assert_eq!(s.level, 0);
    }

    #[test]
    fn test_missing_summary_scores_zero() {
        let (_, _, mut coach) = coach_with(NoHabitData);
        assert_eq!(coach.overwhelm_score(), 0);
        assert_ne!(coach.select_suggestion().unwrap().category, Category::Soften);
    }

    #[test]
    fn test_promotion_after_three_successes() {
        let (_, _, mut coach) = coach_with(FakeHabits::with_mood(None));
        for _ in 0..3 {
            coach.apply_feedback(Outcome::Success);
        }
        assert_eq!(coach.profile().level, 1);
        assert_eq!(coach.profile().success_streak, 0);
    }

    #[test]
    fn test_demotion_after_two_skips() {
        let (storage, clock, _) = coach_with(FakeHabits::with_mood(None));
        storage
            .set(PROFILE_KEY, r#"{"level":1,"skipStreak":0}"#)
            .unwrap();
        let mut coach = Coach::new(
            storage.clone(),
            true,
            FakeHabits::with_mood(None),
            clock,
            StdRng::seed_from_u64(9),
        );

        coach.apply_feedback(Outcome::Skip);
        assert_eq!(coach.profile().level, 1);
        assert_eq!(coach.profile().skip_streak, 1);
        assert_eq!(coach.profile().soft_mode, 1);

        coach.apply_feedback(Outcome::Skip);
        assert_eq!(coach.profile().level, 0);
        assert_eq!(coach.profile().skip_streak, 0);
        assert_eq!(coach.profile().soft_mode, 2);
    }

    #[test]
    fn test_success_decays_soft_mode() {
        let (_, _, mut coach) = coach_with(FakeHabits::with_mood(None));
        coach.apply_feedback(Outcome::Skip);
        assert_eq!(coach.profile().soft_mode, 1);
        coach.apply_feedback(Outcome::Success);
        assert_eq!(coach.profile().soft_mode, 0);
        assert_eq!(coach.profile().skip_streak, 0);
        assert_eq!(coach.profile().success_streak, 1);
    }

    #[test]
    fn test_overwhelmed_resets_and_signals() {
        let (_, _, mut coach) = coach_with(FakeHabits::with_mood(None));
        for _ in 0..3 {
            coach.apply_feedback(Outcome::Success);
        }
        coach.apply_feedback(Outcome::Success);

        let s = coach.apply_feedback(Outcome::Overwhelmed).unwrap();
        assert_eq!(s.category, Category::Soften);

        let p = coach.profile();
        assert_eq!(p.level, 0);
        assert_eq!(p.soft_mode, 2);
        assert_eq!((p.success_streak, p.skip_streak), (0, 0));
        assert_eq!(p.overwhelm_cooldown_until, Some(now() + Duration::hours(48)));

        assert_eq!(coach.habits().signals, vec![OVERWHELM_SIGNAL.to_string()]);
        assert_eq!(
            coach.habits().summary.as_ref().unwrap().mood.as_deref(),
            Some("overwhelmed")
        );
    }

    #[test]
    fn test_overwhelmed_survives_collaborator_failure() {
        let mut habits = FakeHabits::with_mood(None);
        habits.fail_writes = true;
        let (_, _, mut coach) = coach_with(habits);

        let s = coach.apply_feedback(Outcome::Overwhelmed).unwrap();
        assert_eq!(s.category, Category::Soften);
        assert!(coach.profile().overwhelm_cooldown_until.is_some());
    }

    #[test]
    fn test_cooldown_expires() {
        let (_, clock, mut coach) = coach_with(NoHabitData);
        coach.apply_feedback(Outcome::Overwhelmed);
        // work the soft mode back down while still in cooldown
        coach.apply_feedback(Outcome::Success);
        coach.apply_feedback(Outcome::Success);
        assert_eq!(coach.profile().soft_mode, 0);
        assert!(coach.should_soften());

        clock.advance(Duration::hours(48));
        assert!(!coach.should_soften());
        assert_ne!(coach.select_suggestion().unwrap().category, Category::Soften);
    }

    #[test]
    fn test_disabled_suggestions_leave_profile_alone() {
        let (storage, _, mut coach) = coach_with(NoHabitData);
        Settings {
            suggestions_enabled: false,
            ..Settings::default()
        }
        .save(&*storage)
        .unwrap();

        assert!(coach.next_suggestion().is_none());
        assert!(coach.apply_feedback(Outcome::Success).is_none());
        assert_eq!(coach.profile().success_streak, 1);
        assert_eq!(coach.profile().last_suggestion_id, None);
    }

    #[test]
    fn test_saturated_streaks_keep_counting() {
        let (storage, clock, _) = coach_with(NoHabitData);
        storage
            .set(PROFILE_KEY, r#"{"successStreak": 99999999999}"#)
            .unwrap();
        let mut coach = Coach::new(
            storage.clone(),
            true,
            NoHabitData,
            clock.clone(),
            StdRng::seed_from_u64(5),
        )
        .with_policy(CoachPolicy {
            promote_after: u32::MAX,
            ..CoachPolicy::default()
        });
        assert_eq!(coach.profile().success_streak, u32::MAX);

        coach.apply_feedback(Outcome::Success);
        assert_eq!(coach.profile().level, 1);
        assert_eq!(coach.profile().success_streak, 0);

        storage
            .set(PROFILE_KEY, r#"{"skipStreak": 99999999999}"#)
            .unwrap();
        let mut coach = Coach::new(storage, true, NoHabitData, clock, StdRng::seed_from_u64(6))
            .with_policy(CoachPolicy {
                demote_after: u32::MAX,
                ..CoachPolicy::default()
            });
        coach.apply_feedback(Outcome::Skip);
        assert_eq!(coach.profile().skip_streak, 0);
    }

    #[test]
    fn test_huge_streak_with_default_policy() {
        let (storage, clock, _) = coach_with(NoHabitData);
        storage
            .set(PROFILE_KEY, r#"{"successStreak": 99999999999}"#)
            .unwrap();
        let mut coach = Coach::new(storage, true, NoHabitData, clock, StdRng::seed_from_u64(5));

        coach.apply_feedback(Outcome::Success);
        assert_eq!(coach.profile().level, 1);
        assert_eq!(coach.profile().success_streak, 0);
    }

    #[test]
    fn test_oversized_cooldown_does_not_overflow() {
        let (_, _, coach) = coach_with(NoHabitData);
        let mut coach = coach.with_policy(CoachPolicy {
            cooldown: Duration::days(1_000_000_000),
            ..CoachPolicy::default()
        });

        coach.apply_feedback(Outcome::Overwhelmed);
        assert_eq!(
            coach.profile().overwhelm_cooldown_until,
            Some(now() + Duration::hours(48))
        );
        assert!(coach.should_soften());
    }

    #[test]
    fn test_custom_policy() {
        let (_, _, coach) = coach_with(NoHabitData);
        let mut coach = coach.with_policy(CoachPolicy {
            promote_after: 1,
            ..CoachPolicy::default()
        });
        coach.apply_feedback(Outcome::Success);
        assert_eq!(coach.profile().level, 1);
    }
}
