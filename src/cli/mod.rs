use std::path::PathBuf;
use std::rc::Rc;
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use ecohabit::checkin::{parse_checkin, ReplyComposer, ReplyState};
use ecohabit::config::Config;
use ecohabit::consent::{ConsentManager, ConsentState};
use ecohabit::core::{
    Category, Clock, Coach, FileStorage, KeyValueStore, Outcome, Suggestion, SystemClock,
};
use ecohabit::habits::HabitTracker;
use ecohabit::progress::{badge_board, leaderboard, BadgeBoard, Leaderboard};
use ecohabit::settings::Settings;

pub use commands::{Args, Commands, ConsentCommands, Toggle};

mod commands;

/// Everything one invocation needs, wired to the on-disk store
struct Session {
    config: Config,
    storage: Rc<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
    consent: ConsentManager,
}

impl Session {
    fn open(data_dir: Option<PathBuf>) -> Result<Self> {
        let config = Config::new(data_dir)?;
        let storage: Rc<dyn KeyValueStore> = Rc::new(
            FileStorage::open(config.storage_file()).context("Failed to open storage")?,
        );
        let consent = ConsentManager::load(storage.clone());

        Ok(Session {
            config,
            storage,
            clock: Rc::new(SystemClock),
            consent,
        })
    }

    fn collecting(&self) -> bool {
        self.consent.data_collection_enabled()
    }

    fn tracker(&self) -> HabitTracker {
        HabitTracker::load(self.storage.clone(), self.clock.clone(), self.collecting())
    }

    fn coach(&self) -> Coach<HabitTracker, StdRng> {
        Coach::new(
            self.storage.clone(),
            self.collecting(),
            self.tracker(),
            self.clock.clone(),
            StdRng::from_entropy(),
        )
        .with_policy(self.config.coach_policy())
    }

    fn settings(&self) -> Settings {
        Settings::load(self.storage.as_ref(), self.collecting())
    }

    fn memory_only_notice(&self) {
        if self.consent.state() == ConsentState::Undecided {
            println!("ℹ️  Nothing is saved until you run `ecohabit consent accept`.");
        }
    }
}

fn print_suggestion(suggestion: Option<Suggestion>) {
    match suggestion {
        Some(s) => println!("🌿 {}  [{} · level {}]", s.text, s.category, s.level),
        None => println!("💤 Suggestions are off. Turn them on with `ecohabit settings --suggestions on`."),
    }
}

pub fn handle_suggest(data_dir: Option<PathBuf>) -> Result<()> {
    let session = Session::open(data_dir)?;
    let mut coach = session.coach();
    print_suggestion(coach.next_suggestion());
    session.memory_only_notice();
    Ok(())
}

pub fn handle_feedback(outcome: &str, data_dir: Option<PathBuf>) -> Result<()> {
    let session = Session::open(data_dir)?;
    let mut coach = session.coach();

    // Infallible: anything unrecognised is a skip
    let outcome: Outcome = outcome.parse().unwrap_or(Outcome::Skip);
    session
        .consent
        .track_event("coach", "feedback", Some(&format!("{:?}", outcome)));

    let next = coach.apply_feedback(outcome);
    match outcome {
        Outcome::Success => println!("✅ Nice work. That counts."),
        Outcome::Skip => println!("🍃 Skipped, no problem."),
        Outcome::Overwhelmed => println!("🫶 Thanks for saying so. Keeping things gentle for a while."),
    }
    print_suggestion(next);
    session.memory_only_notice();
    Ok(())
}

pub fn handle_checkin(categories: &[String], data_dir: Option<PathBuf>) -> Result<()> {
    let session = Session::open(data_dir)?;
    let mut coach = session.coach();

    for raw in categories {
        let category: Category = raw.parse()?;
        if coach.habits_mut().track(category) {
            session.consent.track_event("habit", "completed", Some(category.as_str()));
            println!("✔️  {} checked in", category);
        } else {
            println!("⚠️  {} is not a trackable habit", category);
        }
    }

    let progress = coach.habits().daily_progress();
    println!("📊 Today: {}/{} ({}%)", progress.completed, progress.total, progress.percentage);

    print_suggestion(coach.apply_feedback(Outcome::Success));
    session.memory_only_notice();
    Ok(())
}

pub fn handle_mood(mood: &str, data_dir: Option<PathBuf>) -> Result<()> {
    let session = Session::open(data_dir)?;
    let mut tracker = session.tracker();
    if tracker.set_mood(mood) {
        println!("😊 Mood for today: {}", mood);
    } else {
        println!("⚠️  Mood can't be empty");
    }
    session.memory_only_notice();
    Ok(())
}

pub fn handle_say(text: &[String], data_dir: Option<PathBuf>) -> Result<()> {
    let session = Session::open(data_dir)?;
    let text = text.join(" ");
    let parsed = parse_checkin(&text);

    // Without consent every `say` starts a fresh conversation
    let state = if session.collecting() {
        ReplyState::load(session.storage.as_ref())
    } else {
        ReplyState::default()
    };
    let mut composer = ReplyComposer::with_state(StdRng::from_entropy(), state);

    for intent in &parsed.intents {
        println!("🔎 Heard: {}", intent.label);
    }
    println!("💬 {}", composer.reply(&parsed));

    if session.collecting() {
        composer
            .state()
            .save(session.storage.as_ref())
            .context("Failed to save check-in state")?;
    }
    Ok(())
}

pub fn handle_summary(data_dir: Option<PathBuf>) -> Result<()> {
    let session = Session::open(data_dir)?;
    let tracker = session.tracker();
    let summary = tracker.today_summary();
    let progress = tracker.daily_progress();
    let totals = tracker.light_totals();

    let mark = |done: bool| if done { "✔️ " } else { "·" };
    println!("📅 {}", summary.day);
    println!("  water   {}", mark(summary.categories.water));
    println!("  plastic {}", mark(summary.categories.plastic));
    println!("  food    {}", mark(summary.categories.food));
    println!("  mood    {}", summary.mood.as_deref().unwrap_or("-"));
    if !summary.overwhelm_signals.is_empty() {
        println!("  overwhelm signals: {}", summary.overwhelm_signals.len());
    }
    println!("📊 Progress: {}/{} ({}%)", progress.completed, progress.total, progress.percentage);
    println!(
        "🔢 Totals: water {}, plastic {}, food {}",
        totals.water.count, totals.plastic.count, totals.food.count
    );
    Ok(())
}

pub fn handle_badges(data_dir: Option<PathBuf>) -> Result<()> {
    let session = Session::open(data_dir)?;
    let totals = session.tracker().light_totals();

    match badge_board(&session.settings(), &totals, session.config.badge_threshold) {
        BadgeBoard::Disabled => {
            println!("Badges are off right now. Turn them on with `ecohabit settings --badges on`.")
        }
        BadgeBoard::Shown(statuses) => {
            println!("🏅 Badges (private)");
            for status in statuses {
                println!(
                    "  {} {:<16} {}",
                    status.badge.emoji,
                    status.badge.title,
                    if status.earned { "earned" } else { "not yet" }
                );
            }
        }
    }
    Ok(())
}

pub fn handle_leaderboard(data_dir: Option<PathBuf>) -> Result<()> {
    let session = Session::open(data_dir)?;
    let tracker = session.tracker();

    match leaderboard(&session.settings(), tracker.daily_history(), session.config.leaderboard_size) {
        Leaderboard::Disabled => println!(
            "Leaderboard is off right now. Turn it on with `ecohabit settings --leaderboard on`."
        ),
        Leaderboard::NoData => println!("No history yet. Complete a few check-ins and come back."),
        Leaderboard::Ranked(rows) => {
            println!("🏆 Your strongest days (this device only)");
            for row in rows {
                let medal = row.medal().map(|m| format!(" {}", m)).unwrap_or_default();
                println!("  {}{:<3} {}  {}/3 · {}", row.rank, medal, row.day, row.score, row.label());
            }
        }
    }
    Ok(())
}

pub fn handle_consent(command: ConsentCommands, data_dir: Option<PathBuf>) -> Result<()> {
    let mut session = Session::open(data_dir)?;
    match command {
        ConsentCommands::Accept => {
            session.consent.set_consent(true)?;
            println!("🔐 Thanks. Your data stays on this device.");
        }
        ConsentCommands::Decline => {
            session.consent.set_consent(false)?;
            println!("🔐 Understood. Nothing will be saved between sessions.");
        }
        ConsentCommands::Status => {
            println!("🔐 Consent: {}", session.consent.state());
        }
    }
    Ok(())
}

pub fn handle_settings(
    suggestions: Option<Toggle>,
    badges: Option<Toggle>,
    leaderboard: Option<Toggle>,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    let session = Session::open(data_dir)?;
    let mut settings = session.settings();

    let changing = suggestions.is_some() || badges.is_some() || leaderboard.is_some();
    if changing {
        if !session.collecting() {
            anyhow::bail!("settings can only be saved after `ecohabit consent accept`");
        }
        if let Some(t) = suggestions {
            settings.suggestions_enabled = t.enabled();
        }
        if let Some(t) = badges {
            settings.badges_enabled = t.enabled();
        }
        if let Some(t) = leaderboard {
            settings.leaderboard_enabled = t.enabled();
        }
        settings.save(session.storage.as_ref())?;
    }

    let flag = |on: bool| if on { "on" } else { "off" };
    println!("⚙️  suggestions: {}", flag(settings.suggestions_enabled));
    println!("⚙️  badges:      {}", flag(settings.badges_enabled));
    println!("⚙️  leaderboard: {}", flag(settings.leaderboard_enabled));
    Ok(())
}

pub fn handle_profile(data_dir: Option<PathBuf>) -> Result<()> {
    let session = Session::open(data_dir)?;
    let coach = session.coach();
    let profile = coach.profile();

    println!("🧭 Level: {}", profile.level);
    println!("🪶 Soft mode: {}", profile.soft_mode);
    println!("📈 Success streak: {}", profile.success_streak);
    println!("📉 Skip streak: {}", profile.skip_streak);
    match profile.overwhelm_cooldown_until {
        Some(until) if profile.in_cooldown(session.clock.now()) => {
            println!("🛌 Gentle mode until {}", until.to_rfc3339())
        }
        _ => println!("🛌 No cooldown"),
    }
    if let Some(id) = &profile.last_suggestion_id {
        match coach.bank().find(id) {
            Some((_, _, entry)) => println!("🌿 Last suggestion: {}", entry.text),
            None => println!("🌿 Last suggestion: {}", id),
        }
    }
    println!("🧮 Overwhelm score today: {}", coach.overwhelm_score());
    Ok(())
}
