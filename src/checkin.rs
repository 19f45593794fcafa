//! Free-text check-ins ("I took a shorter shower") and the coach's gentle replies.
//!
//! Recognition is deliberately light: a couple of known intents plus a generic
//! "I did something" shape. Nothing here judges the user.

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::core::error::Result;
use crate::core::store::{KeyValueStore, CHECKIN_KEY};

static SHORTER_SHOWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(short(er)? shower|took a shorter shower|took shorter shower|short shower)")
        .expect("valid shower pattern")
});

static REUSED_FOOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(reused (food|leftovers)|ate leftovers|used leftovers|saved leftovers)")
        .expect("valid leftovers pattern")
});

static DID_SOMETHING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(i\s+)(did|took|reused|used|ate|made|tried)\b").expect("valid did pattern")
});

static STRUGGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(couldn'?t|didn'?t|failed|messed up|hard|tired|overwhelmed)")
        .expect("valid struggle pattern")
});

const DIDNT_CATCH: &str = "I didn\u{2019}t catch that\u{2014}no worries. Want to try once more?";

const FOLLOWUPS: [&str; 4] = [
    "Thank you for sharing that.",
    "That makes sense.",
    "I hear you.",
    "Got it. That\u{2019}s helpful.",
];

const NEXT_QUESTIONS: [&str; 3] = [
    "Want to do one more tiny thing today\u{2014}or keep it gentle?",
    "Do you want a small suggestion for tomorrow?",
    "Would you like to name one thing that would make tomorrow easier?",
];

const ACKNOWLEDGEMENTS: [&str; 5] = [
    "Nice. That counts.",
    "That counts\u{2014}thank you for doing that.",
    "You did a good thing for Future You.",
    "That\u{2019}s a real win.",
    "Quiet progress. I like it.",
];

const FOLLOW_UP_QUESTIONS: [&str; 4] = [
    "Want to tell me what made that doable today?",
    "Was that easy today, or did it take effort?",
    "Do you want to keep the streak gentle\u{2014}one small thing tomorrow too?",
    "Anything you want to do a little differently tomorrow?",
];

const TOMORROW: [&str; 3] = [
    "We\u{2019}ll try again tomorrow.",
    "If today was heavy, tomorrow is a fresh page.",
    "We can take it one day at a time.",
];

const SOFT: [&str; 3] = [
    "That\u{2019}s okay. You don\u{2019}t need to be perfect.",
    "No judgment here.",
    "Thanks for being honest with me.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intent {
    pub key: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCheckin {
    pub text: String,
    pub normalized: String,
    pub intents: Vec<Intent>,
    pub did_something: bool,
    pub is_empty: bool,
}

pub fn parse_checkin(raw: &str) -> ParsedCheckin {
    let text = raw.trim().to_string();
    let normalized = text.to_lowercase();

    let mut intents = Vec::new();
    if SHORTER_SHOWER.is_match(&normalized) {
        intents.push(Intent {
            key: "shorter_shower",
            label: "shorter shower",
        });
    }
    if REUSED_FOOD.is_match(&normalized) {
        intents.push(Intent {
            key: "reused_food",
            label: "reused food",
        });
    }

    ParsedCheckin {
        did_something: DID_SOMETHING.is_match(&normalized),
        is_empty: text.is_empty(),
        intents,
        normalized,
        text,
    }
}

/// What the composer remembers between check-ins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplyState {
    pub last_reply: String,
    pub last_intent_key: Option<String>,
    pub pending_prompt: bool,
}

impl ReplyState {
    /// Stored state, or a fresh conversation if there is none or it is unreadable
    pub fn load(storage: &dyn KeyValueStore) -> Self {
        let Some(raw) = storage.get(CHECKIN_KEY) else {
            return Self::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "malformed check-in state, starting fresh");
            Self::default()
        })
    }

    pub fn save(&self, storage: &dyn KeyValueStore) -> Result<()> {
        let json = serde_json::to_string(self)?;
        storage.set(CHECKIN_KEY, &json)
    }
}

/// Conversation state across check-ins
pub struct ReplyComposer<R: Rng> {
    rng: R,
    state: ReplyState,
}

impl<R: Rng> ReplyComposer<R> {
    pub fn new(rng: R) -> Self {
        Self::with_state(rng, ReplyState::default())
    }

    /// Pick up a conversation where an earlier composer left it
    pub fn with_state(rng: R, state: ReplyState) -> Self {
        Self { rng, state }
    }

    pub fn state(&self) -> &ReplyState {
        &self.state
    }

    pub fn last_intent_key(&self) -> Option<&str> {
        self.state.last_intent_key.as_deref()
    }

    pub fn awaiting_answer(&self) -> bool {
        self.state.pending_prompt
    }

    /// Random option, stepping to the next one if it would repeat the last reply
    fn pick_varied(&mut self, options: &[&'static str]) -> &'static str {
        match options.len() {
            0 => "",
            1 => options[0],
            n => {
                let i = self.rng.gen_range(0..n);
                if options[i] == self.state.last_reply {
                    options[(i + 1) % n]
                } else {
                    options[i]
                }
            }
        }
    }

    fn remember(&mut self, reply: String) -> String {
        self.state.last_reply = reply.clone();
        reply
    }

    pub fn reply(&mut self, parsed: &ParsedCheckin) -> String {
        if parsed.is_empty {
            return DIDNT_CATCH.to_string();
        }

        if self.state.pending_prompt {
            self.state.pending_prompt = false;
            let reply = format!(
                "{} {}",
                self.pick_varied(&FOLLOWUPS),
                self.pick_varied(&NEXT_QUESTIONS)
            );
            return self.remember(reply);
        }

        if let Some(intent) = parsed.intents.first() {
            self.state.last_intent_key = Some(intent.key.to_string());
        }

        if !parsed.intents.is_empty() || parsed.did_something {
            self.state.pending_prompt = true;
            let reply = format!(
                "{} {}",
                self.pick_varied(&ACKNOWLEDGEMENTS),
                self.pick_varied(&FOLLOW_UP_QUESTIONS)
            );
            return self.remember(reply);
        }

        if STRUGGLE.is_match(&parsed.normalized) {
            let reply = format!("{} {}", self.pick_varied(&SOFT), self.pick_varied(&TOMORROW));
            return self.remember(reply);
        }

        let reply = self.pick_varied(&TOMORROW).to_string();
        self.remember(reply)
    }
}
