use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::rc::Rc;

use super::bank::{Category, MAX_LEVEL};
use super::store::{KeyValueStore, PROFILE_KEY};

pub const MAX_SOFT_MODE: u8 = 3;

/// Adaptive coaching state, one per device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralProfile {
    /// Difficulty tier (0-2)
    pub level: u8,

    /// "Be gentler" intensity (0-3), decays on success
    pub soft_mode: u8,

    pub success_streak: u32,
    pub skip_streak: u32,

    /// Gentlest pool is forced until this instant
    pub overwhelm_cooldown_until: Option<DateTime<Utc>>,

    pub last_category: Option<Category>,
    pub last_suggestion_id: Option<String>,
}

impl BehavioralProfile {
    /// Build a profile from arbitrary (possibly partial or corrupted) JSON.
    /// Anything missing or of the wrong shape falls back to its default.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let profile = Self {
            level: int_field(obj, "level").map(|n| n.clamp(0, MAX_LEVEL as i64) as u8).unwrap_or(0),
            soft_mode: int_field(obj, "softMode")
                .map(|n| n.clamp(0, MAX_SOFT_MODE as i64) as u8)
                .unwrap_or(0),
            success_streak: int_field(obj, "successStreak").map(saturate_u32).unwrap_or(0),
            skip_streak: int_field(obj, "skipStreak").map(saturate_u32).unwrap_or(0),
            overwhelm_cooldown_until: str_field(obj, "overwhelmCooldownUntil")
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            last_category: str_field(obj, "lastCategory").and_then(Category::from_key),
            last_suggestion_id: str_field(obj, "lastSuggestionId").map(str::to_string),
        };

        profile.normalize()
    }

    /// Clamp every field into its valid range. Idempotent.
    pub fn normalize(mut self) -> Self {
        self.level = self.level.min(MAX_LEVEL);
        self.soft_mode = self.soft_mode.min(MAX_SOFT_MODE);
        if self.success_streak > 0 && self.skip_streak > 0 {
            self.success_streak = 0;
            self.skip_streak = 0;
        }
        self
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.overwhelm_cooldown_until.is_some_and(|until| now < until)
    }
}

fn int_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    obj.get(key).and_then(Value::as_f64).map(|n| n.trunc() as i64)
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn saturate_u32(n: i64) -> u32 {
    n.clamp(0, u32::MAX as i64) as u32
}

/// Loads and saves the profile. When data collection is off nothing touches
/// storage and the profile lives only for the session.
pub struct ProfileStore {
    storage: Rc<dyn KeyValueStore>,
    persist: bool,
}

impl ProfileStore {
    pub fn new(storage: Rc<dyn KeyValueStore>, data_collection_enabled: bool) -> Self {
        Self {
            storage,
            persist: data_collection_enabled,
        }
    }

    pub fn load(&self) -> BehavioralProfile {
        if !self.persist {
            return BehavioralProfile::default();
        }

        let Some(raw) = self.storage.get(PROFILE_KEY) else {
            return BehavioralProfile::default();
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => BehavioralProfile::from_value(&value),
            Err(e) => {
                tracing::warn!(error = %e, "malformed coach profile, using defaults");
                BehavioralProfile::default()
            }
        }
    }

    pub fn normalize(&self, profile: BehavioralProfile) -> BehavioralProfile {
        profile.normalize()
    }

    /// Overwrite the stored profile. Failures are logged, never returned.
    pub fn save(&self, profile: &BehavioralProfile) {
        if !self.persist {
            return;
        }

        let json = match serde_json::to_string(profile) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize coach profile");
                return;
            }
        };

        if let Err(e) = self.storage.set(PROFILE_KEY, &json) {
            tracing::warn!(error = %e, "failed to persist coach profile");
        }
    }
}
