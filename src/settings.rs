use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::Result;
use crate::core::store::{KeyValueStore, SETTINGS_KEY};

/// Feature toggles from the transparency panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub suggestions_enabled: bool,
    pub badges_enabled: bool,
    pub leaderboard_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::all(true)
    }
}

impl Settings {
    fn all(enabled: bool) -> Self {
        Self {
            suggestions_enabled: enabled,
            badges_enabled: enabled,
            leaderboard_enabled: enabled,
        }
    }

    /// Read the toggles. Without data-collection consent everything is off;
    /// otherwise only an explicit `false` turns a feature off.
    pub fn load(storage: &dyn KeyValueStore, data_collection_enabled: bool) -> Self {
        if !data_collection_enabled {
            return Self::all(false);
        }

        let Some(raw) = storage.get(SETTINGS_KEY) else {
            return Self::default();
        };

        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "malformed settings, using defaults");
                return Self::default();
            }
        };

        let enabled = |key: &str| parsed.get(key) != Some(&Value::Bool(false));
        Self {
            suggestions_enabled: enabled("suggestionsEnabled"),
            badges_enabled: enabled("badgesEnabled"),
            leaderboard_enabled: enabled("leaderboardEnabled"),
        }
    }

    pub fn save(&self, storage: &dyn KeyValueStore) -> Result<()> {
        let json = serde_json::to_string(self)?;
        storage.set(SETTINGS_KEY, &json)
    }
}
