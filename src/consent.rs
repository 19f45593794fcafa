use std::rc::Rc;

use crate::core::error::Result;
use crate::core::store::{KeyValueStore, CONSENT_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentState {
    /// No answer yet; the banner would still be showing
    Undecided,
    Granted,
    Declined,
}

impl std::fmt::Display for ConsentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsentState::Undecided => write!(f, "undecided"),
            ConsentState::Granted => write!(f, "granted"),
            ConsentState::Declined => write!(f, "declined"),
        }
    }
}

/// Data-collection consent, stored as `"true"`/`"false"` under `ecoHabitConsent`.
pub struct ConsentManager {
    storage: Rc<dyn KeyValueStore>,
    state: ConsentState,
}

impl ConsentManager {
    pub fn load(storage: Rc<dyn KeyValueStore>) -> Self {
        let state = match storage.get(CONSENT_KEY).as_deref() {
            Some("true") => ConsentState::Granted,
            Some("false") => ConsentState::Declined,
            _ => ConsentState::Undecided,
        };
        let manager = Self { storage, state };
        manager.track_event("app", "consent_given", None);
        manager
    }

    pub fn state(&self) -> ConsentState {
        self.state
    }

    pub fn consent_given(&self) -> bool {
        self.state != ConsentState::Undecided
    }

    pub fn data_collection_enabled(&self) -> bool {
        self.state == ConsentState::Granted
    }

    pub fn analytics_enabled(&self) -> bool {
        self.state == ConsentState::Granted
    }

    pub fn set_consent(&mut self, given: bool) -> Result<()> {
        self.storage.set(CONSENT_KEY, if given { "true" } else { "false" })?;
        self.state = if given {
            ConsentState::Granted
        } else {
            ConsentState::Declined
        };
        tracing::info!(given, "consent updated");
        if given {
            self.track_event("app", "consent_given", None);
        }
        Ok(())
    }

    /// Local-only analytics: a log line, and only with consent.
    pub fn track_event(&self, category: &str, action: &str, label: Option<&str>) {
        if !self.analytics_enabled() {
            return;
        }
        tracing::info!(
            target: "ecohabit::analytics",
            category,
            action,
            label = label.unwrap_or(""),
            "event"
        );
    }
}
