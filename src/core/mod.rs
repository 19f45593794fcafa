pub mod bank;
pub mod clock;
pub mod coach;
pub mod error;
pub mod profile;
pub mod store;

pub use bank::{Category, Suggestion, SuggestionBank, SuggestionEntry};
pub use clock::{Clock, FixedClock, SystemClock};
pub use coach::{Coach, CoachPolicy, HabitSummaryProvider, NoHabitData, Outcome};
pub use error::{CoachError, Result};
pub use profile::{BehavioralProfile, ProfileStore};
pub use store::{FileStorage, KeyValueStore, MemoryStorage};
