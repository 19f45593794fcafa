pub mod checkin;
pub mod config;
pub mod consent;
pub mod core;
pub mod habits;
pub mod progress;
pub mod settings;
