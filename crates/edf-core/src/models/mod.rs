//! Data models for configuration and per-document results.

pub mod case;
pub mod config;

pub use case::{CaseRecord, ExpectedRecord, Status};
pub use config::EdfConfig;
