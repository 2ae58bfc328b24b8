//! Court Room terminal runner
//!
//! Drives a [`courtroom::CourtSession`] from stdin: one command per line,
//! session events printed to stdout as they happen, logs on stderr.

pub mod commands;
pub mod config;
pub mod render;

pub use commands::{execute, Command, CommandError, ParseError};
pub use config::{ConfigError, Settings, SettingsOverrides};

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "court_session=info,courtroom=info";
