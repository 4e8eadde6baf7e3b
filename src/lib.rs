//! Parts-Harvester: a bounded-concurrency catalog scraper
//!
//! This crate searches a parts catalog for manufacturers matching a set of
//! keywords, paginates through each manufacturer's categorized listings with a
//! pool of reusable sessions, and writes every extracted part record into a
//! single tabular artifact alongside per-page captures.

pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod session;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Parts-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PaginationState,
        to: state::PaginationState,
    },

    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Worker task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Parts-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use record::{PartRecord, RowParser};
pub use session::{Session, SessionLease, SessionPool};
pub use state::{PaginationState, StopReason};
