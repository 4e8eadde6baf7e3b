//! Session module: the page-driving capability used by discovery and extraction
//!
//! This module contains:
//! - The `Session` trait every automation backend implements
//! - Owned DOM snapshots (`Element`, `PageSnapshot`) that can cross await points
//! - `ChromeSession`, a headless Chrome session for real runs
//! - `HttpSession`, a reqwest/scraper backed session without script support
//! - `SessionPool`, the fixed-size pool that leases sessions to workers

mod chrome;
mod element;
#[cfg(test)]
pub(crate) mod fake;
mod http;
mod pool;

pub use chrome::{launch_options, ChromeSession};
pub use element::{Element, Locator, PageSnapshot};
pub use http::{build_http_client, user_agent_string, HttpSession};
pub use pool::{SessionLease, SessionPool};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a session or the session pool
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Timed out after {timeout:?} waiting for '{selector}'")]
    Timeout { selector: String, timeout: Duration },

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("No page is loaded")]
    NoPage,

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Session {0} has been closed")]
    Closed(usize),

    #[error("Session pool is closed")]
    PoolClosed,

    #[error("Session pool cannot be empty")]
    EmptyPool,

    #[error("Capture failed: {0}")]
    Capture(#[from] std::io::Error),
}

impl SessionError {
    /// Returns true if this error is a bounded wait running out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// A stateful page-driving connection
///
/// A session is owned by the pool and leased to exactly one worker at a time;
/// it moves between worker tasks, so implementations must be `Send`.
#[async_trait]
pub trait Session: Send {
    /// Identifier used in logs
    fn id(&self) -> usize;

    /// Loads `url`, following redirects
    async fn navigate(&mut self, url: &str) -> SessionResult<()>;

    /// URL of the currently loaded page, after redirects; empty before the first navigation
    fn current_url(&self) -> String;

    /// Waits until `selector` matches at least one element or `timeout` elapses
    async fn wait_until_present(&mut self, selector: &str, timeout: Duration)
        -> SessionResult<()>;

    /// First element matching `selector` in the current page
    async fn find_one(&self, selector: &str) -> SessionResult<Option<Element>>;

    /// All elements matching `selector` in the current page, in document order
    async fn find_all(&self, selector: &str) -> SessionResult<Vec<Element>>;

    /// Activates a control previously returned by `find_one`/`find_all`
    async fn click(&mut self, element: &Element) -> SessionResult<()>;

    /// Writes a capture of the current page to `path`
    async fn screenshot(&mut self, path: &Path) -> SessionResult<()>;

    /// Runs a script in the page
    async fn run_script(&mut self, script: &str) -> SessionResult<()>;

    /// File extension of the captures written by `screenshot`
    fn capture_extension(&self) -> &'static str {
        "png"
    }

    /// Tears the session down; later calls fail with `SessionError::Closed`
    async fn quit(&mut self) -> SessionResult<()>;
}
