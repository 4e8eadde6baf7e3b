//! Finalize retry policies
//!
//! When the artifact cannot be written (typically because a spreadsheet
//! program holds it open) the sink asks a `RetryPolicy` whether to try again.

use crate::output::traits::OutputError;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Abort,
}

/// Decides what happens after a failed finalize attempt
///
/// Policies run on a blocking thread and may block.
pub trait RetryPolicy: Send {
    /// Called after attempt number `attempt` (1-based) failed with `error`
    fn on_failure(&mut self, attempt: u32, error: &OutputError) -> RetryDecision;
}

/// Waits for the operator to press Enter before every retry
///
/// Retries indefinitely; only the end of input aborts.
pub struct OperatorPrompt {
    input: Box<dyn BufRead + Send>,
}

impl OperatorPrompt {
    /// Prompts on standard input
    pub fn new() -> Self {
        Self::with_input(BufReader::new(io::stdin()))
    }

    pub fn with_input(input: impl BufRead + Send + 'static) -> Self {
        Self {
            input: Box::new(input),
        }
    }
}

impl Default for OperatorPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy for OperatorPrompt {
    fn on_failure(&mut self, attempt: u32, error: &OutputError) -> RetryDecision {
        if error.is_permission_denied() {
            tracing::error!(
                "Permission denied writing the artifact (attempt {}). Close it if it is open elsewhere.",
                attempt
            );
            eprintln!("Please close the output file and press Enter to retry...");
        } else {
            tracing::error!("Failed to write the artifact (attempt {}): {}", attempt, error);
            eprintln!("An unexpected error occurred. Press Enter to retry...");
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                tracing::warn!("No more operator input; giving up on the artifact");
                RetryDecision::Abort
            }
            Ok(_) => RetryDecision::Retry,
            Err(e) => {
                tracing::warn!("Failed to read operator input: {}", e);
                RetryDecision::Abort
            }
        }
    }
}

/// Retries a bounded number of times with a fixed delay
#[derive(Debug, Clone)]
pub struct MaxAttempts {
    max_attempts: u32,
    delay: Duration,
}

impl MaxAttempts {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl RetryPolicy for MaxAttempts {
    fn on_failure(&mut self, attempt: u32, error: &OutputError) -> RetryDecision {
        if attempt >= self.max_attempts {
            tracing::error!(
                "Failed to write the artifact after {} attempt(s): {}",
                attempt,
                error
            );
            return RetryDecision::Abort;
        }

        tracing::warn!(
            "Failed to write the artifact (attempt {}/{}): {}; retrying in {:?}",
            attempt,
            self.max_attempts,
            error,
            self.delay
        );
        std::thread::sleep(self.delay);
        RetryDecision::Retry
    }
}
