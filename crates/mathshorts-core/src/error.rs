//! Error taxonomy for the workflow engine.
//!
//! Per-language narration and publish failures are NOT errors — they are
//! reported as values (`NarrationResult`, `PublishOutcome`) so one
//! language never aborts its siblings. Only structural failures surface
//! through this enum.

use thiserror::Error;

/// All errors produced by MathShorts components.
#[derive(Error, Debug)]
pub enum MathShortsError {
    /// Problem generator unreachable or returned malformed output.
    /// The caller substitutes the fallback template instead of aborting.
    #[error("problem generation failed: {0}")]
    Generation(String),

    /// Provider signalled overload (HTTP 429/529). Retryable.
    #[error("provider overloaded: {0}")]
    ProviderOverloaded(String),

    /// No ticket with the given id.
    #[error("unknown ticket: {0}")]
    UnknownTicket(String),

    /// Ticket was already resolved; a ticket resolves at most once.
    #[error("ticket already resolved: {0}")]
    AlreadyResolved(String),

    /// A run for this slot is already in flight; the duplicate is dropped.
    #[error("run already in progress for slot '{0}'")]
    AlreadyRunning(String),

    /// Ticket store failure (open, read, or write).
    #[error("ticket store: {0}")]
    Store(String),

    /// Configuration load or parse failure.
    #[error("config: {0}")]
    Config(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MathShortsError>;

impl MathShortsError {
    /// Whether the uniform retry policy applies to this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MathShortsError::ProviderOverloaded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(MathShortsError::ProviderOverloaded("529".into()).is_retryable());
        assert!(!MathShortsError::Generation("bad json".into()).is_retryable());
        assert!(!MathShortsError::UnknownTicket("t-1".into()).is_retryable());
    }
}
