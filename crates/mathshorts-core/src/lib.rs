//! # MathShorts Core
//!
//! Shared foundation for the MathShorts workflow engine: configuration,
//! the error taxonomy, the content data model, and the traits that the
//! external collaborators (problem generator, TTS, publisher) implement.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::MathShortsConfig;
pub use error::{MathShortsError, Result};
pub use traits::{NarrationSource, ProblemSource, PublishSink};
pub use types::{
    ApprovalStatus, ApprovalTicket, ContentBundle, Grade, LanguageOutcome, NarrationResult,
    Problem, ProblemMetadata, ProblemRequest, PublishOutcome, RunResult, RunStatus, TimeSlot,
};
