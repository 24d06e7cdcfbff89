//! Collaborator traits — the seams between the workflow engine and the
//! external services it drives. The engine is constructed with one
//! implementation of each at process start; tests inject mocks.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ContentBundle, NarrationResult, Problem, ProblemRequest, PublishOutcome};

/// Produces one math problem for a (grade, topic, slot) request.
///
/// Fails with `Generation`/`ProviderOverloaded` when the external
/// generator is unreachable or returns malformed output. No retry
/// happens inside an implementation — retry and fallback substitution
/// belong to the caller.
#[async_trait]
pub trait ProblemSource: Send + Sync {
    async fn generate(&self, request: &ProblemRequest) -> Result<Problem>;
}

/// Produces a narration script and synthesized audio for one language.
///
/// Fails-soft: every failure is reported through the returned
/// `NarrationResult`, so one language never aborts the batch.
#[async_trait]
pub trait NarrationSource: Send + Sync {
    async fn synthesize(&self, problem: &Problem, language_tag: &str) -> NarrationResult;
}

/// Hands an approved bundle to the external publishing platform, one
/// language at a time. Fails-soft per language.
#[async_trait]
pub trait PublishSink: Send + Sync {
    async fn publish(&self, bundle: &ContentBundle, language_tag: &str) -> PublishOutcome;
}
