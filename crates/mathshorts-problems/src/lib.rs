//! # MathShorts Problems
//!
//! The `ProblemSource` implementation: a generative-API client that asks
//! for a structured problem JSON, plus the deterministic per-topic
//! fallback table that keeps runs alive when the provider is down.

pub mod api;
pub mod fallback;

pub use api::ApiProblemSource;
pub use fallback::fallback_problem;
