//! # MathShorts Scheduler
//!
//! The coordination core: one `WorkflowEngine` drives the daily content
//! cadence. Each slot run generates a problem (with fallback), fans out
//! narration per language, submits the bundle to the approval gate, and
//! publishes on resolution. Timers are plain tokio intervals; schedule
//! and sweep cadence come from configuration.
//!
//! ```text
//! schedule loop (cron table)
//!   └── run_slot(slot)
//!         Generating  → problem (retry + timeout, fallback on failure)
//!                     → narration fan-out, joined per language
//!         AwaitingApproval → gate.submit → notification side effect
//! resolve / sweep loop
//!   └── complete_run(ticket)
//!         Publishing  → publish fan-out over narrated languages
//!         Completed   → RunResult recorded
//! ```

pub mod cron;
pub mod engine;
pub mod retry;
pub mod runs;

pub use engine::WorkflowEngine;
pub use retry::RetryPolicy;
pub use runs::{RunPhase, SlotRun};
