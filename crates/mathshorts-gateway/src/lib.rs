//! # MathShorts Gateway
//!
//! The one inbound interface the core exposes: the approval decision
//! endpoint a reviewer hits from the notification links, plus read-only
//! ticket/run listings for observability.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, serve};
