//! # MathShorts Approval
//!
//! The human approval gate in front of publishing. A submitted bundle
//! becomes a durable ticket (SQLite — survives restarts, so the
//! deadline-based auto-approval holds across a crash), the reviewer is
//! notified best-effort, and a periodic sweep auto-approves anything
//! still pending past its deadline.

pub mod gate;
pub mod notify;
pub mod store;

pub use gate::{ApprovalGate, Decision};
pub use notify::{NotifyTarget, Notifier};
pub use store::TicketStore;
