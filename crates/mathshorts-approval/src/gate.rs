//! The approval gate state machine: pending → approved | rejected.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

use mathshorts_core::error::{MathShortsError, Result};
use mathshorts_core::types::{ApprovalStatus, ApprovalTicket, ContentBundle};

use crate::notify::Notifier;
use crate::store::TicketStore;

/// Feedback recorded on tickets the deadline sweep resolves.
pub const AUTO_APPROVE_FEEDBACK: &str = "deadline expired — auto-approved";

/// An operator's explicit decision on a pending ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "approve" | "approved" => Ok(Decision::Approve),
            "reject" | "rejected" => Ok(Decision::Reject),
            other => Err(format!("unknown decision '{other}'")),
        }
    }
}

impl Decision {
    fn status(self) -> ApprovalStatus {
        match self {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// Holds submitted bundles pending review. The store mutex is the single
/// ownership discipline over the shared pending set; status transitions
/// themselves rely on the store's check-and-set, so a racing sweep and
/// an explicit resolve settle to exactly one winner.
pub struct ApprovalGate {
    store: Mutex<TicketStore>,
    notifier: Notifier,
    window: Duration,
}

impl ApprovalGate {
    pub fn new(store: TicketStore, notifier: Notifier, window_secs: u64) -> Self {
        Self {
            store: Mutex::new(store),
            notifier,
            window: Duration::seconds(window_secs as i64),
        }
    }

    /// Submit a bundle for review. The ticket is durable before the
    /// notification goes out, and a failed notification never fails the
    /// submission.
    pub async fn submit(&self, bundle: ContentBundle) -> Result<ApprovalTicket> {
        let ticket = ApprovalTicket::new(bundle, Utc::now(), self.window);
        {
            let store = self.store.lock().expect("ticket store poisoned");
            store.insert(&ticket).map_err(MathShortsError::Store)?;
        }
        tracing::info!(
            "🎫 Ticket submitted: {} (deadline {})",
            ticket.id,
            ticket.deadline.format("%Y-%m-%d %H:%M UTC")
        );

        self.notifier.announce_submission(&ticket).await;
        Ok(ticket)
    }

    /// Apply an explicit decision. Fails with `UnknownTicket` for a bad
    /// id and `AlreadyResolved` when the ticket left `pending` first.
    pub fn resolve(
        &self,
        ticket_id: &str,
        decision: Decision,
        feedback: Option<&str>,
    ) -> Result<ApprovalTicket> {
        let store = self.store.lock().expect("ticket store poisoned");

        let won = store
            .resolve_if_pending(ticket_id, decision.status(), Utc::now(), feedback)
            .map_err(MathShortsError::Store)?;
        if !won {
            // Lost the CAS: either the id never existed, or someone
            // (operator or sweep) resolved it first.
            return match store.get(ticket_id).map_err(MathShortsError::Store)? {
                Some(_) => Err(MathShortsError::AlreadyResolved(ticket_id.to_string())),
                None => Err(MathShortsError::UnknownTicket(ticket_id.to_string())),
            };
        }

        let updated = store
            .get(ticket_id)
            .map_err(MathShortsError::Store)?
            .ok_or_else(|| MathShortsError::UnknownTicket(ticket_id.to_string()))?;
        tracing::info!("🎯 Ticket {} resolved: {}", updated.id, updated.status);
        Ok(updated)
    }

    /// Auto-approve every pending ticket past its deadline. Idempotent:
    /// tickets resolved between the scan and the update are skipped.
    /// Returns the tickets this sweep resolved.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<ApprovalTicket>> {
        let store = self.store.lock().expect("ticket store poisoned");
        let expired = store.expired_pending(now).map_err(MathShortsError::Store)?;

        let mut resolved = Vec::new();
        for ticket in expired {
            let won = store
                .resolve_if_pending(
                    &ticket.id,
                    ApprovalStatus::Approved,
                    now,
                    Some(AUTO_APPROVE_FEEDBACK),
                )
                .map_err(MathShortsError::Store)?;
            if !won {
                continue;
            }
            tracing::info!("⏰ Auto-approved on deadline: {}", ticket.id);
            if let Some(updated) = store.get(&ticket.id).map_err(MathShortsError::Store)? {
                resolved.push(updated);
            }
        }
        Ok(resolved)
    }

    /// Observability only.
    pub fn list_pending(&self) -> Result<Vec<ApprovalTicket>> {
        let store = self.store.lock().expect("ticket store poisoned");
        store.pending().map_err(MathShortsError::Store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathshorts_core::types::{Problem, ProblemMetadata, TimeSlot};

    fn sample_bundle() -> ContentBundle {
        let problem = Problem {
            statement_text: "문제".into(),
            equation_text: "3x + 5 = 20".into(),
            solution_steps: vec!["x = 5".into()],
            final_answer: "x = 5원".into(),
            metadata: ProblemMetadata {
                difficulty: "basic".into(),
                tags: vec![],
            },
        };
        ContentBundle::new(problem, vec![], TimeSlot::Morning)
    }

    fn gate(window_secs: u64) -> ApprovalGate {
        ApprovalGate::new(
            TicketStore::open_in_memory().unwrap(),
            Notifier::disabled(),
            window_secs,
        )
    }

    #[tokio::test]
    async fn test_submit_then_explicit_reject() {
        let gate = gate(7200);
        let ticket = gate.submit(sample_bundle()).await.unwrap();
        assert!(ticket.is_pending());

        let resolved = gate
            .resolve(&ticket.id, Decision::Reject, Some("needs rework"))
            .unwrap();
        assert_eq!(resolved.status, ApprovalStatus::Rejected);
        assert_eq!(resolved.resolution_feedback.as_deref(), Some("needs rework"));
        assert!(resolved.resolved_at.is_some());
        assert!(gate.list_pending().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_errors() {
        let gate = gate(7200);
        let ticket = gate.submit(sample_bundle()).await.unwrap();

        let err = gate.resolve("ticket-missing", Decision::Approve, None).unwrap_err();
        assert!(matches!(err, MathShortsError::UnknownTicket(_)));

        gate.resolve(&ticket.id, Decision::Approve, None).unwrap();
        let err = gate.resolve(&ticket.id, Decision::Reject, None).unwrap_err();
        assert!(matches!(err, MathShortsError::AlreadyResolved(_)));
    }

    #[tokio::test]
    async fn test_sweep_boundary_and_idempotence() {
        let gate = gate(3600);
        let ticket = gate.submit(sample_bundle()).await.unwrap();
        let deadline = ticket.deadline;

        // One second early: still pending.
        let swept = gate.sweep_expired(deadline - Duration::seconds(1)).unwrap();
        assert!(swept.is_empty());
        assert_eq!(gate.list_pending().unwrap().len(), 1);

        // One second late: auto-approved with the canonical feedback.
        let swept = gate.sweep_expired(deadline + Duration::seconds(1)).unwrap();
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].status, ApprovalStatus::Approved);
        assert!(swept[0]
            .resolution_feedback
            .as_deref()
            .unwrap()
            .contains("auto-approved"));

        // Same sweep again: nothing to do.
        let swept = gate.sweep_expired(deadline + Duration::seconds(1)).unwrap();
        assert!(swept.is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_submit() {
        // Webhook target nobody listens on — the send fails, the
        // submission must not.
        let mut notify = mathshorts_core::config::NotifyConfig::default();
        notify.webhook = Some(mathshorts_core::config::WebhookNotifyConfig {
            url: "http://127.0.0.1:1/hooks/approval".into(),
        });
        let gate = ApprovalGate::new(
            TicketStore::open_in_memory().unwrap(),
            Notifier::from_config(&notify),
            7200,
        );

        let ticket = gate.submit(sample_bundle()).await.unwrap();
        assert!(ticket.is_pending());
        assert_eq!(gate.list_pending().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_skips_explicitly_resolved_tickets() {
        let gate = gate(0);
        let ticket = gate.submit(sample_bundle()).await.unwrap();
        gate.resolve(&ticket.id, Decision::Reject, None).unwrap();

        let swept = gate.sweep_expired(Utc::now() + Duration::seconds(5)).unwrap();
        assert!(swept.is_empty());
        // Rejection stands.
        let err = gate.resolve(&ticket.id, Decision::Approve, None).unwrap_err();
        assert!(matches!(err, MathShortsError::AlreadyResolved(_)));
    }
}
