//! SQLite-backed ticket persistence.
//!
//! The one hard guarantee this layer provides is the atomic
//! check-and-set on a ticket's status: resolution only succeeds while
//! the row is still `pending`, so a racing sweep and an explicit
//! resolve cannot both win.

use chrono::{DateTime, Utc};
use std::path::Path;

use mathshorts_core::types::{ApprovalStatus, ApprovalTicket, ContentBundle};

/// Durable key-value record per ticket (id → ApprovalTicket).
pub struct TicketStore {
    conn: rusqlite::Connection,
}

impl TicketStore {
    /// Open or create the ticket database.
    pub fn open(path: &Path) -> Result<Self, String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| format!("DB dir: {e}"))?;
        }
        let conn = rusqlite::Connection::open(path).map_err(|e| format!("DB open: {e}"))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, String> {
        let conn = rusqlite::Connection::open_in_memory().map_err(|e| format!("DB open: {e}"))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), String> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS approval_tickets (
                id TEXT PRIMARY KEY,
                bundle TEXT NOT NULL,            -- JSON ContentBundle
                status TEXT NOT NULL DEFAULT 'pending',
                submitted_at TEXT NOT NULL,
                deadline TEXT NOT NULL,
                resolved_at TEXT,
                resolution_feedback TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_tickets_status_deadline
                ON approval_tickets (status, deadline);
         ",
            )
            .map_err(|e| format!("Migration: {e}"))?;
        Ok(())
    }

    /// Persist a freshly created ticket.
    pub fn insert(&self, ticket: &ApprovalTicket) -> Result<(), String> {
        let bundle = serde_json::to_string(&ticket.bundle)
            .map_err(|e| format!("Serialize bundle: {e}"))?;
        self.conn
            .execute(
                "INSERT INTO approval_tickets
                 (id, bundle, status, submitted_at, deadline, resolved_at, resolution_feedback)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    ticket.id,
                    bundle,
                    ticket.status.to_string(),
                    ticket.submitted_at.to_rfc3339(),
                    ticket.deadline.to_rfc3339(),
                    ticket.resolved_at.map(|t| t.to_rfc3339()),
                    ticket.resolution_feedback,
                ],
            )
            .map_err(|e| format!("Insert ticket: {e}"))?;
        Ok(())
    }

    /// Load one ticket by id.
    pub fn get(&self, id: &str) -> Result<Option<ApprovalTicket>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, bundle, status, submitted_at, deadline, resolved_at, resolution_feedback
                 FROM approval_tickets WHERE id = ?1",
            )
            .map_err(|e| format!("Prepare: {e}"))?;
        let mut rows = stmt
            .query_map([id], row_to_ticket)
            .map_err(|e| format!("Query: {e}"))?;
        match rows.next() {
            Some(Ok(ticket)) => Ok(Some(ticket)),
            Some(Err(e)) => Err(format!("Row: {e}")),
            None => Ok(None),
        }
    }

    /// Atomically transition a ticket out of `pending`. Returns false
    /// when the ticket was already resolved (0 rows changed) — the
    /// caller distinguishes that from an unknown id via `get`.
    pub fn resolve_if_pending(
        &self,
        id: &str,
        status: ApprovalStatus,
        resolved_at: DateTime<Utc>,
        feedback: Option<&str>,
    ) -> Result<bool, String> {
        let changed = self
            .conn
            .execute(
                "UPDATE approval_tickets
                 SET status = ?2, resolved_at = ?3, resolution_feedback = ?4
                 WHERE id = ?1 AND status = 'pending'",
                rusqlite::params![id, status.to_string(), resolved_at.to_rfc3339(), feedback],
            )
            .map_err(|e| format!("Resolve ticket: {e}"))?;
        Ok(changed == 1)
    }

    /// All pending tickets, oldest first.
    pub fn pending(&self) -> Result<Vec<ApprovalTicket>, String> {
        self.select_tickets(
            "SELECT id, bundle, status, submitted_at, deadline, resolved_at, resolution_feedback
             FROM approval_tickets WHERE status = 'pending' ORDER BY submitted_at",
            [],
        )
    }

    /// Pending tickets whose deadline has passed.
    pub fn expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<ApprovalTicket>, String> {
        self.select_tickets(
            "SELECT id, bundle, status, submitted_at, deadline, resolved_at, resolution_feedback
             FROM approval_tickets WHERE status = 'pending' AND deadline <= ?1
             ORDER BY deadline",
            [now.to_rfc3339()],
        )
    }

    fn select_tickets<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<ApprovalTicket>, String> {
        let mut stmt = self.conn.prepare(sql).map_err(|e| format!("Prepare: {e}"))?;
        let rows = stmt
            .query_map(params, row_to_ticket)
            .map_err(|e| format!("Query: {e}"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Row: {e}"))
    }
}

fn row_to_ticket(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApprovalTicket> {
    let id: String = row.get(0)?;
    let bundle_json: String = row.get(1)?;
    let status_str: String = row.get(2)?;
    let submitted_at_str: String = row.get(3)?;
    let deadline_str: String = row.get(4)?;
    let resolved_at_str: Option<String> = row.get(5)?;
    let resolution_feedback: Option<String> = row.get(6)?;

    let bundle: ContentBundle = serde_json::from_str(&bundle_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let status = match status_str.as_str() {
        "approved" => ApprovalStatus::Approved,
        "rejected" => ApprovalStatus::Rejected,
        _ => ApprovalStatus::Pending,
    };

    Ok(ApprovalTicket {
        id,
        bundle,
        status,
        submitted_at: parse_ts(&submitted_at_str),
        deadline: parse_ts(&deadline_str),
        resolved_at: resolved_at_str.as_deref().map(parse_ts),
        resolution_feedback,
    })
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mathshorts_core::types::{Problem, ProblemMetadata, TimeSlot};

    fn sample_ticket(window_secs: i64) -> ApprovalTicket {
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
        let bundle = ContentBundle::new(problem, vec![], TimeSlot::Morning);
        ApprovalTicket::new(bundle, Utc::now(), Duration::seconds(window_secs))
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let store = TicketStore::open_in_memory().unwrap();
        let ticket = sample_ticket(7200);
        store.insert(&ticket).unwrap();

        let loaded = store.get(&ticket.id).unwrap().unwrap();
        assert_eq!(loaded.id, ticket.id);
        assert_eq!(loaded.status, ApprovalStatus::Pending);
        assert_eq!(loaded.bundle.problem.equation_text, "3x + 5 = 20");
        assert!(store.get("ticket-nope").unwrap().is_none());
    }

    #[test]
    fn test_resolve_cas_is_single_shot() {
        let store = TicketStore::open_in_memory().unwrap();
        let ticket = sample_ticket(7200);
        store.insert(&ticket).unwrap();

        let now = Utc::now();
        assert!(store
            .resolve_if_pending(&ticket.id, ApprovalStatus::Rejected, now, Some("needs rework"))
            .unwrap());
        // Second attempt loses the race.
        assert!(!store
            .resolve_if_pending(&ticket.id, ApprovalStatus::Approved, now, None)
            .unwrap());

        let loaded = store.get(&ticket.id).unwrap().unwrap();
        assert_eq!(loaded.status, ApprovalStatus::Rejected);
        assert_eq!(loaded.resolution_feedback.as_deref(), Some("needs rework"));
    }

    #[test]
    fn test_expired_pending_respects_deadline() {
        let store = TicketStore::open_in_memory().unwrap();
        let ticket = sample_ticket(3600);
        store.insert(&ticket).unwrap();

        let before = ticket.deadline - Duration::seconds(1);
        let after = ticket.deadline + Duration::seconds(1);
        assert!(store.expired_pending(before).unwrap().is_empty());
        assert_eq!(store.expired_pending(after).unwrap().len(), 1);
    }

    #[test]
    fn test_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.db");

        let ticket = sample_ticket(7200);
        {
            let store = TicketStore::open(&path).unwrap();
            store.insert(&ticket).unwrap();
        }
        // Fresh handle on the same file — a restart.
        let store = TicketStore::open(&path).unwrap();
        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, ticket.id);
    }
}
