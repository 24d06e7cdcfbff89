//! Content data model — the types that flow through one scheduled run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// School grade the problem targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Grade1,
    Grade2,
    Grade3,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grade::Grade1 => write!(f, "grade1"),
            Grade::Grade2 => write!(f, "grade2"),
            Grade::Grade3 => write!(f, "grade3"),
        }
    }
}

/// Named recurring trigger point for one workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Morning,
    Lunch,
}

impl std::fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeSlot::Morning => write!(f, "morning"),
            TimeSlot::Lunch => write!(f, "lunch"),
        }
    }
}

impl std::str::FromStr for TimeSlot {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "morning" => Ok(TimeSlot::Morning),
            "lunch" => Ok(TimeSlot::Lunch),
            other => Err(format!("unknown time slot '{other}'")),
        }
    }
}

/// Immutable request for one problem, created per scheduled run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemRequest {
    pub grade: Grade,
    pub topic: String,
    pub time_slot: TimeSlot,
    pub region: String,
}

/// Difficulty/tagging info attached to a generated problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemMetadata {
    pub difficulty: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One math problem with its worked solution. Read-only once created;
/// lives embedded in a [`ContentBundle`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    /// Full problem statement in the source language.
    pub statement_text: String,
    /// The key equation, e.g. "3x + 5 = 20".
    pub equation_text: String,
    /// Ordered worked steps down to the answer.
    pub solution_steps: Vec<String>,
    pub final_answer: String,
    pub metadata: ProblemMetadata,
}

impl Problem {
    /// A problem is well-formed when statement, steps, and answer are all
    /// non-empty. Callers substitute the fallback template otherwise.
    pub fn is_well_formed(&self) -> bool {
        !self.statement_text.trim().is_empty()
            && !self.solution_steps.is_empty()
            && self.solution_steps.iter().all(|s| !s.trim().is_empty())
            && !self.final_answer.trim().is_empty()
    }
}

/// Outcome of narrating one problem in one language. Fails-soft: failure
/// is carried in `succeeded`/`error_detail`, never as an Err.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationResult {
    pub language_tag: String,
    /// The narration script that was (or would have been) voiced.
    pub script_text: String,
    /// Opaque handle to the synthesized audio (a file path here).
    pub audio_ref: Option<String>,
    pub duration_estimate_secs: u32,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl NarrationResult {
    /// Failure marker for a language, with the reason.
    pub fn failed(language_tag: &str, detail: impl Into<String>) -> Self {
        Self {
            language_tag: language_tag.to_string(),
            script_text: String::new(),
            audio_ref: None,
            duration_estimate_secs: 0,
            succeeded: false,
            error_detail: Some(detail.into()),
        }
    }
}

/// The aggregated problem + per-language narration artifacts of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBundle {
    /// Unique per run.
    pub id: String,
    pub problem: Problem,
    /// One entry per configured language, unique by `language_tag`.
    pub narrations: Vec<NarrationResult>,
    pub created_at: DateTime<Utc>,
    pub time_slot: TimeSlot,
}

impl ContentBundle {
    pub fn new(problem: Problem, narrations: Vec<NarrationResult>, time_slot: TimeSlot) -> Self {
        Self {
            id: format!("bundle-{}", uuid::Uuid::new_v4()),
            problem,
            narrations,
            created_at: Utc::now(),
            time_slot,
        }
    }

    pub fn narration_for(&self, language_tag: &str) -> Option<&NarrationResult> {
        self.narrations.iter().find(|n| n.language_tag == language_tag)
    }

    /// Short human-readable preview used in approval notifications.
    pub fn preview(&self) -> String {
        let statement = &self.problem.statement_text;
        let cut = statement
            .char_indices()
            .nth(100)
            .map(|(i, _)| i)
            .unwrap_or(statement.len());
        if cut < statement.len() {
            format!("{}...", &statement[..cut])
        } else {
            statement.clone()
        }
    }
}

/// Approval lifecycle: pending → approved | rejected (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "pending"),
            ApprovalStatus::Approved => write!(f, "approved"),
            ApprovalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Approval-tracking record for one bundle.
///
/// Invariant: a ticket resolves at most once, and `resolved_at` is set
/// if and only if `status != Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalTicket {
    pub id: String,
    /// Owned exclusively by the ticket while pending.
    pub bundle: ContentBundle,
    pub status: ApprovalStatus,
    pub submitted_at: DateTime<Utc>,
    /// Auto-approval kicks in once this passes.
    pub deadline: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_feedback: Option<String>,
}

impl ApprovalTicket {
    pub fn new(bundle: ContentBundle, submitted_at: DateTime<Utc>, window: chrono::Duration) -> Self {
        Self {
            id: format!("ticket-{}", uuid::Uuid::new_v4()),
            bundle,
            status: ApprovalStatus::Pending,
            submitted_at,
            deadline: submitted_at + window,
            resolved_at: None,
            resolution_feedback: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }
}

/// Per-language publish outcome. Fails-soft, same rationale as narration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub succeeded: bool,
    /// External id/url assigned by the hosting platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl PublishOutcome {
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            external_ref: None,
            error_detail: Some(detail.into()),
        }
    }
}

/// What happened for one language across the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageOutcome {
    pub narration_succeeded: bool,
    /// None = publish never attempted (narration failed or run rejected).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_succeeded: Option<bool>,
}

/// Overall disposition of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every configured language was narrated and published.
    Published,
    /// At least one language published; others failed somewhere.
    PartiallyPublished,
    /// Operator rejected the bundle; nothing was published.
    Rejected,
}

/// Reporting record produced once a run completes. Read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub time_slot: TimeSlot,
    pub bundle_id: String,
    pub per_language: std::collections::BTreeMap<String, LanguageOutcome>,
    pub overall: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_feedback: Option<String>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_problem() -> Problem {
        Problem {
            statement_text: "지민이가 피자를 3개 주문했습니다.".into(),
            equation_text: "3x + 5 = 20".into(),
            solution_steps: vec!["3x = 15".into(), "x = 5".into()],
            final_answer: "x = 5원".into(),
            metadata: ProblemMetadata {
                difficulty: "basic".into(),
                tags: vec![],
            },
        }
    }

    #[test]
    fn test_well_formed_problem() {
        assert!(sample_problem().is_well_formed());

        let mut empty_answer = sample_problem();
        empty_answer.final_answer = "  ".into();
        assert!(!empty_answer.is_well_formed());

        let mut no_steps = sample_problem();
        no_steps.solution_steps.clear();
        assert!(!no_steps.is_well_formed());
    }

    #[test]
    fn test_ticket_deadline_and_invariant() {
        let bundle = ContentBundle::new(sample_problem(), vec![], TimeSlot::Morning);
        let now = Utc::now();
        let ticket = ApprovalTicket::new(bundle, now, chrono::Duration::hours(2));
        assert_eq!(ticket.deadline, now + chrono::Duration::hours(2));
        assert!(ticket.is_pending());
        assert!(ticket.resolved_at.is_none());
    }

    #[test]
    fn test_bundle_preview_truncates_on_char_boundary() {
        let mut problem = sample_problem();
        problem.statement_text = "문".repeat(120);
        let bundle = ContentBundle::new(problem, vec![], TimeSlot::Lunch);
        let preview = bundle.preview();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().filter(|c| *c == '문').count(), 100);
    }

    #[test]
    fn test_time_slot_round_trip() {
        assert_eq!("morning".parse::<TimeSlot>().unwrap(), TimeSlot::Morning);
        assert_eq!(TimeSlot::Lunch.to_string(), "lunch");
        assert!("dinner".parse::<TimeSlot>().is_err());
    }
}
