//! Run bookkeeping: phases, in-flight records, and the result history.

use std::collections::{BTreeMap, VecDeque};

use mathshorts_core::types::{NarrationResult, RunResult, TimeSlot};

/// Per-run state machine. `Generating` and `Publishing` can produce
/// partial failures without changing the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Generating,
    AwaitingApproval,
    Publishing,
    Completed,
}

/// What `run_slot` hands back once the bundle is submitted. The run
/// itself continues when the ticket resolves.
#[derive(Debug, Clone)]
pub struct SlotRun {
    pub time_slot: TimeSlot,
    pub bundle_id: String,
    pub ticket_id: String,
    /// Narration success per language, complete over the configured set.
    pub narration_succeeded: BTreeMap<String, bool>,
}

impl SlotRun {
    pub fn from_narrations(
        time_slot: TimeSlot,
        bundle_id: &str,
        ticket_id: &str,
        narrations: &[NarrationResult],
    ) -> Self {
        Self {
            time_slot,
            bundle_id: bundle_id.to_string(),
            ticket_id: ticket_id.to_string(),
            narration_succeeded: narrations
                .iter()
                .map(|n| (n.language_tag.clone(), n.succeeded))
                .collect(),
        }
    }
}

/// A run waiting on its approval ticket.
#[derive(Debug, Clone)]
pub struct InFlightRun {
    pub slot_run: SlotRun,
    pub phase: RunPhase,
}

/// Bounded history of completed runs, newest last.
pub struct RunHistory {
    results: VecDeque<RunResult>,
    capacity: usize,
}

impl RunHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            results: VecDeque::new(),
            capacity,
        }
    }

    pub fn record(&mut self, result: RunResult) {
        self.results.push_back(result);
        while self.results.len() > self.capacity {
            self.results.pop_front();
        }
    }

    pub fn recent(&self) -> Vec<RunResult> {
        self.results.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mathshorts_core::types::RunStatus;

    fn result(bundle_id: &str) -> RunResult {
        RunResult {
            time_slot: TimeSlot::Morning,
            bundle_id: bundle_id.into(),
            per_language: BTreeMap::new(),
            overall: RunStatus::Published,
            rejection_feedback: None,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = RunHistory::new(3);
        for i in 0..5 {
            history.record(result(&format!("bundle-{i}")));
        }
        let recent = history.recent();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].bundle_id, "bundle-2");
        assert_eq!(recent[2].bundle_id, "bundle-4");
    }

    #[test]
    fn test_slot_run_narration_map() {
        let narrations = vec![
            NarrationResult::failed("en", "down"),
            NarrationResult {
                language_tag: "ko".into(),
                script_text: "대본".into(),
                audio_ref: Some("/tmp/a.mp3".into()),
                duration_estimate_secs: 15,
                succeeded: true,
                error_detail: None,
            },
        ];
        let run = SlotRun::from_narrations(TimeSlot::Lunch, "b-1", "t-1", &narrations);
        assert_eq!(run.narration_succeeded.len(), 2);
        assert!(!run.narration_succeeded["en"]);
        assert!(run.narration_succeeded["ko"]);
    }
}
