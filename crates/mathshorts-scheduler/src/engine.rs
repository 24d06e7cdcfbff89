//! Workflow engine — drives one content run per slot trigger.
//!
//! The engine owns its four collaborators (injected once at process
//! start) and the only mutable shared state in the system: the
//! single-flight slot set, the in-flight run registry, and the result
//! history. All three sit behind plain mutexes with no awaits inside
//! the critical sections; the ticket status race between an explicit
//! resolve and the sweep settles in the gate's check-and-set, not here.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mathshorts_approval::{ApprovalGate, Decision};
use mathshorts_core::config::MathShortsConfig;
use mathshorts_core::error::{MathShortsError, Result};
use mathshorts_core::traits::{NarrationSource, ProblemSource, PublishSink};
use mathshorts_core::types::{
    ApprovalStatus, ApprovalTicket, ContentBundle, LanguageOutcome, NarrationResult, Problem,
    ProblemRequest, PublishOutcome, RunResult, RunStatus, TimeSlot,
};
use mathshorts_problems::fallback_problem;

use crate::cron;
use crate::retry::RetryPolicy;
use crate::runs::{InFlightRun, RunHistory, RunPhase, SlotRun};

/// How many completed RunResults to keep for reporting.
const RESULT_HISTORY_CAP: usize = 100;

pub struct WorkflowEngine {
    problems: Arc<dyn ProblemSource>,
    narrator: Arc<dyn NarrationSource>,
    gate: Arc<ApprovalGate>,
    publisher: Arc<dyn PublishSink>,
    config: MathShortsConfig,
    retry: RetryPolicy,
    /// Slots with a run in flight (anywhere between Generating and
    /// Completed). Guards against duplicate runs for the same slot.
    active_slots: Mutex<HashSet<TimeSlot>>,
    /// Runs awaiting their ticket, keyed by ticket id.
    in_flight: Mutex<HashMap<String, InFlightRun>>,
    history: Mutex<RunHistory>,
}

impl WorkflowEngine {
    pub fn new(
        problems: Arc<dyn ProblemSource>,
        narrator: Arc<dyn NarrationSource>,
        gate: Arc<ApprovalGate>,
        publisher: Arc<dyn PublishSink>,
        config: MathShortsConfig,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.generator);
        Self {
            problems,
            narrator,
            gate,
            publisher,
            config,
            retry,
            active_slots: Mutex::new(HashSet::new()),
            in_flight: Mutex::new(HashMap::new()),
            history: Mutex::new(RunHistory::new(RESULT_HISTORY_CAP)),
        }
    }

    pub fn config(&self) -> &MathShortsConfig {
        &self.config
    }

    /// Execute one slot run through submission. Returns once the bundle
    /// is with the approval gate; publishing happens when the ticket
    /// resolves (explicitly or via the sweep).
    pub async fn run_slot(&self, slot: TimeSlot) -> Result<SlotRun> {
        {
            let mut active = self.active_slots.lock().expect("slot set poisoned");
            if !active.insert(slot) {
                return Err(MathShortsError::AlreadyRunning(slot.to_string()));
            }
        }
        tracing::info!("🚀 Run started for slot '{}'", slot);

        match self.run_slot_inner(slot).await {
            Ok(run) => Ok(run),
            Err(e) => {
                // Submission never happened; free the slot again.
                self.release_slot(slot);
                Err(e)
            }
        }
    }

    async fn run_slot_inner(&self, slot: TimeSlot) -> Result<SlotRun> {
        let request = ProblemRequest {
            grade: self.config.content.grade,
            topic: self.config.content.topic.clone(),
            time_slot: slot,
            region: self.config.content.region.clone(),
        };

        // Generating
        let problem = self.generate_with_fallback(&request).await;

        // Narration fan-out, joined before the bundle exists.
        let narrations = self.narrate_all(&problem).await;
        let ok = narrations.iter().filter(|n| n.succeeded).count();
        tracing::info!(
            "🌍 Narration complete: {}/{} languages succeeded",
            ok,
            narrations.len()
        );

        // AwaitingApproval
        let bundle = ContentBundle::new(problem, narrations, slot);
        let ticket = self.gate.submit(bundle).await?;

        let run = SlotRun::from_narrations(
            slot,
            &ticket.bundle.id,
            &ticket.id,
            &ticket.bundle.narrations,
        );
        self.in_flight
            .lock()
            .expect("in-flight registry poisoned")
            .insert(
                ticket.id.clone(),
                InFlightRun {
                    slot_run: run.clone(),
                    phase: RunPhase::AwaitingApproval,
                },
            );
        Ok(run)
    }

    /// Generate under the uniform retry policy and per-call timeout;
    /// fall back to the static template rather than fail the run.
    async fn generate_with_fallback(&self, request: &ProblemRequest) -> Problem {
        let timeout = Duration::from_secs(self.config.generator.timeout_secs);
        let generated = self
            .retry
            .run("problem generation", |_attempt| {
                let problems = Arc::clone(&self.problems);
                let request = request.clone();
                async move {
                    match tokio::time::timeout(timeout, problems.generate(&request)).await {
                        Ok(result) => result,
                        Err(_) => Err(MathShortsError::Generation(format!(
                            "timed out after {timeout:?}"
                        ))),
                    }
                }
            })
            .await;

        match generated {
            Ok(problem) => problem,
            Err(e) => {
                tracing::warn!(
                    "⚠️ Problem generation failed, using fallback for '{}': {}",
                    request.topic,
                    e
                );
                fallback_problem(&request.topic)
            }
        }
    }

    /// One narration task per configured language, each under its own
    /// timeout. Always returns exactly one result per language.
    async fn narrate_all(&self, problem: &Problem) -> Vec<NarrationResult> {
        let timeout = Duration::from_secs(self.config.voice.timeout_secs);
        let languages = &self.config.content.languages;

        let tasks: Vec<_> = languages
            .iter()
            .map(|lang| {
                let narrator = Arc::clone(&self.narrator);
                let problem = problem.clone();
                let lang = lang.clone();
                tokio::spawn(async move {
                    match tokio::time::timeout(timeout, narrator.synthesize(&problem, &lang)).await
                    {
                        Ok(result) => result,
                        Err(_) => NarrationResult::failed(
                            &lang,
                            format!("narration timed out after {timeout:?}"),
                        ),
                    }
                })
            })
            .collect();

        let mut results = Vec::with_capacity(languages.len());
        for (task, lang) in tasks.into_iter().zip(languages) {
            match task.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    results.push(NarrationResult::failed(lang, format!("narration task: {e}")))
                }
            }
        }
        results
    }

    /// Apply an operator decision and complete the run.
    pub async fn resolve(
        &self,
        ticket_id: &str,
        decision: Decision,
        feedback: Option<&str>,
    ) -> Result<(ApprovalTicket, RunResult)> {
        let ticket = self.gate.resolve(ticket_id, decision, feedback)?;
        let result = self.complete_run(&ticket).await;
        Ok((ticket, result))
    }

    /// Auto-approve expired tickets and complete their runs.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<RunResult>> {
        let tickets = self.gate.sweep_expired(now)?;
        let mut results = Vec::with_capacity(tickets.len());
        for ticket in &tickets {
            results.push(self.complete_run(ticket).await);
        }
        Ok(results)
    }

    /// Drive a resolved ticket to `Completed`: publish on approval,
    /// record the RunResult, release the slot.
    async fn complete_run(&self, ticket: &ApprovalTicket) -> RunResult {
        let slot_run = {
            let mut in_flight = self.in_flight.lock().expect("in-flight registry poisoned");
            match in_flight.get_mut(&ticket.id) {
                Some(entry) => {
                    entry.phase = RunPhase::Publishing;
                    entry.slot_run.clone()
                }
                // Ticket from before a restart: the registry is gone but
                // the bundle still carries everything we need.
                None => SlotRun::from_narrations(
                    ticket.bundle.time_slot,
                    &ticket.bundle.id,
                    &ticket.id,
                    &ticket.bundle.narrations,
                ),
            }
        };

        let mut per_language: BTreeMap<String, LanguageOutcome> = slot_run
            .narration_succeeded
            .iter()
            .map(|(lang, ok)| {
                (
                    lang.clone(),
                    LanguageOutcome {
                        narration_succeeded: *ok,
                        publish_succeeded: None,
                    },
                )
            })
            .collect();

        let overall = match ticket.status {
            ApprovalStatus::Rejected => {
                tracing::info!(
                    "🔄 Bundle {} rejected; publish skipped (feedback: {})",
                    ticket.bundle.id,
                    ticket.resolution_feedback.as_deref().unwrap_or("-")
                );
                RunStatus::Rejected
            }
            _ => {
                // Publishing — only languages that actually narrated.
                for (lang, outcome) in self.publish_all(&ticket.bundle).await {
                    if let Some(entry) = per_language.get_mut(&lang) {
                        entry.publish_succeeded = Some(outcome.succeeded);
                    }
                }
                let total = per_language.len();
                let published = per_language
                    .values()
                    .filter(|o| o.publish_succeeded == Some(true))
                    .count();
                if total > 0 && published == total {
                    RunStatus::Published
                } else {
                    RunStatus::PartiallyPublished
                }
            }
        };

        let result = RunResult {
            time_slot: slot_run.time_slot,
            bundle_id: slot_run.bundle_id.clone(),
            per_language,
            overall,
            rejection_feedback: match ticket.status {
                ApprovalStatus::Rejected => ticket.resolution_feedback.clone(),
                _ => None,
            },
            completed_at: Utc::now(),
        };

        self.in_flight
            .lock()
            .expect("in-flight registry poisoned")
            .remove(&ticket.id);
        self.release_slot(slot_run.time_slot);
        self.history
            .lock()
            .expect("history poisoned")
            .record(result.clone());
        tracing::info!(
            "✅ Run completed for slot '{}': {:?}",
            slot_run.time_slot,
            result.overall
        );
        result
    }

    /// Publish fan-out over languages with a successful narration,
    /// joined before the run can complete.
    async fn publish_all(&self, bundle: &ContentBundle) -> Vec<(String, PublishOutcome)> {
        let timeout = Duration::from_secs(self.config.publish.timeout_secs);
        let languages: Vec<String> = bundle
            .narrations
            .iter()
            .filter(|n| n.succeeded)
            .map(|n| n.language_tag.clone())
            .collect();

        let tasks: Vec<_> = languages
            .iter()
            .map(|lang| {
                let publisher = Arc::clone(&self.publisher);
                let bundle = bundle.clone();
                let lang = lang.clone();
                tokio::spawn(async move {
                    match tokio::time::timeout(timeout, publisher.publish(&bundle, &lang)).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            PublishOutcome::failed(format!("publish timed out after {timeout:?}"))
                        }
                    }
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(languages.len());
        for (task, lang) in tasks.into_iter().zip(languages) {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => PublishOutcome::failed(format!("publish task: {e}")),
            };
            outcomes.push((lang, outcome));
        }
        outcomes
    }

    fn release_slot(&self, slot: TimeSlot) {
        self.active_slots
            .lock()
            .expect("slot set poisoned")
            .remove(&slot);
    }

    /// Pending tickets, for the operator listing.
    pub fn pending_tickets(&self) -> Result<Vec<ApprovalTicket>> {
        self.gate.list_pending()
    }

    /// Completed runs, oldest first.
    pub fn recent_results(&self) -> Vec<RunResult> {
        self.history.lock().expect("history poisoned").recent()
    }

    /// Runs still waiting on approval or mid-publish.
    pub fn in_flight_runs(&self) -> Vec<(String, TimeSlot, RunPhase)> {
        self.in_flight
            .lock()
            .expect("in-flight registry poisoned")
            .iter()
            .map(|(id, entry)| (id.clone(), entry.slot_run.time_slot, entry.phase))
            .collect()
    }
}

/// Fire slots off the cron table. Runs forever; spawn it.
pub async fn run_schedule_loop(engine: Arc<WorkflowEngine>) {
    let entries = engine.config().schedule.entries.clone();
    let tick = engine.config().schedule.tick_interval_secs;
    tracing::info!(
        "⏰ Schedule loop started: {} entries, check every {}s",
        entries.len(),
        tick
    );

    let mut next: Vec<Option<DateTime<Utc>>> = entries
        .iter()
        .map(|e| cron::next_run_from_cron(&e.cron, Utc::now()))
        .collect();

    let mut interval = tokio::time::interval(Duration::from_secs(tick));
    loop {
        interval.tick().await;
        let now = Utc::now();
        for (i, entry) in entries.iter().enumerate() {
            let due = match next[i] {
                Some(due) if now >= due => due,
                _ => continue,
            };
            tracing::info!(
                "🔔 Slot '{}' due (scheduled {})",
                entry.slot,
                due.format("%H:%M")
            );
            match engine.run_slot(entry.slot).await {
                Ok(run) => tracing::info!(
                    "🎫 Slot '{}' submitted as {}",
                    entry.slot,
                    run.ticket_id
                ),
                Err(MathShortsError::AlreadyRunning(slot)) => {
                    tracing::warn!("⏭️ Slot '{}' already in flight, trigger dropped", slot)
                }
                Err(e) => tracing::error!("❌ Slot '{}' run failed: {}", entry.slot, e),
            }
            next[i] = cron::next_run_from_cron(&entry.cron, now);
        }
    }
}

/// Periodically auto-approve expired tickets. Runs forever; spawn it.
pub async fn run_sweep_loop(engine: Arc<WorkflowEngine>) {
    let every = engine.config().approval.sweep_interval_secs;
    tracing::info!("🧹 Sweep loop started: every {}s", every);

    let mut interval = tokio::time::interval(Duration::from_secs(every));
    loop {
        interval.tick().await;
        match engine.sweep_expired(Utc::now()).await {
            Ok(results) if !results.is_empty() => {
                tracing::info!("⏰ Sweep auto-approved {} run(s)", results.len())
            }
            Ok(_) => {}
            Err(e) => tracing::error!("❌ Sweep failed: {}", e),
        }
    }
}
