//! API route handlers for the gateway.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use mathshorts_core::error::MathShortsError;
use mathshorts_core::types::ApprovalTicket;

use super::server::AppState;

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "mathshorts-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Pending approval tickets — what the reviewer still owes a decision.
pub async fn list_pending(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.engine.pending_tickets() {
        Ok(tickets) => {
            let entries: Vec<Value> = tickets.iter().map(ticket_summary).collect();
            (StatusCode::OK, Json(json!({ "ok": true, "pending": entries })))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "ok": false, "error": e.to_string() })),
        ),
    }
}

/// Completed runs plus anything still in flight.
pub async fn list_runs(State(state): State<Arc<AppState>>) -> Json<Value> {
    let in_flight: Vec<Value> = state
        .engine
        .in_flight_runs()
        .into_iter()
        .map(|(ticket_id, slot, phase)| {
            json!({ "ticket_id": ticket_id, "time_slot": slot.to_string(), "phase": phase })
        })
        .collect();
    Json(json!({
        "ok": true,
        "in_flight": in_flight,
        "completed": state.engine.recent_results(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ResolveBody {
    pub action: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// The approval decision endpoint (API form).
pub async fn resolve_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
    Json(body): Json<ResolveBody>,
) -> (StatusCode, Json<Value>) {
    apply_decision(&state, &ticket_id, &body.action, body.feedback.as_deref()).await
}

/// Same endpoint via GET query params, so the email/chat action links
/// resolve with a plain click.
pub async fn resolve_ticket_via_link(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
    Query(query): Query<ResolveBody>,
) -> (StatusCode, Json<Value>) {
    apply_decision(&state, &ticket_id, &query.action, query.feedback.as_deref()).await
}

async fn apply_decision(
    state: &AppState,
    ticket_id: &str,
    action: &str,
    feedback: Option<&str>,
) -> (StatusCode, Json<Value>) {
    let decision = match action.parse() {
        Ok(decision) => decision,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "error": e })),
            );
        }
    };

    match state.engine.resolve(ticket_id, decision, feedback).await {
        Ok((ticket, result)) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "ticket": ticket_summary(&ticket),
                "run_result": result,
            })),
        ),
        Err(e) => (
            status_for(&e),
            Json(json!({ "ok": false, "error": e.to_string() })),
        ),
    }
}

fn ticket_summary(ticket: &ApprovalTicket) -> Value {
    json!({
        "id": ticket.id,
        "bundle_id": ticket.bundle.id,
        "time_slot": ticket.bundle.time_slot.to_string(),
        "status": ticket.status.to_string(),
        "submitted_at": ticket.submitted_at.to_rfc3339(),
        "deadline": ticket.deadline.to_rfc3339(),
        "languages": ticket.bundle.narrations.len(),
        "preview": ticket.bundle.preview(),
        "feedback": ticket.resolution_feedback,
    })
}

/// HTTP status mapping for engine errors.
fn status_for(error: &MathShortsError) -> StatusCode {
    match error {
        MathShortsError::UnknownTicket(_) => StatusCode::NOT_FOUND,
        MathShortsError::AlreadyResolved(_) => StatusCode::CONFLICT,
        MathShortsError::AlreadyRunning(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
