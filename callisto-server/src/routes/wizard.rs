use super::owned_report;
use crate::error::{ServerError, ServerResult};
use crate::middleware::{extract_caller, extract_report_key};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use callisto_core::{Answers, StepOutcome};
use serde_json::{Value, json};
use uuid::Uuid;

/// The review screen lives after the last page
const REVIEW_STEP: &str = "done";

fn parse_step(step: &str) -> ServerResult<usize> {
    step.parse()
        .map_err(|_| ServerError::BadRequest(format!("Invalid wizard step: {step}")))
}

/// GET /reports/{id}/wizard/{step}
///
/// A numbered step returns that page with its saved answers; `done` returns
/// every page for review.
pub async fn show_step(
    State(state): State<AppState>,
    Path((id, step)): Path<(Uuid, String)>,
    headers: HeaderMap,
) -> ServerResult<Json<Value>> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let key = extract_report_key(&headers)?;
    owned_report(&state, &caller, &id).await?;

    let wizard = &state.services.wizard;
    if step == REVIEW_STEP {
        let pages = wizard.review(&id, caller.site_id, &key).await?;
        return Ok(Json(json!({ "pages": pages })));
    }

    let page = wizard
        .goto(&id, caller.site_id, parse_step(&step)?, &key)
        .await?;
    Ok(Json(json!(page)))
}

/// POST /reports/{id}/wizard/{step}
pub async fn save_step(
    State(state): State<AppState>,
    Path((id, step)): Path<(Uuid, String)>,
    headers: HeaderMap,
    Json(answers): Json<Answers>,
) -> ServerResult<Json<Value>> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let key = extract_report_key(&headers)?;
    owned_report(&state, &caller, &id).await?;

    let outcome = state
        .services
        .wizard
        .advance(&id, caller.site_id, parse_step(&step)?, answers, &key)
        .await?;

    let body = match outcome {
        StepOutcome::Next(next) => json!({ "outcome": "next", "step": next }),
        StepOutcome::Done => json!({ "outcome": "done" }),
    };
    Ok(Json(body))
}
