use super::owned_report;
use crate::error::ServerResult;
use crate::middleware::{extract_caller, extract_report_key};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use callisto_core::MatchReport;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct EnterIdentifierRequest {
    pub identifier: String,
}

/// A report's own matching entry. Other owners' rows never leave the server.
#[derive(Serialize)]
pub struct MatchEntryResponse {
    pub id: Uuid,
    pub identifier: String,
    pub created_at: u64,
    pub matched: bool,
}

impl From<MatchReport> for MatchEntryResponse {
    fn from(row: MatchReport) -> Self {
        Self {
            id: row.id,
            identifier: row.identifier,
            created_at: row.created_at,
            matched: row.notified,
        }
    }
}

/// POST /reports/{id}/matching
pub async fn enter_identifier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<EnterIdentifierRequest>,
) -> ServerResult<(StatusCode, Json<MatchEntryResponse>)> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let key = extract_report_key(&headers)?;
    owned_report(&state, &caller, &id).await?;
    state.services.reports.authorize(&id, &key).await?;

    let matching = &state.services.matching;
    let row = matching.submit_identifier(&id, &body.identifier).await?;
    // re-read so a match triggered by this entry shows up
    let row = matching
        .entries_for_report(&id)
        .await?
        .into_iter()
        .find(|entry| entry.id == row.id)
        .unwrap_or(row);

    Ok((StatusCode::CREATED, Json(row.into())))
}

/// GET /reports/{id}/matching
pub async fn list_entries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ServerResult<Json<Vec<MatchEntryResponse>>> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let key = extract_report_key(&headers)?;
    owned_report(&state, &caller, &id).await?;
    state.services.reports.authorize(&id, &key).await?;

    let entries = state.services.matching.entries_for_report(&id).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// DELETE /reports/{id}/matching
pub async fn withdraw_entries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ServerResult<Json<Value>> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let key = extract_report_key(&headers)?;
    owned_report(&state, &caller, &id).await?;
    state.services.reports.authorize(&id, &key).await?;

    let removed = state.services.matching.withdraw(&id).await?;
    Ok(Json(json!({ "removed": removed })))
}
