use super::owned_report;
use crate::error::ServerResult;
use crate::middleware::{extract_caller, extract_report_key};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use callisto_core::{Answers, ContactInfo, Report, ValidationErrors};
use callisto_crypto::Passphrase;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CreateReportRequest {
    pub key: String,
    pub key_confirmation: String,
}

impl CreateReportRequest {
    fn passphrase(self) -> ServerResult<Passphrase> {
        let mut errors = ValidationErrors::default();
        if self.key.is_empty() {
            errors.add("key", "This field is required.");
        } else if self.key != self.key_confirmation {
            errors.add("key_confirmation", "The two passphrase fields didn't match.");
        }
        errors.into_result()?;
        Ok(Passphrase::new(self.key))
    }
}

/// POST /reports
///
/// Creates the report and seals an empty record under the chosen key.
pub async fn create_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateReportRequest>,
) -> ServerResult<(StatusCode, Json<Report>)> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let key = body.passphrase()?;

    let reports = &state.services.reports;
    let report = reports.create(caller.account, caller.site_id).await?;
    let report = reports.update(&report.id, &key, Answers::new()).await?;

    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /reports
pub async fn list_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<Vec<Report>>> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let reports = state
        .services
        .reports
        .list_for_owner(&caller.account, caller.site_id)
        .await?;
    Ok(Json(reports))
}

/// GET /reports/{id}
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ServerResult<Json<Report>> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let report = owned_report(&state, &caller, &id).await?;
    Ok(Json(report))
}

/// POST /reports/{id}/contact
pub async fn set_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(contact): Json<ContactInfo>,
) -> ServerResult<Json<Report>> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let key = extract_report_key(&headers)?;
    owned_report(&state, &caller, &id).await?;

    let report = state.services.reports.set_contact(&id, &key, contact).await?;
    Ok(Json(report))
}

/// POST /reports/{id}/submit
pub async fn submit_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ServerResult<Json<Report>> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let key = extract_report_key(&headers)?;
    owned_report(&state, &caller, &id).await?;

    let report = state.services.reports.submit(&id, &key).await?;
    Ok(Json(report))
}

/// POST /reports/{id}/withdraw
pub async fn withdraw_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ServerResult<Json<Report>> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let key = extract_report_key(&headers)?;
    owned_report(&state, &caller, &id).await?;

    let reports = &state.services.reports;
    reports.authorize(&id, &key).await?;
    let report = reports.withdraw(&id).await?;
    Ok(Json(report))
}

/// DELETE /reports/{id}
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ServerResult<StatusCode> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let key = extract_report_key(&headers)?;
    owned_report(&state, &caller, &id).await?;

    state.services.reports.delete(&id, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /reports/{id}/export
pub async fn export_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let caller = extract_caller(&headers, state.config.default_site_id)?;
    let key = extract_report_key(&headers)?;
    owned_report(&state, &caller, &id).await?;

    let document = state
        .services
        .wizard
        .export(state.exporter.as_ref(), &id, caller.site_id, &key)
        .await?;

    Ok((
        [(header::CONTENT_TYPE, state.exporter.content_type())],
        document,
    )
        .into_response())
}
