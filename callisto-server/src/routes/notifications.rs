use crate::error::ServerResult;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use callisto_core::EmailNotification;
use callisto_core::notification::NewEmailNotification;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SiteQuery {
    pub site_id: Option<u32>,
}

#[derive(Deserialize)]
pub struct AddSiteRequest {
    pub site_id: u32,
}

/// GET /notifications?site_id=N
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<SiteQuery>,
) -> ServerResult<Json<Vec<EmailNotification>>> {
    let site_id = query.site_id.unwrap_or(state.config.default_site_id);
    let notifications = state.services.notifications.on_site(site_id).await?;
    Ok(Json(notifications))
}

/// POST /notifications
pub async fn create_notification(
    State(state): State<AppState>,
    Json(body): Json<NewEmailNotification>,
) -> ServerResult<(StatusCode, Json<EmailNotification>)> {
    let created = state.services.notifications.create(body).await?;
    tracing::info!(id = created.id, name = %created.name, "email notification created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /notifications/{id}
pub async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ServerResult<Json<EmailNotification>> {
    let notification = state.services.notifications.get(id).await?;
    Ok(Json(notification))
}

/// POST /notifications/{id}/sites
pub async fn add_site(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(body): Json<AddSiteRequest>,
) -> ServerResult<Json<EmailNotification>> {
    let notification = state
        .services
        .notifications
        .add_site(id, body.site_id)
        .await?;
    Ok(Json(notification))
}
