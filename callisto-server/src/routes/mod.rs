use crate::error::{ServerError, ServerResult};
use crate::middleware::{require_admin, Caller};
use crate::state::AppState;
use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use callisto_core::Report;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

mod health;
mod matching;
mod notifications;
mod reports;
mod wizard;

pub fn router(state: AppState) -> Router {
    let reports = Router::new()
        .route(
            "/reports",
            post(reports::create_report).get(reports::list_reports),
        )
        .route(
            "/reports/{id}",
            get(reports::get_report).delete(reports::delete_report),
        )
        .route("/reports/{id}/contact", post(reports::set_contact))
        .route("/reports/{id}/submit", post(reports::submit_report))
        .route("/reports/{id}/withdraw", post(reports::withdraw_report))
        .route("/reports/{id}/export", get(reports::export_report))
        .route(
            "/reports/{id}/wizard/{step}",
            get(wizard::show_step).post(wizard::save_step),
        )
        .route(
            "/reports/{id}/matching",
            get(matching::list_entries)
                .post(matching::enter_identifier)
                .delete(matching::withdraw_entries),
        );

    let admin = Router::new()
        .route(
            "/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route("/notifications/{id}", get(notifications::get_notification))
        .route(
            "/notifications/{id}/sites",
            post(notifications::add_site),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    let public = Router::new().route("/health", get(health::health_check));

    Router::new()
        .merge(reports)
        .merge(admin)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load a report the caller owns on the caller's site.
///
/// Reports belonging to someone else are indistinguishable from missing ones.
pub(crate) async fn owned_report(
    state: &AppState,
    caller: &Caller,
    id: &Uuid,
) -> ServerResult<Report> {
    let report = state.services.reports.get(id).await?;
    if report.owner != caller.account || report.site_id != caller.site_id {
        return Err(ServerError::NotFound(format!("report {id}")));
    }
    Ok(report)
}
