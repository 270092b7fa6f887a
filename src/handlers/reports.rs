// src/handlers/reports.rs

use axum::Json;
use chrono::Local;

use crate::{
    middleware::auth::CurrentSession, models::report::Summary,
    services::report_service::build_summary,
};

// GET /api/reports/summary
#[utoipa::path(
    get,
    path = "/api/reports/summary",
    tag = "Reports",
    responses(
        (status = 200, description = "Indicadores calculados sobre o estado da sessão", body = Summary)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_summary(CurrentSession(session): CurrentSession) -> Json<Summary> {
    let members = session.members.members().await;
    let groups = session.small_groups.small_groups().await;
    let today = Local::now().date_naive();

    Json(build_summary(&members, &groups, today))
}
