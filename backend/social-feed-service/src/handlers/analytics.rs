/// Analytics handlers
///
/// Window sizes arrive as raw text and are clamped by the configured
/// [`Window`](crate::services::analytics::Window); reports are computed
/// against the current time.
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::error::Result;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub days: Option<String>,
    pub weeks: Option<String>,
    pub limit: Option<String>,
}

/// GET /v1/analytics/overview
pub async fn overview(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.analytics.overview(Utc::now()).await?))
}

/// GET /v1/analytics/signups?days=
pub async fn signups(
    state: web::Data<AppState>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse> {
    let days = state
        .analytics
        .config()
        .signup_days
        .clamp(query.days.as_deref());
    Ok(HttpResponse::Ok().json(state.analytics.signups(Utc::now(), days).await?))
}

/// GET /v1/analytics/activity?days=
pub async fn activity(
    state: web::Data<AppState>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse> {
    let days = state
        .analytics
        .config()
        .activity_days
        .clamp(query.days.as_deref());
    Ok(HttpResponse::Ok().json(state.analytics.activity(Utc::now(), days).await?))
}

/// GET /v1/analytics/activation
pub async fn activation(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.analytics.activation(Utc::now()).await?))
}

/// GET /v1/analytics/retention?weeks=
pub async fn retention(
    state: web::Data<AppState>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse> {
    let weeks = state
        .analytics
        .config()
        .retention_weeks
        .clamp(query.weeks.as_deref());
    Ok(HttpResponse::Ok().json(state.analytics.retention(Utc::now(), weeks).await?))
}

/// GET /v1/analytics/growth
pub async fn growth(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.analytics.growth(Utc::now()).await?))
}

/// GET /v1/analytics/top-agents?limit=
pub async fn top_agents(
    state: web::Data<AppState>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse> {
    let limit = state
        .analytics
        .config()
        .top_agents
        .clamp(query.limit.as_deref());
    Ok(HttpResponse::Ok().json(state.analytics.top_agents(limit).await?))
}
