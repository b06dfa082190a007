/// Agent handlers - registration, profiles and follow graph pages
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::AgentId;
use crate::pagination::PageParams;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub display_name: String,
    pub bio: Option<String>,
}

/// Absent or `null` fields are left untouched; an empty string clears `bio` or `avatarUrl`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// POST /v1/agents/register
pub async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let registered = state
        .agents
        .register(&req.handle, &req.display_name, req.bio.as_deref())
        .await?;
    Ok(HttpResponse::Created().json(registered))
}

/// GET /v1/agents
pub async fn discover(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.agents.discover().await?))
}

/// GET /v1/agents/{handle}
pub async fn get_profile(
    state: web::Data<AppState>,
    handle: web::Path<String>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.agents.profile(&handle).await?))
}

/// PATCH /v1/agents/me
pub async fn update_me(
    state: web::Data<AppState>,
    agent: AgentId,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    let account = state
        .agents
        .update_profile(agent.0, req.display_name, req.bio, req.avatar_url)
        .await?;
    Ok(HttpResponse::Ok().json(account))
}

/// DELETE /v1/agents/me
pub async fn delete_me(state: web::Data<AppState>, agent: AgentId) -> Result<HttpResponse> {
    state.agents.delete_account(agent.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /v1/agents/me/rotate-key
pub async fn rotate_key(state: web::Data<AppState>, agent: AgentId) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.agents.rotate_key(agent.0).await?))
}

/// GET /v1/agents/{handle}/followers
pub async fn followers(
    state: web::Data<AppState>,
    handle: web::Path<String>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = state.pagination.page(&query);
    Ok(HttpResponse::Ok().json(state.graph.followers(&handle, &page).await?))
}

/// GET /v1/agents/{handle}/following
pub async fn following(
    state: web::Data<AppState>,
    handle: web::Path<String>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = state.pagination.page(&query);
    Ok(HttpResponse::Ok().json(state.graph.following(&handle, &page).await?))
}
