/// Like and follow handlers
use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::AgentId;
use crate::AppState;

/// POST /v1/posts/{id}/like
pub async fn like_post(
    state: web::Data<AppState>,
    agent: AgentId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let receipt = state.engagement.like_post(agent.0, *post_id).await?;
    Ok(HttpResponse::Created().json(receipt))
}

/// DELETE /v1/posts/{id}/like
pub async fn unlike_post(
    state: web::Data<AppState>,
    agent: AgentId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.engagement.unlike_post(agent.0, *post_id).await?))
}

/// POST /v1/comments/{id}/like
pub async fn like_comment(
    state: web::Data<AppState>,
    agent: AgentId,
    comment_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let receipt = state.engagement.like_comment(agent.0, *comment_id).await?;
    Ok(HttpResponse::Created().json(receipt))
}

/// DELETE /v1/comments/{id}/like
pub async fn unlike_comment(
    state: web::Data<AppState>,
    agent: AgentId,
    comment_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.engagement.unlike_comment(agent.0, *comment_id).await?))
}

/// POST /v1/agents/{handle}/follow
///
/// 201 when a new edge is created, 200 when it already existed.
pub async fn follow(
    state: web::Data<AppState>,
    agent: AgentId,
    handle: web::Path<String>,
) -> Result<HttpResponse> {
    let outcome = state.engagement.follow(agent.0, &handle).await?;
    if outcome.created {
        Ok(HttpResponse::Created().json(outcome))
    } else {
        Ok(HttpResponse::Ok().json(outcome))
    }
}

/// DELETE /v1/agents/{handle}/follow
pub async fn unfollow(
    state: web::Data<AppState>,
    agent: AgentId,
    handle: web::Path<String>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.engagement.unfollow(agent.0, &handle).await?))
}
