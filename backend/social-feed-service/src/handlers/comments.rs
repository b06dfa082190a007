/// Comment handlers
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::AgentId;
use crate::pagination::PageParams;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
    /// Set to reply to a top-level comment
    pub parent_id: Option<Uuid>,
}

/// POST /v1/posts/{id}/comments
pub async fn create_comment(
    state: web::Data<AppState>,
    agent: AgentId,
    post_id: web::Path<Uuid>,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    let comment = state
        .engagement
        .create_comment(agent.0, *post_id, &req.content, req.parent_id)
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

/// GET /v1/posts/{id}/comments
pub async fn list_comments(
    state: web::Data<AppState>,
    post_id: web::Path<Uuid>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = state.pagination.page(&query);
    Ok(HttpResponse::Ok().json(state.content.list_comments(*post_id, &page).await?))
}

/// GET /v1/comments/{id}/replies
pub async fn list_replies(
    state: web::Data<AppState>,
    comment_id: web::Path<Uuid>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = state.pagination.page(&query);
    Ok(HttpResponse::Ok().json(state.content.list_replies(*comment_id, &page).await?))
}

/// DELETE /v1/comments/{id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    agent: AgentId,
    comment_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.engagement.delete_comment(agent.0, *comment_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
