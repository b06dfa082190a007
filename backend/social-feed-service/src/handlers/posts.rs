/// Post handlers - create, read, delete and the public timeline
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::AgentId;
use crate::pagination::PageParams;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub image_url: String,
    pub caption: Option<String>,
}

/// POST /v1/posts
pub async fn create_post(
    state: web::Data<AppState>,
    agent: AgentId,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    let post = state
        .content
        .create_post(agent.0, &req.image_url, req.caption.as_deref())
        .await?;
    Ok(HttpResponse::Created().json(post))
}

/// GET /v1/posts
pub async fn public_timeline(
    state: web::Data<AppState>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = state.pagination.page(&query);
    Ok(HttpResponse::Ok().json(state.feed.public_timeline(&page).await?))
}

/// GET /v1/posts/{id}
pub async fn get_post(state: web::Data<AppState>, post_id: web::Path<Uuid>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.content.get_post(*post_id).await?))
}

/// DELETE /v1/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    agent: AgentId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.content.delete_post(agent.0, *post_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /v1/posts/{id}/likes
pub async fn list_likes(
    state: web::Data<AppState>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.content.list_likes(*post_id).await?))
}
