use actix_web::{web, HttpResponse};

use crate::error::Result;
use crate::middleware::AgentId;
use crate::pagination::PageParams;
use crate::AppState;

/// GET /v1/feed - posts by the caller and everyone they follow
pub async fn home_feed(
    state: web::Data<AppState>,
    agent: AgentId,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = state.pagination.page(&query);
    Ok(HttpResponse::Ok().json(state.feed.home_feed(agent.0, &page).await?))
}
