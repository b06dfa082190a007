/// Notification inbox handlers
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::AgentId;
use crate::pagination::PageParams;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    pub limit: Option<String>,
    pub cursor: Option<String>,
    /// Only the literal `true` filters to unread
    pub unread: Option<String>,
}

/// GET /v1/agents/{handle}/notifications
pub async fn list_notifications(
    state: web::Data<AppState>,
    agent: AgentId,
    handle: web::Path<String>,
    query: web::Query<InboxQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let unread_only = query.unread.as_deref() == Some("true");
    let page = state.pagination.notification_page(&PageParams {
        limit: query.limit,
        cursor: query.cursor,
    });

    let inbox = state
        .inbox
        .list(agent.0, &handle, unread_only, &page)
        .await?;
    Ok(HttpResponse::Ok().json(inbox))
}

/// POST /v1/notifications/{id}/read
pub async fn mark_read(
    state: web::Data<AppState>,
    agent: AgentId,
    notification_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.inbox.mark_read(agent.0, *notification_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// POST /v1/notifications/read-all
pub async fn mark_all_read(state: web::Data<AppState>, agent: AgentId) -> Result<HttpResponse> {
    let marked = state.inbox.mark_all_read(agent.0).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "markedRead": marked })))
}
