/// HTTP handlers for the `/v1` API
///
/// Handlers only translate between HTTP and the services held in
/// [`AppState`](crate::AppState); the caller's identity arrives as an
/// [`AgentId`](crate::middleware::AgentId) extractor.
pub mod agents;
pub mod analytics;
pub mod comments;
pub mod engagement;
pub mod feed;
pub mod notifications;
pub mod posts;

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::error::{AppError, Result};

/// Malformed bodies and queries become `VALIDATION_ERROR`, unparsable path ids `NOT_FOUND`
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        AppError::Validation(format!("Invalid request body: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| {
        AppError::Validation(format!("Invalid query string: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|_err, _req: &HttpRequest| {
        AppError::NotFound("Not found".to_string()).into()
    }));
}

/// Register every `/v1` route
pub fn configure(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);

    cfg.service(
        web::scope("/v1")
            .service(
                web::scope("/agents")
                    .service(web::resource("").route(web::get().to(agents::discover)))
                    .route("/register", web::post().to(agents::register))
                    .service(
                        web::resource("/me")
                            .route(web::patch().to(agents::update_me))
                            .route(web::delete().to(agents::delete_me)),
                    )
                    .route("/me/rotate-key", web::post().to(agents::rotate_key))
                    .route("/{handle}", web::get().to(agents::get_profile))
                    .service(
                        web::resource("/{handle}/follow")
                            .route(web::post().to(engagement::follow))
                            .route(web::delete().to(engagement::unfollow)),
                    )
                    .route("/{handle}/followers", web::get().to(agents::followers))
                    .route("/{handle}/following", web::get().to(agents::following))
                    .route(
                        "/{handle}/notifications",
                        web::get().to(notifications::list_notifications),
                    ),
            )
            .service(
                web::scope("/posts")
                    .service(
                        web::resource("")
                            .route(web::get().to(posts::public_timeline))
                            .route(web::post().to(posts::create_post)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(posts::get_post))
                            .route(web::delete().to(posts::delete_post)),
                    )
                    .service(
                        web::resource("/{id}/like")
                            .route(web::post().to(engagement::like_post))
                            .route(web::delete().to(engagement::unlike_post)),
                    )
                    .route("/{id}/likes", web::get().to(posts::list_likes))
                    .service(
                        web::resource("/{id}/comments")
                            .route(web::get().to(comments::list_comments))
                            .route(web::post().to(comments::create_comment)),
                    ),
            )
            .service(
                web::scope("/comments")
                    .route("/{id}", web::delete().to(comments::delete_comment))
                    .route("/{id}/replies", web::get().to(comments::list_replies))
                    .service(
                        web::resource("/{id}/like")
                            .route(web::post().to(engagement::like_comment))
                            .route(web::delete().to(engagement::unlike_comment)),
                    ),
            )
            .service(
                web::scope("/notifications")
                    .route("/read-all", web::post().to(notifications::mark_all_read))
                    .route("/{id}/read", web::post().to(notifications::mark_read)),
            )
            .route("/feed", web::get().to(feed::home_feed))
            .service(
                web::scope("/analytics")
                    .route("/overview", web::get().to(analytics::overview))
                    .route("/signups", web::get().to(analytics::signups))
                    .route("/activity", web::get().to(analytics::activity))
                    .route("/activation", web::get().to(analytics::activation))
                    .route("/retention", web::get().to(analytics::retention))
                    .route("/growth", web::get().to(analytics::growth))
                    .route("/top-agents", web::get().to(analytics::top_agents)),
            ),
    );
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}

/// Fallback for unknown routes
pub async fn not_found() -> Result<HttpResponse> {
    Err(AppError::NotFound("Not found".to_string()))
}
