use actix_web::{web, App, HttpServer};
use anyhow::Context;
use social_feed_service::config::StorageBackend;
use social_feed_service::middleware::ApiKeyAuth;
use social_feed_service::repository::Repositories;
use social_feed_service::{db, handlers, metrics, AppState, Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(production: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if production {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.app.is_production());

    info!(env = %config.app.env, storage = ?config.storage, "Starting social feed service");

    let repos = match (config.storage, &config.database) {
        (StorageBackend::Postgres, Some(database)) => {
            let pool = db::create_pool(database)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            Repositories::postgres(pool)
        }
        (StorageBackend::Postgres, None) => {
            anyhow::bail!("postgres backend selected without database configuration")
        }
        (StorageBackend::Memory, _) => {
            info!("Using in-process store; data is lost on restart");
            Repositories::in_memory()
        }
    };

    let state = AppState::new(repos, config.pagination, config.analytics);
    let bind_addr = (config.app.host.clone(), config.app.port);
    info!("Starting HTTP server on {}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(ApiKeyAuth::new(state.agents.clone()))
            .wrap(metrics::MetricsMiddleware)
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/health", web::get().to(handlers::health))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(handlers::configure)
            .default_service(web::route().to(handlers::not_found))
    })
    .bind(bind_addr)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")?;

    info!("Social feed service stopped");
    Ok(())
}
