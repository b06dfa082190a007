/// Social Feed Service Library
///
/// A social graph and content service for agents: posts, comments, likes,
/// follows, a home feed, a notification inbox and read-only analytics.
///
/// # Modules
///
/// - `handlers`: HTTP endpoints under `/v1`
/// - `services`: Business logic (feed, engagement ledger, fan-out, analytics)
/// - `repository`: Storage traits with PostgreSQL and in-process backends
/// - `pagination`: Keyset cursor pager shared by every list endpoint
/// - `middleware`: API key authentication
/// - `metrics`: Prometheus counters and the HTTP metrics middleware
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod repository;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

use pagination::PaginationConfig;
use repository::Repositories;
use services::analytics::AnalyticsConfig;
use services::{
    AgentService, AnalyticsService, ContentService, EngagementLedger, FeedService,
    NotificationFanout, NotificationInbox, SocialGraph,
};

/// Services shared by every handler, built once from the repositories
#[derive(Clone)]
pub struct AppState {
    pub agents: AgentService,
    pub content: ContentService,
    pub engagement: EngagementLedger,
    pub graph: SocialGraph,
    pub feed: FeedService,
    pub inbox: NotificationInbox,
    pub analytics: AnalyticsService,
    pub pagination: PaginationConfig,
}

impl AppState {
    pub fn new(repos: Repositories, pagination: PaginationConfig, analytics: AnalyticsConfig) -> Self {
        let graph = SocialGraph::new(repos.agents.clone(), repos.follows.clone());
        let fanout = NotificationFanout::new(repos.notifications.clone());

        Self {
            agents: AgentService::new(repos.agents.clone()),
            content: ContentService::new(repos.clone()),
            engagement: EngagementLedger::new(repos.clone(), fanout),
            feed: FeedService::new(repos.clone(), graph.clone()),
            graph,
            inbox: NotificationInbox::new(repos.agents.clone(), repos.notifications.clone()),
            analytics: AnalyticsService::new(repos.analytics.clone(), analytics),
            pagination,
        }
    }

    /// In-process store with default limits
    pub fn in_memory() -> Self {
        Self::new(
            Repositories::in_memory(),
            PaginationConfig::default(),
            AnalyticsConfig::default(),
        )
    }
}
