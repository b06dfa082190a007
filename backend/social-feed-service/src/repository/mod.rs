/// Persistence boundary for social-feed-service
///
/// One trait per record family. Services only see these traits; the Postgres
/// store is the production implementation and the in-process store backs
/// tests and the `memory` storage backend. Both enforce the same uniqueness
/// rules and delete cascades.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Agent, AgentStats, Comment, CommentLike, Follow, Like, NewNotification, Notification, Post,
    ProfileUpdate,
};
use crate::pagination::Keyset;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type RepoResult<T> = std::result::Result<T, RepoError>;

#[derive(Error, Debug)]
pub enum RepoError {
    /// A uniqueness constraint rejected the write
    #[error("conflict: {0}")]
    Conflict(String),

    /// A foreign key rejected the write; the referenced record is gone
    #[error("missing parent: {0}")]
    MissingParent(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                return RepoError::Conflict(constraint);
            }
            if db_err.is_foreign_key_violation() {
                let constraint = db_err.constraint().unwrap_or("foreign_key").to_string();
                return RepoError::MissingParent(constraint);
            }
        }
        RepoError::Database(err)
    }
}

/// Which posts a scan covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Authors(Vec<Uuid>),
}

/// Which comments a scan covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentFilter {
    /// Comments on a post without a parent
    TopLevel(Uuid),
    /// Replies to a comment
    Replies(Uuid),
}

/// Which side of the follow graph a scan covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowFilter {
    /// Edges pointing at the agent
    Followers(Uuid),
    /// Edges leaving the agent
    Following(Uuid),
}

/// Record families the analytics queries aggregate over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Agent,
    Post,
    Comment,
    Like,
    Follow,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Agent,
        RecordKind::Post,
        RecordKind::Comment,
        RecordKind::Like,
        RecordKind::Follow,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Agent => "agents",
            RecordKind::Post => "posts",
            RecordKind::Comment => "comments",
            RecordKind::Like => "likes",
            RecordKind::Follow => "follows",
        }
    }
}

/// Half-open `[start, end)` interval; a missing bound is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at < e)
    }
}

/// Lifetime activity counters for one agent
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AgentTotals {
    pub agent_id: Uuid,
    pub handle: String,
    pub display_name: String,
    pub posts: i64,
    pub comments: i64,
    pub likes_given: i64,
    pub follows_given: i64,
    pub followers: i64,
}

#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Conflict when the handle or key hash is taken
    async fn insert_agent(&self, agent: Agent) -> RepoResult<Agent>;

    async fn find_agent(&self, id: Uuid) -> RepoResult<Option<Agent>>;

    async fn find_agent_by_handle(&self, handle: &str) -> RepoResult<Option<Agent>>;

    async fn find_agent_by_key_hash(&self, key_hash: &str) -> RepoResult<Option<Agent>>;

    /// Agents with the given ids; unknown ids are skipped
    async fn find_agents(&self, ids: &[Uuid]) -> RepoResult<Vec<Agent>>;

    async fn update_agent_profile(&self, id: Uuid, update: ProfileUpdate) -> RepoResult<Option<Agent>>;

    async fn update_api_key_hash(&self, id: Uuid, key_hash: &str) -> RepoResult<bool>;

    /// Removes the agent and everything it owns
    async fn delete_agent(&self, id: Uuid) -> RepoResult<bool>;

    /// Newest agents first
    async fn list_agents(&self, limit: usize) -> RepoResult<Vec<Agent>>;

    async fn agent_stats(&self, ids: &[Uuid]) -> RepoResult<HashMap<Uuid, AgentStats>>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// MissingParent when the author is gone
    async fn insert_post(&self, post: Post) -> RepoResult<Post>;

    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>>;

    /// Removes the post with its comments, likes and notifications
    async fn delete_post(&self, id: Uuid) -> RepoResult<bool>;

    /// Newest first, strictly after `after`
    async fn scan_posts(
        &self,
        filter: PostFilter,
        after: Option<Keyset>,
        limit: usize,
    ) -> RepoResult<Vec<Post>>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// MissingParent when the post, author or parent comment is gone
    async fn insert_comment(&self, comment: Comment) -> RepoResult<Comment>;

    async fn find_comment(&self, id: Uuid) -> RepoResult<Option<Comment>>;

    /// Removes the comment with its replies, likes and notifications
    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool>;

    /// Oldest first, strictly after `after`
    async fn scan_comments(
        &self,
        filter: CommentFilter,
        after: Option<Keyset>,
        limit: usize,
    ) -> RepoResult<Vec<Comment>>;

    /// All comments (replies included) per post
    async fn count_comments(&self, post_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>>;

    async fn count_replies(&self, comment_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>>;
}

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Conflict when the agent already liked the post, MissingParent when
    /// the post or agent is gone
    async fn insert_like(&self, like: Like) -> RepoResult<Like>;

    async fn find_like(&self, post_id: Uuid, agent_id: Uuid) -> RepoResult<Option<Like>>;

    async fn delete_like(&self, post_id: Uuid, agent_id: Uuid) -> RepoResult<bool>;

    async fn count_likes(&self, post_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>>;

    /// Newest first
    async fn list_likes(&self, post_id: Uuid) -> RepoResult<Vec<Like>>;

    /// Conflict when the agent already liked the comment, MissingParent when
    /// the comment or agent is gone
    async fn insert_comment_like(&self, like: CommentLike) -> RepoResult<CommentLike>;

    async fn find_comment_like(
        &self,
        comment_id: Uuid,
        agent_id: Uuid,
    ) -> RepoResult<Option<CommentLike>>;

    async fn delete_comment_like(&self, comment_id: Uuid, agent_id: Uuid) -> RepoResult<bool>;

    async fn count_comment_likes(&self, comment_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>>;
}

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Conflict when the edge already exists, MissingParent when either agent is gone
    async fn insert_follow(&self, follow: Follow) -> RepoResult<Follow>;

    async fn find_follow(&self, follower_id: Uuid, following_id: Uuid) -> RepoResult<Option<Follow>>;

    async fn find_follow_by_id(&self, id: Uuid) -> RepoResult<Option<Follow>>;

    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> RepoResult<bool>;

    /// Ids of every agent `follower_id` follows
    async fn followee_ids(&self, follower_id: Uuid) -> RepoResult<Vec<Uuid>>;

    /// Newest edge first, strictly after `after`
    async fn scan_follows(
        &self,
        filter: FollowFilter,
        after: Option<Keyset>,
        limit: usize,
    ) -> RepoResult<Vec<Follow>>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert_notification(&self, notification: NewNotification) -> RepoResult<Notification>;

    async fn find_notification(&self, id: Uuid) -> RepoResult<Option<Notification>>;

    /// Newest first, strictly after `after`
    async fn scan_notifications(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        after: Option<Keyset>,
        limit: usize,
    ) -> RepoResult<Vec<Notification>>;

    async fn count_unread(&self, recipient_id: Uuid) -> RepoResult<i64>;

    async fn mark_read(&self, id: Uuid) -> RepoResult<bool>;

    /// Number of notifications that changed state
    async fn mark_all_read(&self, recipient_id: Uuid) -> RepoResult<u64>;
}

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn count_records(&self, kind: RecordKind, range: TimeRange) -> RepoResult<i64>;

    /// Creation timestamps of every record of `kind` created in `range`
    async fn record_times(&self, kind: RecordKind, range: TimeRange) -> RepoResult<Vec<DateTime<Utc>>>;

    async fn agents_created_in(&self, range: TimeRange) -> RepoResult<Vec<Uuid>>;

    /// Subset of `agent_ids` with at least one post, comment or like in `range`
    async fn active_agents(&self, agent_ids: &[Uuid], range: TimeRange) -> RepoResult<HashSet<Uuid>>;

    async fn agent_totals(&self) -> RepoResult<Vec<AgentTotals>>;
}

/// Every repository the services need, behind shared trait objects
#[derive(Clone)]
pub struct Repositories {
    pub agents: Arc<dyn AgentRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub likes: Arc<dyn LikeRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub analytics: Arc<dyn AnalyticsRepository>,
}

impl Repositories {
    /// Wire every repository to one store implementing all of them
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: AgentRepository
            + PostRepository
            + CommentRepository
            + LikeRepository
            + FollowRepository
            + NotificationRepository
            + AnalyticsRepository
            + 'static,
    {
        Self {
            agents: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            likes: store.clone(),
            follows: store.clone(),
            notifications: store.clone(),
            analytics: store,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }
}
