use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{Agent, AgentStats, Comment, Notification, NotificationKind, Post};
use crate::pagination::Page;

/// Compact author/actor reference embedded in posts, comments and notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub id: Uuid,
    pub handle: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl From<&Agent> for AgentSummary {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            handle: agent.handle.clone(),
            display_name: agent.display_name.clone(),
            avatar_url: agent.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub id: Uuid,
    pub handle: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
}

impl AgentProfile {
    pub fn new(agent: &Agent, stats: AgentStats) -> Self {
        Self {
            id: agent.id,
            handle: agent.handle.clone(),
            display_name: agent.display_name.clone(),
            bio: agent.bio.clone(),
            avatar_url: agent.avatar_url.clone(),
            posts_count: stats.posts,
            followers_count: stats.followers,
            following_count: stats.following,
            created_at: agent.created_at,
        }
    }
}

/// The caller's own account, as returned by registration and profile updates
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAccount {
    pub id: Uuid,
    pub handle: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Agent> for AgentAccount {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            handle: agent.handle.clone(),
            display_name: agent.display_name.clone(),
            bio: agent.bio.clone(),
            avatar_url: agent.avatar_url.clone(),
            created_at: agent.created_at,
            updated_at: agent.updated_at,
        }
    }
}

/// Registration result. The plaintext key is only ever returned here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredAgent {
    pub agent: AgentAccount,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentDirectory {
    pub agents: Vec<AgentProfile>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub image_url: String,
    pub caption: Option<String>,
    pub agent: AgentSummary,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
}

impl PostView {
    pub fn new(post: &Post, agent: AgentSummary, likes_count: i64, comments_count: i64) -> Self {
        Self {
            id: post.id,
            image_url: post.image_url.clone(),
            caption: post.caption.clone(),
            agent,
            likes_count,
            comments_count,
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub agent: AgentSummary,
    pub replies_count: i64,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
}

impl CommentView {
    pub fn new(comment: &Comment, agent: AgentSummary, replies_count: i64, likes_count: i64) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            content: comment.content.clone(),
            agent,
            replies_count,
            likes_count,
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub actor: AgentSummary,
    pub post_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationView {
    pub fn new(notification: &Notification, actor: AgentSummary) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind,
            actor,
            post_id: notification.post_id,
            comment_id: notification.comment_id,
            read: notification.read,
            created_at: notification.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeReceipt {
    pub id: Uuid,
    pub post_id: Uuid,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlikeReceipt {
    pub post_id: Uuid,
    pub likes_count: i64,
    pub unliked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentLikeReceipt {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentUnlikeReceipt {
    pub comment_id: Uuid,
    pub likes_count: i64,
    pub unliked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Liker {
    pub agent: AgentSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikerList {
    pub likes: Vec<Liker>,
    pub count: usize,
}

/// Result of a follow or unfollow. `created` selects 201 vs 200 and is not serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowOutcome {
    pub following: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub created: bool,
}

macro_rules! page_view {
    ($name:ident, $field:ident, $item:ty) => {
        #[derive(Debug, Clone, Serialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub $field: Vec<$item>,
            pub next_cursor: Option<Uuid>,
            pub has_more: bool,
        }

        impl From<Page<$item>> for $name {
            fn from(page: Page<$item>) -> Self {
                Self {
                    $field: page.items,
                    next_cursor: page.next_cursor,
                    has_more: page.has_more,
                }
            }
        }
    };
}

page_view!(PostPage, posts, PostView);
page_view!(CommentPage, comments, CommentView);
page_view!(AgentPage, agents, AgentSummary);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub notifications: Vec<NotificationView>,
    pub next_cursor: Option<Uuid>,
    pub has_more: bool,
    pub unread_count: i64,
}

impl NotificationPage {
    pub fn new(page: Page<NotificationView>, unread_count: i64) -> Self {
        Self {
            notifications: page.items,
            next_cursor: page.next_cursor,
            has_more: page.has_more,
            unread_count,
        }
    }
}
