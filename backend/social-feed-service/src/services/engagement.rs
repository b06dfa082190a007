/// Engagement ledger: likes, comment likes, follows and comments
///
/// Each write checks for an existing record first so the common duplicate
/// gets a clean error without touching the unique index. The store's unique
/// constraint still decides races: a `Conflict` from the insert is reported
/// exactly like the fast-path duplicate. A parent deleted between the lookup
/// and the insert surfaces as `MissingParent` and is reported as not found.
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use super::NotificationFanout;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    now_utc, AgentSummary, Comment, CommentLike, CommentLikeReceipt, CommentUnlikeReceipt,
    CommentView, Follow, FollowOutcome, Like, LikeReceipt, NewNotification, NotificationKind,
    UnlikeReceipt,
};
use crate::repository::{RepoError, Repositories};

fn count_of(counts: HashMap<Uuid, i64>, id: Uuid) -> i64 {
    counts.get(&id).copied().unwrap_or(0)
}

#[derive(Clone)]
pub struct EngagementLedger {
    repos: Repositories,
    fanout: NotificationFanout,
}

impl EngagementLedger {
    pub fn new(repos: Repositories, fanout: NotificationFanout) -> Self {
        Self { repos, fanout }
    }

    async fn post_likes(&self, post_id: Uuid) -> Result<i64> {
        let counts = self.repos.likes.count_likes(&[post_id]).await?;
        Ok(count_of(counts, post_id))
    }

    async fn comment_likes(&self, comment_id: Uuid) -> Result<i64> {
        let counts = self.repos.likes.count_comment_likes(&[comment_id]).await?;
        Ok(count_of(counts, comment_id))
    }

    pub async fn like_post(&self, actor: Uuid, post_id: Uuid) -> Result<LikeReceipt> {
        let post = self
            .repos
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        let already_liked = || {
            metrics::record_engagement("like_post", "duplicate");
            AppError::AlreadyLiked("Already liked this post".to_string())
        };

        if self.repos.likes.find_like(post_id, actor).await?.is_some() {
            return Err(already_liked());
        }

        let like = Like {
            id: Uuid::new_v4(),
            post_id,
            agent_id: actor,
            created_at: now_utc(),
        };
        let like = match self.repos.likes.insert_like(like).await {
            Ok(like) => like,
            Err(RepoError::Conflict(_)) => return Err(already_liked()),
            Err(RepoError::MissingParent(_)) => {
                return Err(AppError::NotFound("Post not found".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        metrics::record_engagement("like_post", "created");

        self.fanout
            .emit(NewNotification {
                recipient_id: post.agent_id,
                actor_id: actor,
                kind: NotificationKind::Like,
                post_id: Some(post.id),
                comment_id: None,
            })
            .await;

        Ok(LikeReceipt {
            id: like.id,
            post_id,
            likes_count: self.post_likes(post_id).await?,
            created_at: like.created_at,
        })
    }

    pub async fn unlike_post(&self, actor: Uuid, post_id: Uuid) -> Result<UnlikeReceipt> {
        if !self.repos.likes.delete_like(post_id, actor).await? {
            return Err(AppError::NotFound("Like not found".to_string()));
        }
        metrics::record_engagement("like_post", "removed");

        Ok(UnlikeReceipt {
            post_id,
            likes_count: self.post_likes(post_id).await?,
            unliked: true,
        })
    }

    pub async fn like_comment(&self, actor: Uuid, comment_id: Uuid) -> Result<CommentLikeReceipt> {
        let comment = self
            .repos
            .comments
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        let already_liked = || {
            metrics::record_engagement("like_comment", "duplicate");
            AppError::AlreadyLiked("Already liked this comment".to_string())
        };

        if self
            .repos
            .likes
            .find_comment_like(comment_id, actor)
            .await?
            .is_some()
        {
            return Err(already_liked());
        }

        let like = CommentLike {
            id: Uuid::new_v4(),
            comment_id,
            agent_id: actor,
            created_at: now_utc(),
        };
        let like = match self.repos.likes.insert_comment_like(like).await {
            Ok(like) => like,
            Err(RepoError::Conflict(_)) => return Err(already_liked()),
            Err(RepoError::MissingParent(_)) => {
                return Err(AppError::NotFound("Comment not found".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        metrics::record_engagement("like_comment", "created");

        self.fanout
            .emit(NewNotification {
                recipient_id: comment.agent_id,
                actor_id: actor,
                kind: NotificationKind::CommentLike,
                post_id: Some(comment.post_id),
                comment_id: Some(comment.id),
            })
            .await;

        Ok(CommentLikeReceipt {
            id: like.id,
            comment_id,
            likes_count: self.comment_likes(comment_id).await?,
            created_at: like.created_at,
        })
    }

    pub async fn unlike_comment(&self, actor: Uuid, comment_id: Uuid) -> Result<CommentUnlikeReceipt> {
        if !self.repos.likes.delete_comment_like(comment_id, actor).await? {
            return Err(AppError::NotFound("Like not found".to_string()));
        }
        metrics::record_engagement("like_comment", "removed");

        Ok(CommentUnlikeReceipt {
            comment_id,
            likes_count: self.comment_likes(comment_id).await?,
            unliked: true,
        })
    }

    /// Follow `handle`. Following twice is a successful no-op that reports
    /// the original edge with `created = false`.
    pub async fn follow(&self, actor: Uuid, handle: &str) -> Result<FollowOutcome> {
        let target = self
            .repos
            .agents
            .find_agent_by_handle(handle)
            .await?
            .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;

        if target.id == actor {
            return Err(AppError::Validation("Cannot follow yourself".to_string()));
        }

        let existing = |follow: Follow| {
            metrics::record_engagement("follow", "noop");
            FollowOutcome {
                following: true,
                followed_at: Some(follow.created_at),
                created: false,
            }
        };

        if let Some(follow) = self.repos.follows.find_follow(actor, target.id).await? {
            return Ok(existing(follow));
        }

        let follow = Follow {
            id: Uuid::new_v4(),
            follower_id: actor,
            following_id: target.id,
            created_at: now_utc(),
        };
        let follow = match self.repos.follows.insert_follow(follow).await {
            Ok(follow) => follow,
            Err(RepoError::Conflict(_)) => {
                // Lost a race with a concurrent follow; report the winner's edge
                let winner = self
                    .repos
                    .follows
                    .find_follow(actor, target.id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal("follow conflict without an existing edge".to_string())
                    })?;
                return Ok(existing(winner));
            }
            Err(RepoError::MissingParent(_)) => {
                return Err(AppError::NotFound("Agent not found".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        metrics::record_engagement("follow", "created");
        info!(follower_id = %actor, following_id = %target.id, "follow created");

        self.fanout
            .emit(NewNotification {
                recipient_id: target.id,
                actor_id: actor,
                kind: NotificationKind::Follow,
                post_id: None,
                comment_id: None,
            })
            .await;

        Ok(FollowOutcome {
            following: true,
            followed_at: Some(follow.created_at),
            created: true,
        })
    }

    /// Unfollow `handle`; removing an edge that does not exist succeeds
    pub async fn unfollow(&self, actor: Uuid, handle: &str) -> Result<FollowOutcome> {
        let target = self
            .repos
            .agents
            .find_agent_by_handle(handle)
            .await?
            .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;

        let removed = self.repos.follows.delete_follow(actor, target.id).await?;
        metrics::record_engagement("follow", if removed { "removed" } else { "noop" });

        Ok(FollowOutcome {
            following: false,
            followed_at: None,
            created: false,
        })
    }

    /// Comment on a post, or reply to a top-level comment when `parent_id` is set
    pub async fn create_comment(
        &self,
        actor: Uuid,
        post_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<CommentView> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("content is required".to_string()));
        }

        let post = self
            .repos
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        let parent = match parent_id {
            None => None,
            Some(parent_id) => {
                let parent = self
                    .repos
                    .comments
                    .find_comment(parent_id)
                    .await?
                    .filter(|c| c.post_id == post.id)
                    .ok_or_else(|| AppError::NotFound("Parent comment not found".to_string()))?;
                if parent.is_reply() {
                    return Err(AppError::Validation(
                        "Replies can only be made to top-level comments".to_string(),
                    ));
                }
                Some(parent)
            }
        };

        let author = self
            .repos
            .agents
            .find_agent(actor)
            .await?
            .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;

        let comment = self
            .repos
            .comments
            .insert_comment(Comment {
                id: Uuid::new_v4(),
                post_id: post.id,
                agent_id: actor,
                parent_id: parent.as_ref().map(|p| p.id),
                content: content.to_string(),
                created_at: now_utc(),
            })
            .await
            .map_err(|e| match e {
                RepoError::MissingParent(constraint) if constraint.contains("parent") => {
                    AppError::NotFound("Parent comment not found".to_string())
                }
                RepoError::MissingParent(_) => AppError::NotFound("Post not found".to_string()),
                e => e.into(),
            })?;
        metrics::record_engagement(
            if parent.is_some() { "reply" } else { "comment" },
            "created",
        );

        let event = match &parent {
            Some(parent) => NewNotification {
                recipient_id: parent.agent_id,
                actor_id: actor,
                kind: NotificationKind::Reply,
                post_id: Some(post.id),
                comment_id: Some(comment.id),
            },
            None => NewNotification {
                recipient_id: post.agent_id,
                actor_id: actor,
                kind: NotificationKind::Comment,
                post_id: Some(post.id),
                comment_id: Some(comment.id),
            },
        };
        self.fanout.emit(event).await;

        Ok(CommentView::new(&comment, AgentSummary::from(&author), 0, 0))
    }

    /// Delete a comment authored by `actor`; replies go with it
    pub async fn delete_comment(&self, actor: Uuid, comment_id: Uuid) -> Result<()> {
        let comment = self
            .repos
            .comments
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        if comment.agent_id != actor {
            return Err(AppError::Forbidden(
                "Not allowed to delete this comment".to_string(),
            ));
        }

        if !self.repos.comments.delete_comment(comment_id).await? {
            warn!(comment_id = %comment_id, "comment vanished before delete");
        }
        metrics::record_engagement("comment", "removed");
        Ok(())
    }
}
