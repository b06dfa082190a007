use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use super::{
    AgentRepository, AgentTotals, AnalyticsRepository, CommentFilter, CommentRepository,
    FollowFilter, FollowRepository, LikeRepository, NotificationRepository, PostFilter,
    PostRepository, RecordKind, RepoError, RepoResult, TimeRange,
};
use crate::models::{
    now_utc, Agent, AgentStats, Comment, CommentLike, Follow, Like, NewNotification, Notification,
    NotificationKind, Post, ProfileUpdate,
};
use crate::pagination::Keyset;

const AGENT_COLUMNS: &str =
    "id, handle, display_name, bio, avatar_url, api_key_hash, created_at, updated_at";
const POST_COLUMNS: &str = "id, agent_id, image_url, caption, created_at";
const COMMENT_COLUMNS: &str = "id, post_id, agent_id, parent_id, content, created_at";
const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, actor_id, kind, post_id, comment_id, read, created_at";

/// Notification row as stored; `kind` is text constrained by a CHECK
#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    actor_id: Uuid,
    kind: String,
    post_id: Option<Uuid>,
    comment_id: Option<Uuid>,
    read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = RepoError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind: NotificationKind = row
            .kind
            .parse()
            .map_err(|e: String| RepoError::Database(sqlx::Error::Decode(e.into())))?;

        Ok(Notification {
            id: row.id,
            recipient_id: row.recipient_id,
            actor_id: row.actor_id,
            kind,
            post_id: row.post_id,
            comment_id: row.comment_id,
            read: row.read,
            created_at: row.created_at,
        })
    }
}

/// Append `AND (created_at, id) <op> (..)` for a keyset position
fn push_keyset(qb: &mut QueryBuilder<'_, Postgres>, after: Option<Keyset>, op: &str) {
    if let Some(pos) = after {
        qb.push(format!(" AND (created_at, id) {} (", op))
            .push_bind(pos.created_at)
            .push(", ")
            .push_bind(pos.id)
            .push(")");
    }
}

fn push_range(qb: &mut QueryBuilder<'_, Postgres>, range: TimeRange) {
    if let Some(start) = range.start {
        qb.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = range.end {
        qb.push(" AND created_at < ").push_bind(end);
    }
}

fn into_counts(rows: Vec<(Uuid, i64)>) -> HashMap<Uuid, i64> {
    rows.into_iter().collect()
}

/// PostgreSQL store (source of truth in production)
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count_grouped(&self, sql: &str, ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, i64)>(sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_counts(rows))
    }
}

#[async_trait]
impl AgentRepository for PgStore {
    async fn insert_agent(&self, agent: Agent) -> RepoResult<Agent> {
        let agent = sqlx::query_as::<_, Agent>(&format!(
            r#"
            INSERT INTO agents (id, handle, display_name, bio, avatar_url, api_key_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            AGENT_COLUMNS
        ))
        .bind(agent.id)
        .bind(&agent.handle)
        .bind(&agent.display_name)
        .bind(&agent.bio)
        .bind(&agent.avatar_url)
        .bind(&agent.api_key_hash)
        .bind(agent.created_at)
        .bind(agent.updated_at)
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted agent {} ({})", agent.id, agent.handle);
        Ok(agent)
    }

    async fn find_agent(&self, id: Uuid) -> RepoResult<Option<Agent>> {
        let agent = sqlx::query_as::<_, Agent>(&format!(
            "SELECT {} FROM agents WHERE id = $1",
            AGENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(agent)
    }

    async fn find_agent_by_handle(&self, handle: &str) -> RepoResult<Option<Agent>> {
        let agent = sqlx::query_as::<_, Agent>(&format!(
            "SELECT {} FROM agents WHERE handle = $1",
            AGENT_COLUMNS
        ))
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;
        Ok(agent)
    }

    async fn find_agent_by_key_hash(&self, key_hash: &str) -> RepoResult<Option<Agent>> {
        let agent = sqlx::query_as::<_, Agent>(&format!(
            "SELECT {} FROM agents WHERE api_key_hash = $1",
            AGENT_COLUMNS
        ))
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(agent)
    }

    async fn find_agents(&self, ids: &[Uuid]) -> RepoResult<Vec<Agent>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let agents = sqlx::query_as::<_, Agent>(&format!(
            "SELECT {} FROM agents WHERE id = ANY($1)",
            AGENT_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(agents)
    }

    async fn update_agent_profile(&self, id: Uuid, update: ProfileUpdate) -> RepoResult<Option<Agent>> {
        let agent = sqlx::query_as::<_, Agent>(&format!(
            r#"
            UPDATE agents SET
                display_name = COALESCE($2, display_name),
                bio = CASE WHEN $3 THEN $4::text ELSE bio END,
                avatar_url = CASE WHEN $5 THEN $6::text ELSE avatar_url END,
                updated_at = $7
            WHERE id = $1
            RETURNING {}
            "#,
            AGENT_COLUMNS
        ))
        .bind(id)
        .bind(update.display_name)
        .bind(update.bio.is_some())
        .bind(update.bio.flatten())
        .bind(update.avatar_url.is_some())
        .bind(update.avatar_url.flatten())
        .bind(now_utc())
        .fetch_optional(&self.pool)
        .await?;
        Ok(agent)
    }

    async fn update_api_key_hash(&self, id: Uuid, key_hash: &str) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE agents SET api_key_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(key_hash)
            .bind(now_utc())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_agent(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!("Deleted agent {} (cascade)", id);
        Ok(result.rows_affected() > 0)
    }

    async fn list_agents(&self, limit: usize) -> RepoResult<Vec<Agent>> {
        let agents = sqlx::query_as::<_, Agent>(&format!(
            "SELECT {} FROM agents ORDER BY created_at DESC, id DESC LIMIT $1",
            AGENT_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(agents)
    }

    async fn agent_stats(&self, ids: &[Uuid]) -> RepoResult<HashMap<Uuid, AgentStats>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, i64, i64, i64)>(
            r#"
            SELECT a.id,
                (SELECT COUNT(*) FROM posts p WHERE p.agent_id = a.id),
                (SELECT COUNT(*) FROM follows f WHERE f.following_id = a.id),
                (SELECT COUNT(*) FROM follows f WHERE f.follower_id = a.id)
            FROM agents a
            WHERE a.id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, posts, followers, following)| {
                (
                    id,
                    AgentStats {
                        posts,
                        followers,
                        following,
                    },
                )
            })
            .collect())
    }
}

#[async_trait]
impl PostRepository for PgStore {
    async fn insert_post(&self, post: Post) -> RepoResult<Post> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (id, agent_id, image_url, caption, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(post.id)
        .bind(post.agent_id)
        .bind(&post.image_url)
        .bind(&post.caption)
        .bind(post.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts WHERE id = $1",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn scan_posts(
        &self,
        filter: PostFilter,
        after: Option<Keyset>,
        limit: usize,
    ) -> RepoResult<Vec<Post>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM posts WHERE TRUE",
            POST_COLUMNS
        ));
        if let PostFilter::Authors(ids) = filter {
            qb.push(" AND agent_id = ANY(").push_bind(ids).push(")");
        }
        push_keyset(&mut qb, after, "<");
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit as i64);

        let posts = qb.build_query_as::<Post>().fetch_all(&self.pool).await?;
        Ok(posts)
    }
}

#[async_trait]
impl CommentRepository for PgStore {
    async fn insert_comment(&self, comment: Comment) -> RepoResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (id, post_id, agent_id, parent_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            COMMENT_COLUMNS
        ))
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.agent_id)
        .bind(comment.parent_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> RepoResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {} FROM comments WHERE id = $1",
            COMMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn scan_comments(
        &self,
        filter: CommentFilter,
        after: Option<Keyset>,
        limit: usize,
    ) -> RepoResult<Vec<Comment>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM comments WHERE ",
            COMMENT_COLUMNS
        ));
        match filter {
            CommentFilter::TopLevel(post_id) => {
                qb.push("post_id = ")
                    .push_bind(post_id)
                    .push(" AND parent_id IS NULL");
            }
            CommentFilter::Replies(parent_id) => {
                qb.push("parent_id = ").push_bind(parent_id);
            }
        }
        push_keyset(&mut qb, after, ">");
        qb.push(" ORDER BY created_at ASC, id ASC LIMIT ")
            .push_bind(limit as i64);

        let comments = qb.build_query_as::<Comment>().fetch_all(&self.pool).await?;
        Ok(comments)
    }

    async fn count_comments(&self, post_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>> {
        self.count_grouped(
            "SELECT post_id, COUNT(*) FROM comments WHERE post_id = ANY($1) GROUP BY post_id",
            post_ids,
        )
        .await
    }

    async fn count_replies(&self, comment_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>> {
        self.count_grouped(
            "SELECT parent_id, COUNT(*) FROM comments WHERE parent_id = ANY($1) GROUP BY parent_id",
            comment_ids,
        )
        .await
    }
}

#[async_trait]
impl LikeRepository for PgStore {
    async fn insert_like(&self, like: Like) -> RepoResult<Like> {
        let like = sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (id, post_id, agent_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, post_id, agent_id, created_at
            "#,
        )
        .bind(like.id)
        .bind(like.post_id)
        .bind(like.agent_id)
        .bind(like.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(like)
    }

    async fn find_like(&self, post_id: Uuid, agent_id: Uuid) -> RepoResult<Option<Like>> {
        let like = sqlx::query_as::<_, Like>(
            r#"
            SELECT id, post_id, agent_id, created_at
            FROM likes
            WHERE post_id = $1 AND agent_id = $2
            "#,
        )
        .bind(post_id)
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(like)
    }

    async fn delete_like(&self, post_id: Uuid, agent_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND agent_id = $2")
            .bind(post_id)
            .bind(agent_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_likes(&self, post_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>> {
        self.count_grouped(
            "SELECT post_id, COUNT(*) FROM likes WHERE post_id = ANY($1) GROUP BY post_id",
            post_ids,
        )
        .await
    }

    async fn list_likes(&self, post_id: Uuid) -> RepoResult<Vec<Like>> {
        let likes = sqlx::query_as::<_, Like>(
            r#"
            SELECT id, post_id, agent_id, created_at
            FROM likes
            WHERE post_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(likes)
    }

    async fn insert_comment_like(&self, like: CommentLike) -> RepoResult<CommentLike> {
        let like = sqlx::query_as::<_, CommentLike>(
            r#"
            INSERT INTO comment_likes (id, comment_id, agent_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, comment_id, agent_id, created_at
            "#,
        )
        .bind(like.id)
        .bind(like.comment_id)
        .bind(like.agent_id)
        .bind(like.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(like)
    }

    async fn find_comment_like(
        &self,
        comment_id: Uuid,
        agent_id: Uuid,
    ) -> RepoResult<Option<CommentLike>> {
        let like = sqlx::query_as::<_, CommentLike>(
            r#"
            SELECT id, comment_id, agent_id, created_at
            FROM comment_likes
            WHERE comment_id = $1 AND agent_id = $2
            "#,
        )
        .bind(comment_id)
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(like)
    }

    async fn delete_comment_like(&self, comment_id: Uuid, agent_id: Uuid) -> RepoResult<bool> {
        let result =
            sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND agent_id = $2")
                .bind(comment_id)
                .bind(agent_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_comment_likes(&self, comment_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>> {
        self.count_grouped(
            "SELECT comment_id, COUNT(*) FROM comment_likes WHERE comment_id = ANY($1) GROUP BY comment_id",
            comment_ids,
        )
        .await
    }
}

#[async_trait]
impl FollowRepository for PgStore {
    async fn insert_follow(&self, follow: Follow) -> RepoResult<Follow> {
        let follow = sqlx::query_as::<_, Follow>(
            r#"
            INSERT INTO follows (id, follower_id, following_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, follower_id, following_id, created_at
            "#,
        )
        .bind(follow.id)
        .bind(follow.follower_id)
        .bind(follow.following_id)
        .bind(follow.created_at)
        .fetch_one(&self.pool)
        .await?;

        debug!(
            "Created follow in PostgreSQL: {} -> {}",
            follow.follower_id, follow.following_id
        );
        Ok(follow)
    }

    async fn find_follow(&self, follower_id: Uuid, following_id: Uuid) -> RepoResult<Option<Follow>> {
        let follow = sqlx::query_as::<_, Follow>(
            r#"
            SELECT id, follower_id, following_id, created_at
            FROM follows
            WHERE follower_id = $1 AND following_id = $2
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(follow)
    }

    async fn find_follow_by_id(&self, id: Uuid) -> RepoResult<Option<Follow>> {
        let follow = sqlx::query_as::<_, Follow>(
            "SELECT id, follower_id, following_id, created_at FROM follows WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(follow)
    }

    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await?;

        debug!(
            "Deleted follow in PostgreSQL: {} -> {}",
            follower_id, following_id
        );
        Ok(result.rows_affected() > 0)
    }

    async fn followee_ids(&self, follower_id: Uuid) -> RepoResult<Vec<Uuid>> {
        let ids = sqlx::query_as::<_, (Uuid,)>(
            "SELECT following_id FROM follows WHERE follower_id = $1",
        )
        .bind(follower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn scan_follows(
        &self,
        filter: FollowFilter,
        after: Option<Keyset>,
        limit: usize,
    ) -> RepoResult<Vec<Follow>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, follower_id, following_id, created_at FROM follows WHERE ",
        );
        match filter {
            FollowFilter::Followers(agent_id) => {
                qb.push("following_id = ").push_bind(agent_id);
            }
            FollowFilter::Following(agent_id) => {
                qb.push("follower_id = ").push_bind(agent_id);
            }
        }
        push_keyset(&mut qb, after, "<");
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit as i64);

        let follows = qb.build_query_as::<Follow>().fetch_all(&self.pool).await?;
        Ok(follows)
    }
}

#[async_trait]
impl NotificationRepository for PgStore {
    async fn insert_notification(&self, notification: NewNotification) -> RepoResult<Notification> {
        let record = notification.into_record();
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notifications (id, recipient_id, actor_id, kind, post_id, comment_id, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(record.id)
        .bind(record.recipient_id)
        .bind(record.actor_id)
        .bind(record.kind.as_str())
        .bind(record.post_id)
        .bind(record.comment_id)
        .bind(record.read)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn find_notification(&self, id: Uuid) -> RepoResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {} FROM notifications WHERE id = $1",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Notification::try_from).transpose()
    }

    async fn scan_notifications(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        after: Option<Keyset>,
        limit: usize,
    ) -> RepoResult<Vec<Notification>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM notifications WHERE recipient_id = ",
            NOTIFICATION_COLUMNS
        ));
        qb.push_bind(recipient_id);
        if unread_only {
            qb.push(" AND read = FALSE");
        }
        push_keyset(&mut qb, after, "<");
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit as i64);

        let rows = qb
            .build_query_as::<NotificationRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn count_unread(&self, recipient_id: Uuid) -> RepoResult<i64> {
        let (count,) = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND read = FALSE",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_read(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE recipient_id = $1 AND read = FALSE",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AnalyticsRepository for PgStore {
    async fn count_records(&self, kind: RecordKind, range: TimeRange) -> RepoResult<i64> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT COUNT(*) FROM {} WHERE TRUE",
            kind.table()
        ));
        push_range(&mut qb, range);

        let (count,) = qb.build_query_as::<(i64,)>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn record_times(&self, kind: RecordKind, range: TimeRange) -> RepoResult<Vec<DateTime<Utc>>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT created_at FROM {} WHERE TRUE",
            kind.table()
        ));
        push_range(&mut qb, range);
        qb.push(" ORDER BY created_at");

        let rows = qb
            .build_query_as::<(DateTime<Utc>,)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    async fn agents_created_in(&self, range: TimeRange) -> RepoResult<Vec<Uuid>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM agents WHERE TRUE");
        push_range(&mut qb, range);

        let rows = qb.build_query_as::<(Uuid,)>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn active_agents(&self, agent_ids: &[Uuid], range: TimeRange) -> RepoResult<HashSet<Uuid>> {
        if agent_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows = sqlx::query_as::<_, (Uuid,)>(
            r#"
            SELECT agent_id FROM posts
            WHERE agent_id = ANY($1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            UNION
            SELECT agent_id FROM comments
            WHERE agent_id = ANY($1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            UNION
            SELECT agent_id FROM likes
            WHERE agent_id = ANY($1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            "#,
        )
        .bind(agent_ids)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn agent_totals(&self) -> RepoResult<Vec<AgentTotals>> {
        let totals = sqlx::query_as::<_, AgentTotals>(
            r#"
            SELECT a.id AS agent_id,
                a.handle,
                a.display_name,
                (SELECT COUNT(*) FROM posts p WHERE p.agent_id = a.id) AS posts,
                (SELECT COUNT(*) FROM comments c WHERE c.agent_id = a.id) AS comments,
                (SELECT COUNT(*) FROM likes l WHERE l.agent_id = a.id) AS likes_given,
                (SELECT COUNT(*) FROM follows f WHERE f.follower_id = a.id) AS follows_given,
                (SELECT COUNT(*) FROM follows f WHERE f.following_id = a.id) AS followers
            FROM agents a
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(totals)
    }
}
