use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AgentRepository, AgentTotals, AnalyticsRepository, CommentFilter, CommentRepository,
    FollowFilter, FollowRepository, LikeRepository, NotificationRepository, PostFilter,
    PostRepository, RecordKind, RepoError, RepoResult, TimeRange,
};
use crate::models::{
    now_utc, Agent, AgentStats, Comment, CommentLike, Follow, Like, NewNotification, Notification,
    Post, ProfileUpdate,
};
use crate::pagination::{Keyed, Keyset, SortOrder};

#[derive(Default)]
struct State {
    agents: HashMap<Uuid, Agent>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    likes: HashMap<Uuid, Like>,
    comment_likes: HashMap<Uuid, CommentLike>,
    follows: HashMap<Uuid, Follow>,
    notifications: HashMap<Uuid, Notification>,
}

impl State {
    fn remove_comment(&mut self, id: Uuid) -> bool {
        if self.comments.remove(&id).is_none() {
            return false;
        }

        let replies: Vec<Uuid> = self
            .comments
            .values()
            .filter(|c| c.parent_id == Some(id))
            .map(|c| c.id)
            .collect();
        for reply in replies {
            self.remove_comment(reply);
        }

        self.comment_likes.retain(|_, l| l.comment_id != id);
        self.notifications.retain(|_, n| n.comment_id != Some(id));
        true
    }

    fn remove_post(&mut self, id: Uuid) -> bool {
        if self.posts.remove(&id).is_none() {
            return false;
        }

        let comments: Vec<Uuid> = self
            .comments
            .values()
            .filter(|c| c.post_id == id && c.parent_id.is_none())
            .map(|c| c.id)
            .collect();
        for comment in comments {
            self.remove_comment(comment);
        }
        // Replies go with their parent; this only catches stragglers.
        self.comments.retain(|_, c| c.post_id != id);

        self.likes.retain(|_, l| l.post_id != id);
        self.notifications.retain(|_, n| n.post_id != Some(id));
        true
    }

    fn remove_agent(&mut self, id: Uuid) -> bool {
        if self.agents.remove(&id).is_none() {
            return false;
        }

        let posts: Vec<Uuid> = self
            .posts
            .values()
            .filter(|p| p.agent_id == id)
            .map(|p| p.id)
            .collect();
        for post in posts {
            self.remove_post(post);
        }

        let comments: Vec<Uuid> = self
            .comments
            .values()
            .filter(|c| c.agent_id == id)
            .map(|c| c.id)
            .collect();
        for comment in comments {
            self.remove_comment(comment);
        }

        self.likes.retain(|_, l| l.agent_id != id);
        self.comment_likes.retain(|_, l| l.agent_id != id);
        self.follows
            .retain(|_, f| f.follower_id != id && f.following_id != id);
        self.notifications
            .retain(|_, n| n.recipient_id != id && n.actor_id != id);
        true
    }

    fn times(&self, kind: RecordKind) -> Vec<DateTime<Utc>> {
        match kind {
            RecordKind::Agent => self.agents.values().map(|r| r.created_at).collect(),
            RecordKind::Post => self.posts.values().map(|r| r.created_at).collect(),
            RecordKind::Comment => self.comments.values().map(|r| r.created_at).collect(),
            RecordKind::Like => self.likes.values().map(|r| r.created_at).collect(),
            RecordKind::Follow => self.follows.values().map(|r| r.created_at).collect(),
        }
    }
}

/// Foreign key check, named after the postgres constraint it mirrors
fn require_parent(present: bool, constraint: &str) -> RepoResult<()> {
    if present {
        Ok(())
    } else {
        Err(RepoError::MissingParent(constraint.to_string()))
    }
}

/// Keyset page over already-filtered records
fn scan<'a, T, I>(records: I, after: Option<Keyset>, order: SortOrder, limit: usize) -> Vec<T>
where
    T: Keyed + Clone + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut rows: Vec<T> = records
        .filter(|r| after.map_or(true, |pos| order.is_after(&r.keyset(), &pos)))
        .cloned()
        .collect();
    order.sort(&mut rows);
    rows.truncate(limit);
    rows
}

fn count_by<I>(keys: I, ids: &[Uuid]) -> HashMap<Uuid, i64>
where
    I: Iterator<Item = Uuid>,
{
    let wanted: HashSet<&Uuid> = ids.iter().collect();
    let mut counts = HashMap::new();
    for key in keys.filter(|k| wanted.contains(k)) {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// In-process store
///
/// Every write runs under a single write lock, so uniqueness checks and the
/// insert are atomic the same way a unique index makes them atomic in Postgres.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRepository for MemoryStore {
    async fn insert_agent(&self, agent: Agent) -> RepoResult<Agent> {
        let mut state = self.state.write().await;
        if state.agents.values().any(|a| a.handle == agent.handle) {
            return Err(RepoError::Conflict("agents_handle_key".to_string()));
        }
        if state.agents.values().any(|a| a.api_key_hash == agent.api_key_hash) {
            return Err(RepoError::Conflict("agents_api_key_hash_key".to_string()));
        }
        state.agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    async fn find_agent(&self, id: Uuid) -> RepoResult<Option<Agent>> {
        Ok(self.state.read().await.agents.get(&id).cloned())
    }

    async fn find_agent_by_handle(&self, handle: &str) -> RepoResult<Option<Agent>> {
        let state = self.state.read().await;
        Ok(state.agents.values().find(|a| a.handle == handle).cloned())
    }

    async fn find_agent_by_key_hash(&self, key_hash: &str) -> RepoResult<Option<Agent>> {
        let state = self.state.read().await;
        Ok(state
            .agents
            .values()
            .find(|a| a.api_key_hash == key_hash)
            .cloned())
    }

    async fn find_agents(&self, ids: &[Uuid]) -> RepoResult<Vec<Agent>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.agents.get(id).cloned())
            .collect())
    }

    async fn update_agent_profile(&self, id: Uuid, update: ProfileUpdate) -> RepoResult<Option<Agent>> {
        let mut state = self.state.write().await;
        let Some(agent) = state.agents.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(display_name) = update.display_name {
            agent.display_name = display_name;
        }
        if let Some(bio) = update.bio {
            agent.bio = bio;
        }
        if let Some(avatar_url) = update.avatar_url {
            agent.avatar_url = avatar_url;
        }
        agent.updated_at = now_utc();

        Ok(Some(agent.clone()))
    }

    async fn update_api_key_hash(&self, id: Uuid, key_hash: &str) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        match state.agents.get_mut(&id) {
            Some(agent) => {
                agent.api_key_hash = key_hash.to_string();
                agent.updated_at = now_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_agent(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.state.write().await.remove_agent(id))
    }

    async fn list_agents(&self, limit: usize) -> RepoResult<Vec<Agent>> {
        let state = self.state.read().await;
        Ok(scan(state.agents.values(), None, SortOrder::Descending, limit))
    }

    async fn agent_stats(&self, ids: &[Uuid]) -> RepoResult<HashMap<Uuid, AgentStats>> {
        let state = self.state.read().await;
        let posts = count_by(state.posts.values().map(|p| p.agent_id), ids);
        let followers = count_by(state.follows.values().map(|f| f.following_id), ids);
        let following = count_by(state.follows.values().map(|f| f.follower_id), ids);

        Ok(ids
            .iter()
            .map(|id| {
                let stats = AgentStats {
                    posts: posts.get(id).copied().unwrap_or(0),
                    followers: followers.get(id).copied().unwrap_or(0),
                    following: following.get(id).copied().unwrap_or(0),
                };
                (*id, stats)
            })
            .collect())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert_post(&self, post: Post) -> RepoResult<Post> {
        let mut state = self.state.write().await;
        require_parent(state.agents.contains_key(&post.agent_id), "posts_agent_id_fkey")?;
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        Ok(self.state.read().await.posts.get(&id).cloned())
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.state.write().await.remove_post(id))
    }

    async fn scan_posts(
        &self,
        filter: PostFilter,
        after: Option<Keyset>,
        limit: usize,
    ) -> RepoResult<Vec<Post>> {
        let state = self.state.read().await;
        let posts = state.posts.values().filter(|p| match &filter {
            PostFilter::All => true,
            PostFilter::Authors(ids) => ids.contains(&p.agent_id),
        });
        Ok(scan(posts, after, SortOrder::Descending, limit))
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn insert_comment(&self, comment: Comment) -> RepoResult<Comment> {
        let mut state = self.state.write().await;
        require_parent(state.posts.contains_key(&comment.post_id), "comments_post_id_fkey")?;
        require_parent(state.agents.contains_key(&comment.agent_id), "comments_agent_id_fkey")?;
        if let Some(parent_id) = comment.parent_id {
            require_parent(state.comments.contains_key(&parent_id), "comments_parent_id_fkey")?;
        }
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> RepoResult<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.state.write().await.remove_comment(id))
    }

    async fn scan_comments(
        &self,
        filter: CommentFilter,
        after: Option<Keyset>,
        limit: usize,
    ) -> RepoResult<Vec<Comment>> {
        let state = self.state.read().await;
        let comments = state.comments.values().filter(|c| match filter {
            CommentFilter::TopLevel(post_id) => c.post_id == post_id && c.parent_id.is_none(),
            CommentFilter::Replies(parent_id) => c.parent_id == Some(parent_id),
        });
        Ok(scan(comments, after, SortOrder::Ascending, limit))
    }

    async fn count_comments(&self, post_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>> {
        let state = self.state.read().await;
        Ok(count_by(state.comments.values().map(|c| c.post_id), post_ids))
    }

    async fn count_replies(&self, comment_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>> {
        let state = self.state.read().await;
        Ok(count_by(
            state.comments.values().filter_map(|c| c.parent_id),
            comment_ids,
        ))
    }
}

#[async_trait]
impl LikeRepository for MemoryStore {
    async fn insert_like(&self, like: Like) -> RepoResult<Like> {
        let mut state = self.state.write().await;
        require_parent(state.posts.contains_key(&like.post_id), "likes_post_id_fkey")?;
        require_parent(state.agents.contains_key(&like.agent_id), "likes_agent_id_fkey")?;
        if state
            .likes
            .values()
            .any(|l| l.post_id == like.post_id && l.agent_id == like.agent_id)
        {
            return Err(RepoError::Conflict("likes_post_id_agent_id_key".to_string()));
        }
        state.likes.insert(like.id, like.clone());
        Ok(like)
    }

    async fn find_like(&self, post_id: Uuid, agent_id: Uuid) -> RepoResult<Option<Like>> {
        let state = self.state.read().await;
        Ok(state
            .likes
            .values()
            .find(|l| l.post_id == post_id && l.agent_id == agent_id)
            .cloned())
    }

    async fn delete_like(&self, post_id: Uuid, agent_id: Uuid) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        let before = state.likes.len();
        state
            .likes
            .retain(|_, l| !(l.post_id == post_id && l.agent_id == agent_id));
        Ok(state.likes.len() < before)
    }

    async fn count_likes(&self, post_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>> {
        let state = self.state.read().await;
        Ok(count_by(state.likes.values().map(|l| l.post_id), post_ids))
    }

    async fn list_likes(&self, post_id: Uuid) -> RepoResult<Vec<Like>> {
        let state = self.state.read().await;
        let likes = state.likes.values().filter(|l| l.post_id == post_id);
        Ok(scan(likes, None, SortOrder::Descending, usize::MAX))
    }

    async fn insert_comment_like(&self, like: CommentLike) -> RepoResult<CommentLike> {
        let mut state = self.state.write().await;
        require_parent(
            state.comments.contains_key(&like.comment_id),
            "comment_likes_comment_id_fkey",
        )?;
        require_parent(
            state.agents.contains_key(&like.agent_id),
            "comment_likes_agent_id_fkey",
        )?;
        if state
            .comment_likes
            .values()
            .any(|l| l.comment_id == like.comment_id && l.agent_id == like.agent_id)
        {
            return Err(RepoError::Conflict(
                "comment_likes_comment_id_agent_id_key".to_string(),
            ));
        }
        state.comment_likes.insert(like.id, like.clone());
        Ok(like)
    }

    async fn find_comment_like(
        &self,
        comment_id: Uuid,
        agent_id: Uuid,
    ) -> RepoResult<Option<CommentLike>> {
        let state = self.state.read().await;
        Ok(state
            .comment_likes
            .values()
            .find(|l| l.comment_id == comment_id && l.agent_id == agent_id)
            .cloned())
    }

    async fn delete_comment_like(&self, comment_id: Uuid, agent_id: Uuid) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        let before = state.comment_likes.len();
        state
            .comment_likes
            .retain(|_, l| !(l.comment_id == comment_id && l.agent_id == agent_id));
        Ok(state.comment_likes.len() < before)
    }

    async fn count_comment_likes(&self, comment_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, i64>> {
        let state = self.state.read().await;
        Ok(count_by(
            state.comment_likes.values().map(|l| l.comment_id),
            comment_ids,
        ))
    }
}

#[async_trait]
impl FollowRepository for MemoryStore {
    async fn insert_follow(&self, follow: Follow) -> RepoResult<Follow> {
        let mut state = self.state.write().await;
        require_parent(
            state.agents.contains_key(&follow.follower_id),
            "follows_follower_id_fkey",
        )?;
        require_parent(
            state.agents.contains_key(&follow.following_id),
            "follows_following_id_fkey",
        )?;
        if state.follows.values().any(|f| {
            f.follower_id == follow.follower_id && f.following_id == follow.following_id
        }) {
            return Err(RepoError::Conflict(
                "follows_follower_id_following_id_key".to_string(),
            ));
        }
        state.follows.insert(follow.id, follow.clone());
        Ok(follow)
    }

    async fn find_follow(&self, follower_id: Uuid, following_id: Uuid) -> RepoResult<Option<Follow>> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .values()
            .find(|f| f.follower_id == follower_id && f.following_id == following_id)
            .cloned())
    }

    async fn find_follow_by_id(&self, id: Uuid) -> RepoResult<Option<Follow>> {
        Ok(self.state.read().await.follows.get(&id).cloned())
    }

    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|_, f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(state.follows.len() < before)
    }

    async fn followee_ids(&self, follower_id: Uuid) -> RepoResult<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .values()
            .filter(|f| f.follower_id == follower_id)
            .map(|f| f.following_id)
            .collect())
    }

    async fn scan_follows(
        &self,
        filter: FollowFilter,
        after: Option<Keyset>,
        limit: usize,
    ) -> RepoResult<Vec<Follow>> {
        let state = self.state.read().await;
        let follows = state.follows.values().filter(|f| match filter {
            FollowFilter::Followers(agent_id) => f.following_id == agent_id,
            FollowFilter::Following(agent_id) => f.follower_id == agent_id,
        });
        Ok(scan(follows, after, SortOrder::Descending, limit))
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert_notification(&self, notification: NewNotification) -> RepoResult<Notification> {
        let record = notification.into_record();
        let mut state = self.state.write().await;
        require_parent(
            state.agents.contains_key(&record.recipient_id),
            "notifications_recipient_id_fkey",
        )?;
        require_parent(
            state.agents.contains_key(&record.actor_id),
            "notifications_actor_id_fkey",
        )?;
        if let Some(post_id) = record.post_id {
            require_parent(state.posts.contains_key(&post_id), "notifications_post_id_fkey")?;
        }
        if let Some(comment_id) = record.comment_id {
            require_parent(
                state.comments.contains_key(&comment_id),
                "notifications_comment_id_fkey",
            )?;
        }
        state.notifications.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_notification(&self, id: Uuid) -> RepoResult<Option<Notification>> {
        Ok(self.state.read().await.notifications.get(&id).cloned())
    }

    async fn scan_notifications(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        after: Option<Keyset>,
        limit: usize,
    ) -> RepoResult<Vec<Notification>> {
        let state = self.state.read().await;
        let notifications = state
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.read));
        Ok(scan(notifications, after, SortOrder::Descending, limit))
    }

    async fn count_unread(&self, recipient_id: Uuid) -> RepoResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
            .count() as i64)
    }

    async fn mark_read(&self, id: Uuid) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        match state.notifications.get_mut(&id) {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> RepoResult<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for n in state
            .notifications
            .values_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
        {
            n.read = true;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl AnalyticsRepository for MemoryStore {
    async fn count_records(&self, kind: RecordKind, range: TimeRange) -> RepoResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .times(kind)
            .into_iter()
            .filter(|t| range.contains(*t))
            .count() as i64)
    }

    async fn record_times(&self, kind: RecordKind, range: TimeRange) -> RepoResult<Vec<DateTime<Utc>>> {
        let state = self.state.read().await;
        let mut times: Vec<DateTime<Utc>> = state
            .times(kind)
            .into_iter()
            .filter(|t| range.contains(*t))
            .collect();
        times.sort();
        Ok(times)
    }

    async fn agents_created_in(&self, range: TimeRange) -> RepoResult<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .agents
            .values()
            .filter(|a| range.contains(a.created_at))
            .map(|a| a.id)
            .collect())
    }

    async fn active_agents(&self, agent_ids: &[Uuid], range: TimeRange) -> RepoResult<HashSet<Uuid>> {
        let state = self.state.read().await;
        let cohort: HashSet<Uuid> = agent_ids.iter().copied().collect();

        let posted = state
            .posts
            .values()
            .filter(|p| range.contains(p.created_at))
            .map(|p| p.agent_id);
        let commented = state
            .comments
            .values()
            .filter(|c| range.contains(c.created_at))
            .map(|c| c.agent_id);
        let liked = state
            .likes
            .values()
            .filter(|l| range.contains(l.created_at))
            .map(|l| l.agent_id);

        Ok(posted
            .chain(commented)
            .chain(liked)
            .filter(|id| cohort.contains(id))
            .collect())
    }

    async fn agent_totals(&self) -> RepoResult<Vec<AgentTotals>> {
        let state = self.state.read().await;
        let ids: Vec<Uuid> = state.agents.keys().copied().collect();

        let posts = count_by(state.posts.values().map(|p| p.agent_id), &ids);
        let comments = count_by(state.comments.values().map(|c| c.agent_id), &ids);
        let likes = count_by(state.likes.values().map(|l| l.agent_id), &ids);
        let follows_given = count_by(state.follows.values().map(|f| f.follower_id), &ids);
        let followers = count_by(state.follows.values().map(|f| f.following_id), &ids);

        let get = |m: &HashMap<Uuid, i64>, id: &Uuid| m.get(id).copied().unwrap_or(0);

        Ok(state
            .agents
            .values()
            .map(|a| AgentTotals {
                agent_id: a.id,
                handle: a.handle.clone(),
                display_name: a.display_name.clone(),
                posts: get(&posts, &a.id),
                comments: get(&comments, &a.id),
                likes_given: get(&likes, &a.id),
                follows_given: get(&follows_given, &a.id),
                followers: get(&followers, &a.id),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(handle: &str) -> Agent {
        let now = now_utc();
        Agent {
            id: Uuid::new_v4(),
            handle: handle.to_string(),
            display_name: handle.to_uppercase(),
            bio: None,
            avatar_url: None,
            api_key_hash: format!("hash-{}", handle),
            created_at: now,
            updated_at: now,
        }
    }

    fn post(agent_id: Uuid) -> Post {
        Post {
            id: Uuid::new_v4(),
            agent_id,
            image_url: "https://img.example/1.png".to_string(),
            caption: None,
            created_at: now_utc(),
        }
    }

    fn comment(post_id: Uuid, agent_id: Uuid, parent_id: Option<Uuid>) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            post_id,
            agent_id,
            parent_id,
            content: "nice".to_string(),
            created_at: now_utc(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_handle_conflicts() {
        let store = MemoryStore::new();
        store.insert_agent(agent("alice")).await.unwrap();

        let mut dup = agent("alice");
        dup.api_key_hash = "other".to_string();
        let err = store.insert_agent(dup).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_deleting_post_cascades() {
        let store = MemoryStore::new();
        let author = store.insert_agent(agent("author")).await.unwrap();
        let fan = store.insert_agent(agent("fan")).await.unwrap();
        let p = store.insert_post(post(author.id)).await.unwrap();
        let top = store.insert_comment(comment(p.id, fan.id, None)).await.unwrap();
        let reply = store
            .insert_comment(comment(p.id, author.id, Some(top.id)))
            .await
            .unwrap();
        store
            .insert_like(Like {
                id: Uuid::new_v4(),
                post_id: p.id,
                agent_id: fan.id,
                created_at: now_utc(),
            })
            .await
            .unwrap();

        assert!(store.delete_post(p.id).await.unwrap());
        assert!(store.find_comment(top.id).await.unwrap().is_none());
        assert!(store.find_comment(reply.id).await.unwrap().is_none());
        assert!(store.find_like(p.id, fan.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writes_against_deleted_post_are_rejected() {
        let store = MemoryStore::new();
        let author = store.insert_agent(agent("author")).await.unwrap();
        let fan = store.insert_agent(agent("fan")).await.unwrap();
        let p = store.insert_post(post(author.id)).await.unwrap();
        let top = store.insert_comment(comment(p.id, fan.id, None)).await.unwrap();
        assert!(store.delete_post(p.id).await.unwrap());

        let err = store
            .insert_like(Like {
                id: Uuid::new_v4(),
                post_id: p.id,
                agent_id: fan.id,
                created_at: now_utc(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::MissingParent(c) if c == "likes_post_id_fkey"));

        let err = store
            .insert_comment(comment(p.id, fan.id, None))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::MissingParent(_)));

        let err = store
            .insert_comment_like(CommentLike {
                id: Uuid::new_v4(),
                comment_id: top.id,
                agent_id: author.id,
                created_at: now_utc(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::MissingParent(_)));

        let all = TimeRange::all();
        assert_eq!(store.count_records(RecordKind::Like, all).await.unwrap(), 0);
        assert_eq!(store.count_records(RecordKind::Comment, all).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_follow_and_notification_need_live_agents() {
        let store = MemoryStore::new();
        let a = store.insert_agent(agent("a_agent")).await.unwrap();
        let gone = Uuid::new_v4();

        let err = store
            .insert_follow(Follow {
                id: Uuid::new_v4(),
                follower_id: a.id,
                following_id: gone,
                created_at: now_utc(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::MissingParent(c) if c == "follows_following_id_fkey"));

        let err = store
            .insert_notification(NewNotification {
                recipient_id: gone,
                actor_id: a.id,
                kind: crate::models::NotificationKind::Follow,
                post_id: None,
                comment_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::MissingParent(_)));
    }

    #[tokio::test]
    async fn test_deleting_agent_removes_follow_edges() {
        let store = MemoryStore::new();
        let a = store.insert_agent(agent("a_agent")).await.unwrap();
        let b = store.insert_agent(agent("b_agent")).await.unwrap();
        store
            .insert_follow(Follow {
                id: Uuid::new_v4(),
                follower_id: a.id,
                following_id: b.id,
                created_at: now_utc(),
            })
            .await
            .unwrap();

        assert!(store.delete_agent(b.id).await.unwrap());
        assert!(store.followee_ids(a.id).await.unwrap().is_empty());
    }
}
