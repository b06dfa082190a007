/// Posts and comment/like reads
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{hydrate_comments, hydrate_posts, load_agents};
use crate::error::{AppError, Result};
use crate::models::{
    now_utc, AgentSummary, Comment, CommentPage, Liker, LikerList, Post, PostView,
};
use crate::pagination::{paginate, CursorSource, Keyed, Keyset, PageRequest};
use crate::repository::{CommentFilter, CommentRepository, RepoResult, Repositories};

struct CommentSource<'a> {
    repo: &'a dyn CommentRepository,
    filter: CommentFilter,
}

#[async_trait]
impl CursorSource for CommentSource<'_> {
    type Item = Comment;

    async fn locate(&self, cursor: Uuid) -> RepoResult<Option<Keyset>> {
        Ok(self.repo.find_comment(cursor).await?.map(|c| c.keyset()))
    }

    async fn fetch(&self, after: Option<Keyset>, take: usize) -> RepoResult<Vec<Comment>> {
        self.repo.scan_comments(self.filter, after, take).await
    }
}

#[derive(Clone)]
pub struct ContentService {
    repos: Repositories,
}

impl ContentService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn create_post(
        &self,
        actor: Uuid,
        image_url: &str,
        caption: Option<&str>,
    ) -> Result<PostView> {
        let image_url = image_url.trim();
        if image_url.is_empty() {
            return Err(AppError::Validation("imageUrl is required".to_string()));
        }

        let author = self
            .repos
            .agents
            .find_agent(actor)
            .await?
            .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;

        let post = self
            .repos
            .posts
            .insert_post(Post {
                id: Uuid::new_v4(),
                agent_id: actor,
                image_url: image_url.to_string(),
                caption: caption.filter(|c| !c.is_empty()).map(str::to_string),
                created_at: now_utc(),
            })
            .await?;

        info!(post_id = %post.id, agent_id = %actor, "post created");
        Ok(PostView::new(&post, AgentSummary::from(&author), 0, 0))
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostView> {
        let post = self
            .repos
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        hydrate_posts(&self.repos, std::slice::from_ref(&post))
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    /// Delete a post owned by `actor` with its comments, likes and notifications
    pub async fn delete_post(&self, actor: Uuid, post_id: Uuid) -> Result<()> {
        let post = self
            .repos
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        if post.agent_id != actor {
            return Err(AppError::Forbidden(
                "Not allowed to delete this post".to_string(),
            ));
        }

        self.repos.posts.delete_post(post_id).await?;
        info!(post_id = %post_id, agent_id = %actor, "post deleted");
        Ok(())
    }

    /// Top-level comments on a post, oldest first
    pub async fn list_comments(&self, post_id: Uuid, page: &PageRequest) -> Result<CommentPage> {
        if self.repos.posts.find_post(post_id).await?.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        self.comment_page(CommentFilter::TopLevel(post_id), page)
            .await
    }

    /// Replies to a comment, oldest first
    pub async fn list_replies(&self, comment_id: Uuid, page: &PageRequest) -> Result<CommentPage> {
        if self.repos.comments.find_comment(comment_id).await?.is_none() {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }
        self.comment_page(CommentFilter::Replies(comment_id), page)
            .await
    }

    async fn comment_page(&self, filter: CommentFilter, page: &PageRequest) -> Result<CommentPage> {
        let source = CommentSource {
            repo: self.repos.comments.as_ref(),
            filter,
        };
        let comments = paginate(&source, page).await?;
        let views = hydrate_comments(&self.repos, &comments.items).await?;
        Ok(comments.with_items(views).into())
    }

    /// Everyone who liked a post, most recent first
    pub async fn list_likes(&self, post_id: Uuid) -> Result<LikerList> {
        if self.repos.posts.find_post(post_id).await?.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let likes = self.repos.likes.list_likes(post_id).await?;
        let agent_ids: Vec<Uuid> = likes.iter().map(|l| l.agent_id).collect();
        let agents = load_agents(self.repos.agents.as_ref(), &agent_ids).await?;

        let likes: Vec<Liker> = likes
            .iter()
            .filter_map(|like| {
                agents.get(&like.agent_id).map(|agent| Liker {
                    agent: AgentSummary::from(agent),
                    created_at: like.created_at,
                })
            })
            .collect();

        Ok(LikerList {
            count: likes.len(),
            likes,
        })
    }
}
