/// Business logic layer for social-feed-service
///
/// Services receive their repositories explicitly and take the acting agent
/// as an argument; nothing here reads request state.
use futures::TryFutureExt;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Agent, AgentSummary, Comment, CommentView, Post, PostView};
use crate::repository::{AgentRepository, Repositories};

pub mod agents;
pub mod analytics;
pub mod content;
pub mod engagement;
pub mod feed;
pub mod graph;
pub mod notifications;

pub use agents::{generate_api_key, hash_api_key, AgentService};
pub use analytics::AnalyticsService;
pub use content::ContentService;
pub use engagement::EngagementLedger;
pub use feed::FeedService;
pub use graph::SocialGraph;
pub use notifications::{NotificationFanout, NotificationInbox};

/// Batch-load agents by id; missing agents are absent from the map
pub(crate) async fn load_agents(
    repo: &dyn AgentRepository,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, Agent>> {
    let mut unique = ids.to_vec();
    unique.sort();
    unique.dedup();

    let agents = repo.find_agents(&unique).await?;
    Ok(agents.into_iter().map(|a| (a.id, a)).collect())
}

/// Attach authors and live counts to posts. Posts whose author is gone are dropped.
pub(crate) async fn hydrate_posts(repos: &Repositories, posts: &[Post]) -> Result<Vec<PostView>> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let author_ids: Vec<Uuid> = posts.iter().map(|p| p.agent_id).collect();

    let (authors, likes, comments) = tokio::try_join!(
        load_agents(repos.agents.as_ref(), &author_ids),
        repos.likes.count_likes(&post_ids).map_err(AppError::from),
        repos.comments.count_comments(&post_ids).map_err(AppError::from),
    )?;

    Ok(posts
        .iter()
        .filter_map(|post| {
            let author = authors.get(&post.agent_id)?;
            Some(PostView::new(
                post,
                AgentSummary::from(author),
                likes.get(&post.id).copied().unwrap_or(0),
                comments.get(&post.id).copied().unwrap_or(0),
            ))
        })
        .collect())
}

/// Attach authors, reply counts and like counts to comments
pub(crate) async fn hydrate_comments(
    repos: &Repositories,
    comments: &[Comment],
) -> Result<Vec<CommentView>> {
    if comments.is_empty() {
        return Ok(Vec::new());
    }

    let comment_ids: Vec<Uuid> = comments.iter().map(|c| c.id).collect();
    let author_ids: Vec<Uuid> = comments.iter().map(|c| c.agent_id).collect();

    let (authors, replies, likes) = tokio::try_join!(
        load_agents(repos.agents.as_ref(), &author_ids),
        repos.comments.count_replies(&comment_ids).map_err(AppError::from),
        repos.likes.count_comment_likes(&comment_ids).map_err(AppError::from),
    )?;

    Ok(comments
        .iter()
        .filter_map(|comment| {
            let author = authors.get(&comment.agent_id)?;
            Some(CommentView::new(
                comment,
                AgentSummary::from(author),
                replies.get(&comment.id).copied().unwrap_or(0),
                likes.get(&comment.id).copied().unwrap_or(0),
            ))
        })
        .collect())
}
