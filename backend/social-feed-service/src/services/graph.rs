/// Social graph reads: followee snapshots and follower/following pages
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::load_agents;
use crate::error::{AppError, Result};
use crate::models::{AgentPage, AgentSummary, Follow};
use crate::pagination::{paginate, CursorSource, Keyed, Keyset, PageRequest};
use crate::repository::{AgentRepository, FollowFilter, FollowRepository, RepoResult};

struct FollowSource<'a> {
    repo: &'a dyn FollowRepository,
    filter: FollowFilter,
}

#[async_trait]
impl CursorSource for FollowSource<'_> {
    type Item = Follow;

    async fn locate(&self, cursor: Uuid) -> RepoResult<Option<Keyset>> {
        Ok(self.repo.find_follow_by_id(cursor).await?.map(|f| f.keyset()))
    }

    async fn fetch(&self, after: Option<Keyset>, take: usize) -> RepoResult<Vec<Follow>> {
        self.repo.scan_follows(self.filter, after, take).await
    }
}

#[derive(Clone)]
pub struct SocialGraph {
    agents: Arc<dyn AgentRepository>,
    follows: Arc<dyn FollowRepository>,
}

impl SocialGraph {
    pub fn new(agents: Arc<dyn AgentRepository>, follows: Arc<dyn FollowRepository>) -> Self {
        Self { agents, follows }
    }

    /// Everyone `agent_id` follows, read once per call
    pub async fn followee_ids(&self, agent_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self.follows.followee_ids(agent_id).await?)
    }

    /// Agents following `handle`, newest edge first. Cursors are follow ids.
    pub async fn followers(&self, handle: &str, page: &PageRequest) -> Result<AgentPage> {
        let agent_id = self.resolve(handle).await?;
        self.page(FollowFilter::Followers(agent_id), page).await
    }

    /// Agents `handle` follows, newest edge first. Cursors are follow ids.
    pub async fn following(&self, handle: &str, page: &PageRequest) -> Result<AgentPage> {
        let agent_id = self.resolve(handle).await?;
        self.page(FollowFilter::Following(agent_id), page).await
    }

    async fn resolve(&self, handle: &str) -> Result<Uuid> {
        self.agents
            .find_agent_by_handle(handle)
            .await?
            .map(|a| a.id)
            .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))
    }

    async fn page(&self, filter: FollowFilter, page: &PageRequest) -> Result<AgentPage> {
        let source = FollowSource {
            repo: self.follows.as_ref(),
            filter,
        };
        let edges = paginate(&source, page).await?;

        let other_side = |f: &Follow| match filter {
            FollowFilter::Followers(_) => f.follower_id,
            FollowFilter::Following(_) => f.following_id,
        };
        let ids: Vec<Uuid> = edges.items.iter().map(other_side).collect();
        let agents = load_agents(self.agents.as_ref(), &ids).await?;

        let summaries = ids
            .iter()
            .filter_map(|id| agents.get(id).map(AgentSummary::from))
            .collect();

        Ok(edges.with_items(summaries).into())
    }
}
