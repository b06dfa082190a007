/// Feed assembly
///
/// The home feed is the viewer's own posts plus the posts of everyone the
/// viewer follows, newest first. The followee set is read once per request
/// and reused for every page fetch within it.
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::{hydrate_posts, SocialGraph};
use crate::error::Result;
use crate::models::{Post, PostPage};
use crate::pagination::{paginate, CursorSource, Keyed, Keyset, PageRequest};
use crate::repository::{PostFilter, PostRepository, RepoResult, Repositories};

struct PostSource<'a> {
    repo: &'a dyn PostRepository,
    filter: PostFilter,
}

#[async_trait]
impl CursorSource for PostSource<'_> {
    type Item = Post;

    async fn locate(&self, cursor: Uuid) -> RepoResult<Option<Keyset>> {
        Ok(self.repo.find_post(cursor).await?.map(|p| p.keyset()))
    }

    async fn fetch(&self, after: Option<Keyset>, take: usize) -> RepoResult<Vec<Post>> {
        self.repo.scan_posts(self.filter.clone(), after, take).await
    }
}

#[derive(Clone)]
pub struct FeedService {
    repos: Repositories,
    graph: SocialGraph,
}

impl FeedService {
    pub fn new(repos: Repositories, graph: SocialGraph) -> Self {
        Self { repos, graph }
    }

    pub async fn home_feed(&self, viewer: Uuid, page: &PageRequest) -> Result<PostPage> {
        let mut authors = self.graph.followee_ids(viewer).await?;
        authors.push(viewer);
        authors.sort();
        authors.dedup();

        debug!(agent_id = %viewer, authors = authors.len(), "assembling home feed");

        self.page(PostFilter::Authors(authors), page).await
    }

    /// Every post, newest first
    pub async fn public_timeline(&self, page: &PageRequest) -> Result<PostPage> {
        self.page(PostFilter::All, page).await
    }

    async fn page(&self, filter: PostFilter, page: &PageRequest) -> Result<PostPage> {
        let source = PostSource {
            repo: self.repos.posts.as_ref(),
            filter,
        };
        let posts = paginate(&source, page).await?;
        let views = hydrate_posts(&self.repos, &posts.items).await?;
        Ok(posts.with_items(views).into())
    }
}
