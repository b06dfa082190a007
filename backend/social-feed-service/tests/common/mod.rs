//! Shared fixtures for social-feed-service integration tests
//!
//! Everything runs against the in-process store. `seed_*` helpers write
//! records with explicit timestamps for time-sensitive tests; `register` and
//! `publish` go through the services like a real client would.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use social_feed_service::models::{Agent, Follow, Like, Post, PostView};
use social_feed_service::pagination::PaginationConfig;
use social_feed_service::repository::{
    AgentRepository, FollowRepository, LikeRepository, PostRepository, Repositories,
};
use social_feed_service::services::analytics::AnalyticsConfig;
use social_feed_service::services::hash_api_key;
use social_feed_service::AppState;

pub struct TestApp {
    pub state: AppState,
    pub repos: Repositories,
}

/// A registered agent and its plaintext API key
pub struct TestAgent {
    pub id: Uuid,
    pub handle: String,
    pub api_key: String,
}

impl TestAgent {
    pub fn bearer(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.api_key))
    }
}

pub fn test_app() -> TestApp {
    let repos = Repositories::in_memory();
    TestApp {
        state: AppState::new(
            repos.clone(),
            PaginationConfig::default(),
            AnalyticsConfig::default(),
        ),
        repos,
    }
}

impl TestApp {
    pub async fn register(&self, handle: &str) -> TestAgent {
        let registered = self
            .state
            .agents
            .register(handle, &format!("Agent {}", handle), None)
            .await
            .expect("register agent");
        TestAgent {
            id: registered.agent.id,
            handle: handle.to_string(),
            api_key: registered.api_key,
        }
    }

    pub async fn publish(&self, agent: &TestAgent, caption: &str) -> PostView {
        self.state
            .content
            .create_post(agent.id, "https://img.example/p.png", Some(caption))
            .await
            .expect("create post")
    }

    pub async fn seed_agent(&self, handle: &str, created_at: DateTime<Utc>) -> Agent {
        self.repos
            .agents
            .insert_agent(Agent {
                id: Uuid::new_v4(),
                handle: handle.to_string(),
                display_name: handle.to_uppercase(),
                bio: None,
                avatar_url: None,
                api_key_hash: hash_api_key(&Uuid::new_v4().to_string()),
                created_at,
                updated_at: created_at,
            })
            .await
            .expect("seed agent")
    }

    pub async fn seed_post(&self, agent_id: Uuid, created_at: DateTime<Utc>) -> Post {
        self.repos
            .posts
            .insert_post(Post {
                id: Uuid::new_v4(),
                agent_id,
                image_url: "https://img.example/seed.png".to_string(),
                caption: None,
                created_at,
            })
            .await
            .expect("seed post")
    }

    pub async fn seed_like(&self, agent_id: Uuid, post_id: Uuid, created_at: DateTime<Utc>) -> Like {
        self.repos
            .likes
            .insert_like(Like {
                id: Uuid::new_v4(),
                post_id,
                agent_id,
                created_at,
            })
            .await
            .expect("seed like")
    }

    pub async fn seed_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Follow {
        self.repos
            .follows
            .insert_follow(Follow {
                id: Uuid::new_v4(),
                follower_id,
                following_id,
                created_at,
            })
            .await
            .expect("seed follow")
    }
}
