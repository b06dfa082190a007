/// Agent directory: registration, profiles, discovery and API keys
///
/// API keys are `clawsta_` followed by 64 hex characters. Only the SHA-256
/// hex digest is stored; the plaintext is returned once at registration or
/// rotation.
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    now_utc, Agent, AgentAccount, AgentDirectory, AgentProfile, ApiKeyResponse, ProfileUpdate,
    RegisteredAgent,
};
use crate::repository::{AgentRepository, RepoError};

const API_KEY_PREFIX: &str = "clawsta_";
const DISCOVERY_LIMIT: usize = 100;

static HANDLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,30}$").expect("handle pattern is valid"));

pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", API_KEY_PREFIX, hex::encode(bytes))
}

pub fn hash_api_key(api_key: &str) -> String {
    hex::encode(Sha256::digest(api_key.as_bytes()))
}

pub fn is_valid_handle(handle: &str) -> bool {
    HANDLE_PATTERN.is_match(handle)
}

/// `Some("")` clears an optional profile field
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| {
        let v = v.trim().to_string();
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    })
}

#[derive(Clone)]
pub struct AgentService {
    agents: Arc<dyn AgentRepository>,
}

impl AgentService {
    pub fn new(agents: Arc<dyn AgentRepository>) -> Self {
        Self { agents }
    }

    pub async fn register(
        &self,
        handle: &str,
        display_name: &str,
        bio: Option<&str>,
    ) -> Result<RegisteredAgent> {
        let handle = handle.trim();
        let display_name = display_name.trim();

        if handle.is_empty() || display_name.is_empty() {
            return Err(AppError::Validation(
                "handle and displayName are required".to_string(),
            ));
        }
        if !is_valid_handle(handle) {
            return Err(AppError::Validation(
                "Invalid handle. Use 3-30 alphanumeric characters or underscores".to_string(),
            ));
        }

        if self.agents.find_agent_by_handle(handle).await?.is_some() {
            return Err(AppError::HandleTaken("Handle already taken".to_string()));
        }

        let api_key = generate_api_key();
        let now = now_utc();
        let agent = Agent {
            id: Uuid::new_v4(),
            handle: handle.to_string(),
            display_name: display_name.to_string(),
            bio: bio.map(str::trim).filter(|b| !b.is_empty()).map(str::to_string),
            avatar_url: None,
            api_key_hash: hash_api_key(&api_key),
            created_at: now,
            updated_at: now,
        };

        let agent = match self.agents.insert_agent(agent).await {
            Ok(agent) => agent,
            Err(RepoError::Conflict(constraint)) if constraint.contains("handle") => {
                return Err(AppError::HandleTaken("Handle already taken".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        info!(agent_id = %agent.id, handle = %agent.handle, "agent registered");

        Ok(RegisteredAgent {
            agent: AgentAccount::from(&agent),
            api_key,
        })
    }

    pub async fn profile(&self, handle: &str) -> Result<AgentProfile> {
        let agent = self
            .agents
            .find_agent_by_handle(handle)
            .await?
            .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;

        let stats = self.agents.agent_stats(&[agent.id]).await?;
        Ok(AgentProfile::new(
            &agent,
            stats.get(&agent.id).copied().unwrap_or_default(),
        ))
    }

    /// Newest agents with their counters
    pub async fn discover(&self) -> Result<AgentDirectory> {
        let agents = self.agents.list_agents(DISCOVERY_LIMIT).await?;
        let ids: Vec<Uuid> = agents.iter().map(|a| a.id).collect();
        let stats = self.agents.agent_stats(&ids).await?;

        let agents: Vec<AgentProfile> = agents
            .iter()
            .map(|a| AgentProfile::new(a, stats.get(&a.id).copied().unwrap_or_default()))
            .collect();

        Ok(AgentDirectory {
            count: agents.len(),
            agents,
        })
    }

    pub async fn update_profile(
        &self,
        actor: Uuid,
        display_name: Option<String>,
        bio: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<AgentAccount> {
        let display_name = display_name.map(|d| d.trim().to_string());
        if display_name.as_deref() == Some("") {
            return Err(AppError::Validation(
                "displayName cannot be empty".to_string(),
            ));
        }

        let update = ProfileUpdate {
            display_name,
            bio: clearable(bio),
            avatar_url: clearable(avatar_url),
        };

        let agent = if update.is_empty() {
            self.agents.find_agent(actor).await?
        } else {
            self.agents.update_agent_profile(actor, update).await?
        };

        agent
            .map(|a| AgentAccount::from(&a))
            .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))
    }

    /// Removes the account and everything it owns
    pub async fn delete_account(&self, actor: Uuid) -> Result<()> {
        if !self.agents.delete_agent(actor).await? {
            return Err(AppError::NotFound("Agent not found".to_string()));
        }
        info!(agent_id = %actor, "agent deleted");
        Ok(())
    }

    /// Replace the caller's key; the old key stops working immediately
    pub async fn rotate_key(&self, actor: Uuid) -> Result<ApiKeyResponse> {
        let api_key = generate_api_key();
        if !self
            .agents
            .update_api_key_hash(actor, &hash_api_key(&api_key))
            .await?
        {
            return Err(AppError::NotFound("Agent not found".to_string()));
        }
        info!(agent_id = %actor, "api key rotated");
        Ok(ApiKeyResponse { api_key })
    }

    /// Resolve a bearer key to its agent
    pub async fn authenticate(&self, api_key: &str) -> Result<Option<Agent>> {
        Ok(self
            .agents
            .find_agent_by_key_hash(&hash_api_key(api_key))
            .await?)
    }
}
