//! In-memory repositories for embedding and tests.

use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use vanity_core::Result;
use vanity_core::profile::{PlayerProfile, ProfileRepository};
use vanity_core::tag_request::{TagRequest, TagRequestRepository, TagRequestStatus};

/// Profiles held in a map; nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<Uuid, PlayerProfile>>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_id(&self, player_id: Uuid) -> Result<Option<PlayerProfile>> {
        Ok(self.profiles.read().await.get(&player_id).cloned())
    }

    async fn save(&self, profile: &PlayerProfile) -> Result<()> {
        self.profiles
            .write()
            .await
            .insert(profile.player_id, profile.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTagRequestRepository {
    requests: RwLock<HashMap<Uuid, TagRequest>>,
}

impl InMemoryTagRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TagRequestRepository for InMemoryTagRequestRepository {
    async fn find_by_id(&self, request_id: Uuid) -> Result<Option<TagRequest>> {
        Ok(self.requests.read().await.get(&request_id).cloned())
    }

    async fn save(&self, request: &TagRequest) -> Result<()> {
        self.requests
            .write()
            .await
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn transition(&self, request: &TagRequest, expected: TagRequestStatus) -> Result<bool> {
        let mut requests = self.requests.write().await;
        match requests.get_mut(&request.id) {
            Some(stored) if stored.status == expected => {
                *stored = request.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_pending(&self) -> Result<Vec<TagRequest>> {
        let mut pending: Vec<TagRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.requested_at);
        Ok(pending)
    }

    async fn list_by_player(&self, player_id: Uuid) -> Result<Vec<TagRequest>> {
        let mut requests: Vec<TagRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.player_id == player_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_transition_requires_expected_status() {
        let repo = InMemoryTagRequestRepository::new();
        let request = TagRequest::new(Uuid::new_v4(), "Steve", "CHAMPION", Utc::now());

        let mut denied = request.clone();
        denied.deny(Uuid::new_v4(), "Mod", None, Utc::now()).unwrap();
        // Absent requests never transition.
        assert!(!repo.transition(&denied, TagRequestStatus::Pending).await.unwrap());

        repo.save(&request).await.unwrap();
        assert!(repo.transition(&denied, TagRequestStatus::Pending).await.unwrap());
        assert!(!repo.transition(&denied, TagRequestStatus::Pending).await.unwrap());
        assert!(repo.list_pending().await.unwrap().is_empty());
    }
}
