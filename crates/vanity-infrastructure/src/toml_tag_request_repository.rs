//! TOML-based TagRequestRepository implementation.

use crate::storage::AtomicTomlFile;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use vanity_core::tag_request::{TagRequest, TagRequestRepository, TagRequestStatus};
use vanity_core::{Result, VanityError};

/// Stores each tag request as its own TOML file.
///
/// ```text
/// base_dir/
/// └── tag_requests/
///     ├── <request-id>.toml
///     └── <request-id>.lock    # created by conditional transitions
/// ```
///
/// Listing scans the directory; unreadable files are logged and skipped so one
/// corrupt record never hides the rest.
#[derive(Debug, Clone)]
pub struct TomlTagRequestRepository {
    requests_dir: PathBuf,
}

impl TomlTagRequestRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let requests_dir = base_dir.as_ref().join("tag_requests");
        std::fs::create_dir_all(&requests_dir)?;
        Ok(Self { requests_dir })
    }

    fn file(&self, request_id: Uuid) -> AtomicTomlFile<TagRequest> {
        AtomicTomlFile::new(self.requests_dir.join(format!("{}.toml", request_id)))
    }

    fn load_all(dir: &Path) -> Result<Vec<TagRequest>> {
        let mut requests = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_record = path.extension().is_some_and(|ext| ext == "toml")
                && !path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with('.'));
            if !is_record {
                continue;
            }
            match AtomicTomlFile::<TagRequest>::new(path.clone()).load() {
                Ok(Some(request)) => requests.push(request),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Skipping unreadable tag request {}: {}", path.display(), e);
                }
            }
        }
        Ok(requests)
    }

    async fn scan(&self) -> Result<Vec<TagRequest>> {
        let dir = self.requests_dir.clone();
        tokio::task::spawn_blocking(move || Self::load_all(&dir))
            .await
            .map_err(|e| VanityError::internal(format!("tag request scan failed: {}", e)))?
    }
}

#[async_trait::async_trait]
impl TagRequestRepository for TomlTagRequestRepository {
    async fn find_by_id(&self, request_id: Uuid) -> Result<Option<TagRequest>> {
        let file = self.file(request_id);
        tokio::task::spawn_blocking(move || file.load().map_err(VanityError::from))
            .await
            .map_err(|e| VanityError::internal(format!("tag request load failed: {}", e)))?
    }

    async fn save(&self, request: &TagRequest) -> Result<()> {
        let file = self.file(request.id);
        let request = request.clone();
        tokio::task::spawn_blocking(move || file.save(&request).map_err(VanityError::from))
            .await
            .map_err(|e| VanityError::internal(format!("tag request save failed: {}", e)))?
    }

    async fn transition(&self, request: &TagRequest, expected: TagRequestStatus) -> Result<bool> {
        let file = self.file(request.id);
        let request = request.clone();
        tokio::task::spawn_blocking(move || {
            file.replace_if(&request, |current| {
                current.is_some_and(|stored| stored.status == expected)
            })
            .map_err(VanityError::from)
        })
        .await
        .map_err(|e| VanityError::internal(format!("tag request transition failed: {}", e)))?
    }

    async fn list_pending(&self) -> Result<Vec<TagRequest>> {
        let mut pending: Vec<TagRequest> = self
            .scan()
            .await?
            .into_iter()
            .filter(|r| r.is_pending())
            .collect();
        pending.sort_by_key(|r| r.requested_at);
        Ok(pending)
    }

    async fn list_by_player(&self, player_id: Uuid) -> Result<Vec<TagRequest>> {
        let mut requests: Vec<TagRequest> = self
            .scan()
            .await?
            .into_iter()
            .filter(|r| r.player_id == player_id)
            .collect();
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }
}
