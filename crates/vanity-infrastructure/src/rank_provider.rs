//! A rank provider backed by an in-process assignment table.

use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;
use vanity_core::rank::RankProvider;

/// Answers rank lookups from a table, falling back to a default rank.
///
/// Hosts without an external permission system (and tests) assign ranks
/// directly with [`StaticRankProvider::set_rank`].
#[derive(Debug)]
pub struct StaticRankProvider {
    default_rank: String,
    assignments: RwLock<HashMap<Uuid, String>>,
}

impl StaticRankProvider {
    pub fn new(default_rank: impl Into<String>) -> Self {
        Self {
            default_rank: default_rank.into(),
            assignments: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_rank(&self, player_id: Uuid, rank: impl Into<String>) {
        let mut assignments = self.assignments.write().unwrap_or_else(|e| e.into_inner());
        assignments.insert(player_id, rank.into());
    }

    pub fn clear_rank(&self, player_id: Uuid) {
        let mut assignments = self.assignments.write().unwrap_or_else(|e| e.into_inner());
        assignments.remove(&player_id);
    }
}

impl RankProvider for StaticRankProvider {
    fn primary_rank(&self, player_id: Uuid) -> String {
        let assignments = self.assignments.read().unwrap_or_else(|e| e.into_inner());
        assignments
            .get(&player_id)
            .cloned()
            .unwrap_or_else(|| self.default_rank.clone())
    }
}
