//! crates/study_planner_core/src/plans.rs
//!
//! The session-scoped plan list and the search filter used by the main view.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::StudyPlanItem;
use crate::ports::{PlanRepository, PortError, PortResult};

/// Holds the study plans for the running session. Persistence is explicit,
/// through a [`crate::ports::PlanArchive`].
#[derive(Default)]
pub struct InMemoryPlanRepository {
    items: RwLock<Vec<StudyPlanItem>>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn get_all(&self) -> PortResult<Vec<StudyPlanItem>> {
        Ok(self.items.read().await.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> PortResult<Option<StudyPlanItem>> {
        Ok(self.items.read().await.iter().find(|i| i.id == id).cloned())
    }

    async fn add(&self, mut item: StudyPlanItem) -> PortResult<StudyPlanItem> {
        let mut items = self.items.write().await;
        if items.iter().any(|i| i.id == item.id) {
            return Err(PortError::Conflict(format!(
                "Study plan {} already exists",
                item.id
            )));
        }
        let now = Utc::now();
        item.created_at = now;
        item.modified_at = now;
        items.push(item.clone());
        Ok(item)
    }

    async fn update(&self, mut item: StudyPlanItem) -> PortResult<StudyPlanItem> {
        let mut items = self.items.write().await;
        let slot = items
            .iter_mut()
            .find(|i| i.id == item.id)
            .ok_or_else(|| PortError::NotFound(format!("Study plan {} not found", item.id)))?;
        item.created_at = slot.created_at;
        item.touch();
        *slot = item.clone();
        Ok(item)
    }

    async fn delete(&self, id: Uuid) -> PortResult<bool> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|i| i.id != id);
        Ok(items.len() < before)
    }

    async fn find(
        &self,
        predicate: &(dyn for<'a> Fn(&'a StudyPlanItem) -> bool + Send + Sync),
    ) -> PortResult<Vec<StudyPlanItem>> {
        Ok(self
            .items
            .read()
            .await
            .iter()
            .filter(|i| predicate(*i))
            .cloned()
            .collect())
    }

    async fn count(&self) -> PortResult<usize> {
        Ok(self.items.read().await.len())
    }

    async fn clear(&self) -> PortResult<()> {
        self.items.write().await.clear();
        Ok(())
    }

    /// Bulk insert for loaded files: timestamps are kept as stored. Nothing is
    /// added when any id clashes.
    async fn add_range(&self, new_items: Vec<StudyPlanItem>) -> PortResult<()> {
        let mut items = self.items.write().await;
        ensure_unique_ids(items.iter().chain(new_items.iter()))?;
        items.extend(new_items);
        Ok(())
    }

    /// Swaps the whole list under one write lock. On a duplicate id the current
    /// list is left untouched.
    async fn replace_all(&self, new_items: Vec<StudyPlanItem>) -> PortResult<()> {
        ensure_unique_ids(new_items.iter())?;
        *self.items.write().await = new_items;
        Ok(())
    }
}

fn ensure_unique_ids<'a>(items: impl Iterator<Item = &'a StudyPlanItem>) -> PortResult<()> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.id) {
            return Err(PortError::Conflict(format!(
                "Study plan {} already exists",
                item.id
            )));
        }
    }
    Ok(())
}

//=========================================================================================
// Filtering
//=========================================================================================

/// Search box + "completed only" toggle of the plan list.
#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    pub search: Option<String>,
    pub completed_only: bool,
}

impl PlanFilter {
    pub fn matches(&self, item: &StudyPlanItem) -> bool {
        if self.completed_only && !item.is_completed {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                [&item.subject, &item.notes, &item.category]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }

    /// Matching items, most recent date first.
    pub fn apply(&self, items: Vec<StudyPlanItem>) -> Vec<StudyPlanItem> {
        let mut matched: Vec<_> = items.into_iter().filter(|i| self.matches(i)).collect();
        matched.sort_by(|a, b| b.date.cmp(&a.date));
        matched
    }
}
