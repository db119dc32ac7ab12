use crate::entity::CatalogEntity;
use crate::error::Result;
use crate::feed::{sort_newest_first, Thread};
use crate::reconcile::{self, Applied};
use crate::suggestion::Suggestion;
use crate::task::TaskCount;

/// Client-side view of one entity and its task list.
///
/// Every write to the cached state goes through a method here, and each one
/// takes data the server already confirmed.
#[derive(Debug, Clone)]
pub struct EntityCache {
    entity: CatalogEntity,
    tasks: Vec<Thread>,
    counts: TaskCount,
}

impl EntityCache {
    pub fn new(entity: CatalogEntity) -> Self {
        Self {
            entity,
            tasks: Vec::new(),
            counts: TaskCount::default(),
        }
    }

    pub fn entity(&self) -> &CatalogEntity {
        &self.entity
    }

    pub fn tasks(&self) -> &[Thread] {
        &self.tasks
    }

    pub fn counts(&self) -> TaskCount {
        self.counts
    }

    pub fn task(&self, task_id: u64) -> Option<&Thread> {
        crate::task::find_by_task_id(&self.tasks, task_id)
    }

    /// Replace the entity with a server snapshot. An older version than the
    /// cached one is ignored.
    pub fn replace_entity(&mut self, snapshot: CatalogEntity) -> bool {
        if snapshot.version < self.entity.version {
            return false;
        }
        self.entity = snapshot;
        true
    }

    /// Replace the task list and counters after a refresh.
    pub fn set_tasks(&mut self, mut tasks: Vec<Thread>, counts: TaskCount) {
        sort_newest_first(&mut tasks);
        self.tasks = tasks;
        self.counts = counts;
    }

    /// Insert or replace one thread by id, keeping newest-first order.
    pub fn upsert_thread(&mut self, thread: Thread) {
        match self.tasks.iter_mut().find(|t| t.id == thread.id) {
            Some(existing) => *existing = thread,
            None => {
                self.tasks.push(thread);
                sort_newest_first(&mut self.tasks);
            }
        }
    }

    /// Suggestions attached to the cached tasks.
    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.tasks
            .iter()
            .filter_map(|t| t.task.as_ref()?.suggestion.clone())
            .collect()
    }

    /// Merge an accepted suggestion into the cached entity.
    pub fn merge_accepted(&mut self, suggestion: &Suggestion) -> Result<Applied> {
        reconcile::apply(&mut self.entity, suggestion)
    }
}
