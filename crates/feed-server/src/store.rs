use feed_core::entity::CatalogEntity;
use feed_core::entity_link::EntityLink;
use feed_core::feed::{sort_newest_first, Thread};
use feed_core::filter::{encode_cursor, ListQuery};
use feed_core::guard;
use feed_core::incident::{self, IncidentPage, Paging, ResolutionStatus};
use feed_core::patch::{self, PatchOp};
use feed_core::permission::{require, PermissionGate, PolicyEngine};
use feed_core::reaction::Reaction;
use feed_core::reconcile;
use feed_core::reference::ActorRef;
use feed_core::suggestion::SuggestedValue;
use feed_core::task::{self, TaskCount, CLOSE_WITHOUT_COMMENT};
use feed_core::types::{FeedFilter, Operation};
use feed_core::wire::{CreateThread, FeedQuery, ResolvedTask, SearchHit, SearchIndex};
use feed_core::{FeedError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// Initial contents of the store, loaded from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<ActorRef>,
    #[serde(default)]
    pub teams: Vec<ActorRef>,
    #[serde(default)]
    pub entities: Vec<CatalogEntity>,
    #[serde(default)]
    pub threads: Vec<Thread>,
    #[serde(default)]
    pub incidents: Vec<ResolutionStatus>,
    #[serde(default)]
    pub policy: PolicyEngine,
}

impl Seed {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let seed: Seed = serde_yaml::from_str(&data)?;
        Ok(seed)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Store {
    users: Vec<ActorRef>,
    teams: Vec<ActorRef>,
    entities: Vec<CatalogEntity>,
    threads: Vec<Thread>,
    incidents: Vec<ResolutionStatus>,
    next_task_id: u64,
}

fn is_assigned(thread: &Thread, user: &str) -> bool {
    thread
        .task
        .as_ref()
        .is_some_and(|t| t.assignees.iter().any(|a| a.name == user))
}

fn user_matches(q: &FeedQuery, thread: &Thread) -> bool {
    let Some(user) = q.user_id.as_deref() else {
        return true;
    };
    match q.filter_type {
        Some(FeedFilter::Owner) => is_assigned(thread, user),
        Some(FeedFilter::AssignedBy) => thread.created_by == user,
        Some(FeedFilter::Mentions) => thread.mentions(user),
        None => is_assigned(thread, user) || thread.created_by == user || thread.mentions(user),
    }
}

/// An entity link matches its own columns; a column link matches only that
/// column.
fn about_matches(link: &EntityLink, about: &EntityLink) -> bool {
    if link.is_column() {
        link.key() == about.key()
    } else {
        link.contains(about)
    }
}

fn search_matches(query: &str, fields: &[&str]) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() || q == "*" {
        return true;
    }
    fields.iter().any(|f| f.to_lowercase().contains(&q))
}

impl Store {
    pub fn from_seed(seed: Seed) -> Self {
        let next_task_id = seed
            .threads
            .iter()
            .filter_map(|t| t.task.as_ref().map(|task| task.id))
            .max()
            .unwrap_or(0);
        Self {
            users: seed.users,
            teams: seed.teams,
            entities: seed.entities,
            threads: seed.threads,
            incidents: seed.incidents,
            next_task_id,
        }
    }

    /// The known user with this login, or a bare reference to it.
    pub fn actor(&self, name: &str) -> ActorRef {
        self.users
            .iter()
            .find(|u| u.name == name)
            .cloned()
            .unwrap_or_else(|| ActorRef::user(name))
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    pub fn entity(&self, fqn: &str) -> Result<&CatalogEntity> {
        self.entities
            .iter()
            .find(|e| e.fully_qualified_name == fqn)
            .ok_or_else(|| FeedError::EntityNotFound(fqn.to_string()))
    }

    fn entity_mut(&mut self, fqn: &str) -> Result<&mut CatalogEntity> {
        self.entities
            .iter_mut()
            .find(|e| e.fully_qualified_name == fqn)
            .ok_or_else(|| FeedError::EntityNotFound(fqn.to_string()))
    }

    // -----------------------------------------------------------------------
    // Feed
    // -----------------------------------------------------------------------

    pub fn list_threads(&self, q: &FeedQuery) -> Result<Vec<Thread>> {
        let link = q.entity_link.as_deref().map(EntityLink::parse).transpose()?;
        let mut out: Vec<Thread> = self
            .threads
            .iter()
            .filter(|t| q.thread_type.map_or(true, |ty| t.thread_type == ty))
            .filter(|t| {
                q.task_status
                    .map_or(true, |s| t.task.as_ref().is_some_and(|task| task.status == s))
            })
            .filter(|t| link.as_ref().map_or(true, |l| about_matches(l, &t.about)))
            .filter(|t| user_matches(q, t))
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        Ok(out)
    }

    pub fn count(&self, link: Option<&EntityLink>) -> TaskCount {
        TaskCount::of(
            self.threads
                .iter()
                .filter(|t| link.map_or(true, |l| about_matches(l, &t.about))),
        )
    }

    pub fn thread(&self, id: Uuid) -> Result<&Thread> {
        self.threads
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| FeedError::ThreadNotFound(id.to_string()))
    }

    fn thread_mut(&mut self, id: Uuid) -> Result<&mut Thread> {
        self.threads
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| FeedError::ThreadNotFound(id.to_string()))
    }

    pub fn create_thread(&mut self, body: CreateThread, by: &str, now: i64) -> Result<Thread> {
        let thread = match body {
            CreateThread::Conversation { about, message } => {
                if !guard::can_submit_comment(&message) {
                    return Err(FeedError::Validation("message is empty".to_string()));
                }
                self.entity(&about.entity_fqn)?;
                Thread::conversation(about, message, by, now)
            }
            CreateThread::Task(new_task) => {
                new_task.validate()?;
                let entity = self.entity(&new_task.about.entity_fqn)?;
                if let Some(column) = &new_task.about.column {
                    if entity.column(column).is_none() {
                        return Err(FeedError::Validation(format!(
                            "{} has no column '{column}'",
                            entity.fully_qualified_name
                        )));
                    }
                }
                self.next_task_id += 1;
                new_task.into_thread(self.next_task_id, by, now)
            }
        };
        self.threads.push(thread.clone());
        Ok(thread)
    }

    pub fn add_post(&mut self, id: Uuid, from: &str, message: &str, now: i64) -> Result<Thread> {
        if !guard::can_submit_comment(message) {
            return Err(FeedError::Validation("reply is empty".to_string()));
        }
        let thread = self.thread_mut(id)?;
        thread.add_post(from, message, now);
        Ok(thread.clone())
    }

    pub fn delete_post(&mut self, id: Uuid, post_id: Uuid, actor: &str) -> Result<Thread> {
        let thread = self.thread_mut(id)?;
        thread.delete_post(post_id, actor)?;
        Ok(thread.clone())
    }

    /// Apply a JSON patch to a thread. Only the actor's own reactions may
    /// change.
    pub fn patch_thread(
        &mut self,
        id: Uuid,
        ops: &[PatchOp],
        actor: &ActorRef,
        now: i64,
    ) -> Result<Thread> {
        let thread = self.thread_mut(id)?;
        let mut doc = serde_json::to_value(&*thread)?;
        patch::apply(&mut doc, ops)?;
        let patched: Thread = serde_json::from_value(doc)?;

        let mut expected = thread.clone();
        expected.reactions = patched.reactions.clone();
        if expected != patched {
            return Err(FeedError::Validation(
                "only reactions can be patched on a thread".to_string(),
            ));
        }
        let changed = |a: &[Reaction], b: &[Reaction]| -> bool {
            a.iter()
                .filter(|r| !b.contains(r))
                .any(|r| !r.user.is_same(actor))
        };
        if changed(&thread.reactions, &patched.reactions)
            || changed(&patched.reactions, &thread.reactions)
        {
            return Err(FeedError::Policy(
                "Reactions can only be changed by the user who added them".to_string(),
            ));
        }

        thread.reactions = patched.reactions;
        thread.updated_at = now;
        Ok(thread.clone())
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub fn task(&self, task_id: u64) -> Result<&Thread> {
        task::find_by_task_id(&self.threads, task_id).ok_or(FeedError::TaskNotFound(task_id))
    }

    /// Accept the task's suggestion and merge it into the entity. Nothing is
    /// written unless every step succeeds.
    pub fn resolve_task<G: PermissionGate + ?Sized>(
        &mut self,
        task_id: u64,
        actor: &ActorRef,
        gate: &G,
        new_value: Option<SuggestedValue>,
        now: i64,
    ) -> Result<ResolvedTask> {
        let thread = self.task(task_id)?;
        let operation = thread
            .task
            .as_ref()
            .map(|t| t.task_type.edit_operation())
            .unwrap_or(Operation::EditAll);
        require(gate, actor, operation, &thread.about)?;

        let mut updated = thread.clone();
        let suggestion = task::resolve(&mut updated, &actor.name, new_value, now)?;
        let fqn = updated.about.entity_fqn.clone();
        let mut entity = self.entity(&fqn)?.clone();
        if reconcile::apply(&mut entity, &suggestion)?.changed {
            entity.bump_version();
        }

        *self.entity_mut(&fqn)? = entity.clone();
        *task::find_by_task_id_mut(&mut self.threads, task_id)? = updated.clone();
        Ok(ResolvedTask {
            thread: updated,
            entity,
        })
    }

    pub fn close_task<G: PermissionGate + ?Sized>(
        &mut self,
        task_id: u64,
        actor: &ActorRef,
        gate: &G,
        comment: &str,
        now: i64,
    ) -> Result<Thread> {
        if !guard::can_submit_comment(comment) {
            return Err(FeedError::Policy(CLOSE_WITHOUT_COMMENT.to_string()));
        }
        let thread = self.task(task_id)?;
        let operation = thread
            .task
            .as_ref()
            .map(|t| t.task_type.edit_operation())
            .unwrap_or(Operation::EditAll);
        require(gate, actor, operation, &thread.about)?;

        let thread = task::find_by_task_id_mut(&mut self.threads, task_id)?;
        task::close(thread, &actor.name, comment, now)?;
        Ok(thread.clone())
    }

    // -----------------------------------------------------------------------
    // Incidents
    // -----------------------------------------------------------------------

    pub fn list_incidents(&self, q: &ListQuery) -> Result<IncidentPage> {
        let start = q.start()?;
        let rows: Vec<ResolutionStatus> = if q.latest {
            incident::latest_per_test_case(&self.incidents)
        } else {
            let mut all = self.incidents.clone();
            all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            all
        };
        let rows: Vec<ResolutionStatus> = rows.into_iter().filter(|r| q.filter.matches(r)).collect();

        let limit = q.limit.max(1);
        let total = rows.len();
        let start = start.min(total);
        let end = (start + limit).min(total);
        let paging = Paging {
            before: (start > 0).then(|| encode_cursor(start.saturating_sub(limit))),
            after: (end < total).then(|| encode_cursor(end)),
            total,
        };
        Ok(IncidentPage {
            data: rows[start..end].to_vec(),
            paging,
        })
    }

    pub fn patch_incident<G: PermissionGate + ?Sized>(
        &mut self,
        id: Uuid,
        ops: &[PatchOp],
        actor: &ActorRef,
        gate: &G,
        now: i64,
    ) -> Result<ResolutionStatus> {
        let pos = self
            .incidents
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| FeedError::IncidentNotFound(id.to_string()))?;
        let record = &self.incidents[pos];
        let link = EntityLink::entity("testCase", record.test_case_reference.fqn());
        require(gate, actor, Operation::EditTests, &link)?;

        let mut updated = incident::apply_patch(record, ops)?;
        updated.updated_at = now;
        updated.updated_by = Some(actor.name.clone());
        self.incidents[pos] = updated.clone();
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    pub fn search(&self, query: &str, index: SearchIndex) -> Vec<SearchHit> {
        let actor_hit = |a: &ActorRef| SearchHit {
            name: a.name.clone(),
            display_name: a.display_name.clone(),
            fully_qualified_name: a.name.clone(),
            entity_type: a.actor_type.to_string(),
        };
        match index {
            SearchIndex::User => self
                .users
                .iter()
                .filter(|u| search_matches(query, &[&u.name, u.label()]))
                .map(actor_hit)
                .collect(),
            SearchIndex::Team => self
                .teams
                .iter()
                .filter(|t| search_matches(query, &[&t.name, t.label()]))
                .map(actor_hit)
                .collect(),
            SearchIndex::Table => self
                .entities
                .iter()
                .filter(|e| search_matches(query, &[&e.name, &e.fully_qualified_name]))
                .map(|e| SearchHit {
                    name: e.name.clone(),
                    display_name: None,
                    fully_qualified_name: e.fully_qualified_name.clone(),
                    entity_type: e.entity_type.clone(),
                })
                .collect(),
            SearchIndex::TestCase => {
                let mut hits: Vec<SearchHit> = Vec::new();
                for r in &self.incidents {
                    let tc = &r.test_case_reference;
                    if hits.iter().any(|h| h.fully_qualified_name == tc.fqn()) {
                        continue;
                    }
                    if search_matches(query, &[&tc.name, tc.fqn(), tc.label()]) {
                        hits.push(SearchHit {
                            name: tc.name.clone(),
                            display_name: tc.display_name.clone(),
                            fully_qualified_name: tc.fqn().to_string(),
                            entity_type: tc.entity_type.clone(),
                        });
                    }
                }
                hits
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use feed_core::entity::Column;
    use feed_core::filter::IncidentFilter;
    use feed_core::permission::AllowAll;
    use feed_core::reference::EntityRef;
    use feed_core::task::NewTask;
    use feed_core::types::{ResolutionStatusType, Severity, TaskStatus, TaskType};

    const FQN: &str = "svc.db.schema.orders";

    fn store() -> Store {
        Store::from_seed(Seed {
            users: vec![ActorRef::user("admin"), ActorRef::user("user1")],
            entities: vec![CatalogEntity::table(FQN, vec![Column::new("id")])],
            ..Seed::default()
        })
    }

    fn request(store: &mut Store, task_type: TaskType, value: SuggestedValue) -> Thread {
        let task = NewTask::new(task_type, &format!("<#E::table::{FQN}>"), vec![ActorRef::user("user1")])
            .unwrap()
            .with_suggestion(value)
            .unwrap();
        store.create_thread(CreateThread::Task(task), "admin", 10).unwrap()
    }

    #[test]
    fn task_ids_increase() {
        let mut s = store();
        let a = request(&mut s, TaskType::RequestDescription, SuggestedValue::Description("a".into()));
        let b = request(&mut s, TaskType::RequestDescription, SuggestedValue::Description("b".into()));
        assert_eq!(a.task.unwrap().id + 1, b.task.unwrap().id);
    }

    #[test]
    fn task_on_unknown_entity_is_rejected() {
        let mut s = store();
        let task = NewTask::new(TaskType::RequestTag, "<#E::table::nope>", vec![ActorRef::user("u")]).unwrap();
        assert!(matches!(
            s.create_thread(CreateThread::Task(task), "admin", 1),
            Err(FeedError::EntityNotFound(_))
        ));
    }

    #[test]
    fn resolve_merges_and_bumps_version() {
        let mut s = store();
        let t = request(&mut s, TaskType::RequestDescription, SuggestedValue::Description("Orders".into()));
        let id = t.task.unwrap().id;
        let user1 = s.actor("user1");
        let resolved = s.resolve_task(id, &user1, &AllowAll, None, 20).unwrap();
        assert_eq!(resolved.entity.description.as_deref(), Some("Orders"));
        assert!((resolved.entity.version - 0.2).abs() < 1e-9);
        assert_eq!(resolved.thread.task.unwrap().status, TaskStatus::Closed);
        assert_eq!(s.count(None), TaskCount { open: 0, closed: 1 });
    }

    #[test]
    fn close_without_comment_is_policy() {
        let mut s = store();
        let t = request(&mut s, TaskType::RequestTag, SuggestedValue::TagLabels(vec![]));
        let id = t.task.unwrap().id;
        let admin = s.actor("admin");
        assert!(matches!(
            s.close_task(id, &admin, &AllowAll, "  ", 20),
            Err(FeedError::Policy(_))
        ));
        assert_eq!(s.count(None), TaskCount { open: 1, closed: 0 });
    }

    #[test]
    fn feed_filters() {
        let mut s = store();
        let t = request(&mut s, TaskType::RequestTag, SuggestedValue::TagLabels(vec![]));
        s.add_post(t.id, "admin", "ping @aaron.warren5", 11).unwrap();

        let owner = FeedQuery::tasks_for_user("user1", FeedFilter::Owner, TaskStatus::Open);
        assert_eq!(s.list_threads(&owner).unwrap().len(), 1);
        let by = FeedQuery::tasks_for_user("admin", FeedFilter::AssignedBy, TaskStatus::Open);
        assert_eq!(s.list_threads(&by).unwrap().len(), 1);
        let mentions = FeedQuery::tasks_for_user("aaron.warren5", FeedFilter::Mentions, TaskStatus::Open);
        assert_eq!(s.list_threads(&mentions).unwrap().len(), 1);
        let closed = FeedQuery::tasks_for_user("user1", FeedFilter::Owner, TaskStatus::Closed);
        assert!(s.list_threads(&closed).unwrap().is_empty());
    }

    #[test]
    fn mentions_filter_ignores_longer_names() {
        let mut s = store();
        let t = request(&mut s, TaskType::RequestTag, SuggestedValue::TagLabels(vec![]));
        s.add_post(t.id, "admin", "cc @user10", 11).unwrap();

        let user1 = FeedQuery::tasks_for_user("user1", FeedFilter::Mentions, TaskStatus::Open);
        assert!(s.list_threads(&user1).unwrap().is_empty());
        let user10 = FeedQuery::tasks_for_user("user10", FeedFilter::Mentions, TaskStatus::Open);
        assert_eq!(s.list_threads(&user10).unwrap().len(), 1);
    }

    #[test]
    fn column_link_narrows_feed() {
        let mut s = store();
        request(&mut s, TaskType::RequestTag, SuggestedValue::TagLabels(vec![]));
        let column = EntityLink::table_column(FQN, "id", "tags");
        let q = FeedQuery::tasks_about(&column, TaskStatus::Open);
        assert!(s.list_threads(&q).unwrap().is_empty());
        let q = FeedQuery::tasks_about(&EntityLink::table(FQN), TaskStatus::Open);
        assert_eq!(s.list_threads(&q).unwrap().len(), 1);
    }

    #[test]
    fn reactions_patch_limited_to_actor() {
        let mut s = store();
        let t = request(&mut s, TaskType::RequestTag, SuggestedValue::TagLabels(vec![]));
        let admin = s.actor("admin");
        let before = serde_json::to_value(&t).unwrap();

        let mut mine = t.clone();
        feed_core::reaction::toggle(&mut mine.reactions, feed_core::reaction::ReactionType::Heart, &admin);
        let ops = patch::diff(&before, &serde_json::to_value(&mine).unwrap());
        let patched = s.patch_thread(t.id, &ops, &admin, 12).unwrap();
        assert_eq!(patched.reactions.len(), 1);

        let other = s.actor("user1");
        let after = serde_json::to_value(&patched).unwrap();
        let mut cleared = patched.clone();
        cleared.reactions.clear();
        let ops = patch::diff(&after, &serde_json::to_value(&cleared).unwrap());
        assert!(matches!(
            s.patch_thread(t.id, &ops, &other, 13),
            Err(FeedError::Policy(_))
        ));

        let mut renamed = patched.clone();
        renamed.message = "changed".into();
        let ops = patch::diff(&after, &serde_json::to_value(&renamed).unwrap());
        assert!(matches!(
            s.patch_thread(t.id, &ops, &admin, 14),
            Err(FeedError::Validation(_))
        ));
    }

    #[test]
    fn incident_pages_chain_through_cursors() {
        let mut s = store();
        for i in 0..5 {
            s.incidents.push(ResolutionStatus::new_incident(
                EntityRef::test_case(format!("{FQN}.tc{i}")),
                100 + i,
            ));
        }
        let filter = IncidentFilter::between(0, 1_000).unwrap();
        let first = s.list_incidents(&ListQuery::latest(filter.clone(), 2)).unwrap();
        assert_eq!(first.data.len(), 2);
        assert_eq!(first.paging.total, 5);
        assert!(first.paging.before.is_none());

        let mut q = ListQuery::latest(filter.clone(), 2);
        q.after = first.paging.after.clone();
        let second = s.list_incidents(&q).unwrap();
        assert_ne!(second.data[0].id, first.data[0].id);

        let mut back = ListQuery::latest(filter, 2);
        back.before = second.paging.before.clone();
        assert_eq!(s.list_incidents(&back).unwrap().data, first.data);
    }

    #[test]
    fn incident_patch_records_author() {
        let mut s = store();
        let rec = ResolutionStatus::new_incident(EntityRef::test_case(format!("{FQN}.tc")), 100);
        let id = rec.id;
        s.incidents.push(rec.clone());
        let mut updated = rec.clone();
        updated.severity = Some(Severity::Severity1);
        let ops = incident::patch_for(&rec, &updated).unwrap();
        let admin = s.actor("admin");
        let out = s.patch_incident(id, &ops, &admin, &AllowAll, 200).unwrap();
        assert_eq!(out.severity, Some(Severity::Severity1));
        assert_eq!(out.updated_by.as_deref(), Some("admin"));
        assert_eq!(out.test_case_resolution_status_type, ResolutionStatusType::New);
    }

    #[test]
    fn search_by_index() {
        let s = store();
        assert_eq!(s.search("user", SearchIndex::User).len(), 1);
        assert_eq!(s.search("*", SearchIndex::User).len(), 2);
        assert_eq!(s.search("orders", SearchIndex::Table).len(), 1);
        assert!(s.search("x", SearchIndex::Team).is_empty());
    }
}
