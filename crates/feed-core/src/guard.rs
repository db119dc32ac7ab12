//! Precondition predicates.
//!
//! Interactive callers disable an action while its predicate is false
//! instead of submitting and reporting an error. The engine checks the same
//! predicates before issuing a request.

use crate::entity_link::EntityLink;
use crate::feed::Thread;
use crate::reference::ActorRef;
use crate::task::TaskState;

/// A reply or comment needs non-blank text.
pub fn can_submit_comment(body: &str) -> bool {
    !body.trim().is_empty()
}

/// Close is offered only on an open task and only once a comment is typed.
pub fn can_close(thread: &Thread, comment: &str) -> bool {
    matches!(TaskState::of(thread), Some(TaskState::Open { .. })) && can_submit_comment(comment)
}

/// Mirrors the checks `NewTask::new` performs.
pub fn can_create_task(about: &str, assignees: &[ActorRef]) -> bool {
    EntityLink::parse(about).is_ok() && !assignees.is_empty()
}

/// Accept needs an open task carrying a pending suggestion.
pub fn can_accept(thread: &Thread) -> bool {
    let Some(task) = thread.task.as_ref() else {
        return false;
    };
    matches!(TaskState::of(thread), Some(TaskState::Open { .. }))
        && task.suggestion.as_ref().is_some_and(|s| s.is_pending())
}

/// Reject is offered on any open task.
pub fn can_reject(thread: &Thread) -> bool {
    TaskState::of(thread).is_some_and(TaskState::is_open)
}
