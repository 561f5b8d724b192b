//! Status lifecycle.
//!
//! ```text
//! Open ⇄ In Progress ⇄ Done
//!  └──────────────────↗ (forbidden)
//! ```
//!
//! Every transition is allowed except `Open -> Done`. Self-transitions are
//! no-ops and allowed; `Done` is not terminal.

use crate::error::IssueError;
use crate::types::{Issue, Status};

impl Status {
    /// Valid next states from the current state
    pub const fn allowed_next_states(self) -> &'static [Status] {
        match self {
            Status::Open => &[Status::Open, Status::InProgress],
            Status::InProgress => &[Status::Open, Status::InProgress, Status::Done],
            Status::Done => &[Status::Open, Status::InProgress, Status::Done],
        }
    }

    /// Check whether transitioning to `next` is allowed
    pub fn can_transition_to(self, next: Status) -> bool {
        self.allowed_next_states().contains(&next)
    }
}

pub fn can_transition(current: Status, requested: Status) -> bool {
    current.can_transition_to(requested)
}

/// Validate a status change for `issue` and return the status to persist.
///
/// The issue itself is never modified here.
pub fn apply_transition(issue: &Issue, requested: Status) -> Result<Status, IssueError> {
    if can_transition(issue.status, requested) {
        Ok(requested)
    } else {
        Err(IssueError::InvalidTransition {
            id: issue.id.clone(),
            from: issue.status,
            to: requested,
        })
    }
}
