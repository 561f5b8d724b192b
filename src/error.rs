//! Error taxonomy for board operations.
//!
//! Validation and transition failures are recoverable and surfaced to the
//! user. Store failures are passed through untouched.

use crate::types::{Issue, Status};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IssueError {
    /// A required creation field was empty or missing.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The lifecycle forbids this status change.
    #[error("Invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: Status, to: Status },

    /// Failure reported by the store collaborator.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl IssueError {
    /// Message suitable for showing directly to the user
    pub fn user_message(&self) -> String {
        match self {
            IssueError::InvalidTransition {
                from: Status::Open,
                to: Status::Done,
                ..
            } => "Please move issue to In Progress before marking it Done.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IssueError>;

/// Result of a create request that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Issue),
    /// The caller declined to create past a duplicate warning. Nothing was written.
    Cancelled { similar_titles: Vec<String> },
}

impl CreateOutcome {
    pub fn created(&self) -> Option<&Issue> {
        match self {
            CreateOutcome::Created(issue) => Some(issue),
            CreateOutcome::Cancelled { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CreateOutcome::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_to_done_user_message() {
        let err = IssueError::InvalidTransition {
            id: "sd-1".to_string(),
            from: Status::Open,
            to: Status::Done,
        };
        assert_eq!(
            err.user_message(),
            "Please move issue to In Progress before marking it Done."
        );
        assert_eq!(
            err.to_string(),
            "Invalid status transition for sd-1: Open -> Done"
        );
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: IssueError = anyhow::anyhow!("connection refused").into();
        assert_eq!(err.to_string(), "connection refused");
        assert!(matches!(err, IssueError::Store(_)));
    }
}
