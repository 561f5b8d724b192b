//! Issue service: create, change status, list.
//!
//! Each operation works on a snapshot fetched at its start. No state is
//! written before the final store call of an operation.

use crate::duplicate::find_similar;
use crate::error::{CreateOutcome, IssueError, Result};
use crate::lifecycle::apply_transition;
use crate::query::{sort_newest_first, visible_issues};
use crate::store::IssueStore;
use crate::types::{Actor, FilterSelection, Issue, IssueDraft, NewIssue, Stats, Status};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

/// Decision point asked whether to create an issue despite similar titles.
///
/// Returning `false` aborts the creation with nothing written.
pub trait DuplicateConfirmer {
    fn confirm_duplicates(&mut self, candidate_title: &str, similar: &[&Issue]) -> bool;
}

impl<F> DuplicateConfirmer for F
where
    F: FnMut(&str, &[&Issue]) -> bool,
{
    fn confirm_duplicates(&mut self, candidate_title: &str, similar: &[&Issue]) -> bool {
        self(candidate_title, similar)
    }
}

/// Confirmer that always gives the same answer
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl DuplicateConfirmer for FixedAnswer {
    fn confirm_duplicates(&mut self, _candidate_title: &str, _similar: &[&Issue]) -> bool {
        self.0
    }
}

pub struct IssueService<S> {
    store: S,
}

impl<S: IssueStore> IssueService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create an issue on behalf of `actor`.
    ///
    /// Fails with [`IssueError::Validation`] before touching the store when
    /// the title, description or priority is missing. When existing titles
    /// contain the new title, `confirmer` decides whether to go ahead.
    pub fn create<C>(
        &self,
        draft: IssueDraft,
        actor: &Actor,
        confirmer: &mut C,
    ) -> Result<CreateOutcome>
    where
        C: DuplicateConfirmer + ?Sized,
    {
        let title = draft.title.trim();
        let description = draft.description.trim();
        let priority = match draft.priority {
            Some(priority) if !title.is_empty() && !description.is_empty() => priority,
            _ => {
                return Err(IssueError::Validation(
                    "Title, description and priority are required".to_string(),
                ))
            }
        };

        let existing = self.store.fetch_all_issues()?;
        debug!(existing = existing.len(), "fetched snapshot for create");

        let similar = find_similar(title, &existing);
        if !similar.is_empty() {
            warn!(title, matches = similar.len(), "similar issues found");
            if !confirmer.confirm_duplicates(title, &similar) {
                warn!(title, "creation cancelled at duplicate warning");
                return Ok(CreateOutcome::Cancelled {
                    similar_titles: similar.iter().map(|i| i.title.clone()).collect(),
                });
            }
        }

        let assigned_to = draft
            .assigned_to
            .as_deref()
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .unwrap_or(actor.as_str())
            .to_string();

        let record = NewIssue {
            title: title.to_string(),
            description: description.to_string(),
            priority,
            status: Status::Open,
            assigned_to,
            created_by: actor.to_string(),
            created_at: next_created_at(&existing),
        };

        let issue = self.store.insert_issue(record)?;
        info!(id = %issue.id, title = %issue.title, priority = %issue.priority, "created issue");
        Ok(CreateOutcome::Created(issue))
    }

    /// Move `issue` to `requested`, returning the updated copy.
    ///
    /// On [`IssueError::InvalidTransition`] the store is not called.
    pub fn change_status(&self, issue: &Issue, requested: Status) -> Result<Issue> {
        let status = apply_transition(issue, requested).map_err(|err| {
            warn!(id = %issue.id, from = %issue.status, to = %requested, "rejected status change");
            err
        })?;

        self.store.update_issue_status(&issue.id, status)?;
        info!(id = %issue.id, from = %issue.status, to = %status, "status changed");

        Ok(Issue {
            status,
            ..issue.clone()
        })
    }

    /// Visible issues for `filter`, newest first
    pub fn list(&self, filter: &FilterSelection) -> Result<Vec<Issue>> {
        let mut all = self.store.fetch_all_issues()?;
        sort_newest_first(&mut all);
        let visible: Vec<Issue> = visible_issues(&all, filter).cloned().collect();
        debug!(total = all.len(), visible = visible.len(), "listed issues");
        Ok(visible)
    }

    pub fn find(&self, id: &str) -> Result<Option<Issue>> {
        Ok(self.store.fetch_issue(id)?)
    }

    pub fn stats(&self) -> Result<Stats> {
        let all = self.store.fetch_all_issues()?;
        Ok(Stats::from_issues(&all))
    }
}

/// Creation timestamp strictly after every existing one
fn next_created_at(existing: &[Issue]) -> DateTime<Utc> {
    let now = Utc::now();
    match existing.iter().map(|issue| issue.created_at).max() {
        Some(newest) if newest >= now => newest + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::Priority;

    fn actor() -> Actor {
        Actor::new("alice@example.com").unwrap()
    }

    #[test]
    fn test_create_sets_defaults() {
        let service = IssueService::new(MemoryStore::new());
        let outcome = service
            .create(
                IssueDraft::new("  Login fails ", " 500 on submit ", Priority::High),
                &actor(),
                &mut FixedAnswer(false),
            )
            .unwrap();

        let issue = outcome.created().unwrap();
        assert_eq!(issue.title, "Login fails");
        assert_eq!(issue.description, "500 on submit");
        assert_eq!(issue.status, Status::Open);
        assert_eq!(issue.assigned_to, "alice@example.com");
        assert_eq!(issue.created_by, "alice@example.com");
    }

    #[test]
    fn test_create_respects_assignee() {
        let service = IssueService::new(MemoryStore::new());
        let outcome = service
            .create(
                IssueDraft::new("Task", "Do it", Priority::Low).assigned_to("bob@example.com"),
                &actor(),
                &mut FixedAnswer(true),
            )
            .unwrap();
        assert_eq!(outcome.created().unwrap().assigned_to, "bob@example.com");
    }

    #[test]
    fn test_blank_assignee_falls_back_to_actor() {
        let service = IssueService::new(MemoryStore::new());
        let outcome = service
            .create(
                IssueDraft::new("Task", "Do it", Priority::Low).assigned_to("   "),
                &actor(),
                &mut FixedAnswer(true),
            )
            .unwrap();
        assert_eq!(outcome.created().unwrap().assigned_to, "alice@example.com");
    }

    #[test]
    fn test_validation_failures_never_touch_store() {
        let store = MemoryStore::new();
        let service = IssueService::new(store.clone());

        let drafts = vec![
            IssueDraft::new("", "desc", Priority::Low),
            IssueDraft::new("   ", "desc", Priority::Low),
            IssueDraft::new("title", " \t", Priority::Low),
            IssueDraft {
                title: "title".to_string(),
                description: "desc".to_string(),
                priority: None,
                assigned_to: None,
            },
        ];

        for draft in drafts {
            let err = service
                .create(draft, &actor(), &mut FixedAnswer(true))
                .unwrap_err();
            assert!(matches!(err, IssueError::Validation(_)));
        }
        assert_eq!(store.call_count(), 0);
    }

    #[test]
    fn test_duplicate_prompt_receives_matches() {
        let service = IssueService::new(MemoryStore::new());
        service
            .create(
                IssueDraft::new("Export bug", "CSV broken", Priority::Medium),
                &actor(),
                &mut FixedAnswer(true),
            )
            .unwrap();

        let mut seen = Vec::new();
        let mut confirmer = |candidate: &str, similar: &[&Issue]| {
            seen.push(candidate.to_string());
            seen.extend(similar.iter().map(|i| i.title.clone()));
            true
        };
        let outcome = service
            .create(
                IssueDraft::new("export", "again", Priority::Low),
                &actor(),
                &mut confirmer,
            )
            .unwrap();

        assert!(outcome.created().is_some());
        assert_eq!(seen, vec!["export".to_string(), "Export bug".to_string()]);
    }

    #[test]
    fn test_confirmer_not_called_without_matches() {
        let service = IssueService::new(MemoryStore::new());
        let mut called = false;
        let mut confirmer = |_: &str, _: &[&Issue]| {
            called = true;
            false
        };
        let outcome = service
            .create(
                IssueDraft::new("Unique", "desc", Priority::Low),
                &actor(),
                &mut confirmer,
            )
            .unwrap();
        assert!(outcome.created().is_some());
        assert!(!called);
    }

    #[test]
    fn test_change_status_returns_updated_copy() {
        let service = IssueService::new(MemoryStore::new());
        let issue = service
            .create(
                IssueDraft::new("Thing", "desc", Priority::Low),
                &actor(),
                &mut FixedAnswer(true),
            )
            .unwrap()
            .created()
            .cloned()
            .unwrap();

        let updated = service.change_status(&issue, Status::InProgress).unwrap();
        assert_eq!(updated.status, Status::InProgress);
        assert_eq!(updated.id, issue.id);
        assert_eq!(issue.status, Status::Open);
    }

    #[test]
    fn test_rejected_transition_skips_store() {
        let store = MemoryStore::new();
        let service = IssueService::new(store.clone());
        let issue = service
            .create(
                IssueDraft::new("Thing", "desc", Priority::Low),
                &actor(),
                &mut FixedAnswer(true),
            )
            .unwrap()
            .created()
            .cloned()
            .unwrap();

        let calls_before = store.call_count();
        let err = service.change_status(&issue, Status::Done).unwrap_err();
        assert!(matches!(err, IssueError::InvalidTransition { .. }));
        assert_eq!(store.call_count(), calls_before);
    }

    #[test]
    fn test_created_at_is_strictly_increasing() {
        let service = IssueService::new(MemoryStore::new());
        let mut stamps = Vec::new();
        for n in 0..20 {
            let outcome = service
                .create(
                    IssueDraft::new(format!("Item {}", n), "desc", Priority::Low),
                    &actor(),
                    &mut FixedAnswer(true),
                )
                .unwrap();
            stamps.push(outcome.created().unwrap().created_at);
        }
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }
}
