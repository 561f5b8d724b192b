//! Store collaborator interface.
//!
//! The core only needs three operations from persistence: fetch every issue
//! newest first, insert a new record, and overwrite one issue's status.
//! Backends are free to do anything else behind those calls.

use crate::query::sort_newest_first;
use crate::types::{Issue, NewIssue, Status};
use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, MutexGuard};

pub trait IssueStore {
    /// Fetch every issue, sorted descending by `created_at`.
    fn fetch_all_issues(&self) -> Result<Vec<Issue>>;

    /// Persist a new issue and return it with its assigned id.
    fn insert_issue(&self, record: NewIssue) -> Result<Issue>;

    /// Overwrite the status of an existing issue.
    ///
    /// # Errors
    ///
    /// Returns an error if no issue has this id.
    fn update_issue_status(&self, id: &str, status: Status) -> Result<()>;

    /// Look up a single issue by id
    fn fetch_issue(&self, id: &str) -> Result<Option<Issue>> {
        Ok(self
            .fetch_all_issues()?
            .into_iter()
            .find(|issue| issue.id == id))
    }
}

impl<S: IssueStore + ?Sized> IssueStore for &S {
    fn fetch_all_issues(&self) -> Result<Vec<Issue>> {
        (**self).fetch_all_issues()
    }

    fn insert_issue(&self, record: NewIssue) -> Result<Issue> {
        (**self).insert_issue(record)
    }

    fn update_issue_status(&self, id: &str, status: Status) -> Result<()> {
        (**self).update_issue_status(id, status)
    }

    fn fetch_issue(&self, id: &str) -> Result<Option<Issue>> {
        (**self).fetch_issue(id)
    }
}

#[derive(Default)]
struct MemoryState {
    issues: Vec<Issue>,
    next_number: u32,
    calls: usize,
    offline: bool,
}

/// In-memory store.
///
/// Clones share the same underlying data, so a test can keep a handle while
/// a service owns another.
#[derive(Clone)]
pub struct MemoryStore {
    prefix: String,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_prefix("sd")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            state: Arc::new(Mutex::new(MemoryState {
                next_number: 1,
                ..Default::default()
            })),
        }
    }

    /// Number of store operations invoked so far, including failed ones
    pub fn call_count(&self) -> usize {
        self.state.lock().map(|s| s.calls).unwrap_or(0)
    }

    /// Make every subsequent call fail, as an unreachable remote store would
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.offline = offline;
        }
    }

    /// Lock the state and account for one store call
    fn begin_call(&self) -> Result<MutexGuard<'_, MemoryState>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("In-memory store lock poisoned"))?;
        state.calls += 1;
        if state.offline {
            anyhow::bail!("Issue store unavailable");
        }
        Ok(state)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueStore for MemoryStore {
    fn fetch_all_issues(&self) -> Result<Vec<Issue>> {
        let state = self.begin_call()?;
        let mut issues = state.issues.clone();
        sort_newest_first(&mut issues);
        Ok(issues)
    }

    fn insert_issue(&self, record: NewIssue) -> Result<Issue> {
        let mut state = self.begin_call()?;
        let id = format!("{}-{}", self.prefix, state.next_number);
        state.next_number += 1;
        let issue = record.with_id(id);
        state.issues.push(issue.clone());
        Ok(issue)
    }

    fn update_issue_status(&self, id: &str, status: Status) -> Result<()> {
        let mut state = self.begin_call()?;
        let issue = state
            .issues
            .iter_mut()
            .find(|issue| issue.id == id)
            .ok_or_else(|| anyhow!("Issue not found: {}", id))?;
        issue.status = status;
        Ok(())
    }
}
