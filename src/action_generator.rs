//! Random issue-board action generator for property-based testing
//!
//! This module generates seeded random sequences of board actions, runs them
//! through [`IssueService`] against any [`IssueStore`], and checks every
//! outcome against a small reference model kept alongside.
//!
//! ## Referring to issues
//!
//! The generator never knows which creates will succeed (validation failures
//! and declined duplicate prompts create nothing), so status changes refer to
//! an issue by a random `target` index. Both the executor and the model
//! resolve it as `created[target % created.len()]` over the issues that exist
//! in creation order. With no issues yet, the action is skipped on both sides.
//!
//! ## What gets exercised
//!
//! - blank titles, blank descriptions and missing priorities (validation)
//! - titles cut from earlier titles with random casing (duplicate prompt),
//!   answered yes or no at random
//! - every status change, including the forbidden `Open -> Done`
//! - lists under every filter combination, compared by id and order
//!
//! ### Example
//!
//! ```text
//!   1. create "Login fails #4821" (High, confirm:no)    → Created sd-1
//!   2. create "login" (Low, confirm:no)                 → Cancelled (1 similar)
//!   3. status #7 → Done                                 → InvalidTransition sd-1
//!   4. status #2 → In Progress                          → StatusChanged sd-1
//!   5. list status:any priority:High                    → [sd-1]
//! ```

use crate::error::{CreateOutcome, IssueError};
use crate::service::{FixedAnswer, IssueService};
use crate::store::IssueStore;
use crate::types::{Actor, FilterSelection, IssueDraft, Priority, Status};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SUBJECTS: [&str; 7] = [
    "Login fails",
    "Release v2 ---",
    "Export bug",
    "Crash on save",
    "Slow dashboard",
    "Sync error",
    "Report totals wrong",
];

/// A board action
#[derive(Debug, Clone, PartialEq)]
pub enum IssueAction {
    Create {
        title: String,
        description: String,
        priority: Option<Priority>,
        assigned_to: Option<String>,
        /// Answer given if the duplicate prompt appears
        confirm: bool,
    },

    ChangeStatus { target: usize, status: Status },

    List { filter: FilterSelection },
}

impl std::fmt::Display for IssueAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueAction::Create {
                title,
                priority,
                confirm,
                ..
            } => write!(
                f,
                "create {:?} ({}, confirm:{})",
                title,
                priority.map(|p| p.as_str()).unwrap_or("no priority"),
                if *confirm { "yes" } else { "no" }
            ),
            IssueAction::ChangeStatus { target, status } => {
                write!(f, "status #{} → {}", target, status)
            }
            IssueAction::List { filter } => write!(
                f,
                "list status:{} priority:{}",
                filter.status.map(|s| s.as_str()).unwrap_or("any"),
                filter.priority.map(|p| p.as_str()).unwrap_or("any")
            ),
        }
    }
}

/// Outcome of one action, as observed or as predicted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created { id: String },
    Cancelled { similar: usize },
    ValidationError,
    StatusChanged { id: String, status: Status },
    InvalidTransition { id: String },
    Listed { ids: Vec<String> },
    Skipped,
}

/// Generates random action sequences
pub struct ActionGenerator {
    rng: StdRng,
    titles: Vec<String>,
}

impl ActionGenerator {
    /// Create a new generator with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            titles: Vec::new(),
        }
    }

    pub fn generate_sequence(&mut self, num_actions: usize) -> Vec<IssueAction> {
        (0..num_actions).map(|_| self.generate_action()).collect()
    }

    fn generate_action(&mut self) -> IssueAction {
        if self.titles.is_empty() {
            return self.generate_create();
        }

        let rand_val = self.rng.gen_range(0..100);
        if rand_val < 40 {
            self.generate_create()
        } else if rand_val < 75 {
            self.generate_change_status()
        } else {
            self.generate_list()
        }
    }

    fn generate_create(&mut self) -> IssueAction {
        let title = match self.rng.gen_range(0..100) {
            0..=7 if self.rng.gen_bool(0.5) => String::new(),
            0..=7 => "   ".to_string(),
            8..=29 if !self.titles.is_empty() => self.fragment_of_known_title(),
            _ => format!(
                "{} #{}",
                SUBJECTS[self.rng.gen_range(0..SUBJECTS.len())],
                self.rng.gen_range(1..10_000)
            ),
        };
        if !title.trim().is_empty() {
            self.titles.push(title.trim().to_string());
        }

        let description = if self.rng.gen_bool(0.05) {
            " ".to_string()
        } else {
            format!("Details {}", self.rng.gen_range(0..1000))
        };

        let priority = if self.rng.gen_bool(0.05) {
            None
        } else {
            Some(self.random_priority())
        };

        let assigned_to = match self.rng.gen_range(0..10) {
            0..=2 => Some("bob@example.com".to_string()),
            3 => Some("  ".to_string()),
            _ => None,
        };

        IssueAction::Create {
            title,
            description,
            priority,
            assigned_to,
            confirm: self.rng.gen_bool(0.5),
        }
    }

    /// A substring of an earlier title with randomized casing
    fn fragment_of_known_title(&mut self) -> String {
        let source = self.titles[self.rng.gen_range(0..self.titles.len())].clone();
        let chars: Vec<char> = source.chars().collect();
        let start = self.rng.gen_range(0..chars.len());
        let end = self.rng.gen_range(start + 1..=chars.len());
        let fragment: String = chars[start..end]
            .iter()
            .map(|c| {
                if self.rng.gen_bool(0.5) {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect();

        // Keep it creatable: a whitespace-only cut would fail validation
        if fragment.trim().is_empty() {
            source
        } else {
            fragment
        }
    }

    fn generate_change_status(&mut self) -> IssueAction {
        IssueAction::ChangeStatus {
            target: self.rng.gen_range(0..1000),
            status: Status::ALL[self.rng.gen_range(0..Status::ALL.len())],
        }
    }

    fn generate_list(&mut self) -> IssueAction {
        let status = if self.rng.gen_bool(0.5) {
            Some(Status::ALL[self.rng.gen_range(0..Status::ALL.len())])
        } else {
            None
        };
        let priority = if self.rng.gen_bool(0.4) {
            Some(self.random_priority())
        } else {
            None
        };
        IssueAction::List {
            filter: FilterSelection::new(status, priority),
        }
    }

    fn random_priority(&mut self) -> Priority {
        Priority::ALL[self.rng.gen_range(0..Priority::ALL.len())]
    }
}

#[derive(Debug, Clone)]
struct ModelIssue {
    id: String,
    title: String,
    priority: Priority,
    status: Status,
}

/// Reference model predicting the outcome of each action
pub struct ReferenceModel {
    prefix: String,
    next_number: u32,
    /// Creation order
    issues: Vec<ModelIssue>,
}

impl ReferenceModel {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next_number: 1,
            issues: Vec::new(),
        }
    }

    pub fn apply(&mut self, action: &IssueAction) -> Outcome {
        match action {
            IssueAction::Create {
                title,
                description,
                priority,
                confirm,
                ..
            } => {
                let title = title.trim();
                let priority = match priority {
                    Some(p) if !title.is_empty() && !description.trim().is_empty() => *p,
                    _ => return Outcome::ValidationError,
                };

                let needle = title.to_lowercase();
                let similar = self
                    .issues
                    .iter()
                    .filter(|i| i.title.to_lowercase().contains(&needle))
                    .count();
                if similar > 0 && !confirm {
                    return Outcome::Cancelled { similar };
                }

                let id = format!("{}-{}", self.prefix, self.next_number);
                self.next_number += 1;
                self.issues.push(ModelIssue {
                    id: id.clone(),
                    title: title.to_string(),
                    priority,
                    status: Status::Open,
                });
                Outcome::Created { id }
            }

            IssueAction::ChangeStatus { target, status } => {
                if self.issues.is_empty() {
                    return Outcome::Skipped;
                }
                let idx = target % self.issues.len();
                let issue = &mut self.issues[idx];
                if issue.status == Status::Open && *status == Status::Done {
                    return Outcome::InvalidTransition {
                        id: issue.id.clone(),
                    };
                }
                issue.status = *status;
                Outcome::StatusChanged {
                    id: issue.id.clone(),
                    status: *status,
                }
            }

            IssueAction::List { filter } => {
                let ids = self
                    .issues
                    .iter()
                    .rev()
                    .filter(|i| match filter.status {
                        None => i.status != Status::Done,
                        Some(s) => i.status == s,
                    })
                    .filter(|i| filter.priority.map_or(true, |p| i.priority == p))
                    .map(|i| i.id.clone())
                    .collect();
                Outcome::Listed { ids }
            }
        }
    }

    /// Status of every issue, newest first
    pub fn statuses(&self) -> Vec<(String, Status)> {
        self.issues
            .iter()
            .rev()
            .map(|i| (i.id.clone(), i.status))
            .collect()
    }
}

/// Executes actions through the issue service
pub struct ActionExecutor<S> {
    service: IssueService<S>,
    actor: Actor,
    /// Ids in creation order
    created: Vec<String>,
}

impl<S: IssueStore> ActionExecutor<S> {
    pub fn new(store: S, actor: Actor) -> Self {
        Self {
            service: IssueService::new(store),
            actor,
            created: Vec::new(),
        }
    }

    pub fn service(&self) -> &IssueService<S> {
        &self.service
    }

    /// Execute a single action
    ///
    /// Validation, transition and cancellation outcomes are results, not
    /// errors. Only store failures come back as `Err`.
    pub fn execute(&mut self, action: &IssueAction) -> Result<Outcome> {
        match action {
            IssueAction::Create {
                title,
                description,
                priority,
                assigned_to,
                confirm,
            } => {
                let draft = IssueDraft {
                    title: title.clone(),
                    description: description.clone(),
                    priority: *priority,
                    assigned_to: assigned_to.clone(),
                };
                match self
                    .service
                    .create(draft, &self.actor, &mut FixedAnswer(*confirm))
                {
                    Ok(CreateOutcome::Created(issue)) => {
                        self.created.push(issue.id.clone());
                        Ok(Outcome::Created { id: issue.id })
                    }
                    Ok(CreateOutcome::Cancelled { similar_titles }) => Ok(Outcome::Cancelled {
                        similar: similar_titles.len(),
                    }),
                    Err(IssueError::Validation(_)) => Ok(Outcome::ValidationError),
                    Err(e) => Err(e).context("create failed unexpectedly"),
                }
            }

            IssueAction::ChangeStatus { target, status } => {
                if self.created.is_empty() {
                    return Ok(Outcome::Skipped);
                }
                let id = &self.created[target % self.created.len()];
                let issue = self
                    .service
                    .find(id)?
                    .ok_or_else(|| anyhow::anyhow!("Created issue {} vanished", id))?;
                match self.service.change_status(&issue, *status) {
                    Ok(updated) => Ok(Outcome::StatusChanged {
                        id: updated.id,
                        status: updated.status,
                    }),
                    Err(IssueError::InvalidTransition { id, .. }) => {
                        Ok(Outcome::InvalidTransition { id })
                    }
                    Err(e) => Err(e).context("status change failed unexpectedly"),
                }
            }

            IssueAction::List { filter } => {
                let ids = self
                    .service
                    .list(filter)?
                    .into_iter()
                    .map(|issue| issue.id)
                    .collect();
                Ok(Outcome::Listed { ids })
            }
        }
    }
}

/// Summary of a checked sequence
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    pub actions: usize,
    pub created: usize,
    pub cancelled: usize,
    pub rejected: usize,
}

impl SequenceReport {
    /// Add another run's counts to this one
    pub fn absorb(&mut self, other: &SequenceReport) {
        self.actions += other.actions;
        self.created += other.created;
        self.cancelled += other.cancelled;
        self.rejected += other.rejected;
    }
}

/// Generate `num_actions` actions from `seed`, run them against `store` and
/// compare each outcome with the reference model.
///
/// `log` receives one line per action.
pub fn check_sequence<S: IssueStore>(
    store: S,
    prefix: &str,
    seed: u64,
    num_actions: usize,
    mut log: impl FnMut(String),
) -> Result<SequenceReport> {
    let actor = Actor::new("tester@example.com")?;
    let mut executor = ActionExecutor::new(store, actor);
    let mut model = ReferenceModel::new(prefix);
    let mut report = SequenceReport::default();

    let actions = ActionGenerator::new(seed).generate_sequence(num_actions);
    for (i, action) in actions.iter().enumerate() {
        let expected = model.apply(action);
        let observed = executor
            .execute(action)
            .with_context(|| format!("action {} ({}) failed", i + 1, action))?;
        log(format!("{:3}. {} → {:?}", i + 1, action, observed));

        if observed != expected {
            anyhow::bail!(
                "Mismatch at action {} ({}):\n  expected: {:?}\n  observed: {:?}",
                i + 1,
                action,
                expected,
                observed
            );
        }

        report.actions += 1;
        match observed {
            Outcome::Created { .. } => report.created += 1,
            Outcome::Cancelled { .. } => report.cancelled += 1,
            Outcome::ValidationError | Outcome::InvalidTransition { .. } => report.rejected += 1,
            _ => {}
        }
    }

    let stored: Vec<(String, Status)> = executor
        .service()
        .store()
        .fetch_all_issues()?
        .into_iter()
        .map(|issue| (issue.id, issue.status))
        .collect();
    if stored != model.statuses() {
        anyhow::bail!(
            "Final state mismatch:\n  expected: {:?}\n  stored:   {:?}",
            model.statuses(),
            stored
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_generator_is_deterministic() {
        let a = ActionGenerator::new(7).generate_sequence(50);
        let b = ActionGenerator::new(7).generate_sequence(50);
        assert_eq!(a, b);
    }

    #[test]
    fn test_first_action_is_create() {
        for seed in 0..20 {
            let actions = ActionGenerator::new(seed).generate_sequence(1);
            assert!(matches!(actions[0], IssueAction::Create { .. }));
        }
    }

    #[test]
    fn test_model_forbids_open_to_done() {
        let mut model = ReferenceModel::new("m");
        let created = model.apply(&IssueAction::Create {
            title: "A".to_string(),
            description: "d".to_string(),
            priority: Some(Priority::Low),
            assigned_to: None,
            confirm: false,
        });
        assert_eq!(created, Outcome::Created { id: "m-1".to_string() });

        let outcome = model.apply(&IssueAction::ChangeStatus {
            target: 3,
            status: Status::Done,
        });
        assert_eq!(outcome, Outcome::InvalidTransition { id: "m-1".to_string() });
    }

    #[test]
    fn test_check_sequence_against_memory_store() {
        for seed in [1, 2, 3] {
            let report =
                check_sequence(MemoryStore::with_prefix("mem"), "mem", seed, 60, |_| {}).unwrap();
            assert_eq!(report.actions, 60);
        }
    }
}
