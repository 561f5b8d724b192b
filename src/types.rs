use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Issue status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
}

impl Status {
    /// All statuses in lifecycle order
    pub const ALL: [Status; 3] = [Status::Open, Status::InProgress, Status::Done];

    /// Get the string representation of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Status::Open),
            "in progress" | "in_progress" | "in-progress" | "inprogress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            _ => Err(anyhow::anyhow!(
                "Invalid status: '{}'. Valid values are: Open, In Progress, Done",
                s
            )),
        }
    }
}

/// Issue priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Get the string representation of this priority
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(anyhow::anyhow!(
                "Invalid priority: '{}'. Valid values are: Low, Medium, High",
                s
            )),
        }
    }
}

/// A stored issue.
///
/// `id`, `created_by`, `created_at` and `priority` never change once the
/// store has assigned the id. `status` only changes through the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub assigned_to: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Issue record handed to the store before an id has been assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub assigned_to: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl NewIssue {
    /// Attach a store-assigned id
    pub fn with_id(self, id: String) -> Issue {
        Issue {
            id,
            title: self.title,
            description: self.description,
            priority: self.priority,
            status: self.status,
            assigned_to: self.assigned_to,
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

/// Raw creation input, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub assigned_to: Option<String>,
}

impl IssueDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority: Some(priority),
            assigned_to: None,
        }
    }

    pub fn assigned_to(mut self, user: impl Into<String>) -> Self {
        self.assigned_to = Some(user.into());
        self
    }
}

/// Identifier of the user acting on the board
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Actor(String);

impl Actor {
    pub fn new(id: impl Into<String>) -> anyhow::Result<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            anyhow::bail!("Actor identifier must not be empty");
        }
        if !id.contains('@') {
            anyhow::bail!("Invalid actor '{}': expected an email-like identifier", id);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Active filter selection for a view. `None` means unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
}

impl FilterSelection {
    pub fn new(status: Option<Status>, priority: Option<Priority>) -> Self {
        Self { status, priority }
    }
}

/// Statistics structure
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub done: usize,
    pub by_priority: BTreeMap<Priority, usize>,
}

impl Stats {
    /// Tally a snapshot of issues
    pub fn from_issues(issues: &[Issue]) -> Self {
        let mut stats = Stats {
            total: issues.len(),
            ..Default::default()
        };
        for priority in Priority::ALL {
            stats.by_priority.insert(priority, 0);
        }
        for issue in issues {
            match issue.status {
                Status::Open => stats.open += 1,
                Status::InProgress => stats.in_progress += 1,
                Status::Done => stats.done += 1,
            }
            *stats.by_priority.entry(issue.priority).or_insert(0) += 1;
        }
        stats
    }
}
