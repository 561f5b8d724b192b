use crate::config::{Config, CONFIG_FILE};
use crate::format::{issue_to_markdown, markdown_to_issue};
use crate::lock::{Lock, LOCK_FILE};
use crate::query::sort_newest_first;
use crate::store::IssueStore;
use crate::types::{Issue, NewIssue, Status};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the data directory searched for by the CLI
pub const DATA_DIR: &str = ".sprintdesk";

pub const HISTORY_FILE: &str = "command_history.log";

/// File-backed issue store: one markdown file per issue
pub struct Storage {
    data_dir: PathBuf,
    issues_dir: PathBuf,
    prefix: String,
}

impl Storage {
    /// Open storage at the given data directory
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        let issues_dir = data_dir.join("issues");
        fs::create_dir_all(&issues_dir).context("Failed to create issues directory")?;

        let config = if data_dir.join(CONFIG_FILE).exists() {
            Config::load(&data_dir)?
        } else {
            let config = Config::new(infer_prefix(&data_dir).unwrap_or_else(|| "sd".to_string()));
            config.save(&data_dir)?;
            config
        };

        ensure_gitignore(&data_dir)?;

        Ok(Self {
            data_dir,
            issues_dir,
            prefix: config.issue_prefix,
        })
    }

    /// Initialize a new data directory
    pub fn init(
        data_dir: PathBuf,
        prefix: Option<String>,
        default_actor: Option<String>,
    ) -> Result<Self> {
        let issues_dir = data_dir.join("issues");
        fs::create_dir_all(&issues_dir).context("Failed to create issues directory")?;

        let prefix = prefix
            .or_else(|| infer_prefix(&data_dir))
            .unwrap_or_else(|| "sd".to_string());

        let config = Config {
            issue_prefix: prefix.clone(),
            default_actor,
        };
        config.save(&data_dir)?;

        ensure_gitignore(&data_dir)?;

        Ok(Self {
            data_dir,
            issues_dir,
            prefix,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn config(&self) -> Result<Config> {
        Config::load(&self.data_dir)
    }

    fn issue_path(&self, id: &str) -> PathBuf {
        self.issues_dir.join(format!("{}.md", id))
    }

    /// Get the next issue number for this prefix
    fn next_number(&self) -> Result<u32> {
        let entries = fs::read_dir(&self.issues_dir).context("Failed to read issues directory")?;

        let mut max_num = 0;
        for entry in entries {
            let name = entry?.file_name();
            let name_str = name.to_string_lossy();

            if let Some((prefix, num_str)) = name_str
                .strip_suffix(".md")
                .and_then(|issue_id| issue_id.rsplit_once('-'))
            {
                if prefix == self.prefix {
                    if let Ok(num) = num_str.parse::<u32>() {
                        max_num = max_num.max(num);
                    }
                }
            }
        }

        Ok(max_num + 1)
    }

    fn read_issue(&self, id: &str) -> Result<Issue> {
        let content = fs::read_to_string(self.issue_path(id))
            .with_context(|| format!("Failed to read issue file {}.md", id))?;
        markdown_to_issue(id, &content)
    }

    fn write_issue(&self, issue: &Issue) -> Result<()> {
        let markdown = issue_to_markdown(issue)?;
        fs::write(self.issue_path(&issue.id), markdown)
            .with_context(|| format!("Failed to write issue file {}.md", issue.id))
    }

    fn read_all(&self) -> Result<Vec<Issue>> {
        let entries = fs::read_dir(&self.issues_dir).context("Failed to read issues directory")?;

        let mut issues = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name_str = name.to_string_lossy();

            if let Some(issue_id) = name_str.strip_suffix(".md") {
                issues.push(self.read_issue(issue_id)?);
            }
        }

        Ok(issues)
    }
}

impl IssueStore for Storage {
    fn fetch_all_issues(&self) -> Result<Vec<Issue>> {
        let _lock = Lock::acquire(&self.data_dir)?;

        let mut issues = self.read_all()?;
        sort_newest_first(&mut issues);
        debug!(count = issues.len(), dir = %self.issues_dir.display(), "loaded issues");
        Ok(issues)
    }

    fn insert_issue(&self, record: NewIssue) -> Result<Issue> {
        let _lock = Lock::acquire(&self.data_dir)?;

        let id = format!("{}-{}", self.prefix, self.next_number()?);
        let issue = record.with_id(id);
        self.write_issue(&issue)?;

        Ok(issue)
    }

    fn update_issue_status(&self, id: &str, status: Status) -> Result<()> {
        let _lock = Lock::acquire(&self.data_dir)?;

        if !is_plain_id(id) || !self.issue_path(id).exists() {
            anyhow::bail!("Issue not found: {}", id);
        }

        let mut issue = self.read_issue(id)?;
        issue.status = status;
        self.write_issue(&issue)
    }

    fn fetch_issue(&self, id: &str) -> Result<Option<Issue>> {
        let _lock = Lock::acquire(&self.data_dir)?;

        if !is_plain_id(id) || !self.issue_path(id).exists() {
            return Ok(None);
        }
        self.read_issue(id).map(Some)
    }
}

/// Reject ids that would escape the issues directory
fn is_plain_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '\\']) && !id.contains("..")
}

/// Infer prefix from the directory containing the data directory
fn infer_prefix(data_dir: &Path) -> Option<String> {
    let parent = data_dir.parent()?;
    let parent = if parent.as_os_str().is_empty() {
        std::env::current_dir().ok()?
    } else {
        parent.canonicalize().ok()?
    };
    let name = parent.file_name()?.to_str()?;

    let prefix = name.to_lowercase().replace([' ', '_'], "-");
    if prefix.is_empty() {
        None
    } else {
        Some(prefix)
    }
}

/// Ensure .gitignore exists and contains required entries
fn ensure_gitignore(data_dir: &Path) -> Result<()> {
    use std::io::Write;

    let gitignore_path = data_dir.join(".gitignore");
    let required_entries = [LOCK_FILE, HISTORY_FILE];

    let existing = if gitignore_path.exists() {
        fs::read_to_string(&gitignore_path).context("Failed to read .gitignore")?
    } else {
        String::new()
    };

    let missing: Vec<&str> = required_entries
        .iter()
        .copied()
        .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
        .collect();

    if !missing.is_empty() {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&gitignore_path)
            .context("Failed to open .gitignore for writing")?;

        if !existing.is_empty() && !existing.ends_with('\n') {
            writeln!(file)?;
        }
        for entry in missing {
            writeln!(file, "{}", entry)?;
        }
    }

    Ok(())
}
