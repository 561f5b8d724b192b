use crate::types::Issue;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frontmatter for markdown issues
#[derive(Debug, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: String,
    pub status: String,
    pub priority: String,
    pub assigned_to: String,
    pub created_by: String,
    pub created_at: String,
}

const REQUIRED_FIELDS: [&str; 6] = [
    "title",
    "status",
    "priority",
    "assigned_to",
    "created_by",
    "created_at",
];

/// Convert an Issue to markdown format
pub fn issue_to_markdown(issue: &Issue) -> Result<String> {
    let fm = Frontmatter {
        title: issue.title.clone(),
        status: issue.status.to_string(),
        priority: issue.priority.to_string(),
        assigned_to: issue.assigned_to.clone(),
        created_by: issue.created_by.clone(),
        created_at: issue.created_at.to_rfc3339(),
    };

    let mut output = String::new();
    output.push_str("---\n");
    output.push_str(&serde_yaml::to_string(&fm).context("Failed to serialize frontmatter")?);
    output.push_str("---\n");

    if !issue.description.is_empty() {
        output.push_str("\n# Description\n\n");
        output.push_str(&sanitize_section_content(&issue.description));
        output.push('\n');
    }

    Ok(output)
}

/// Demote top-level headers so they cannot start a new section
fn sanitize_section_content(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            if line.starts_with("# ") {
                format!("#{}", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse markdown format into an Issue
pub fn markdown_to_issue(issue_id: &str, content: &str) -> Result<Issue> {
    let (yaml, body) = split_frontmatter(content).ok_or_else(|| {
        anyhow::anyhow!("Invalid markdown format in {}.md: missing frontmatter", issue_id)
    })?;

    let fm: Frontmatter = serde_yaml::from_str(yaml).map_err(|e| {
        let mut error_msg = format!("Failed to parse frontmatter in {}.md: {}", issue_id, e);

        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| !yaml.contains(&format!("{}:", field)))
            .collect();
        if !missing.is_empty() {
            error_msg.push_str("\nMissing required fields: ");
            error_msg.push_str(&missing.join(", "));
        }

        anyhow::anyhow!(error_msg)
    })?;

    Ok(Issue {
        id: issue_id.to_string(),
        title: fm.title,
        description: parse_description(body),
        priority: fm
            .priority
            .parse()
            .with_context(|| format!("Bad priority in {}.md", issue_id))?,
        status: fm
            .status
            .parse()
            .with_context(|| format!("Bad status in {}.md", issue_id))?,
        assigned_to: fm.assigned_to,
        created_by: fm.created_by,
        created_at: parse_timestamp(&fm.created_at)?,
    })
}

/// Split a file into its frontmatter and body.
///
/// Both delimiters must be a `---` line of their own.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---\n")?;
    if let Some(body) = rest.strip_prefix("---\n") {
        return Some(("", body));
    }
    match rest.find("\n---\n") {
        Some(idx) => Some((&rest[..idx + 1], &rest[idx + 5..])),
        None => rest.strip_suffix("\n---").map(|yaml| (yaml, "")),
    }
}

/// Extract the `# Description` section from the body.
///
/// Headers are recognized with the same rule `sanitize_section_content`
/// demotes them by: `# ` at the very start of the line.
fn parse_description(body: &str) -> String {
    let mut in_description = false;
    let mut content = Vec::new();

    for line in body.lines() {
        if let Some(header) = line.strip_prefix("# ") {
            in_description = header == "Description";
            continue;
        }
        if in_description {
            content.push(line);
        }
    }

    content.join("\n").trim().to_string()
}

/// Parse a timestamp string
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }

    let formats = ["%Y-%m-%dT%H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];
    for format in &formats {
        if let Ok(t) = DateTime::parse_from_str(s, format) {
            return Ok(t.with_timezone(&Utc));
        }
    }

    anyhow::bail!("Failed to parse timestamp: {}", s)
}
