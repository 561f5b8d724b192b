//! Advisory duplicate-title detection.
//!
//! A match only challenges the creation; the caller decides whether to go
//! ahead. Only "existing title contains candidate" is tested, never the
//! reverse.

use crate::types::Issue;

/// Find existing issues whose title contains `candidate_title`, ignoring case.
///
/// Matches are returned in the order of `existing`.
pub fn find_similar<'a>(candidate_title: &str, existing: &'a [Issue]) -> Vec<&'a Issue> {
    let needle = candidate_title.to_lowercase();
    existing
        .iter()
        .filter(|issue| issue.title.to_lowercase().contains(&needle))
        .collect()
}

/// Build the prompt text listing similar issues
pub fn similar_issues_message(similar: &[&Issue]) -> String {
    let names = similar
        .iter()
        .map(|issue| format!("• {}", issue.title))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Similar issues found:\n{}", names)
}
