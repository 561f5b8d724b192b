//! Visible issue set.
//!
//! Filtering never reorders: the input is expected newest first and the
//! output keeps that order.

use crate::types::{FilterSelection, Issue, Status};

impl FilterSelection {
    /// Check whether an issue passes both the status and priority predicates.
    ///
    /// With no status selected, `Done` issues are hidden.
    pub fn matches(&self, issue: &Issue) -> bool {
        let status_ok = match self.status {
            None => issue.status != Status::Done,
            Some(status) => issue.status == status,
        };
        let priority_ok = match self.priority {
            None => true,
            Some(priority) => issue.priority == priority,
        };
        status_ok && priority_ok
    }
}

/// Lazily filter `all_issues` by `filter`.
///
/// The returned iterator can be cloned to restart the view.
pub fn visible_issues<'a>(
    all_issues: &'a [Issue],
    filter: &'a FilterSelection,
) -> impl Iterator<Item = &'a Issue> + Clone + 'a {
    all_issues.iter().filter(move |issue| filter.matches(issue))
}

/// Sort issues newest first by `created_at`, keeping the relative order of ties
pub fn sort_newest_first(issues: &mut [Issue]) {
    issues.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;
    use chrono::{Duration, Utc};

    fn issues() -> Vec<Issue> {
        let now = Utc::now();
        let make = |n: i64, status, priority| Issue {
            id: format!("sd-{}", n),
            title: format!("Issue {}", n),
            description: "desc".to_string(),
            priority,
            status,
            assigned_to: "a@example.com".to_string(),
            created_by: "a@example.com".to_string(),
            created_at: now + Duration::seconds(n),
        };
        let mut all = vec![
            make(1, Status::Open, Priority::High),
            make(2, Status::InProgress, Priority::Low),
            make(3, Status::Done, Priority::High),
            make(4, Status::Open, Priority::Medium),
        ];
        sort_newest_first(&mut all);
        all
    }

    fn ids<'a>(it: impl Iterator<Item = &'a Issue>) -> Vec<&'a str> {
        it.map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_default_hides_done() {
        let all = issues();
        let filter = FilterSelection::default();
        assert_eq!(
            ids(visible_issues(&all, &filter)),
            vec!["sd-4", "sd-2", "sd-1"]
        );
    }

    #[test]
    fn test_explicit_done_shows_only_done() {
        let all = issues();
        let filter = FilterSelection::new(Some(Status::Done), None);
        assert_eq!(ids(visible_issues(&all, &filter)), vec!["sd-3"]);
    }

    #[test]
    fn test_priority_filter_combines_with_default_status() {
        let all = issues();
        let filter = FilterSelection::new(None, Some(Priority::High));
        assert_eq!(ids(visible_issues(&all, &filter)), vec!["sd-1"]);
    }

    #[test]
    fn test_view_is_restartable() {
        let all = issues();
        let filter = FilterSelection::new(Some(Status::Open), None);
        let view = visible_issues(&all, &filter);
        let first = ids(view.clone());
        let second = ids(view);
        assert_eq!(first, second);
        assert_eq!(first, vec!["sd-4", "sd-1"]);
    }

    #[test]
    fn test_sort_newest_first_is_stable() {
        let now = Utc::now();
        let mut all: Vec<Issue> = (1..=3)
            .map(|n| Issue {
                id: format!("sd-{}", n),
                title: "same".to_string(),
                description: "d".to_string(),
                priority: Priority::Low,
                status: Status::Open,
                assigned_to: "a@x".to_string(),
                created_by: "a@x".to_string(),
                created_at: now,
            })
            .collect();
        sort_newest_first(&mut all);
        assert_eq!(ids(all.iter()), vec!["sd-1", "sd-2", "sd-3"]);
    }
}
