use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{non_empty, Pagination};

pub const DEFAULT_ISSUE_PAGE_SIZE: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "open",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Resolved => "resolved",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(rename(deserialize = "_id"), alias = "id")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bookbox_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub status: IssueStatus,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct IssueList {
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Serialize)]
pub struct IssuePage {
    pub issues: Vec<Issue>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueFilters {
    pub username: Option<String>,
    pub bookbox_id: Option<String>,
    pub status: Option<IssueStatus>,
    pub oldest_first: Option<bool>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

impl IssueFilters {
    pub fn page_size(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_ISSUE_PAGE_SIZE).max(1)
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(username) = non_empty(self.username.clone()) {
            pairs.push(("username", username));
        }
        if let Some(bookbox_id) = non_empty(self.bookbox_id.clone()) {
            pairs.push(("bookboxId", bookbox_id));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if self.oldest_first == Some(true) {
            pairs.push(("oldestFirst", "true".to_string()));
        }
        pairs.push(("limit", self.page_size().to_string()));
        pairs.push(("page", self.page.unwrap_or(1).max(1).to_string()));
        pairs
    }
}

/// Status changes an admin can apply to an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueTransition {
    Investigate,
    Close,
    Reopen,
}

impl IssueTransition {
    pub fn path_segment(&self) -> &'static str {
        match self {
            IssueTransition::Investigate => "investigate",
            IssueTransition::Close => "close",
            IssueTransition::Reopen => "reopen",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_list_without_pagination() {
        let list: IssueList = serde_json::from_value(json!({
            "issues": [{
                "_id": "i1",
                "username": "carol",
                "bookboxId": "b1",
                "subject": "Door is broken",
                "status": "in_progress",
                "timestamp": "2026-10-01T08:30:00Z"
            }]
        }))
        .unwrap();

        assert_eq!(list.issues.len(), 1);
        assert_eq!(list.issues[0].status, IssueStatus::InProgress);
        assert!(list.pagination.is_none());
    }

    #[test]
    fn test_filters_query() {
        let filters = IssueFilters {
            bookbox_id: Some("b1".to_string()),
            status: Some(IssueStatus::Open),
            oldest_first: Some(false),
            ..IssueFilters::default()
        };
        assert_eq!(
            filters.query_pairs(),
            vec![
                ("bookboxId", "b1".to_string()),
                ("status", "open".to_string()),
                ("limit", "5".to_string()),
                ("page", "1".to_string()),
            ]
        );
    }
}
