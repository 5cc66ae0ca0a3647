use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_results: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub limit: u32,
}

impl Pagination {
    /// Single empty page, used when the API omits pagination.
    pub fn first_page(limit: u32) -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            total_results: 0,
            has_next_page: false,
            has_prev_page: false,
            limit,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

impl PageQuery {
    pub fn query_pairs(&self, default_limit: u32) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = super::non_empty(self.q.clone()) {
            pairs.push(("q", q));
        }
        pairs.push(("limit", self.limit.unwrap_or(default_limit).max(1).to_string()));
        pairs.push(("page", self.page.unwrap_or(1).max(1).to_string()));
        pairs
    }
}
