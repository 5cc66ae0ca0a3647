use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::non_empty;

pub const DEFAULT_TRANSACTION_LIMIT: u32 = 50;
pub const MAX_TRANSACTION_LIMIT: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionAction {
    Added,
    Took,
    #[serde(other)]
    Other,
}

/// A book added to or taken from a book box, as recorded by the Lino API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename(deserialize = "_id"), alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub book_title: Option<String>,
    #[serde(default)]
    pub bookbox_id: String,
    pub action: TransactionAction,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// One-line description, e.g. `alice took the book with ISBN "123" from book box b1`.
    pub fn describe(&self) -> String {
        let (verb, preposition) = match self.action {
            TransactionAction::Added => ("added", "to"),
            _ => ("took", "from"),
        };
        let book = match (&self.isbn, &self.book_title) {
            (Some(isbn), _) => format!("the book with ISBN \"{}\"", isbn),
            (None, Some(title)) => format!("\"{}\"", title),
            (None, None) => "a book".to_string(),
        };
        format!(
            "{} {} {} {} book box {}",
            self.username, verb, book, preposition, self.bookbox_id
        )
    }
}

/// The API answers either `{ "transactions": [...] }` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TransactionList {
    Wrapped { transactions: Vec<Transaction> },
    Bare(Vec<Transaction>),
}

impl TransactionList {
    pub fn into_vec(self) -> Vec<Transaction> {
        match self {
            TransactionList::Wrapped { transactions } => transactions,
            TransactionList::Bare(transactions) => transactions,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilters {
    pub username: Option<String>,
    pub book_title: Option<String>,
    pub bookbox_id: Option<String>,
    pub limit: Option<u32>,
}

impl TransactionFilters {
    pub fn for_bookbox(bookbox_id: &str, limit: u32) -> Self {
        Self {
            bookbox_id: Some(bookbox_id.to_string()),
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Trims text filters, drops empty ones and clamps the limit.
    pub fn normalized(self) -> Self {
        Self {
            username: non_empty(self.username),
            book_title: non_empty(self.book_title),
            bookbox_id: non_empty(self.bookbox_id),
            limit: Some(
                self.limit
                    .unwrap_or(DEFAULT_TRANSACTION_LIMIT)
                    .clamp(1, MAX_TRANSACTION_LIMIT),
            ),
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(username) = &self.username {
            pairs.push(("username", username.clone()));
        }
        if let Some(title) = &self.book_title {
            pairs.push(("bookTitle", title.clone()));
        }
        if let Some(bookbox_id) = &self.bookbox_id {
            pairs.push(("bookboxId", bookbox_id.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrapped_and_bare_lists() {
        let item = json!({
            "_id": "t1",
            "username": "alice",
            "isbn": "9780000000001",
            "bookboxId": "b1",
            "action": "took",
            "timestamp": "2026-10-15T10:00:00Z"
        });

        let wrapped: TransactionList =
            serde_json::from_value(json!({ "transactions": [item.clone()] })).unwrap();
        let bare: TransactionList = serde_json::from_value(json!([item])).unwrap();

        let wrapped = wrapped.into_vec();
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].id, "t1");
        assert_eq!(wrapped[0].action, TransactionAction::Took);
        assert_eq!(bare.into_vec().len(), 1);
    }

    #[test]
    fn test_unknown_action_does_not_fail() {
        let transaction: Transaction = serde_json::from_value(json!({
            "_id": "t2",
            "action": "borrowed",
            "timestamp": "2026-10-15T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(transaction.action, TransactionAction::Other);
    }

    #[test]
    fn test_filters_drop_blank_values() {
        let filters = TransactionFilters {
            username: Some("  ".to_string()),
            book_title: Some(" Dune ".to_string()),
            bookbox_id: None,
            limit: Some(0),
        }
        .normalized();

        assert_eq!(
            filters.query_pairs(),
            vec![("bookTitle", "Dune".to_string()), ("limit", "1".to_string())]
        );
    }

    #[test]
    fn test_describe() {
        let transaction: Transaction = serde_json::from_value(json!({
            "_id": "t3",
            "username": "bob",
            "isbn": "42",
            "bookboxId": "b9",
            "action": "added",
            "timestamp": "2026-10-15T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(
            transaction.describe(),
            "bob added the book with ISBN \"42\" to book box b9"
        );
    }
}
