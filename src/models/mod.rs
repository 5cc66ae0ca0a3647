pub mod bookbox;
pub mod issue;
pub mod pagination;
pub mod transaction;
pub mod user;

pub use bookbox::*;
pub use issue::*;
pub use pagination::*;
pub use transaction::*;
pub use user::*;

/// Trims a free-text filter and drops it when nothing is left.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
