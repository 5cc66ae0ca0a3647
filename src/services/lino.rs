use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::{
    errors::{AppError, Result},
    models::{
        AdminChange, AdminKey, AdminList, AdminStatus, BookBox, BookBoxList, BookBoxPayload, BookBoxSearch,
        CurrentUserResponse, IssueFilters, IssueList, IssueTransition, LinoUser, LoginRequest,
        LoginResponse, PageQuery, RegisterRequest, Transaction, TransactionFilters,
        TransactionList, TransferRequest, UserList,
    },
    services::metrics::MetricsService,
};

pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Typed client for the Lino REST API. Cheap to clone; all clones share one
/// connection pool.
#[derive(Clone)]
pub struct LinoClient {
    http: Client,
    base_url: String,
    metrics: MetricsService,
}

impl LinoClient {
    pub fn new(base_url: &str, timeout: Duration, metrics: MetricsService) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url, metrics))
    }

    pub fn with_client(http: Client, base_url: &str, metrics: MetricsService) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            metrics,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(reqwest::header::ACCEPT, "application/json");
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and turns non-2xx answers into `AppError`s.
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<Response> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record_upstream(operation, "error");
                tracing::error!("Lino API {} failed: {}", operation, e);
                return Err(AppError::Http(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            self.metrics.record_upstream(operation, "success");
            return Ok(response);
        }

        self.metrics.record_upstream(operation, "failure");
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| fallback.to_string());
        tracing::debug!("Lino API {} returned {}: {}", operation, status, message);

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized(message));
        }
        Err(AppError::Upstream {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T> {
        let response = self.execute(operation, request, fallback).await?;
        response.json::<T>().await.map_err(|e| {
            tracing::error!("Unexpected {} response from the Lino API: {}", operation, e);
            AppError::Upstream {
                status: 502,
                message: fallback.to_string(),
            }
        })
    }

    /// For endpoints whose body may be empty or irrelevant.
    async fn value(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<Value> {
        let response = self.execute(operation, request, fallback).await?;
        let body = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    // Authentication

    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            identifier: identifier.to_string(),
            password: password.to_string(),
        };
        let request = self
            .request(Method::POST, "/users/login", None)
            .json(&body);
        self.json("login", request, "Login failed").await
    }

    pub async fn register(&self, body: &RegisterRequest) -> Result<Value> {
        let request = self
            .request(Method::POST, "/users/register", None)
            .json(body);
        self.value("register", request, "Registration failed").await
    }

    pub async fn current_user(&self, token: &str) -> Result<LinoUser> {
        let request = self.request(Method::GET, "/users", Some(token));
        let response: CurrentUserResponse = self
            .json("current_user", request, "Failed to fetch user")
            .await?;
        Ok(response.user)
    }

    pub async fn is_admin(&self, token: &str) -> Result<bool> {
        let request = self.request(Method::GET, "/admin/status", Some(token));
        let status: AdminStatus = self
            .json("admin_status", request, "Failed to check admin status")
            .await?;
        Ok(status.is_admin())
    }

    // Admin management

    pub async fn list_admins(&self, token: &str) -> Result<Value> {
        let request = self.request(Method::GET, "/admin/list", Some(token));
        self.value("list_admins", request, "Failed to fetch admins").await
    }

    pub async fn search_admins(&self, token: &str, query: &PageQuery) -> Result<AdminList> {
        let request = self
            .request(Method::GET, "/admin/search", Some(token))
            .query(&query.query_pairs(DEFAULT_SEARCH_LIMIT));
        self.json("search_admins", request, "Failed to search admins")
            .await
    }

    pub async fn search_users(&self, token: &str, query: &PageQuery) -> Result<UserList> {
        let request = self
            .request(Method::GET, "/admin/users/search", Some(token))
            .query(&query.query_pairs(DEFAULT_SEARCH_LIMIT));
        self.json("search_users", request, "Failed to search users")
            .await
    }

    pub async fn add_admin(&self, token: &str, username: &str) -> Result<Value> {
        let body = AdminChange {
            username: username.to_string(),
        };
        let request = self
            .request(Method::POST, "/admin/add", Some(token))
            .json(&body);
        self.value("add_admin", request, "Failed to add admin").await
    }

    /// `POST /admin/set`: elevates the token's own account with the verification key.
    pub async fn set_admin(&self, token: &str, admin_verification_key: &str) -> Result<Value> {
        let request = self
            .request(Method::POST, "/admin/set", Some(token))
            .json(&AdminKey {
                admin_verification_key,
            });
        self.value("set_admin", request, "Admin verification failed")
            .await
    }

    pub async fn remove_admin(&self, token: &str, username: &str) -> Result<Value> {
        let body = AdminChange {
            username: username.to_string(),
        };
        let request = self
            .request(Method::DELETE, "/admin/remove", Some(token))
            .json(&body);
        self.value("remove_admin", request, "Failed to remove admin")
            .await
    }

    // Book boxes

    pub async fn create_bookbox(&self, token: &str, payload: &BookBoxPayload) -> Result<BookBox> {
        let request = self
            .request(Method::POST, "/admin/bookboxes", Some(token))
            .json(payload);
        self.json("create_bookbox", request, "Failed to create book box")
            .await
    }

    pub async fn get_bookbox(&self, token: &str, id: &str) -> Result<BookBox> {
        let request = self.request(Method::GET, &format!("/bookboxes/{}", id), Some(token));
        self.json("get_bookbox", request, "Failed to fetch book box")
            .await
    }

    pub async fn update_bookbox(
        &self,
        token: &str,
        id: &str,
        payload: &BookBoxPayload,
    ) -> Result<Value> {
        let request = self
            .request(Method::PUT, &format!("/admin/bookboxes/{}", id), Some(token))
            .json(payload);
        self.value("update_bookbox", request, "Failed to update book box")
            .await
    }

    pub async fn delete_bookbox(&self, token: &str, id: &str) -> Result<()> {
        let path = format!("/admin/bookboxes/{}", id);
        let request = self.request(Method::DELETE, &path, Some(token));
        self.execute("delete_bookbox", request, "Failed to delete book box")
            .await?;
        Ok(())
    }

    pub async fn search_bookboxes(&self, token: &str, search: &BookBoxSearch) -> Result<Vec<BookBox>> {
        let request = self
            .request(Method::GET, "/admin/bookboxes/search", Some(token))
            .query(&search.query_pairs());
        let list: BookBoxList = self
            .json("search_bookboxes", request, "Failed to fetch book boxes")
            .await?;
        Ok(list.into_vec())
    }

    pub async fn set_bookbox_active(&self, token: &str, id: &str, active: bool) -> Result<Value> {
        let (operation, action, fallback) = if active {
            ("activate_bookbox", "activate", "Failed to activate book box")
        } else {
            ("deactivate_bookbox", "deactivate", "Failed to deactivate book box")
        };
        let request = self.request(
            Method::PATCH,
            &format!("/admin/bookboxes/{}/{}", id, action),
            Some(token),
        );
        self.value(operation, request, fallback).await
    }

    pub async fn transfer_bookbox(&self, token: &str, id: &str, new_owner: &str) -> Result<Value> {
        let body = TransferRequest {
            new_owner: new_owner.to_string(),
        };
        let path = format!("/admin/bookboxes/{}/transfer", id);
        let request = self
            .request(Method::PATCH, &path, Some(token))
            .json(&body);
        self.value("transfer_bookbox", request, "Failed to transfer book box ownership")
            .await
    }

    // Transactions and issues

    pub async fn search_transactions(
        &self,
        token: &str,
        filters: &TransactionFilters,
    ) -> Result<Vec<Transaction>> {
        let request = self
            .request(Method::GET, "/books/transactions", Some(token))
            .query(&filters.query_pairs());
        let list: TransactionList = self
            .json("search_transactions", request, "Failed to fetch transactions")
            .await?;
        Ok(list.into_vec())
    }

    pub async fn search_issues(&self, token: &str, filters: &IssueFilters) -> Result<IssueList> {
        let request = self
            .request(Method::GET, "/search/issues", Some(token))
            .query(&filters.query_pairs());
        self.json("search_issues", request, "Failed to fetch issues")
            .await
    }

    pub async fn transition_issue(
        &self,
        token: &str,
        id: &str,
        transition: IssueTransition,
    ) -> Result<Value> {
        let request = self.request(
            Method::PUT,
            &format!("/issues/{}/{}", id, transition.path_segment()),
            Some(token),
        );
        self.value("transition_issue", request, "Failed to update issue")
            .await
    }

    /// Any HTTP answer from the base URL counts as reachable.
    pub async fn ping(&self) -> bool {
        match self.http.get(&self.base_url).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Lino API is unreachable: {}", e);
                false
            }
        }
    }
}

/// Pulls the `error` (or `message`) field out of a JSON error body.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .filter_map(|field| value.get(*field))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(
            error_message(r#"{"error":"Bookbox not found","message":"other"}"#).as_deref(),
            Some("Bookbox not found")
        );
        assert_eq!(
            error_message(r#"{"message":"User is not an admin"}"#).as_deref(),
            Some("User is not an admin")
        );
    }

    #[test]
    fn test_error_message_missing() {
        assert_eq!(error_message("<html>Bad gateway</html>"), None);
        assert_eq!(error_message(r#"{"error":""}"#), None);
        assert_eq!(error_message(r#"{"error":42}"#), None);
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = LinoClient::with_client(
            Client::new(),
            "http://localhost:3000/",
            MetricsService::new().unwrap(),
        );
        assert_eq!(client.base_url(), "http://localhost:3000");
    }
}
