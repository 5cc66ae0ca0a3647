use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::cookie;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("File too large")]
    FileTooLarge,

    #[error("Not found")]
    NotFound,

    #[error("Lino API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Rejected { status, .. } => *status,
            AppError::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Upstream { status, .. } => match StatusCode::from_u16(*status) {
                Ok(code) if code.is_client_error() => code,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::ExternalService(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the admin; never leaks transport internals.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::Validation(msg)
            | AppError::ExternalService(msg) => msg.clone(),
            AppError::Upstream { message, .. } | AppError::Rejected { message, .. } => {
                message.clone()
            }
            AppError::Forbidden => "Access forbidden".to_string(),
            AppError::FileTooLarge => "File too large".to_string(),
            AppError::NotFound => "Resource not found".to_string(),
            AppError::Http(_) => "Unable to reach the Lino API".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Upstream { status, message } => {
                tracing::error!("Lino API returned {}: {}", status, message);
            }
            AppError::ExternalService(msg) => tracing::error!("External service error: {}", msg),
            AppError::Http(e) => tracing::error!("HTTP client error: {}", e),
            AppError::Internal(e) => tracing::error!("Internal error: {:#}", e),
            AppError::Unauthorized(msg) => tracing::debug!("Rejected session: {}", msg),
            _ => {}
        }

        let status = self.status();
        let message = self.user_message();

        if let AppError::Unauthorized(_) = self {
            let body = Json(json!({
                "error": message,
                "status": status.as_u16(),
                "redirect": "/login"
            }));
            return (
                status,
                [(header::SET_COOKIE, cookie::clear_session_cookie())],
                body,
            )
                .into_response();
        }

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

macro_rules! from_rejection {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for AppError {
                fn from(rejection: $rejection) -> Self {
                    AppError::Rejected {
                        status: rejection.status(),
                        message: rejection.body_text(),
                    }
                }
            }
        )*
    };
}

from_rejection!(JsonRejection, QueryRejection, PathRejection);

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_mapping() {
        let not_found = AppError::Upstream {
            status: 404,
            message: "Bookbox not found".to_string(),
        };
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.user_message(), "Bookbox not found");

        let server_error = AppError::Upstream {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(server_error.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_unauthorized_clears_cookie() {
        let response = AppError::Unauthorized("expired".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(cookie.contains("Max-Age=0"));
    }
}
