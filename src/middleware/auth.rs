use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    auth::cookie::{clear_session_cookie, extract_session_token},
    errors::{AppError, Result},
    handlers::AppState,
};

pub const NOT_ADMIN_MESSAGE: &str =
    "You do not have admin privileges. Please contact the admin of Lino to make you a fellow admin.";
pub const ADMIN_CHECK_FAILED_MESSAGE: &str =
    "Unable to verify admin status. Please contact the admin of Lino to make you a fellow admin.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "The identifier or password is invalid.";

/// A signed-in Lino admin. The admin flag is re-checked against the Lino API
/// on every request, so revoked admins lose access immediately.
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin {
    pub username: String,
    pub token: String,
    pub is_super_admin: bool,
}

/// An admin whose username matches `SUPER_ADMIN_USERNAME`.
#[derive(Debug, Clone)]
pub struct SuperAdmin(pub AuthenticatedAdmin);

/// Guard for HTML pages: redirects to the login page instead of answering 401.
#[derive(Debug, Clone)]
pub struct PageSession(pub AuthenticatedAdmin);

/// Asks the Lino API whether `token` belongs to an admin, mapping every
/// negative or failed answer to `Unauthorized`.
pub async fn verify_admin(state: &AppState, token: &str) -> Result<()> {
    match state.lino.is_admin(token).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(AppError::Unauthorized(NOT_ADMIN_MESSAGE.to_string())),
        Err(e) => {
            tracing::warn!("Admin status check failed: {}", e);
            Err(AppError::Unauthorized(ADMIN_CHECK_FAILED_MESSAGE.to_string()))
        }
    }
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthenticatedAdmin> {
    let session = extract_session_token(&parts.headers)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
    let claims = state.sessions.verify(&session)?;

    verify_admin(state, &claims.token).await?;

    Ok(AuthenticatedAdmin {
        // Both must hold: the signed flag and the configured name.
        is_super_admin: claims.super_admin && state.config.is_super_admin(&claims.sub),
        username: claims.sub,
        token: claims.token,
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        authenticate(parts, state).await
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let admin = authenticate(parts, state).await?;
        if !admin.is_super_admin {
            tracing::debug!("{} tried to reach a super admin route", admin.username);
            return Err(AppError::Forbidden);
        }
        Ok(SuperAdmin(admin))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for PageSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        match authenticate(parts, state).await {
            Ok(admin) => Ok(PageSession(admin)),
            Err(e) => {
                tracing::debug!("Redirecting {} to login: {}", parts.uri.path(), e);
                Err(login_redirect())
            }
        }
    }
}

pub fn login_redirect() -> Response {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}
