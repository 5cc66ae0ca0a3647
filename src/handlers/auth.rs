use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    auth::cookie,
    errors::{AppError, Result},
    extract::Json,
    handlers::AppState,
    middleware::auth::{verify_admin, AuthenticatedAdmin, INVALID_CREDENTIALS_MESSAGE},
    models::{AdminKeyRequest, LinoUser, LoginRequest, LoginResponse, RegisterRequest, SessionInfo},
};

/// Logs into Lino. Rejected credentials collapse into one message; other
/// backend errors keep their own.
async fn lino_login(state: &AppState, identifier: &str, password: &str) -> Result<LoginResponse> {
    if identifier.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Please enter your identifier and password".to_string(),
        ));
    }

    match state.lino.login(identifier, password).await {
        Ok(response) => Ok(response),
        Err(AppError::Unauthorized(_)) => {
            Err(AppError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()))
        }
        Err(AppError::Upstream { status, .. }) if matches!(status, 403 | 404) => {
            Err(AppError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()))
        }
        Err(e) => Err(e),
    }
}

fn login_token(response: &LoginResponse) -> Result<String> {
    response
        .token
        .clone()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()))
}

/// Checks the admin flag behind `token` and signs a console session.
async fn open_session(
    state: &AppState,
    identifier: &str,
    token: &str,
    user: Option<LinoUser>,
) -> Result<(String, SessionInfo)> {
    verify_admin(state, token).await?;

    let username = match user {
        Some(user) => user.username,
        None => match state.lino.current_user(token).await {
            Ok(user) => user.username,
            Err(e) => {
                tracing::debug!("Could not resolve username, using identifier: {}", e);
                identifier.to_string()
            }
        },
    };

    let is_super_admin =
        state.config.is_super_admin(&username) || state.config.is_super_admin(identifier);
    let session = state.sessions.issue(&username, token, is_super_admin)?;

    tracing::info!("Admin {} signed in", username);

    Ok((
        session,
        SessionInfo {
            redirect: if is_super_admin { "/super-admin" } else { "/" }.to_string(),
            username,
            is_super_admin,
        },
    ))
}

/// Logs into Lino, checks the admin flag and signs a console session.
/// Returns the session token and what the browser should do next.
pub(crate) async fn sign_in(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> Result<(String, SessionInfo)> {
    let identifier = identifier.trim();
    let response = lino_login(state, identifier, password).await?;
    let token = login_token(&response)?;
    open_session(state, identifier, &token, response.user).await
}

fn session_response(state: &AppState, session: &str, message: &str, info: SessionInfo) -> Response {
    (
        [(header::SET_COOKIE, state.session_cookie(session))],
        Json(json!({
            "message": message,
            "data": info
        })),
    )
        .into_response()
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response> {
    let (session, info) = sign_in(&state, &request.identifier, &request.password).await?;
    Ok(session_response(&state, &session, "Login successful", info))
}

/// Grants admin rights to an existing Lino account holding the verification
/// key, then signs it in.
pub async fn verify_admin_key(
    State(state): State<AppState>,
    Json(request): Json<AdminKeyRequest>,
) -> Result<Response> {
    let key = request.admin_verification_key.trim();
    if key.is_empty() {
        return Err(AppError::Validation(
            "An admin verification key is required".to_string(),
        ));
    }

    let identifier = request.identifier.trim();
    let response = lino_login(&state, identifier, &request.password).await?;
    let token = login_token(&response)?;

    state.lino.set_admin(&token, key).await?;
    tracing::info!("{} verified an admin key", identifier);

    let (session, info) = open_session(&state, identifier, &token, response.user).await?;
    Ok(session_response(&state, &session, "Admin verification successful", info))
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }
    if request.admin_verification_key.trim().is_empty() {
        return Err(AppError::Validation(
            "An admin verification key is required".to_string(),
        ));
    }

    let data = state.lino.register(&request).await?;
    tracing::info!("Registered admin account {}", request.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful",
            "data": data
        })),
    ))
}

pub async fn logout() -> Response {
    (
        [(header::SET_COOKIE, cookie::clear_session_cookie())],
        Json(json!({
            "message": "Logged out",
            "data": { "redirect": "/login" }
        })),
    )
        .into_response()
}

pub async fn me(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
) -> Result<Json<serde_json::Value>> {
    let user = state.lino.current_user(&admin.token).await?;

    Ok(Json(json!({
        "data": {
            "username": admin.username,
            "email": user.email,
            "isSuperAdmin": admin.is_super_admin
        }
    })))
}
