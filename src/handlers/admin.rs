use axum::{extract::State, http::StatusCode};
use serde_json::json;

use crate::{
    errors::{AppError, Result},
    extract::{Json, Path, Query},
    handlers::AppState,
    middleware::auth::{AuthenticatedAdmin, SuperAdmin},
    models::{AdminChange, PageQuery, Pagination, UserPage},
    services::lino::DEFAULT_SEARCH_LIMIT,
};

/// Admin lookup used by the ownership transfer dialog.
pub async fn search_admins(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Query(query): Query<PageQuery>,
) -> Result<Json<serde_json::Value>> {
    let list = state.lino.search_admins(&admin.token, &query).await?;
    let pagination = list
        .pagination
        .unwrap_or_else(|| Pagination::first_page(query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)));

    Ok(Json(json!({
        "data": list.admins,
        "pagination": pagination
    })))
}

/// Current admins, shown on the super admin panel.
pub async fn list_admins(
    State(state): State<AppState>,
    SuperAdmin(admin): SuperAdmin,
) -> Result<Json<serde_json::Value>> {
    let data = state.lino.list_admins(&admin.token).await?;
    Ok(Json(json!({ "data": data })))
}

pub async fn list_users(
    State(state): State<AppState>,
    SuperAdmin(admin): SuperAdmin,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPage>> {
    let list = state.lino.search_users(&admin.token, &query).await?;
    let pagination = list.pagination.unwrap_or_else(|| Pagination {
        total_results: list.users.len() as u32,
        ..Pagination::first_page(query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
    });

    Ok(Json(UserPage {
        users: list.users,
        pagination,
    }))
}

pub async fn add_admin(
    State(state): State<AppState>,
    SuperAdmin(admin): SuperAdmin,
    Json(request): Json<AdminChange>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("A username is required".to_string()));
    }

    let data = state.lino.add_admin(&admin.token, username).await?;
    tracing::info!("{} granted admin privileges to {}", admin.username, username);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("{} is now an admin", username),
            "data": data
        })),
    ))
}

pub async fn remove_admin(
    State(state): State<AppState>,
    SuperAdmin(admin): SuperAdmin,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>> {
    if state.config.is_super_admin(&username) {
        return Err(AppError::Validation(
            "The super admin cannot lose admin privileges".to_string(),
        ));
    }

    let data = state.lino.remove_admin(&admin.token, &username).await?;
    tracing::info!("{} revoked admin privileges from {}", admin.username, username);

    Ok(Json(json!({
        "message": format!("{} is no longer an admin", username),
        "data": data
    })))
}
