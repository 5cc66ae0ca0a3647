use axum::extract::State;
use serde_json::json;

use crate::{
    errors::Result,
    extract::{Json, Path, Query},
    handlers::AppState,
    middleware::auth::AuthenticatedAdmin,
    models::{IssueFilters, IssuePage, IssueTransition, Pagination},
};

pub async fn search(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Query(filters): Query<IssueFilters>,
) -> Result<Json<IssuePage>> {
    let list = state.lino.search_issues(&admin.token, &filters).await?;
    let pagination = list.pagination.unwrap_or_else(|| Pagination {
        total_results: list.issues.len() as u32,
        ..Pagination::first_page(filters.page_size())
    });

    Ok(Json(IssuePage {
        issues: list.issues,
        pagination,
    }))
}

pub async fn transition(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path((id, transition)): Path<(String, IssueTransition)>,
) -> Result<Json<serde_json::Value>> {
    let data = state
        .lino
        .transition_issue(&admin.token, &id, transition)
        .await?;
    tracing::info!(
        "{} applied {} to issue {}",
        admin.username,
        transition.path_segment(),
        id
    );

    Ok(Json(json!({
        "message": "Issue updated successfully",
        "data": data
    })))
}
