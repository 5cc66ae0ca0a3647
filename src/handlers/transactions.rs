use axum::extract::State;
use serde_json::json;

use crate::{
    errors::Result,
    extract::{Json, Query},
    handlers::AppState,
    middleware::auth::AuthenticatedAdmin,
    models::TransactionFilters,
};

pub async fn search(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Query(filters): Query<TransactionFilters>,
) -> Result<Json<serde_json::Value>> {
    let filters = filters.normalized();
    let transactions = state.lino.search_transactions(&admin.token, &filters).await?;

    let descriptions: Vec<String> = transactions.iter().map(|t| t.describe()).collect();

    Ok(Json(json!({
        "data": transactions,
        "descriptions": descriptions,
        "count": transactions.len(),
        "limit": filters.limit
    })))
}
