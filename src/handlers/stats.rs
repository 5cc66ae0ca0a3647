use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::{
    errors::Result,
    extract::{Json, Path, Query},
    handlers::AppState,
    middleware::auth::AuthenticatedAdmin,
    models::TransactionFilters,
    stats::{chart, Period, TransactionSnapshot},
};

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub period: Period,
    /// Calendar day (`YYYY-MM-DD`) for the hourly breakdown; today when absent.
    pub date: Option<NaiveDate>,
}

/// One fetch of the book box's transactions, reused for both series.
async fn load_snapshot(state: &AppState, token: &str, bookbox_id: &str) -> Result<TransactionSnapshot> {
    let filters = TransactionFilters::for_bookbox(bookbox_id, state.config.transaction_fetch_limit);
    let transactions = state.lino.search_transactions(token, &filters).await?;
    tracing::debug!(
        "Loaded {} transactions for book box {}",
        transactions.len(),
        bookbox_id
    );
    Ok(TransactionSnapshot::new(bookbox_id, transactions))
}

pub async fn report(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<serde_json::Value>> {
    let snapshot = load_snapshot(&state, &admin.token, &id).await?;
    let now = Utc::now().with_timezone(&state.config.display_timezone());
    let date = query.date.unwrap_or_else(|| now.date_naive());

    Ok(Json(json!({
        "data": snapshot.report(query.period, date, &now)
    })))
}

pub async fn activity_chart(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Response> {
    let snapshot = load_snapshot(&state, &admin.token, &id).await?;
    let now = Utc::now().with_timezone(&state.config.display_timezone());
    let svg = chart::activity_chart(&snapshot.activity(query.period, &now));

    Ok(svg_response(svg))
}

pub async fn hourly_chart(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Response> {
    let snapshot = load_snapshot(&state, &admin.token, &id).await?;
    let tz = state.config.display_timezone();
    let date = query
        .date
        .unwrap_or_else(|| Utc::now().with_timezone(&tz).date_naive());
    let svg = chart::hourly_chart(&snapshot.hourly(date, &tz));

    Ok(svg_response(svg))
}

fn svg_response(svg: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        svg,
    )
        .into_response()
}
