use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::handlers::AppState;

pub async fn liveness() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let lino_status = if state.lino.ping().await {
        "healthy"
    } else {
        "unhealthy"
    };

    let image_host_status = if state.config.image_host_api_key.is_some() {
        "configured"
    } else {
        "missing_key"
    };
    let qr_status = if state.qr.is_configured() {
        "configured"
    } else {
        "missing_key"
    };

    let (code, overall_status) = if lino_status == "healthy" {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        code,
        Json(json!({
            "status": overall_status,
            "checks": {
                "lino_api": lino_status,
                "image_host": image_host_status,
                "qr_code": qr_status
            },
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}
