use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{handlers::AppState, services::metrics::RequestTimer};

pub async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let timer = RequestTimer::new(method.clone(), state.metrics.clone());

    let response = next.run(request).await;

    let status = response.status();
    if status.is_server_error() {
        tracing::warn!("{} {} failed with {}", method, path, status);
    }
    timer.finish(status.as_u16());

    response
}
