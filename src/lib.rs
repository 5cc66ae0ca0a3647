use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod stats;
pub mod utils;

use handlers::{
    admin, bookboxes, health, issues, metrics, pages, stats as stats_handlers, transactions,
    AppState,
};

// Room for the text fields next to the image in a multipart body.
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_size + FORM_OVERHEAD;

    let api = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/admin-key", post(handlers::auth::verify_admin_key))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route("/bookboxes", get(bookboxes::search).post(bookboxes::create))
        .route(
            "/bookboxes/:id",
            get(bookboxes::get)
                .put(bookboxes::update)
                .delete(bookboxes::delete),
        )
        .route("/bookboxes/:id/activate", patch(bookboxes::activate))
        .route("/bookboxes/:id/deactivate", patch(bookboxes::deactivate))
        .route("/bookboxes/:id/transfer", patch(bookboxes::transfer))
        .route("/bookboxes/:id/qr", get(bookboxes::qr_code))
        .route("/bookboxes/:id/map", get(bookboxes::map))
        .route("/bookboxes/:id/stats", get(stats_handlers::report))
        .route(
            "/bookboxes/:id/stats/activity.svg",
            get(stats_handlers::activity_chart),
        )
        .route(
            "/bookboxes/:id/stats/hourly.svg",
            get(stats_handlers::hourly_chart),
        )
        .route("/transactions", get(transactions::search))
        .route("/issues", get(issues::search))
        .route("/issues/:id/:transition", put(issues::transition))
        .route("/admins/search", get(admin::search_admins))
        .route("/admins", get(admin::list_admins).post(admin::add_admin))
        .route("/admins/:username", delete(admin::remove_admin))
        .route("/users", get(admin::list_users));

    Router::new()
        .route("/", get(pages::dashboard))
        .route("/super-admin", get(pages::super_admin))
        .route("/login", get(pages::login_page).post(pages::login_submit))
        .route("/logout", post(pages::logout))
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
