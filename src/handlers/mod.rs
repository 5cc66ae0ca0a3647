use reqwest::Client;
use std::sync::Arc;

use crate::{
    auth::{cookie, SessionService},
    config::Config,
    errors::{AppError, Result},
    services::{create_image_host, ImageHost, LinoClient, MetricsService, QrCodeClient},
};

pub mod admin;
pub mod auth;
pub mod bookboxes;
pub mod health;
pub mod issues;
pub mod metrics;
pub mod pages;
pub mod stats;
pub mod transactions;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub lino: LinoClient,
    pub image_host: Arc<dyn ImageHost>,
    pub qr: QrCodeClient,
    pub sessions: SessionService,
    pub metrics: MetricsService,
}

impl AppState {
    /// Wires every client around one shared `reqwest::Client`.
    pub fn new(config: Config) -> Result<Self> {
        let metrics = MetricsService::new().map_err(anyhow::Error::from)?;
        let http = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            lino: LinoClient::with_client(http.clone(), &config.lino_api_url, metrics.clone()),
            image_host: create_image_host(&config, http.clone(), metrics.clone()),
            qr: QrCodeClient::new(&config, http, metrics.clone()),
            sessions: SessionService::new(&config.session_secret, config.session_ttl_hours),
            metrics,
            config,
        })
    }

    pub fn session_cookie(&self, session: &str) -> String {
        cookie::session_cookie(session, self.sessions.max_age_secs(), self.config.cookie_secure)
    }
}

/// JSON 404 for paths no route matches.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
