use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_SESSION_SECRET: &str = "change-me-in-production";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub lino_api_url: String,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
    pub super_admin_username: Option<String>,
    pub image_host_url: String,
    pub image_host_api_key: Option<String>,
    pub qr_api_url: String,
    pub qr_api_key: Option<String>,
    pub qr_logo_path: Option<String>,
    pub public_bookbox_url: String,
    pub maps_api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub max_upload_size: usize,
    pub transaction_fetch_limit: u32,
    pub stats_timezone: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            lino_api_url: "https://lino-1.onrender.com".to_string(),
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
            session_ttl_hours: 12,
            cookie_secure: false,
            super_admin_username: None,
            image_host_url: "https://api.imgbb.com/1/upload".to_string(),
            image_host_api_key: None,
            qr_api_url: "https://qrcode-monkey.p.rapidapi.com".to_string(),
            qr_api_key: None,
            qr_logo_path: None,
            public_bookbox_url: "https://ceduni-lino.netlify.app/bookbox/".to_string(),
            maps_api_key: None,
            request_timeout_secs: 30,
            max_upload_size: 10 * 1024 * 1024, // 10MB
            transaction_fetch_limit: 10_000,
            stats_timezone: "America/Montreal".to_string(),
        }
    }
}

impl Config {
    /// Loads `.env` (if any) and layers environment variables over the defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let settings = config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port)?
            .set_default("lino_api_url", defaults.lino_api_url)?
            .set_default("session_secret", defaults.session_secret)?
            .set_default("session_ttl_hours", defaults.session_ttl_hours)?
            .set_default("cookie_secure", defaults.cookie_secure)?
            .set_default("image_host_url", defaults.image_host_url)?
            .set_default("qr_api_url", defaults.qr_api_url)?
            .set_default("public_bookbox_url", defaults.public_bookbox_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default("max_upload_size", defaults.max_upload_size as u64)?
            .set_default("transaction_fetch_limit", defaults.transaction_fetch_limit)?
            .set_default("stats_timezone", defaults.stats_timezone)?
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .context("building configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("reading configuration from environment")?;

        config
            .stats_timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid STATS_TIMEZONE {}: {}", config.stats_timezone, e))?;

        if config.session_secret == DEFAULT_SESSION_SECRET {
            tracing::warn!("SESSION_SECRET is not set; using the built-in development secret");
        }
        if config.super_admin_username.is_none() {
            tracing::warn!("SUPER_ADMIN_USERNAME is not set; the super admin panel is unreachable");
        }

        Ok(config)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Zone used to place transactions into local days and hours.
    pub fn display_timezone(&self) -> Tz {
        self.stats_timezone.parse().unwrap_or(Tz::UTC)
    }

    pub fn is_super_admin(&self, username: &str) -> bool {
        self.super_admin_username
            .as_deref()
            .is_some_and(|name| name == username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_timezone_follows_dst() {
        use chrono::{Offset, TimeZone};

        let tz = Config::default().display_timezone();
        let winter = tz.with_ymd_and_hms(2026, 12, 1, 12, 0, 0).unwrap();
        let summer = tz.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        assert_eq!(winter.offset().fix().local_minus_utc(), -5 * 3600);
        assert_eq!(summer.offset().fix().local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let config = Config {
            stats_timezone: "Mars/Olympus_Mons".to_string(),
            ..Config::default()
        };
        assert_eq!(config.display_timezone(), Tz::UTC);
    }

    #[test]
    fn test_super_admin_requires_configured_name() {
        let config = Config::default();
        assert!(!config.is_super_admin("root"));

        let config = Config {
            super_admin_username: Some("root".to_string()),
            ..Config::default()
        };
        assert!(config.is_super_admin("root"));
        assert!(!config.is_super_admin("alice"));
    }
}
