use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{multipart, Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    config::Config,
    errors::{AppError, Result},
    services::metrics::MetricsService,
    utils::file::{guess_mime_type, validate_logo},
};

const QR_FAILED: &str = "Failed to generate QR code";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QrStyle<'a> {
    body: &'a str,
    eye: &'a str,
    eye_ball: &'a str,
    body_color: &'a str,
    bg_color: &'a str,
    logo: &'a str,
    logo_mode: &'a str,
}

#[derive(Debug, Serialize)]
struct QrRequest<'a> {
    data: &'a str,
    config: QrStyle<'a>,
    size: u32,
    file: &'a str,
    download: bool,
}

impl<'a> QrRequest<'a> {
    fn new(data: &'a str, logo: &'a str) -> Self {
        Self {
            data,
            config: QrStyle {
                body: "circle",
                eye: "frame13",
                eye_ball: "ball15",
                body_color: "#000000",
                bg_color: "#ffffff",
                logo,
                logo_mode: "default",
            },
            size: 2000,
            file: "png",
            download: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LogoUploadResponse {
    #[serde(default)]
    file: Option<String>,
}

/// QRCode Monkey (via RapidAPI) client. Codes point at the public page of a book box.
#[derive(Clone)]
pub struct QrCodeClient {
    http: Client,
    api_url: String,
    api_host: String,
    api_key: Option<String>,
    logo_path: Option<PathBuf>,
    public_bookbox_url: String,
    metrics: MetricsService,
}

impl QrCodeClient {
    pub fn new(config: &Config, http: Client, metrics: MetricsService) -> Self {
        let api_url = config.qr_api_url.trim_end_matches('/').to_string();
        let api_host = Url::parse(&api_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();

        Self {
            http,
            api_url,
            api_host,
            api_key: config.qr_api_key.clone().filter(|key| !key.is_empty()),
            logo_path: config.qr_logo_path.as_ref().map(PathBuf::from),
            public_bookbox_url: config.public_bookbox_url.clone(),
            metrics,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Text encoded in the QR code of a book box.
    pub fn payload_for(&self, bookbox_id: &str) -> String {
        format!("{}{}", self.public_bookbox_url, bookbox_id)
    }

    fn authorized(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        request
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", &self.api_host)
    }

    /// Uploads the configured logo and returns the file name the QR service assigned to it.
    pub async fn upload_logo(&self) -> Result<Option<String>> {
        let (Some(path), Some(api_key)) = (&self.logo_path, &self.api_key) else {
            return Ok(None);
        };

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to read QR logo {}: {}", path.display(), e))
        })?;
        let mime_type = guess_mime_type(path);
        validate_logo(&bytes, &mime_type)?;

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name(path))
            .mime_str(&mime_type)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .authorized(self.http.post(format!("{}/qr/uploadImage", self.api_url)), api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            self.metrics.record_upstream("qr_logo_upload", "failure");
            return Err(AppError::ExternalService(format!(
                "Failed to upload image ({})",
                response.status()
            )));
        }

        let body: LogoUploadResponse = response.json().await?;
        self.metrics.record_upstream("qr_logo_upload", "success");
        Ok(body.file.filter(|file| !file.is_empty()))
    }

    /// Renders `data` as a PNG QR code. A logo that cannot be uploaded is left out.
    pub async fn generate(&self, data: &str) -> Result<Vec<u8>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::ExternalService("QR code service is not configured".to_string())
        })?;

        let logo = match self.upload_logo().await {
            Ok(logo) => logo.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Failed to upload QR logo, generating without it: {}", e);
                String::new()
            }
        };

        let response = self
            .authorized(self.http.post(format!("{}/qr/custom", self.api_url)), api_key)
            .json(&QrRequest::new(data, &logo))
            .send()
            .await
            .map_err(|e| {
                self.metrics.record_upstream("qr_generate", "error");
                tracing::error!("QR code request failed: {}", e);
                AppError::ExternalService(QR_FAILED.to_string())
            })?;

        if !response.status().is_success() {
            self.metrics.record_upstream("qr_generate", "failure");
            tracing::error!("QR code service returned {}", response.status());
            return Err(AppError::ExternalService(QR_FAILED.to_string()));
        }

        let png = response.bytes().await?;
        self.metrics.record_upstream("qr_generate", "success");
        Ok(png.to_vec())
    }

    pub async fn generate_for_bookbox(&self, bookbox_id: &str) -> Result<Vec<u8>> {
        self.generate(&self.payload_for(bookbox_id)).await
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "logo.png".to_string())
}

/// Inlines a PNG so the dashboard can show it without a second request.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
