use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    config::Config,
    errors::{AppError, Result},
    services::metrics::MetricsService,
    utils::file::UploadedImage,
};

const UPLOAD_FAILED: &str = "Failed to upload image to image host";

/// Somewhere to put book-box photos; returns the public URL of the stored image.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, image: UploadedImage) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ImgbbResponse {
    data: ImgbbImage,
}

#[derive(Debug, Deserialize)]
struct ImgbbImage {
    url: String,
}

/// ImgBB-compatible upload API: `POST {url}?key={key}` with an `image` form field.
pub struct ImgbbHost {
    http: Client,
    upload_url: String,
    api_key: Option<String>,
    metrics: MetricsService,
}

impl ImgbbHost {
    pub fn new(
        http: Client,
        upload_url: &str,
        api_key: Option<String>,
        metrics: MetricsService,
    ) -> Self {
        Self {
            http,
            upload_url: upload_url.to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
            metrics,
        }
    }
}

#[async_trait]
impl ImageHost for ImgbbHost {
    async fn upload(&self, image: UploadedImage) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            tracing::error!("IMAGE_HOST_API_KEY is not configured");
            AppError::ExternalService(UPLOAD_FAILED.to_string())
        })?;

        let size = image.bytes.len();
        let part = multipart::Part::bytes(image.bytes)
            .file_name(image.filename)
            .mime_str(&image.mime_type)?;
        let form = multipart::Form::new().part("image", part);

        let response = self
            .http
            .post(&self.upload_url)
            .query(&[("key", api_key)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                self.metrics.record_upstream("image_upload", "error");
                tracing::error!("Image upload request failed: {}", e);
                AppError::ExternalService(UPLOAD_FAILED.to_string())
            })?;

        if !response.status().is_success() {
            self.metrics.record_upstream("image_upload", "failure");
            tracing::error!("Image host returned {}", response.status());
            return Err(AppError::ExternalService(UPLOAD_FAILED.to_string()));
        }

        let body: ImgbbResponse = response.json().await.map_err(|e| {
            self.metrics.record_upstream("image_upload", "failure");
            tracing::error!("Failed to parse image host response: {}", e);
            AppError::ExternalService(UPLOAD_FAILED.to_string())
        })?;

        self.metrics.record_upstream("image_upload", "success");
        tracing::info!("Uploaded {} bytes to image host: {}", size, body.data.url);
        Ok(body.data.url)
    }
}

pub fn create_image_host(config: &Config, http: Client, metrics: MetricsService) -> Arc<dyn ImageHost> {
    Arc::new(ImgbbHost::new(
        http,
        &config.image_host_url,
        config.image_host_api_key.clone(),
        metrics,
    ))
}
