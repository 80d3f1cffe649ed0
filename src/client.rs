//! Remote background removal service client
//!
//! [`BackgroundService`] is the seam the workflow talks to. [`RemoveBgClient`]
//! implements it over HTTP: one multipart POST carrying the `size` field and the
//! `image_file` part, with the credential in the `X-Api-Key` header.

use crate::config::ClientConfig;
use crate::error::{BgRemovalError, Result};
use crate::types::SourceImage;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Header carrying the credential
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Multipart field holding the sizing parameter
pub const SIZE_FIELD: &str = "size";

/// Multipart field holding the image payload
pub const IMAGE_FIELD: &str = "image_file";

/// Failure of a single removal request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceFailure {
    /// The service answered with a non-2xx status
    #[error("{status_code}: {status_text} - {body}")]
    Http {
        status_code: u16,
        status_text: String,
        body: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, reset)
    #[error("{message}")]
    Transport { message: String },
}

impl ServiceFailure {
    pub fn http(status_code: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Http {
            status_code,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// HTTP status code, when the service answered
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status_code, .. } => Some(*status_code),
            Self::Transport { .. } => None,
        }
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// A service able to remove the background of one image
#[async_trait]
pub trait BackgroundService: Send + Sync {
    /// Send `image` with `api_key` and return the processed image bytes
    ///
    /// # Errors
    /// - [`ServiceFailure::Http`] for non-2xx answers
    /// - [`ServiceFailure::Transport`] when no answer was received
    async fn remove_background(
        &self,
        image: &SourceImage,
        api_key: &str,
    ) -> std::result::Result<Bytes, ServiceFailure>;
}

/// HTTP client for remove.bg compatible endpoints
#[derive(Debug, Clone)]
pub struct RemoveBgClient {
    client: Client,
    config: ClientConfig,
}

impl RemoveBgClient {
    /// Create a client for the given configuration
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Failed to create HTTP client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            BgRemovalError::invalid_config(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self { client, config })
    }

    /// Client for the default remove.bg endpoint
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build_form(&self, image: &SourceImage) -> std::result::Result<Form, ServiceFailure> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.mime_type())
            .map_err(|e| {
                ServiceFailure::transport(format!(
                    "Invalid content type '{}': {}",
                    image.mime_type(),
                    e
                ))
            })?;

        Ok(Form::new()
            .text(SIZE_FIELD, self.config.size.clone())
            .part(IMAGE_FIELD, part))
    }
}

#[async_trait]
impl BackgroundService for RemoveBgClient {
    #[instrument(
        skip(self, image, api_key),
        fields(endpoint = %self.config.endpoint, file = %image.file_name(), bytes = image.len())
    )]
    async fn remove_background(
        &self,
        image: &SourceImage,
        api_key: &str,
    ) -> std::result::Result<Bytes, ServiceFailure> {
        let form = self.build_form(image)?;

        debug!("Sending background removal request");
        let response = self
            .client
            .post(&self.config.endpoint)
            .header(API_KEY_HEADER, api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Transport failure");
                ServiceFailure::transport(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ServiceFailure::transport(e.to_string()))?;
            info!(status = status.as_u16(), result_bytes = bytes.len(), "Background removed");
            return Ok(bytes);
        }

        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "Service rejected request");

        Err(ServiceFailure::Http {
            status_code: status.as_u16(),
            status_text,
            body,
        })
    }
}
