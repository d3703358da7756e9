//! OCR collaborators: turn a staged drawing into plain text.
//!
//! The estimator never sees pixels. Whatever implements [`OcrEngine`] is the
//! only component that reads the image file staged by
//! [`crate::upload::StagedUpload`]; everything downstream works on the
//! string it returns. An empty string is a valid answer (blank sheet, or
//! text the backend could not read) and simply leads to a default-sized
//! quote.
//!
//! ## Retry Strategy
//!
//! Cloud OCR endpoints return 429/5xx under load. [`GoogleVisionOcr`] retries
//! those with exponential backoff (`retry_backoff_ms * 2^attempt`), so with
//! the defaults a request waits at most 500 ms + 1 s before giving up.
//! Errors reported inside a 200 response (bad image, permission denied) are
//! not retried.

use crate::config::OcrConfig;
use crate::error::QuoteError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Something that can read the text on a drawing.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Recognise all text in the image file at `image`.
    async fn recognize(&self, image: &Path) -> Result<String, QuoteError>;
}

/// Returns a fixed text for every image.
///
/// Used when the text is already known (the CLI `text` mode) and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTextOcr {
    text: String,
}

impl StaticTextOcr {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl OcrEngine for StaticTextOcr {
    fn name(&self) -> &str {
        "static"
    }

    async fn recognize(&self, _image: &Path) -> Result<String, QuoteError> {
        Ok(self.text.clone())
    }
}

// ── Google Cloud Vision ──────────────────────────────────────────────────

/// Google Cloud Vision `TEXT_DETECTION` over the REST API.
pub struct GoogleVisionOcr {
    client: reqwest::Client,
    config: OcrConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest<'a> {
    image: VisionImage,
    features: Vec<VisionFeature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_context: Option<ImageContext<'a>>,
}

#[derive(Debug, Serialize)]
struct VisionImage {
    content: String,
}

#[derive(Debug, Serialize)]
struct VisionFeature {
    #[serde(rename = "type")]
    feature_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext<'a> {
    language_hints: &'a [String],
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<VisionStatus>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct VisionStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(String),
    /// Worth retrying (network error, 429, 5xx).
    Transient(String),
    Fatal(QuoteError),
}

impl GoogleVisionOcr {
    /// Create a client from `config`. Fails when no API key is configured.
    pub fn new(config: OcrConfig) -> Result<Self, QuoteError> {
        if config.api_key.is_none() {
            return Err(QuoteError::OcrNotConfigured {
                backend: "google-vision".to_string(),
                hint: "Set GOOGLE_VISION_API_KEY to a Cloud Vision API key.".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| QuoteError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create a client from `GOOGLE_VISION_API_KEY` / `GOOGLE_VISION_ENDPOINT`.
    pub fn from_env() -> Result<Self, QuoteError> {
        Self::new(OcrConfig::from_env())
    }

    fn build_request<'a>(&'a self, image: &[u8]) -> AnnotateRequest<'a> {
        let image_context = if self.config.language_hints.is_empty() {
            None
        } else {
            Some(ImageContext {
                language_hints: &self.config.language_hints,
            })
        };
        AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: VisionImage {
                    content: STANDARD.encode(image),
                },
                features: vec![VisionFeature {
                    feature_type: "TEXT_DETECTION",
                }],
                image_context,
            }],
        }
    }

    async fn attempt(&self, body: &AnnotateRequest<'_>) -> Attempt {
        let key = self.config.api_key.as_deref().unwrap_or_default();
        let response = match self
            .client
            .post(&self.config.endpoint)
            .query(&[("key", key)])
            .json(body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Attempt::Fatal(QuoteError::OcrTimeout {
                    secs: self.config.timeout_secs,
                })
            }
            Err(e) => return Attempt::Transient(e.to_string()),
        };

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Attempt::Transient(format!("HTTP {status}"));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Attempt::Fatal(QuoteError::OcrFailed {
                retries: 0,
                detail: format!("HTTP {status}: {}", truncate(&body, 200)),
            });
        }

        match response.json::<AnnotateResponse>().await {
            Ok(parsed) => match extract_text(parsed) {
                Ok(text) => Attempt::Done(text),
                Err(e) => Attempt::Fatal(e),
            },
            Err(e) => Attempt::Fatal(QuoteError::OcrFailed {
                retries: 0,
                detail: format!("Unreadable response: {e}"),
            }),
        }
    }
}

#[async_trait]
impl OcrEngine for GoogleVisionOcr {
    fn name(&self) -> &str {
        "google-vision"
    }

    async fn recognize(&self, image: &Path) -> Result<String, QuoteError> {
        let bytes = read_image(image).await?;
        let body = self.build_request(&bytes);
        let mut last_err: Option<String> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.config.retry_backoff_ms, attempt);
                warn!(
                    "OCR: retry {}/{} after {}ms",
                    attempt, self.config.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.attempt(&body).await {
                Attempt::Done(text) => {
                    debug!("OCR: {} characters recognised", text.chars().count());
                    return Ok(text);
                }
                Attempt::Fatal(e) => return Err(e),
                Attempt::Transient(msg) => {
                    warn!("OCR: attempt {} failed: {}", attempt + 1, msg);
                    last_err = Some(msg);
                }
            }
        }

        Err(QuoteError::OcrFailed {
            retries: self.config.max_retries,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

async fn read_image(path: &Path) -> Result<Vec<u8>, QuoteError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| QuoteError::StagingFailed { source })?;
    debug!("OCR: read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Delay before retry number `attempt` (1-based), saturating on overflow.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Pull the full text out of a Vision response; missing text is an empty page.
fn extract_text(response: AnnotateResponse) -> Result<String, QuoteError> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(status) = first.error {
        return Err(QuoteError::OcrFailed {
            retries: 0,
            detail: format!("Vision error {}: {}", status.code, status.message),
        });
    }
    Ok(first
        .full_text_annotation
        .map(|a| a.text)
        .unwrap_or_default())
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
