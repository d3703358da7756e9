//! HTTP front-end: `POST /pdf/analyze` with a multipart drawing upload.
//!
//! The handler is glue only. It reads the multipart fields, hands the image
//! to [`crate::quote::quote_upload`] and maps the outcome to a status code:
//!
//! | Outcome                         | Status | Body                                   |
//! |---------------------------------|--------|----------------------------------------|
//! | Quote                           | 200    | quote fields (`preis`, `laenge`, …)   |
//! | Micron tolerance                | 200    | `{"manuell": true}`                    |
//! | Missing file / not an image     | 400    | `{"error": "Nur Bilddateien erlaubt."}`|
//! | Unreadable or oversized body    | 500    | `{"error": "Analyse fehlgeschlagen."}` |
//! | Anything else                   | 500    | `{"error": "Analyse fehlgeschlagen."}` |
//!
//! Internal error details are logged, never returned to the client.

use crate::error::QuoteError;
use crate::estimate::CostEstimator;
use crate::ocr::OcrEngine;
use crate::quote::{quote_upload, QuoteParams};
use crate::upload::ImageUpload;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Message returned for rejected uploads.
pub const INVALID_UPLOAD_MESSAGE: &str = "Nur Bilddateien erlaubt.";
/// Message returned for every internal failure.
pub const PROCESSING_FAILED_MESSAGE: &str = "Analyse fehlgeschlagen.";

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Default: `0.0.0.0:3001`, port overridable via `PORT`.
    pub bind: SocketAddr,
    /// Maximum request body size in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3001)),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Defaults with the port taken from `PORT` when it parses.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.bind.set_port(port);
        }
        config
    }
}

/// Shared, immutable per-process state.
#[derive(Clone)]
pub struct AppState {
    pub estimator: Arc<CostEstimator>,
    pub ocr: Arc<dyn OcrEngine>,
}

impl AppState {
    pub fn new(estimator: CostEstimator, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            estimator: Arc::new(estimator),
            ocr,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    ocr: String,
}

/// Build the application router.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/pdf/analyze", post(analyze))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, config: ServerConfig) -> Result<(), QuoteError> {
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| QuoteError::Internal(format!("Failed to bind {}: {e}", config.bind)))?;
    info!("Listening on http://{}", config.bind);

    axum::serve(listener, router(state, &config))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| QuoteError::Internal(format!("Server error: {e}")))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ocr: state.ocr.name().to_string(),
    })
}

/// Multipart fields of an analyze request.
#[derive(Default)]
struct AnalyzeForm {
    file: Option<ImageUpload>,
    stueckzahl: Option<String>,
    material: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<AnalyzeForm, QuoteError> {
    let mut form = AnalyzeForm::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(QuoteError::UploadRead {
                    detail: format!("{} ({})", e.body_text(), e.status()),
                })
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().map(str::to_string);
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| QuoteError::UploadRead {
                    detail: format!("{} ({})", e.body_text(), e.status()),
                })?;
                let mut upload = ImageUpload::new(bytes.to_vec());
                upload.content_type = content_type;
                upload.filename = filename;
                form.file = Some(upload);
            }
            "stueckzahl" => form.stueckzahl = field.text().await.ok(),
            "material" => form.material = field.text().await.ok(),
            other => warn!("Ignoring unknown form field '{}'", other),
        }
    }
    Ok(form)
}

async fn analyze(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(e),
    };
    let Some(upload) = form.file else {
        return error_response(QuoteError::MissingFile);
    };
    let params = QuoteParams::from_form(form.stueckzahl.as_deref(), form.material.as_deref());

    match quote_upload(&upload, &params, &state.estimator, state.ocr.as_ref()).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(err: QuoteError) -> Response {
    if err.is_client_error() {
        warn!("Rejected upload: {}", err);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: INVALID_UPLOAD_MESSAGE.to_string(),
            }),
        )
            .into_response()
    } else {
        error!("Analysis failed: {}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: PROCESSING_FAILED_MESSAGE.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::StaticTextOcr;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::path::Path;
    use tower::ServiceExt;

    const BOUNDARY: &str = "XQUOTEBOUNDARY";
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    struct FailingOcr;

    #[async_trait]
    impl OcrEngine for FailingOcr {
        fn name(&self) -> &str {
            "failing"
        }

        async fn recognize(&self, _image: &Path) -> Result<String, QuoteError> {
            Err(QuoteError::OcrFailed {
                retries: 2,
                detail: "secret backend detail".into(),
            })
        }
    }

    fn app(ocr: Arc<dyn OcrEngine>) -> Router {
        app_with(ocr, ServerConfig::default())
    }

    fn app_with(ocr: Arc<dyn OcrEngine>, config: ServerConfig) -> Router {
        router(AppState::new(CostEstimator::default(), ocr), &config)
    }

    fn multipart_body(file: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((content_type, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"zeichnung.png\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn analyze_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/pdf/analyze")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1_000_000)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn quote_for_image_upload() {
        let ocr = Arc::new(StaticTextOcr::new("50mm 20mm 5mm"));
        let body = multipart_body(
            Some(("image/png", PNG_MAGIC)),
            &[("stueckzahl", "2"), ("material", "Stahl")],
        );
        let (status, json) = send(app(ocr), analyze_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["laenge"], 50.0);
        assert_eq!(json["breite"], 20.0);
        assert_eq!(json["dicke"], 5.0);
        assert_eq!(json["material"], "stahl");
        assert_eq!(json["text"], "50mm 20mm 5mm");
        assert!(json["preis"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn micron_tolerance_returns_manual_flag() {
        let ocr = Arc::new(StaticTextOcr::new("80mm\nToleranz: 5µm"));
        let body = multipart_body(Some(("image/jpeg", PNG_MAGIC)), &[]);
        let (status, json) = send(app(ocr), analyze_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "manuell": true }));
    }

    #[tokio::test]
    async fn non_image_is_bad_request() {
        let ocr = Arc::new(StaticTextOcr::new("50mm"));
        let body = multipart_body(Some(("application/pdf", b"%PDF-1.7")), &[]);
        let (status, json) = send(app(ocr), analyze_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], INVALID_UPLOAD_MESSAGE);
    }

    #[tokio::test]
    async fn missing_file_is_bad_request() {
        let ocr = Arc::new(StaticTextOcr::new("50mm"));
        let body = multipart_body(None, &[("stueckzahl", "3")]);
        let (status, _) = send(app(ocr), analyze_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ocr_failure_is_opaque_500() {
        let body = multipart_body(Some(("image/png", PNG_MAGIC)), &[]);
        let (status, json) = send(app(Arc::new(FailingOcr)), analyze_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], PROCESSING_FAILED_MESSAGE);
        assert!(!json.to_string().contains("secret backend detail"));
    }

    #[tokio::test]
    async fn oversized_image_is_not_reported_as_non_image() {
        let ocr = Arc::new(StaticTextOcr::new("50mm"));
        let config = ServerConfig {
            max_upload_bytes: 1024,
            ..ServerConfig::default()
        };
        let mut png = PNG_MAGIC.to_vec();
        png.resize(4096, 0);
        let body = multipart_body(Some(("image/png", png.as_slice())), &[]);
        let (status, json) = send(app_with(ocr, config), analyze_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], PROCESSING_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn truncated_body_is_opaque_500() {
        let ocr = Arc::new(StaticTextOcr::new("50mm"));
        let mut png = PNG_MAGIC.to_vec();
        png.resize(512, 0);
        let mut body = multipart_body(Some(("image/png", png.as_slice())), &[]);
        body.truncate(body.len() - 64);
        let (status, json) = send(app(ocr), analyze_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], PROCESSING_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn health_reports_backend() {
        let ocr = Arc::new(StaticTextOcr::new(""));
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app(ocr), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ocr"], "static");
    }
}
