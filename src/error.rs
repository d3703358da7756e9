//! Error types for the drawing-quote library.
//!
//! The estimation engine itself never fails: missing dimensions and missing
//! feature keywords are absorbed by defaults, and a micron tolerance is a
//! valid [`crate::estimate::EstimationResult::ManualReview`] outcome rather
//! than an error. [`QuoteError`] therefore only covers the I/O glue around
//! the engine:
//!
//! * **Client faults** — the upload is missing or is not an image. Surfaced
//!   as HTTP 400 by the server.
//! * **Processing failures** — the request body could not be read, the OCR
//!   call failed, a temp file could not be written, the configuration is
//!   invalid. Logged in full, surfaced to HTTP callers as an opaque 500.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the drawing-quote library.
#[derive(Debug, Error)]
pub enum QuoteError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Image file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The request carried no file at all.
    #[error("No file provided")]
    MissingFile,

    /// The upload is not an image (declared or sniffed MIME is not `image/*`).
    #[error("Upload is not an image (content type: {content_type})")]
    NotAnImage { content_type: String },

    /// The request body could not be read (over the size limit, truncated,
    /// malformed multipart).
    #[error("Failed to read upload: {detail}")]
    UploadRead { detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// No OCR backend could be configured (missing API key etc.).
    #[error("OCR backend '{backend}' is not configured.\n{hint}")]
    OcrNotConfigured { backend: String, hint: String },

    /// The OCR service returned an error or an unreadable response.
    #[error("OCR failed after {retries} retries: {detail}")]
    OcrFailed { retries: u32, detail: String },

    /// The OCR call exceeded its timeout.
    #[error("OCR call timed out after {secs}s")]
    OcrTimeout { secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {detail}")]
    ConfigLoad { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write the upload to temporary storage or read it back.
    #[error("Failed to stage upload: {source}")]
    StagingFailed {
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuoteError {
    /// Whether the error was caused by the caller's input rather than by
    /// the service. Client errors map to HTTP 400, everything else to 500.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QuoteError::MissingFile | QuoteError::NotAnImage { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_an_image_display() {
        let e = QuoteError::NotAnImage {
            content_type: "application/pdf".into(),
        };
        assert!(e.to_string().contains("application/pdf"), "got: {e}");
    }

    #[test]
    fn ocr_failed_display() {
        let e = QuoteError::OcrFailed {
            retries: 2,
            detail: "quota exceeded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("2 retries"));
        assert!(msg.contains("quota exceeded"));
    }

    #[test]
    fn client_errors_are_classified() {
        assert!(QuoteError::MissingFile.is_client_error());
        assert!(QuoteError::NotAnImage {
            content_type: "text/plain".into()
        }
        .is_client_error());
        assert!(!QuoteError::OcrTimeout { secs: 30 }.is_client_error());
        assert!(!QuoteError::UploadRead {
            detail: "length limit exceeded".into()
        }
        .is_client_error());
        assert!(!QuoteError::Internal("boom".into()).is_client_error());
    }
}
