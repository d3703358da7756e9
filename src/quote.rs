//! Request-level entry points: upload in, quote out.
//!
//! These functions wire the I/O collaborators around the pure estimator:
//!
//! ```text
//! upload ─▶ MIME check ─▶ stage to temp dir ─▶ OCR ─▶ estimate ─▶ result
//!                                 └───────── release (background) ◀──┘
//! ```
//!
//! Only the OCR call awaits. The estimator itself runs synchronously on the
//! caller's task; it is a few regex scans and a dozen multiplications.

use crate::catalog::{normalise_key, DEFAULT_MATERIAL};
use crate::error::QuoteError;
use crate::estimate::{CostEstimator, EstimationRequest, EstimationResult};
use crate::ocr::OcrEngine;
use crate::upload::{load_image_file, ImageUpload, StagedUpload};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Caller-supplied quote parameters (`stueckzahl`, `material`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteParams {
    pub quantity: u32,
    pub material: String,
}

impl Default for QuoteParams {
    fn default() -> Self {
        Self {
            quantity: 1,
            material: DEFAULT_MATERIAL.to_string(),
        }
    }
}

impl QuoteParams {
    pub fn new(quantity: u32, material: impl Into<String>) -> Self {
        Self {
            quantity: quantity.max(1),
            material: material.into(),
        }
    }

    /// Build parameters from raw form fields.
    ///
    /// The quantity takes the leading integer of the field (`"25 Stk"` is
    /// 25); an absent, non-numeric or zero quantity becomes 1. A blank
    /// material becomes the default material.
    pub fn from_form(stueckzahl: Option<&str>, material: Option<&str>) -> Self {
        let quantity = stueckzahl.and_then(parse_leading_int).unwrap_or(1).max(1);
        let material = material
            .map(normalise_key)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MATERIAL.to_string());
        Self { quantity, material }
    }

    fn request(&self, raw_text: String) -> EstimationRequest {
        EstimationRequest::new(raw_text, self.quantity, self.material.clone())
    }
}

/// Leading decimal integer of `s` after optional whitespace and `+`.
///
/// Negative numbers and inputs without digits yield `None`; values beyond
/// `u32` saturate at `u32::MAX`.
fn parse_leading_int(s: &str) -> Option<u32> {
    let s = s.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let digits: &str = &s[..s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len())];
    if digits.is_empty() {
        return None;
    }
    Some(digits.bytes().fold(0u32, |acc, d| {
        acc.saturating_mul(10).saturating_add(u32::from(d - b'0'))
    }))
}

/// Estimate from already-recognised text. No I/O.
pub fn quote_text(
    text: impl Into<String>,
    params: &QuoteParams,
    estimator: &CostEstimator,
) -> EstimationResult {
    estimator.estimate(&params.request(text.into()))
}

/// Quote one uploaded drawing.
///
/// # Errors
/// - [`QuoteError::NotAnImage`] when the upload is not `image/*`; the OCR
///   backend is never called in that case
/// - [`QuoteError::StagingFailed`] when the temp copy cannot be written or
///   read back
/// - any error of the OCR backend
pub async fn quote_upload(
    upload: &ImageUpload,
    params: &QuoteParams,
    estimator: &CostEstimator,
    ocr: &dyn OcrEngine,
) -> Result<EstimationResult, QuoteError> {
    let start = Instant::now();
    upload.ensure_image()?;
    info!(
        "Quoting {} ({} bytes, qty {}, material {})",
        upload.filename.as_deref().unwrap_or("<upload>"),
        upload.bytes.len(),
        params.quantity,
        params.material
    );

    let staged = StagedUpload::stage(upload)?;
    let recognised = ocr.recognize(staged.path()).await;
    staged.release();
    let text = recognised?;
    debug!("OCR via {} returned {} characters", ocr.name(), text.chars().count());

    let result = quote_text(text, params, estimator);
    match &result {
        EstimationResult::ManualReview => info!(
            "Manual review required ({}ms)",
            start.elapsed().as_millis()
        ),
        EstimationResult::Quote(q) => info!(
            "Quoted {:.2} per part, {:.3} kg, {:.1} min ({}ms)",
            q.price,
            q.raw_weight_kg,
            q.runtime_minutes,
            start.elapsed().as_millis()
        ),
    }
    Ok(result)
}

/// Quote a drawing stored on the local file system.
pub async fn quote_image_file(
    path: impl AsRef<Path>,
    params: &QuoteParams,
    estimator: &CostEstimator,
    ocr: &dyn OcrEngine,
) -> Result<EstimationResult, QuoteError> {
    let upload = load_image_file(path)?;
    quote_upload(&upload, params, estimator, ocr).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Treats the staged file's bytes as the recognised text.
    #[derive(Default)]
    struct FileContentsOcr {
        seen: Mutex<Option<std::path::PathBuf>>,
    }

    #[async_trait]
    impl OcrEngine for FileContentsOcr {
        fn name(&self) -> &str {
            "file-contents"
        }

        async fn recognize(&self, image: &Path) -> Result<String, QuoteError> {
            *self.seen.lock().unwrap() = Some(image.to_path_buf());
            let bytes = tokio::fs::read(image)
                .await
                .map_err(|source| QuoteError::StagingFailed { source })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }

    #[test]
    fn form_defaults() {
        assert_eq!(QuoteParams::from_form(None, None), QuoteParams::default());
        assert_eq!(
            QuoteParams::from_form(Some(""), Some("  ")),
            QuoteParams::default()
        );
    }

    #[test]
    fn form_quantity_takes_leading_integer() {
        assert_eq!(QuoteParams::from_form(Some("25"), None).quantity, 25);
        assert_eq!(QuoteParams::from_form(Some(" 25 Stk"), None).quantity, 25);
        assert_eq!(QuoteParams::from_form(Some("3.7"), None).quantity, 3);
        assert_eq!(QuoteParams::from_form(Some("+4"), None).quantity, 4);
    }

    #[test]
    fn form_quantity_falls_back_to_one() {
        for raw in ["abc", "0", "-5", ""] {
            assert_eq!(QuoteParams::from_form(Some(raw), None).quantity, 1, "{raw}");
        }
    }

    #[test]
    fn form_quantity_saturates_on_overflow() {
        assert_eq!(
            QuoteParams::from_form(Some("99999999999"), None).quantity,
            u32::MAX
        );
        assert_eq!(
            QuoteParams::from_form(Some("4294967296 Stk"), None).quantity,
            u32::MAX
        );
    }

    #[test]
    fn form_material_is_case_folded() {
        assert_eq!(
            QuoteParams::from_form(None, Some("Edelstahl")).material,
            "edelstahl"
        );
    }

    #[tokio::test]
    async fn ocr_reads_the_staged_file() {
        let ocr = FileContentsOcr::default();
        let upload = ImageUpload::new(b"Platte 120mm 40mm 8mm".to_vec())
            .with_content_type("image/png")
            .with_filename("platte.png");

        let result = quote_upload(&upload, &QuoteParams::default(), &CostEstimator::default(), &ocr)
            .await
            .unwrap();

        let quote = result.as_quote().unwrap();
        assert_eq!(
            (quote.length_mm, quote.width_mm, quote.thickness_mm),
            (120.0, 40.0, 8.0)
        );
        let seen = ocr.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.file_name().unwrap(), "platte.png");
    }

    #[tokio::test]
    async fn non_image_never_reaches_ocr() {
        let ocr = FileContentsOcr::default();
        let upload = ImageUpload::new(b"%PDF-1.7".to_vec()).with_content_type("application/pdf");

        let err = quote_upload(&upload, &QuoteParams::default(), &CostEstimator::default(), &ocr)
            .await
            .unwrap_err();

        assert!(matches!(err, QuoteError::NotAnImage { .. }));
        assert!(ocr.seen.lock().unwrap().is_none());
    }

    #[test]
    fn quote_text_uses_params() {
        let estimator = CostEstimator::default();
        let one = quote_text("", &QuoteParams::new(1, "stahl"), &estimator);
        let ten = quote_text("", &QuoteParams::new(10, "stahl"), &estimator);
        assert!(one.as_quote().unwrap().price > ten.as_quote().unwrap().price);
    }
}
