//! # drawing-quote
//!
//! Estimate a machining quote (price, raw-material weight, runtime) for a
//! metal part from one photographed technical drawing.
//!
//! ## Why text, not geometry?
//!
//! Shop-floor drawings arrive as phone photos: skewed, half-shadowed, often
//! hand-annotated. Reconstructing geometry from them is out of reach, but
//! OCR reliably recovers the dimension callouts, the tolerance notes and the
//! feature labels. That text is enough for a first quote that errs toward
//! asking a human whenever precision work is involved.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image
//!  │
//!  ├─ 1. Upload     MIME check, stage in a temp dir
//!  ├─ 2. OCR        Google Cloud Vision (or any OcrEngine) → raw text
//!  ├─ 3. Guard      micron tolerance? → {"manuell": true}, stop
//!  ├─ 4. Analyse    mm values → L × W × T, feature keywords → line counts
//!  ├─ 5. Estimate   weight, runtime, material + machining + overhead, margin
//!  └─ 6. Release    temp dir removed in the background
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use drawing_quote::{quote_text, CostEstimator, QuoteParams};
//!
//! let estimator = CostEstimator::default();
//! let params = QuoteParams::new(10, "stahl");
//! let result = quote_text("Platte 200mm x 80mm x 12mm\nBohrung Ø8", &params, &estimator);
//!
//! let quote = result.as_quote().expect("no micron tolerance on this drawing");
//! assert_eq!(quote.length_mm, 200.0);
//! assert!(quote.price > quote.material_cost);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum HTTP front-end (`POST /pdf/analyze`) |
//! | `cli`    | on      | Enables the `drawquote` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analysis;
pub mod catalog;
pub mod config;
pub mod error;
pub mod estimate;
pub mod ocr;
pub mod quote;
#[cfg(feature = "server")]
pub mod server;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analysis::{
    extract_dimensions, has_micron_tolerance, scan_features, DimensionTriple, FeatureCounts,
};
pub use catalog::{MaterialCatalog, MaterialEntry, DEFAULT_MATERIAL};
pub use config::{EstimatorConfig, EstimatorConfigBuilder, OcrConfig, PricingParams};
pub use error::QuoteError;
pub use estimate::{CostEstimator, EstimationRequest, EstimationResult, Quote};
pub use ocr::{GoogleVisionOcr, OcrEngine, StaticTextOcr};
pub use quote::{quote_image_file, quote_text, quote_upload, QuoteParams};
pub use upload::{load_image_file, ImageUpload, StagedUpload};
