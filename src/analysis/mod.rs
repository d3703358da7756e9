//! Text analysis stages for quote estimation.
//!
//! Each submodule reads the raw OCR text and derives exactly one signal.
//! None of them looks at the image; they only see what the OCR backend
//! reported, with no guaranteed layout or reading order.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌─▶ tolerance  (micron callout? → manual review, stop)
//! raw text ──┤
//!            ├─▶ dimensions (mm values ranked into L × W × T)
//!            └─▶ features   (keyword line counts → extra runtime)
//! ```
//!
//! 1. [`tolerance`]  — conservative detector for µm tolerances
//! 2. [`dimensions`] — magnitude-ranked millimetre measurements
//! 3. [`features`]   — per-keyword count of lines mentioning a feature

pub mod dimensions;
pub mod features;
pub mod tolerance;

pub use dimensions::{extract_dimensions, DimensionTriple};
pub use features::{scan_features, FeatureCounts, DEFAULT_FEATURE_KEYWORDS};
pub use tolerance::has_micron_tolerance;
