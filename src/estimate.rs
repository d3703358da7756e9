//! The cost estimator: OCR text in, quote out.
//!
//! ## Model
//!
//! ```text
//! volume      = L/10 · W/10 · T/10                       [cm³]
//! raw weight  = volume · density / 1000                  [kg]
//! material    = raw weight · price/kg
//! runtime     = L/100 · min/100mm + base + Σfeatures · min/feature   [min]
//! machining   = runtime / 60 · hourly rate
//! unit price  = ((setup + programming) / qty + material + machining) · margin
//! ```
//!
//! The estimator is a pure function of its configuration and the request.
//! It holds no mutable state, so one instance can be shared across every
//! request of a server behind an `Arc`.

use crate::analysis::{extract_dimensions, has_micron_tolerance, scan_features};
use crate::catalog::{normalise_key, DEFAULT_MATERIAL};
use crate::config::EstimatorConfig;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

/// Input to a single estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationRequest {
    /// Full OCR text of the drawing.
    pub raw_text: String,
    /// Ordered quantity, at least 1.
    pub quantity: u32,
    /// Material name as given by the caller.
    pub material_key: String,
}

impl EstimationRequest {
    /// Build a request. A quantity of 0 is raised to 1 so the per-job
    /// overhead can always be divided.
    pub fn new(raw_text: impl Into<String>, quantity: u32, material_key: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            quantity: quantity.max(1),
            material_key: material_key.into(),
        }
    }

    /// Request for one part in the default material.
    pub fn single(raw_text: impl Into<String>) -> Self {
        Self::new(raw_text, 1, DEFAULT_MATERIAL)
    }
}

/// A full automatic quote.
///
/// Field names on the wire are the German names the shop front-end expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    /// Price per part including margin.
    #[serde(rename = "preis")]
    pub price: f64,
    #[serde(rename = "laenge")]
    pub length_mm: f64,
    #[serde(rename = "breite")]
    pub width_mm: f64,
    #[serde(rename = "dicke")]
    pub thickness_mm: f64,
    #[serde(rename = "laufzeit_min")]
    pub runtime_minutes: f64,
    #[serde(rename = "materialkosten")]
    pub material_cost: f64,
    #[serde(rename = "rohgewicht")]
    pub raw_weight_kg: f64,
    /// Case-folded material key as requested, even when it hit the fallback price.
    pub material: String,
    /// Leading characters of the OCR text, for tracing a quote back to its input.
    #[serde(rename = "text")]
    pub text_excerpt: String,
}

/// Outcome of an estimation.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimationResult {
    /// The drawing carries micron tolerances; a human must quote it.
    ManualReview,
    Quote(Quote),
}

impl EstimationResult {
    pub fn is_manual(&self) -> bool {
        matches!(self, EstimationResult::ManualReview)
    }

    pub fn as_quote(&self) -> Option<&Quote> {
        match self {
            EstimationResult::Quote(q) => Some(q),
            EstimationResult::ManualReview => None,
        }
    }
}

/// `ManualReview` serialises as `{"manuell": true}`, a quote as its fields.
impl Serialize for EstimationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EstimationResult::ManualReview => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("manuell", &true)?;
                map.end()
            }
            EstimationResult::Quote(quote) => quote.serialize(serializer),
        }
    }
}

/// Turns OCR text into quotes using an injected [`EstimatorConfig`].
#[derive(Debug, Clone, Default)]
pub struct CostEstimator {
    config: EstimatorConfig,
}

impl CostEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate price, raw weight and runtime for one drawing.
    ///
    /// Returns [`EstimationResult::ManualReview`] without computing anything
    /// else when the text contains a micron tolerance.
    pub fn estimate(&self, request: &EstimationRequest) -> EstimationResult {
        let material = self.config.catalog.lookup(&request.material_key);
        let p = &self.config.pricing;

        if has_micron_tolerance(&request.raw_text) {
            debug!("Micron tolerance found, quote needs manual review");
            return EstimationResult::ManualReview;
        }

        let dims = extract_dimensions(&request.raw_text);
        let features = scan_features(&request.raw_text, &self.config.vocabulary);
        debug!(
            "Dimensions {}×{}×{} mm, {} feature lines",
            dims.length_mm,
            dims.width_mm,
            dims.thickness_mm,
            features.total()
        );

        let raw_weight_kg = dims.volume_cm3() * material.density_g_cm3 / 1000.0;
        let material_cost = raw_weight_kg * material.price_per_kg;

        let runtime_minutes = dims.length_mm / 100.0 * p.minutes_per_100mm
            + p.base_minutes
            + features.total() as f64 * p.minutes_per_feature_line;
        let machining_cost = runtime_minutes / 60.0 * p.hourly_rate;

        let quantity = f64::from(request.quantity.max(1));
        let unit_price =
            (p.setup_cost + p.programming_cost) / quantity + material_cost + machining_cost;
        let price = unit_price * p.margin;

        EstimationResult::Quote(Quote {
            price,
            length_mm: dims.length_mm,
            width_mm: dims.width_mm,
            thickness_mm: dims.thickness_mm,
            runtime_minutes,
            material_cost,
            raw_weight_kg,
            material: normalise_key(&request.material_key),
            text_excerpt: excerpt(&request.raw_text, p.excerpt_chars),
        })
    }
}

/// First `n` characters of `text`, never splitting a UTF-8 sequence.
fn excerpt(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}
