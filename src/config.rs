//! Configuration types for quote estimation.
//!
//! Every business assumption the estimator relies on (setup and programming
//! overhead, hourly machine rate, profit margin, runtime model, material
//! prices) lives in [`EstimatorConfig`]. Nothing in the estimation logic is a
//! literal price, so a shop can retune its quotes from a JSON file and tests
//! can vary a single knob without touching code.
//!
//! OCR access is configured separately through [`OcrConfig`] because the
//! engine never talks to the OCR service itself.

use crate::analysis::DEFAULT_FEATURE_KEYWORDS;
use crate::catalog::MaterialCatalog;
use crate::error::QuoteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Cost and runtime model parameters.
///
/// Defaults reproduce the shop's historical quoting sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingParams {
    /// Machine setup cost per job. Default: 60.
    pub setup_cost: f64,

    /// CAM programming cost per job. Default: 30.
    ///
    /// Setup and programming are paid once per order and spread over the
    /// ordered quantity, which is why single parts are so much dearer.
    pub programming_cost: f64,

    /// Machine hourly rate. Default: 35.
    pub hourly_rate: f64,

    /// Multiplier applied to the unit price. Default: 1.15 (15 % profit).
    pub margin: f64,

    /// Fixed runtime allowance per part in minutes. Default: 2.
    pub base_minutes: f64,

    /// Runtime per 100 mm of part length in minutes. Default: 1.
    pub minutes_per_100mm: f64,

    /// Runtime added per line mentioning a feature keyword. Default: 0.5.
    pub minutes_per_feature_line: f64,

    /// Characters of OCR text echoed back in the quote. Default: 300.
    pub excerpt_chars: usize,
}

impl Default for PricingParams {
    fn default() -> Self {
        Self {
            setup_cost: 60.0,
            programming_cost: 30.0,
            hourly_rate: 35.0,
            margin: 1.15,
            base_minutes: 2.0,
            minutes_per_100mm: 1.0,
            minutes_per_feature_line: 0.5,
            excerpt_chars: 300,
        }
    }
}

/// Complete estimator configuration: material table, pricing, feature vocabulary.
///
/// Built via [`EstimatorConfig::builder()`], loaded with
/// [`EstimatorConfig::from_json_file`], or taken as
/// [`EstimatorConfig::default()`].
///
/// # Example
/// ```rust
/// use drawing_quote::EstimatorConfig;
///
/// let config = EstimatorConfig::builder()
///     .hourly_rate(48.0)
///     .margin(1.25)
///     .build()
///     .unwrap();
/// assert_eq!(config.pricing.hourly_rate, 48.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub catalog: MaterialCatalog,
    pub pricing: PricingParams,
    /// Feature keywords, matched as case-insensitive substrings per line.
    pub vocabulary: Vec<String>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            catalog: MaterialCatalog::default(),
            pricing: PricingParams::default(),
            vocabulary: DEFAULT_FEATURE_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

impl EstimatorConfig {
    /// Create a new builder for `EstimatorConfig`.
    pub fn builder() -> EstimatorConfigBuilder {
        EstimatorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load a configuration from a JSON file.
    ///
    /// Missing fields keep their defaults, so a file containing only
    /// `{"pricing": {"margin": 1.3}}` is valid. The result is validated the
    /// same way the builder validates.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, QuoteError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| QuoteError::ConfigLoad {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let config: EstimatorConfig =
            serde_json::from_str(&raw).map_err(|e| QuoteError::ConfigLoad {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the estimator relies on.
    pub fn validate(&self) -> Result<(), QuoteError> {
        let p = &self.pricing;
        if !(p.margin >= 1.0) {
            return Err(QuoteError::InvalidConfig(format!(
                "margin must be ≥ 1.0 so the price never drops below cost, got {}",
                p.margin
            )));
        }
        if !(p.hourly_rate > 0.0) {
            return Err(QuoteError::InvalidConfig(format!(
                "hourly rate must be > 0, got {}",
                p.hourly_rate
            )));
        }
        for (name, value) in [
            ("setup cost", p.setup_cost),
            ("programming cost", p.programming_cost),
            ("base minutes", p.base_minutes),
            ("minutes per 100 mm", p.minutes_per_100mm),
            ("minutes per feature line", p.minutes_per_feature_line),
        ] {
            if !(value >= 0.0) {
                return Err(QuoteError::InvalidConfig(format!(
                    "{name} must be ≥ 0, got {value}"
                )));
            }
        }
        if self.vocabulary.is_empty() {
            return Err(QuoteError::InvalidConfig(
                "feature vocabulary must contain at least one keyword".into(),
            ));
        }
        if self.vocabulary.iter().any(|k| k.trim().is_empty()) {
            return Err(QuoteError::InvalidConfig(
                "feature keywords must not be empty".into(),
            ));
        }
        for entry in self
            .catalog
            .entries()
            .chain(std::iter::once(self.catalog.fallback()))
        {
            if !(entry.density_g_cm3 > 0.0) || !(entry.price_per_kg >= 0.0) {
                return Err(QuoteError::InvalidConfig(format!(
                    "material '{}' needs a positive density and a non-negative price",
                    entry.name
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`EstimatorConfig`].
#[derive(Debug)]
pub struct EstimatorConfigBuilder {
    config: EstimatorConfig,
}

impl EstimatorConfigBuilder {
    pub fn catalog(mut self, catalog: MaterialCatalog) -> Self {
        self.config.catalog = catalog;
        self
    }

    pub fn pricing(mut self, pricing: PricingParams) -> Self {
        self.config.pricing = pricing;
        self
    }

    pub fn setup_cost(mut self, cost: f64) -> Self {
        self.config.pricing.setup_cost = cost;
        self
    }

    pub fn programming_cost(mut self, cost: f64) -> Self {
        self.config.pricing.programming_cost = cost;
        self
    }

    pub fn hourly_rate(mut self, rate: f64) -> Self {
        self.config.pricing.hourly_rate = rate;
        self
    }

    pub fn margin(mut self, margin: f64) -> Self {
        self.config.pricing.margin = margin;
        self
    }

    pub fn base_minutes(mut self, minutes: f64) -> Self {
        self.config.pricing.base_minutes = minutes;
        self
    }

    pub fn minutes_per_100mm(mut self, minutes: f64) -> Self {
        self.config.pricing.minutes_per_100mm = minutes;
        self
    }

    pub fn minutes_per_feature_line(mut self, minutes: f64) -> Self {
        self.config.pricing.minutes_per_feature_line = minutes;
        self
    }

    pub fn excerpt_chars(mut self, n: usize) -> Self {
        self.config.pricing.excerpt_chars = n;
        self
    }

    pub fn vocabulary<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.vocabulary = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EstimatorConfig, QuoteError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── OCR ──────────────────────────────────────────────────────────────────

/// Default Google Cloud Vision REST endpoint.
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Connection settings for the OCR backend.
#[derive(Clone)]
pub struct OcrConfig {
    /// `images:annotate` endpoint. Default: [`DEFAULT_VISION_ENDPOINT`].
    pub endpoint: String,

    /// API key appended as `?key=`. Read from `GOOGLE_VISION_API_KEY` by
    /// [`OcrConfig::from_env`].
    pub api_key: Option<String>,

    /// Per-call timeout in seconds. Default: 30.
    pub timeout_secs: u64,

    /// Maximum retry attempts on a transient failure. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Optional language hints passed to the OCR backend. Default: `["de"]`.
    pub language_hints: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 500,
            language_hints: vec!["de".to_string()],
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("language_hints", &self.language_hints)
            .finish()
    }
}

impl OcrConfig {
    /// Defaults plus `GOOGLE_VISION_API_KEY` / `GOOGLE_VISION_ENDPOINT` from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var("GOOGLE_VISION_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Ok(endpoint) = std::env::var("GOOGLE_VISION_ENDPOINT") {
            if !endpoint.is_empty() {
                config.endpoint = endpoint;
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MaterialEntry;
    use std::io::Write;

    #[test]
    fn defaults_match_quoting_sheet() {
        let p = PricingParams::default();
        assert_eq!(p.setup_cost + p.programming_cost, 90.0);
        assert_eq!(p.hourly_rate, 35.0);
        assert_eq!(p.margin, 1.15);
        assert_eq!(p.excerpt_chars, 300);
        assert!(EstimatorConfig::default().validate().is_ok());
    }

    #[test]
    fn margin_below_one_is_rejected() {
        let err = EstimatorConfig::builder().margin(0.9).build().unwrap_err();
        assert!(matches!(err, QuoteError::InvalidConfig(_)));
    }

    #[test]
    fn nan_rate_is_rejected() {
        assert!(EstimatorConfig::builder()
            .hourly_rate(f64::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn negative_setup_cost_is_rejected() {
        assert!(EstimatorConfig::builder().setup_cost(-1.0).build().is_err());
    }

    #[test]
    fn zero_density_is_rejected() {
        let catalog = MaterialCatalog::new(
            [MaterialEntry::new("schaum", 2.0, 0.0)],
            MaterialEntry::new("aluminium", 7.0, 2.7),
        );
        assert!(EstimatorConfig::builder().catalog(catalog).build().is_err());
    }

    #[test]
    fn blank_keyword_is_rejected() {
        assert!(EstimatorConfig::builder()
            .vocabulary(["bohrung", " "])
            .build()
            .is_err());
    }

    #[test]
    fn empty_vocabulary_is_rejected() {
        let err = EstimatorConfig::builder()
            .vocabulary(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("vocabulary"));
    }

    #[test]
    fn empty_vocabulary_in_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"vocabulary": []}}"#).unwrap();
        file.flush().unwrap();
        assert!(EstimatorConfig::from_json_file(file.path()).is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pricing": {{"margin": 1.3}}}}"#).unwrap();

        let config = EstimatorConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.pricing.margin, 1.3);
        assert_eq!(config.pricing.hourly_rate, 35.0);
        assert_eq!(config.vocabulary.len(), 5);
        assert_eq!(config.catalog.lookup("kupfer").price_per_kg, 10.0);
    }

    #[test]
    fn invalid_json_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = EstimatorConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, QuoteError::ConfigLoad { .. }));
    }

    #[test]
    fn ocr_config_debug_redacts_key() {
        let config = OcrConfig {
            api_key: Some("secret-key".into()),
            ..OcrConfig::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }
}
