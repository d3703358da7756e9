//! Material catalog: price per kilogram and density per material name.
//!
//! The catalog is plain data. It is owned by [`crate::config::EstimatorConfig`]
//! and handed to the estimator at construction, so a shop can ship its own
//! price list as JSON without touching any estimation logic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the material used when the caller names none.
pub const DEFAULT_MATERIAL: &str = "aluminium";

/// Pricing and physical data for one material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialEntry {
    pub name: String,
    /// Raw material price in currency units per kilogram.
    pub price_per_kg: f64,
    /// Density in g/cm³.
    pub density_g_cm3: f64,
}

impl MaterialEntry {
    pub fn new(name: impl Into<String>, price_per_kg: f64, density_g_cm3: f64) -> Self {
        Self {
            name: name.into(),
            price_per_kg,
            density_g_cm3,
        }
    }
}

/// Immutable material table keyed by lower-cased name.
///
/// Serialised as `{"materials": [...], "fallback": {...}}`; keys are
/// re-derived from the entry names on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CatalogFile", into = "CatalogFile")]
pub struct MaterialCatalog {
    entries: BTreeMap<String, MaterialEntry>,
    /// Returned for any key not present in `entries`.
    fallback: MaterialEntry,
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        Self::new(
            [
                MaterialEntry::new("aluminium", 7.0, 2.7),
                MaterialEntry::new("edelstahl", 6.5, 7.9),
                MaterialEntry::new("stahl", 1.5, 7.85),
                MaterialEntry::new("messing", 8.0, 8.5),
                MaterialEntry::new("kupfer", 10.0, 8.96),
            ],
            MaterialEntry::new(DEFAULT_MATERIAL, 7.0, 2.7),
        )
    }
}

impl MaterialCatalog {
    /// Build a catalog from entries. Names are case-folded into keys; a later
    /// entry with the same key replaces an earlier one.
    pub fn new(entries: impl IntoIterator<Item = MaterialEntry>, fallback: MaterialEntry) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (normalise_key(&e.name), e))
            .collect();
        Self { entries, fallback }
    }

    /// Resolve a material by name, falling back to the default entry.
    ///
    /// Unknown names are not an error: the shop's policy is to price them
    /// like aluminium.
    pub fn lookup(&self, key: &str) -> &MaterialEntry {
        self.entries
            .get(&normalise_key(key))
            .unwrap_or(&self.fallback)
    }

    /// Whether `key` names a material in the table (as opposed to hitting the fallback).
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&normalise_key(key))
    }

    pub fn fallback(&self) -> &MaterialEntry {
        &self.fallback
    }

    /// All entries, ordered by key.
    pub fn entries(&self) -> impl Iterator<Item = &MaterialEntry> {
        self.entries.values()
    }
}

#[derive(Serialize, Deserialize)]
struct CatalogFile {
    materials: Vec<MaterialEntry>,
    fallback: MaterialEntry,
}

impl From<CatalogFile> for MaterialCatalog {
    fn from(file: CatalogFile) -> Self {
        MaterialCatalog::new(file.materials, file.fallback)
    }
}

impl From<MaterialCatalog> for CatalogFile {
    fn from(catalog: MaterialCatalog) -> Self {
        CatalogFile {
            materials: catalog.entries.into_values().collect(),
            fallback: catalog.fallback,
        }
    }
}

/// Case-fold and trim a material name into a catalog key.
pub fn normalise_key(key: &str) -> String {
    key.trim().to_lowercase()
}
