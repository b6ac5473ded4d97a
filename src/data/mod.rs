//! Core data models for the nisab proxy
//!
//! This module contains the cache key types, the nisab entry document that is
//! cached and served, the upstream client, and the offline fallback calculation.

pub mod fallback;
pub mod key;
pub mod upstream;

pub use fallback::{calculate_fallback, FallbackPriceTable, MetalWeights};
pub use key::{CacheKey, Currency, Standard};
pub use upstream::{IslamicApiClient, UpstreamError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a served entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Read from the cache store within the freshness window
    Cache,
    /// Fetched live from IslamicAPI
    #[serde(rename = "islamicapi")]
    IslamicApi,
    /// Computed locally from the fallback price table
    Fallback,
}

/// Threshold figures for a single metal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalThreshold {
    /// Reference weight in grams
    pub weight: f64,
    /// Price per gram in the entry's currency
    pub unit_price: f64,
    /// `unit_price * weight`
    pub nisab_amount: f64,
}

/// Gold and silver thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NisabThresholds {
    pub gold: MetalThreshold,
    pub silver: MetalThreshold,
}

/// The `data` object of a nisab entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NisabData {
    pub nisab_thresholds: NisabThresholds,
    pub zakat_rate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Any other fields sent by the upstream
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A nisab threshold document, as cached on disk and returned to clients
///
/// The header strings default to empty when the upstream omits them; call
/// [`NisabEntry::complete_with`] before persisting so stored entries are always
/// fully populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NisabEntry {
    pub code: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub calculation_standard: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub weight_unit: String,
    #[serde(default)]
    pub updated_at: String,
    pub data: NisabData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<String>,
    /// Which path served the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NisabEntry {
    /// Fills empty header fields from the request key and the given timestamp.
    pub fn complete_with(&mut self, key: &CacheKey, now: &str) {
        if self.status.is_empty() {
            self.status = "success".to_string();
        }
        if self.calculation_standard.is_empty() {
            self.calculation_standard = key.standard.as_str().to_string();
        }
        if self.currency.is_empty() {
            self.currency = key.currency.code().to_string();
        }
        if self.weight_unit.is_empty() {
            self.weight_unit = "gram".to_string();
        }
        if self.updated_at.is_empty() {
            self.updated_at = now.to_string();
        }
    }

    /// Sets the provenance fields
    pub fn annotate(&mut self, source: Source, cached_at: Option<String>, debug: &str) {
        self.source = Some(source);
        self.cached_at = cached_at;
        self.debug = Some(debug.to_string());
    }
}
