//! Offline nisab calculation
//!
//! When IslamicAPI cannot be reached the proxy still answers, using reference
//! metal prices in USD and a static exchange-rate table. The figures are an
//! approximation and the entry says so in `data.notes`.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use super::{
    CacheKey, MetalThreshold, NisabData, NisabEntry, NisabThresholds, Source, Standard,
};

/// Reference price of gold per gram in USD
const GOLD_USD_PER_GRAM: f64 = 62.75;

/// Reference price of silver per gram in USD
const SILVER_USD_PER_GRAM: f64 = 0.85;

/// Weights used when a standard has no row in the table
const CLASSICAL_WEIGHTS: MetalWeights = MetalWeights {
    gold: 87.48,
    silver: 612.36,
};

const COMMON_WEIGHTS: MetalWeights = MetalWeights {
    gold: 85.0,
    silver: 595.0,
};

pub const FALLBACK_NOTES: &str = "Fallback calculation - API unavailable";
pub const FALLBACK_DEBUG: &str = "Using fallback calculation";

/// Reference weights in grams for one calculation standard
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetalWeights {
    pub gold: f64,
    pub silver: f64,
}

/// Static prices used for the fallback calculation
///
/// Loaded once at startup (optionally overridden from the `[fallback]` config
/// section) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackPriceTable {
    #[serde(default = "default_gold_price")]
    pub gold_usd_per_gram: f64,
    #[serde(default = "default_silver_price")]
    pub silver_usd_per_gram: f64,
    /// Reference weights keyed by standard name
    #[serde(default = "default_weights")]
    pub weights: BTreeMap<String, MetalWeights>,
    /// Units of each currency per USD, keyed by uppercase code
    #[serde(default = "default_exchange_rates")]
    pub exchange_rates: BTreeMap<String, f64>,
}

fn default_gold_price() -> f64 {
    GOLD_USD_PER_GRAM
}

fn default_silver_price() -> f64 {
    SILVER_USD_PER_GRAM
}

fn default_weights() -> BTreeMap<String, MetalWeights> {
    BTreeMap::from([
        (Standard::Classical.as_str().to_string(), CLASSICAL_WEIGHTS),
        (Standard::Common.as_str().to_string(), COMMON_WEIGHTS),
    ])
}

fn default_exchange_rates() -> BTreeMap<String, f64> {
    [
        ("NGN", 1300.0),
        ("USD", 1.0),
        ("EUR", 0.92),
        ("GBP", 0.79),
        ("SAR", 3.75),
        ("AED", 3.67),
        ("PKR", 280.0),
        ("INR", 83.0),
        ("MYR", 4.75),
        ("IDR", 15500.0),
    ]
    .into_iter()
    .map(|(code, rate)| (code.to_string(), rate))
    .collect()
}

impl Default for FallbackPriceTable {
    fn default() -> Self {
        Self {
            gold_usd_per_gram: default_gold_price(),
            silver_usd_per_gram: default_silver_price(),
            weights: default_weights(),
            exchange_rates: default_exchange_rates(),
        }
    }
}

impl FallbackPriceTable {
    /// Weights for a standard, falling back to the classical weights
    pub fn weights_for(&self, standard: Standard) -> MetalWeights {
        self.weights
            .get(standard.as_str())
            .or_else(|| self.weights.get(Standard::Classical.as_str()))
            .copied()
            .unwrap_or(CLASSICAL_WEIGHTS)
    }

    /// Exchange rate against USD, 1.0 when the currency has no entry
    pub fn rate_for(&self, currency: &str) -> f64 {
        self.exchange_rates.get(currency).copied().unwrap_or(1.0)
    }
}

/// Rounds half away from zero to `places` decimal places
fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn threshold(usd_per_gram: f64, rate: f64, weight: f64) -> MetalThreshold {
    let unit_price = usd_per_gram * rate;
    MetalThreshold {
        weight,
        unit_price: round_to(unit_price, 4),
        nisab_amount: round_to(unit_price * weight, 2),
    }
}

/// Computes a complete nisab entry for `key` from the price table.
///
/// The numeric fields depend only on `key` and `table`; only `updated_at`
/// varies between calls.
pub fn calculate_fallback(key: &CacheKey, table: &FallbackPriceTable) -> NisabEntry {
    let weights = table.weights_for(key.standard);
    let rate = table.rate_for(key.currency.code());

    NisabEntry {
        code: 200,
        status: "success".to_string(),
        calculation_standard: key.standard.as_str().to_string(),
        currency: key.currency.code().to_string(),
        weight_unit: "gram".to_string(),
        updated_at: Utc::now().to_rfc3339(),
        data: NisabData {
            nisab_thresholds: NisabThresholds {
                gold: threshold(table.gold_usd_per_gram, rate, weights.gold),
                silver: threshold(table.silver_usd_per_gram, rate, weights.silver),
            },
            zakat_rate: "2.5%".to_string(),
            notes: Some(FALLBACK_NOTES.to_string()),
            extra: Map::new(),
        },
        source: Some(Source::Fallback),
        cached_at: None,
        debug: Some(FALLBACK_DEBUG.to_string()),
        extra: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Currency;

    #[test]
    fn test_classical_usd_example() {
        let key = CacheKey::new(Currency::Usd, Standard::Classical);
        let entry = calculate_fallback(&key, &FallbackPriceTable::default());
        let gold = &entry.data.nisab_thresholds.gold;
        let silver = &entry.data.nisab_thresholds.silver;

        assert_eq!(gold.weight, 87.48);
        assert_eq!(gold.unit_price, 62.75);
        assert_eq!(gold.nisab_amount, 5489.37);
        assert_eq!(silver.weight, 612.36);
        assert_eq!(silver.unit_price, 0.85);
        assert_eq!(silver.nisab_amount, 520.51);
    }

    #[test]
    fn test_common_ngn() {
        let key = CacheKey::new(Currency::Ngn, Standard::Common);
        let entry = calculate_fallback(&key, &FallbackPriceTable::default());
        let gold = &entry.data.nisab_thresholds.gold;
        let silver = &entry.data.nisab_thresholds.silver;

        assert_eq!(gold.weight, 85.0);
        assert!((gold.unit_price - 81575.0).abs() < 1e-6);
        assert!((gold.nisab_amount - 6_933_875.0).abs() < 1e-6);
        assert_eq!(silver.weight, 595.0);
        assert!((silver.unit_price - 1105.0).abs() < 1e-6);
        assert!((silver.nisab_amount - 657_475.0).abs() < 1e-6);
    }

    #[test]
    fn test_entry_header_fields() {
        let key = CacheKey::new(Currency::Eur, Standard::Classical);
        let entry = calculate_fallback(&key, &FallbackPriceTable::default());

        assert_eq!(entry.code, 200);
        assert_eq!(entry.status, "success");
        assert_eq!(entry.currency, "EUR");
        assert_eq!(entry.calculation_standard, "classical");
        assert_eq!(entry.weight_unit, "gram");
        assert_eq!(entry.data.zakat_rate, "2.5%");
        assert_eq!(entry.data.notes.as_deref(), Some(FALLBACK_NOTES));
        assert_eq!(entry.source, Some(Source::Fallback));
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.updated_at).is_ok());
    }

    #[test]
    fn test_calculation_is_deterministic() {
        let table = FallbackPriceTable::default();
        for currency in Currency::ALL {
            for standard in Standard::ALL {
                let key = CacheKey::new(currency, standard);
                let a = calculate_fallback(&key, &table).data.nisab_thresholds;
                let b = calculate_fallback(&key, &table).data.nisab_thresholds;
                assert_eq!(a.gold.unit_price.to_bits(), b.gold.unit_price.to_bits());
                assert_eq!(a.gold.nisab_amount.to_bits(), b.gold.nisab_amount.to_bits());
                assert_eq!(a.silver.unit_price.to_bits(), b.silver.unit_price.to_bits());
                assert_eq!(
                    a.silver.nisab_amount.to_bits(),
                    b.silver.nisab_amount.to_bits()
                );
            }
        }
    }

    #[test]
    fn test_missing_table_rows_use_defaults() {
        let table = FallbackPriceTable {
            weights: BTreeMap::new(),
            exchange_rates: BTreeMap::new(),
            ..FallbackPriceTable::default()
        };
        let key = CacheKey::new(Currency::Pkr, Standard::Common);
        let entry = calculate_fallback(&key, &table);
        let gold = &entry.data.nisab_thresholds.gold;

        // classical weights, rate 1
        assert_eq!(gold.weight, 87.48);
        assert_eq!(gold.unit_price, 62.75);
    }

    #[test]
    fn test_common_falls_back_to_classical_row() {
        let mut table = FallbackPriceTable::default();
        table.weights.remove("common");
        assert_eq!(table.weights_for(Standard::Common), CLASSICAL_WEIGHTS);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(520.506, 2), 520.51);
        assert_eq!(round_to(1.23456, 4), 1.2346);
        assert_eq!(round_to(2.0, 2), 2.0);
    }
}
