//! Request validation and cache keys
//!
//! Raw query values are normalized into a [`CacheKey`]. Unsupported values fall
//! back to the defaults (`NGN`, `classical`) instead of producing an error, so a
//! caller always gets an answer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies the proxy serves
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Ngn,
    Usd,
    Eur,
    Gbp,
    Sar,
    Aed,
    Pkr,
    Inr,
    Myr,
    Idr,
}

impl Currency {
    /// Every supported currency
    pub const ALL: [Currency; 10] = [
        Currency::Ngn,
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Sar,
        Currency::Aed,
        Currency::Pkr,
        Currency::Inr,
        Currency::Myr,
        Currency::Idr,
    ];

    /// Uppercase ISO code, e.g. `"NGN"`
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Ngn => "NGN",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Sar => "SAR",
            Currency::Aed => "AED",
            Currency::Pkr => "PKR",
            Currency::Inr => "INR",
            Currency::Myr => "MYR",
            Currency::Idr => "IDR",
        }
    }

    /// Parses a currency code, ignoring case and surrounding whitespace.
    ///
    /// Returns `None` for codes outside the supported set.
    pub fn from_str(s: &str) -> Option<Self> {
        let code = s.trim().to_uppercase();
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Convention for the gold/silver reference weights
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Standard {
    #[default]
    Classical,
    Common,
}

impl Standard {
    pub const ALL: [Standard; 2] = [Standard::Classical, Standard::Common];

    pub fn as_str(&self) -> &'static str {
        match self {
            Standard::Classical => "classical",
            Standard::Common => "common",
        }
    }

    /// Parses a standard name. Matching is case-sensitive after trimming.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "classical" => Some(Standard::Classical),
            "common" => Some(Standard::Common),
            _ => None,
        }
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one cached nisab entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CacheKey {
    pub currency: Currency,
    pub standard: Standard,
}

impl CacheKey {
    pub fn new(currency: Currency, standard: Standard) -> Self {
        Self { currency, standard }
    }

    /// Builds a key from raw request values.
    ///
    /// Missing or unsupported values are replaced by the defaults; this never fails.
    pub fn normalize(currency: Option<&str>, standard: Option<&str>) -> Self {
        let currency = currency.and_then(Currency::from_str).unwrap_or_default();
        let standard = standard.and_then(Standard::from_str).unwrap_or_default();
        Self { currency, standard }
    }

    /// Storage name for this key, e.g. `nisab_usd_classical`
    pub fn location(&self) -> String {
        format!(
            "nisab_{}_{}",
            self.currency.code().to_lowercase(),
            self.standard.as_str()
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.currency, self.standard)
    }
}
