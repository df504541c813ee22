//! Product catalog backed by the payments provider.
//!
//! Products and prices are owned by the provider. The types here name the
//! fields the storefront displays and carry everything else through
//! untouched in `extra`, so the JSON API can hand upstream objects back
//! unmodified.

mod stripe;

pub use stripe::StripeClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Currencies Stripe expresses without a minor unit.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub default_price: Option<DefaultPrice>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// The default price, if the provider expanded it inline.
    pub fn price(&self) -> Option<&Price> {
        match &self.default_price {
            Some(DefaultPrice::Expanded(price)) => Some(price),
            _ => None,
        }
    }
}

/// `default_price` is an object when expanded and a bare price id otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultPrice {
    Expanded(Box<Price>),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    pub currency: String,
    /// Amount in the currency's minor unit
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub recurring: Option<Recurring>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurring {
    pub interval: String,
    #[serde(default = "default_interval_count")]
    pub interval_count: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_interval_count() -> u32 {
    1
}

impl Price {
    /// Human-readable amount such as `19.99 USD` or `500 JPY / month`.
    /// Returns `None` for prices without a fixed amount.
    pub fn display_amount(&self) -> Option<String> {
        let amount = format_amount(self.unit_amount?, &self.currency);
        match &self.recurring {
            Some(r) if r.interval_count > 1 => {
                Some(format!("{} / {} {}s", amount, r.interval_count, r.interval))
            }
            Some(r) => Some(format!("{} / {}", amount, r.interval)),
            None => Some(amount),
        }
    }
}

/// Format a minor-unit amount with its upper-cased currency code.
pub fn format_amount(minor_units: i64, currency: &str) -> String {
    let code = currency.to_uppercase();
    if ZERO_DECIMAL_CURRENCIES.contains(&currency.to_lowercase().as_str()) {
        return format!("{} {}", minor_units, code);
    }

    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    format!("{}{}.{:02} {}", sign, abs / 100, abs % 100, code)
}

/// Stripe object ids are ASCII alphanumerics with `_` separators.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 255
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no such product: {0}")]
    NotFound(String),

    #[error("catalog API error ({status}): {message}")]
    Api {
        status: u16,
        kind: String,
        code: Option<String>,
        message: String,
    },

    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected catalog response: {0}")]
    Decode(String),
}

/// Read access to the product catalog.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// List products with their default price expanded, in provider order.
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError>;

    /// Retrieve one product with its default price expanded.
    async fn get_product(&self, id: &str) -> Result<Product, CatalogError>;
}
