//! Bill data types shared by the gateway, the split calculator and the
//! HTTP layer.
//!
//! Everything here is a request-scoped value: built from a request body or a
//! model reply, used once, dropped.

use crate::error::BillSplitError;
use serde::{Deserialize, Serialize};

/// One purchased line on a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub name: String,
    pub price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl BillItem {
    pub fn new(name: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
        }
    }

    /// `price × quantity`.
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }

    pub(crate) fn validate(&self) -> Result<(), BillSplitError> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(BillSplitError::InvalidInput(format!(
                "Item '{}' has an invalid price: {}",
                self.name, self.price
            )));
        }
        if self.quantity == 0 {
            return Err(BillSplitError::InvalidInput(format!(
                "Item '{}' must have a quantity of at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

/// A bill as extracted from a receipt.
///
/// The `/parse-bill` endpoint returns the model's JSON untouched; this type is
/// the typed view for library callers that want one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BillData {
    pub items: Vec<BillItem>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub tip: Option<f64>,
}

impl BillData {
    /// Interpret a gateway reply as a typed bill.
    pub fn from_value(value: serde_json::Value) -> Result<Self, BillSplitError> {
        serde_json::from_value(value).map_err(|e| BillSplitError::InvalidInput(e.to_string()))
    }

    /// Σ `price × quantity` over all items.
    pub fn subtotal(&self) -> f64 {
        subtotal(&self.items)
    }
}

/// Body of `POST /split-equal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRequest {
    pub items: Vec<BillItem>,
    pub tax: f64,
    pub tip: f64,
    pub people_count: u32,
    /// Informational tag sent by clients; it does not change the arithmetic.
    pub split_type: String,
}

/// Body of `POST /split-by-item`.
///
/// `assignments[i][j] == 1` means person `j` shares item `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSplitRequest {
    pub items: Vec<BillItem>,
    pub tax: f64,
    pub tip: f64,
    pub assignments: Vec<Vec<u8>>,
}

/// Result of an equal split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualSplit {
    pub subtotal: f64,
    pub tax: f64,
    pub tip: f64,
    pub total: f64,
    pub per_person: f64,
    pub tax_per_person: f64,
    pub tip_per_person: f64,
}

/// Result of a per-item split. Vectors are indexed by person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSplit {
    pub person_subtotals: Vec<f64>,
    pub tax_per_person: f64,
    pub tip_per_person: f64,
    pub person_totals: Vec<f64>,
    pub total: f64,
}

/// Σ `price × quantity`.
pub fn subtotal(items: &[BillItem]) -> f64 {
    items.iter().map(BillItem::line_total).sum()
}

pub(crate) fn validate_charge(label: &str, amount: f64) -> Result<(), BillSplitError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(BillSplitError::InvalidInput(format!(
            "{label} must be a non-negative amount, got {amount}"
        )));
    }
    Ok(())
}
