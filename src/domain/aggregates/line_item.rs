//! Line items frozen into a vente

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::value_objects::{Money, Quantity};

/// Catalog collection a line item was resolved against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineKind { Product, Pack }

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Product => write!(f, "Product"), Self::Pack => write!(f, "Pack") }
    }
}

/// A priced cart line. Designation and prices are copied from the catalog when
/// the vente is created and never re-read afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "type")]
    pub kind: LineKind,
    #[serde(rename = "itemId")]
    pub reference_id: String,
    pub designation: String,
    #[serde(rename = "price")]
    pub unit_price_ht: Money,
    #[serde(rename = "oldPrice", default, skip_serializing_if = "Option::is_none")]
    pub old_unit_price_ht: Option<Money>,
    pub quantity: Quantity,
    #[serde(rename = "variant", default, skip_serializing_if = "Option::is_none")]
    pub variant_label: Option<String>,
}

impl LineItem {
    pub fn line_ht(&self) -> Money { self.unit_price_ht.multiply(self.quantity.value()) }

    /// Catalog markdown on this line (`oldPrice - price`), zero when there is none.
    pub fn markdown_ht(&self) -> Money {
        self.old_unit_price_ht
            .map(|old| old.saturating_sub(self.unit_price_ht).multiply(self.quantity.value()))
            .unwrap_or(Money::ZERO)
    }
}
