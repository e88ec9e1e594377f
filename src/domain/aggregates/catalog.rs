//! Catalog view consumed by the normalizer

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::LineKind;
use crate::domain::value_objects::Money;
use crate::Unavailability;

/// What the engine needs to know about a product or pack at checkout time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub kind: LineKind,
    pub name: String,
    pub price_ht: Money,
    #[serde(default)]
    pub old_price_ht: Option<Money>,
    #[serde(default)]
    pub status: CatalogStatus,
    /// `None` when stock is not tracked for this item.
    #[serde(default)]
    pub stock: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogStatus { #[default] Active, Disabled }

impl CatalogItem {
    pub fn product(id: impl Into<String>, name: impl Into<String>, price_ht: Money) -> Self {
        Self { id: id.into(), kind: LineKind::Product, name: name.into(), price_ht, old_price_ht: None, status: CatalogStatus::Active, stock: None }
    }

    pub fn pack(id: impl Into<String>, name: impl Into<String>, price_ht: Money) -> Self {
        Self { kind: LineKind::Pack, ..Self::product(id, name, price_ht) }
    }

    pub fn with_stock(mut self, stock: u32) -> Self { self.stock = Some(stock); self }
    pub fn with_old_price(mut self, old: Money) -> Self { self.old_price_ht = Some(old); self }
    pub fn disabled(mut self) -> Self { self.status = CatalogStatus::Disabled; self }

    pub fn is_enabled(&self) -> bool { self.status == CatalogStatus::Active }

    /// Reports a stock shortfall for `requested` units, if stock is tracked.
    pub fn shortfall(&self, requested: u32) -> Option<Unavailability> {
        match self.stock {
            Some(available) if available < requested => Some(Unavailability::OutOfStock { requested, available }),
            _ => None,
        }
    }
}
