//! Resolves cart entries against the catalog and snapshots their prices.

use std::collections::{HashMap, HashSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::{Cart, CatalogItem, LineItem, LineKind};
use crate::{Result, Unavailability, VenteError};

/// Read access to products and packs.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn find(&self, kind: LineKind, id: &str) -> Result<Option<CatalogItem>>;
}

/// Whether a stock shortfall blocks the sale. Decided by the caller, not the normalizer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockPolicy { #[default] Enforce, Allow }

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortfall {
    pub kind: LineKind,
    pub item_id: String,
    pub reason: Unavailability,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedCart {
    pub items: Vec<LineItem>,
    pub shortfalls: Vec<Shortfall>,
}

impl NormalizedCart {
    /// Applies the caller's stock policy, failing on the first shortfall when enforced.
    pub fn under_policy(self, policy: StockPolicy) -> Result<Vec<LineItem>> {
        match (policy, self.shortfalls.into_iter().next()) {
            (StockPolicy::Enforce, Some(s)) => Err(VenteError::ItemUnavailable { kind: s.kind, item_id: s.item_id, reason: s.reason }),
            _ => Ok(self.items),
        }
    }
}

/// Snapshots every cart entry. Must run at submission time: the prices
/// captured here are the ones the vente is charged at.
///
/// Stock is checked against the total requested per item, so variants of
/// one product draw from the same stock.
pub async fn normalize(catalog: &dyn Catalog, cart: &Cart) -> Result<NormalizedCart> {
    if cart.is_empty() {
        return Err(VenteError::invalid("items", "at least one item is required"));
    }
    let mut requested: HashMap<(LineKind, &str), u32> = HashMap::new();
    for entry in cart.entries() {
        let total = requested.entry((entry.kind, entry.item_id.as_str())).or_insert(0);
        *total = total.saturating_add(entry.quantity.value());
    }
    let mut checked = HashSet::new();
    let mut items = Vec::with_capacity(cart.len());
    let mut shortfalls = Vec::new();
    for (index, entry) in cart.entries().iter().enumerate() {
        let unavailable = |reason| VenteError::ItemUnavailable { kind: entry.kind, item_id: entry.item_id.clone(), reason };
        let found = catalog.find(entry.kind, &entry.item_id).await?.ok_or_else(|| unavailable(Unavailability::Missing))?;
        if !found.is_enabled() {
            return Err(unavailable(Unavailability::Disabled));
        }
        if found.price_ht.is_negative() {
            return Err(VenteError::invalid(format!("items[{}].price", index), "catalog price is negative"));
        }
        let key = (entry.kind, entry.item_id.as_str());
        let total = requested.get(&key).copied().unwrap_or(entry.quantity.value());
        if let Some(reason) = checked.insert(key).then(|| found.shortfall(total)).flatten() {
            tracing::debug!(kind = %entry.kind, item_id = %entry.item_id, %reason, "stock shortfall");
            shortfalls.push(Shortfall { kind: entry.kind, item_id: entry.item_id.clone(), reason });
        }
        items.push(LineItem {
            kind: entry.kind,
            reference_id: found.id,
            designation: found.name,
            unit_price_ht: found.price_ht,
            old_unit_price_ht: found.old_price_ht,
            quantity: entry.quantity,
            variant_label: entry.variant.clone(),
        });
    }
    Ok(NormalizedCart { items, shortfalls })
}
