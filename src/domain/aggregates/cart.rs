//! Cart value handed to the engine by the calling context

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::LineKind;
use crate::domain::value_objects::Quantity;

/// A cart is owned by the caller (session, local storage, admin form) and passed
/// in as a plain value; the engine keeps no cart state of its own.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    entries: Vec<CartEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    #[serde(rename = "type")]
    pub kind: LineKind,
    pub item_id: String,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl CartEntry {
    fn same_line(&self, other: &CartEntry) -> bool {
        self.kind == other.kind && self.item_id == other.item_id && self.variant == other.variant
    }
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn entries(&self) -> &[CartEntry] { &self.entries }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Adds an entry, merging it into an existing line with the same item and variant.
    pub fn add(&mut self, entry: CartEntry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.same_line(&entry)) {
            existing.quantity = existing.quantity.add(entry.quantity);
        } else {
            self.entries.push(entry);
        }
    }
}

impl FromIterator<CartEntry> for Cart {
    fn from_iter<I: IntoIterator<Item = CartEntry>>(iter: I) -> Self {
        let mut cart = Cart::new();
        for entry in iter { cart.add(entry); }
        cart
    }
}
