//! Tax & totals calculator

use rust_decimal::Decimal;
use crate::domain::aggregates::LineItem;
use crate::domain::value_objects::{Money, Rate};
use crate::{Result, VenteError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineTotals {
    pub line_ht: Money,
    pub line_ttc: Money,
}

/// Unrounded totals of a set of line items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Totals {
    pub lines: Vec<LineTotals>,
    pub subtotal_ht: Money,
    pub subtotal_ttc: Money,
    pub tva_amount: Money,
    /// Catalog markdowns (`oldPrice - price`) at TTC, informational only.
    pub products_discount: Money,
}

pub fn compute(items: &[LineItem], tva: Rate) -> Result<Totals> {
    if items.is_empty() {
        return Err(VenteError::invalid("items", "at least one item is required"));
    }
    let factor = Decimal::ONE + tva.fraction();
    let too_large = |field: String| VenteError::invalid(field, "amount is too large");
    let mut lines = Vec::with_capacity(items.len());
    let mut markdown_ht = Money::ZERO;
    for (index, item) in items.iter().enumerate() {
        if item.unit_price_ht.is_negative() {
            return Err(VenteError::invalid(format!("items[{}].price", index), "price must not be negative"));
        }
        let qty = item.quantity.value();
        let line_ht = item.unit_price_ht.checked_multiply(qty).ok_or_else(|| too_large(format!("items[{}].quantity", index)))?;
        let line_ttc = line_ht.checked_mul(factor).ok_or_else(|| too_large(format!("items[{}].quantity", index)))?;
        if let Some(old) = item.old_unit_price_ht {
            markdown_ht = old
                .checked_sub(item.unit_price_ht)
                .and_then(|d| d.at_least_zero().checked_multiply(qty))
                .and_then(|d| markdown_ht.checked_add(d))
                .ok_or_else(|| too_large(format!("items[{}].oldPrice", index)))?;
        }
        lines.push(LineTotals { line_ht, line_ttc });
    }
    let sum = |pick: fn(&LineTotals) -> Money| lines.iter().try_fold(Money::ZERO, |acc, l| acc.checked_add(pick(l))).ok_or_else(|| too_large("items".into()));
    let subtotal_ht = sum(|l| l.line_ht)?;
    let subtotal_ttc = sum(|l| l.line_ttc)?;
    let products_discount = markdown_ht.checked_mul(factor).ok_or_else(|| too_large("items".into()))?;
    Ok(Totals { lines, subtotal_ht, subtotal_ttc, tva_amount: subtotal_ttc - subtotal_ht, products_discount })
}
