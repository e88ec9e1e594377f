//! Order aggregation: composes totals, shipping, promo and manual adjustments.

use crate::domain::aggregates::{DeliveryOption, LineItem, VenteTotals};
use crate::domain::services::promo::{self, Adjustments};
use crate::domain::services::shipping::shipping_fee;
use crate::domain::services::totals::{self, Totals};
use crate::domain::value_objects::{Money, Rate};
use crate::{Result, VenteError};

/// Full-precision breakdown of a cart. [`PriceBreakdown::freeze`] produces
/// the rounded record stored on the vente.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub tva_rate: Rate,
    pub totals: Totals,
    pub shipping_fee: Money,
    pub promo_discount: Money,
    pub adjustments: Adjustments,
    pub net_a_payer: Money,
    /// Deductions exceeded the amount due and the net was held at zero.
    pub clamped: bool,
}

/// Prices `items`. `promo_rate` must come from a code that already passed
/// [`promo::check`].
pub fn price(items: &[LineItem], tva_rate: Rate, delivery: &DeliveryOption, promo_rate: Option<Rate>, adjustments: Adjustments) -> Result<PriceBreakdown> {
    let totals = totals::compute(items, tva_rate)?;
    if totals.subtotal_ttc > Money::max_storable() {
        return Err(VenteError::invalid("items", "amount is too large"));
    }
    let shipping_fee = shipping_fee(totals.subtotal_ttc, delivery);
    let promo_discount = promo_rate.map(|rate| promo::discount_amount(totals.subtotal_ttc, rate)).unwrap_or(Money::ZERO);
    let gross = totals
        .subtotal_ttc
        .checked_add(shipping_fee)
        .and_then(|g| g.checked_add(adjustments.additional_charges))
        .and_then(|g| g.checked_sub(adjustments.additional_discount))
        .and_then(|g| g.checked_sub(promo_discount))
        .filter(|g| *g <= Money::max_storable())
        .ok_or_else(|| VenteError::invalid("netAPayer", "amount is too large"))?;
    let clamped = gross.is_negative();
    if clamped {
        tracing::warn!(additional_discount = %adjustments.additional_discount, promo = %promo_discount, "discounts exceed amount due, net clamped to zero");
    }
    Ok(PriceBreakdown { tva_rate, totals, shipping_fee, promo_discount, adjustments, net_a_payer: gross.at_least_zero(), clamped })
}

impl PriceBreakdown {
    pub fn freeze(&self) -> VenteTotals {
        VenteTotals {
            tva_rate: self.tva_rate,
            total_ht: self.totals.subtotal_ht.rounded(),
            tva: self.totals.tva_amount.rounded(),
            total_ttc: self.totals.subtotal_ttc.rounded(),
            products_discount: self.totals.products_discount.rounded(),
            livraison: self.shipping_fee.rounded(),
            additional_charges: self.adjustments.additional_charges.rounded(),
            additional_discount: self.adjustments.additional_discount.rounded(),
            discount: self.promo_discount.rounded(),
            net_a_payer: self.net_a_payer.rounded(),
        }
    }
}
