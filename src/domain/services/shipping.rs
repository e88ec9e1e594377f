//! Shipping rule evaluator

use crate::domain::aggregates::{DeliveryMethod, DeliveryOption};
use crate::domain::value_objects::Money;

/// Fee charged for `option` on a cart worth `subtotal_ttc`. The threshold is
/// compared against the displayed (rounded) subtotal.
pub fn shipping_fee(subtotal_ttc: Money, option: &DeliveryOption) -> Money {
    match option.method {
        DeliveryMethod::Pickup => Money::ZERO,
        DeliveryMethod::Standard if subtotal_ttc.rounded() >= option.free_above => Money::ZERO,
        DeliveryMethod::Standard => option.base_fee,
    }
}
