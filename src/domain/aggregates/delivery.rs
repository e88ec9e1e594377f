//! Delivery choice

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod { #[default] Standard, Pickup }

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Standard => "standard", Self::Pickup => "pickup" }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value { "standard" => Some(Self::Standard), "pickup" => Some(Self::Pickup), _ => None }
    }
}

/// A delivery method with the fees configured for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOption {
    pub method: DeliveryMethod,
    pub base_fee: Money,
    pub free_above: Money,
}
