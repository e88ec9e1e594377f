//! Configuration loaded from the environment (`.env` honoured via dotenvy)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use crate::domain::aggregates::{DeliveryMethod, DeliveryOption};
use crate::domain::value_objects::{Money, Rate};
use crate::domain::services::StockPolicy;

pub const DEFAULT_PORT: u16 = 8083;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl From<ConfigError> for crate::VenteError {
    fn from(e: ConfigError) -> Self { Self::Configuration(e.to_string()) }
}

/// Values served by the "advanced settings" collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSettings {
    #[serde(deserialize_with = "Rate::deserialize_tax")]
    pub tva: Rate,
    pub livraison: Money,
    pub free_shipping_above: Money,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            tva: Rate::new_unchecked(Decimal::new(19, 2)),
            livraison: Money::new(Decimal::new(7, 0)),
            free_shipping_above: Money::new(Decimal::new(300, 0)),
        }
    }
}

impl PricingSettings {
    pub fn delivery_option(&self, method: DeliveryMethod) -> DeliveryOption {
        DeliveryOption { method, base_fee: self.livraison, free_above: self.free_shipping_above }
    }

    pub fn validated(tva: Decimal, livraison: Decimal, free_shipping_above: Decimal) -> Result<Self, ConfigError> {
        let tva = Rate::tax(tva).map_err(|e| ConfigError::Invalid { key: "VENTE_TVA", message: e.to_string() })?;
        let non_negative = |key: &'static str, value: Decimal| {
            if value < Decimal::ZERO { Err(ConfigError::Invalid { key, message: format!("{} is negative", value) }) } else { Ok(Money::new(value)) }
        };
        Ok(Self {
            tva,
            livraison: non_negative("VENTE_LIVRAISON", livraison)?,
            free_shipping_above: non_negative("VENTE_FREE_SHIPPING_ABOVE", free_shipping_above)?,
        })
    }
}

/// Stock policy per sale channel: the storefront refuses shortfalls, the back office may oversell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockPolicies {
    pub storefront: StockPolicy,
    pub admin: StockPolicy,
}

impl Default for StockPolicies {
    fn default() -> Self { Self { storefront: StockPolicy::Enforce, admin: StockPolicy::Allow } }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub pricing: PricingSettings,
    pub stock: StockPolicies,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT, database_url: None, nats_url: None, pricing: PricingSettings::default(), stock: StockPolicies::default() }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|key| std::env::var(key).ok()) }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = PricingSettings::default();
        let decimal = |key: &'static str, default: Decimal| -> Result<Decimal, ConfigError> {
            match get(key) {
                None => Ok(default),
                Some(raw) => Decimal::from_str(raw.trim()).map_err(|e| ConfigError::Invalid { key, message: format!("'{}': {}", raw, e) }),
            }
        };
        let pricing = PricingSettings::validated(
            decimal("VENTE_TVA", defaults.tva.fraction())?,
            decimal("VENTE_LIVRAISON", defaults.livraison.amount())?,
            decimal("VENTE_FREE_SHIPPING_ABOVE", defaults.free_shipping_above.amount())?,
        )?;
        let port = match get("PORT") {
            None => DEFAULT_PORT,
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key: "PORT", message: format!("'{}' is not a port", raw) })?,
        };
        let admin = match get("VENTE_ADMIN_STOCK_POLICY").as_deref() {
            None | Some("allow") => StockPolicy::Allow,
            Some("enforce") => StockPolicy::Enforce,
            Some(other) => return Err(ConfigError::Invalid { key: "VENTE_ADMIN_STOCK_POLICY", message: format!("unknown policy '{}'", other) }),
        };
        Ok(Self {
            port,
            database_url: get("DATABASE_URL").filter(|v| !v.is_empty()),
            nats_url: get("NATS_URL").filter(|v| !v.is_empty()),
            pricing,
            stock: StockPolicies { admin, ..StockPolicies::default() },
        })
    }
}
