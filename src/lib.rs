//! Vente Engine
//!
//! Pricing and lifecycle engine for orders ("ventes") placed through the
//! storefront checkout or the back-office sale form.
//!
//! ## Features
//! - Cart normalization against the catalog (products and packs)
//! - HT/TTC totals with a flat TVA rate, in 3-decimal currency
//! - Shipping rules with a configurable free-shipping threshold
//! - Promo codes with validity windows and usage caps
//! - Atomic order creation and an audited status state machine

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

use std::fmt;
use thiserror::Error;

use crate::domain::aggregates::{LineKind, VenteStatus};
use crate::domain::services::promo::WindowViolation;

pub use crate::application::VenteService;
pub use crate::config::AppConfig;

// =============================================================================
// Error Types
// =============================================================================

/// One rejected input field, with a path such as `items[0].quantity`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}: {}", self.field, self.message) }
}

/// Why a catalog item cannot be sold.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum Unavailability {
    Missing,
    Disabled,
    OutOfStock { requested: u32, available: u32 },
}

impl fmt::Display for Unavailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "not found in catalog"),
            Self::Disabled => write!(f, "disabled"),
            Self::OutOfStock { requested, available } => write!(f, "out of stock ({} requested, {} available)", requested, available),
        }
    }
}

#[derive(Error, Debug)]
pub enum VenteError {
    #[error("Validation failed: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    #[error("{kind} {item_id} is unavailable: {reason}")]
    ItemUnavailable { kind: LineKind, item_id: String, reason: Unavailability },

    #[error("Promo code '{0}' does not exist")]
    PromoCodeNotFound(String),

    #[error("Promo code '{0}' is not active")]
    PromoCodeInactive(String),

    #[error("Promo code '{code}' {window}")]
    PromoCodeExpired { code: String, window: WindowViolation },

    #[error("Promo code '{code}' has reached its usage limit of {limit}")]
    PromoCodeExhausted { code: String, limit: u32 },

    #[error("Cannot move vente from {from} to {to}")]
    InvalidTransition { from: VenteStatus, to: VenteStatus },

    #[error("Vente {0} not found")]
    VenteNotFound(String),

    #[error("Storage error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl VenteError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldViolation { field: field.into(), message: message.into() }])
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl From<sqlx::Error> for VenteError {
    fn from(e: sqlx::Error) -> Self { Self::Persistence(e.to_string()) }
}

impl From<validator::ValidationErrors> for VenteError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut violations = Vec::new();
        flatten_validation_errors("", &errors, &mut violations);
        violations.sort_by(|a, b| a.field.cmp(&b.field));
        Self::Validation(violations)
    }
}

fn flatten_validation_errors(prefix: &str, errors: &validator::ValidationErrors, out: &mut Vec<FieldViolation>) {
    use validator::ValidationErrorsKind;
    for (field, kind) in errors.errors() {
        let field = wire_name(field);
        let path = if prefix.is_empty() { field } else { format!("{}.{}", prefix, field) };
        match kind {
            ValidationErrorsKind::Field(errs) => out.extend(errs.iter().map(|e| FieldViolation {
                field: path.clone(),
                message: e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()),
            })),
            ValidationErrorsKind::Struct(inner) => flatten_validation_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// Request field name as it appears in JSON bodies.
fn wire_name(field: &str) -> String {
    if field == "kind" {
        return "type".to_string();
    }
    let mut name = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        match c {
            '_' => upper = true,
            c if upper => { name.extend(c.to_uppercase()); upper = false; }
            c => name.push(c),
        }
    }
    name
}

pub type Result<T> = std::result::Result<T, VenteError>;
