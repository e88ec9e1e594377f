//! Request and response bodies

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use crate::application::{CheckoutCommand, SaleChannel, VenteUpdate};
use crate::domain::aggregates::{Cart, CartEntry, ClientInfo, ClientRef, DeliveryMethod, LineKind, ModePayment, PromoCode, VenteStatus};
use crate::domain::services::Adjustments;
use crate::domain::value_objects::{Money, Quantity};
use crate::{FieldViolation, Result, VenteError};

/// Non-negative and small enough for a money column.
fn storable_amount(value: &Decimal) -> std::result::Result<(), ValidationError> {
    let amount = Money::new(*value);
    if amount.is_negative() {
        return Err(ValidationError::new("range").with_message("must not be negative".into()));
    }
    if amount > Money::max_storable() {
        return Err(ValidationError::new("range").with_message(format!("must not exceed {}", Money::max_storable()).into()));
    }
    Ok(())
}

fn one() -> i64 { 1 }

/// Body of `POST /vente/new` and `POST /vente/quote`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VenteRequest {
    #[validate(length(min = 1, message = "at least one item is required"), nested)]
    pub items: Vec<CartItemRequest>,
    #[serde(default)]
    pub is_new_client: bool,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client: Option<ClientRequest>,
    #[serde(default)]
    pub promo_code: Option<String>,
    /// Fee the client displayed; the engine recomputes it.
    #[serde(default)]
    #[validate(custom(function = "storable_amount"))]
    pub livraison: Option<Decimal>,
    #[serde(default)]
    pub delivery_method: DeliveryMethod,
    #[serde(default)]
    #[validate(custom(function = "storable_amount"))]
    pub additional_charges: Decimal,
    #[serde(default)]
    #[validate(custom(function = "storable_amount"))]
    pub additional_discount: Decimal,
    pub mode_payment: ModePayment,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub channel: SaleChannel,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    #[serde(rename = "type")]
    pub kind: LineKind,
    #[validate(length(min = 1, message = "is required"))]
    pub item_id: String,
    /// Display name the client had; ignored.
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default = "one")]
    #[validate(range(min = 1, max = 10000, message = "must be between 1 and 10000"))]
    pub quantity: i64,
    #[serde(default)]
    #[validate(custom(function = "storable_amount"))]
    pub price: Option<Decimal>,
    #[serde(default)]
    #[validate(custom(function = "storable_amount"))]
    pub old_price: Option<Decimal>,
    #[serde(default)]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,
    #[validate(email(message = "is not a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub phone1: String,
    #[serde(default)]
    pub phone2: Option<String>,
    #[validate(length(min = 1, message = "is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "is required"))]
    pub ville: String,
    #[serde(default)]
    pub client_note: Option<String>,
}

impl ClientRequest {
    fn validated(self) -> Result<ClientInfo> {
        if let Err(errors) = self.validate() {
            return Err(prefixed("client", errors.into()));
        }
        let blank_to_none = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Ok(ClientInfo {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone1: self.phone1.trim().to_string(),
            phone2: blank_to_none(self.phone2),
            address: self.address.trim().to_string(),
            ville: self.ville.trim().to_string(),
            client_note: blank_to_none(self.client_note),
        })
    }
}

fn prefixed(prefix: &str, error: VenteError) -> VenteError {
    match error {
        VenteError::Validation(fields) => VenteError::Validation(
            fields.into_iter().map(|f| FieldViolation { field: format!("{}.{}", prefix, f.field), message: f.message }).collect(),
        ),
        other => other,
    }
}

impl VenteRequest {
    pub fn into_command(self, actor: Option<String>) -> Result<CheckoutCommand> {
        self.validate()?;

        let client = if self.is_new_client {
            let info = self.client.ok_or_else(|| VenteError::invalid("client", "is required for a new client"))?;
            ClientRef::Snapshot(info.validated()?)
        } else {
            let id = self.client_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty());
            ClientRef::Account(id.ok_or_else(|| VenteError::invalid("clientId", "is required for an existing client"))?)
        };

        let mut cart = Cart::new();
        let mut claimed_prices = Vec::new();
        for (index, item) in self.items.into_iter().enumerate() {
            let quantity = u32::try_from(item.quantity)
                .ok()
                .and_then(|q| Quantity::new(q).ok())
                .ok_or_else(|| VenteError::invalid(format!("items[{}].quantity", index), "must be at least 1"))?;
            if let Some(price) = item.price {
                claimed_prices.push((item.kind, item.item_id.clone(), Money::new(price)));
            }
            cart.add(CartEntry { kind: item.kind, item_id: item.item_id, quantity, variant: item.variant.filter(|v| !v.is_empty()) });
        }

        Ok(CheckoutCommand {
            cart,
            client,
            promo_code: self.promo_code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            delivery_method: self.delivery_method,
            adjustments: Adjustments::new(Money::new(self.additional_charges), Money::new(self.additional_discount))?,
            mode_payment: self.mode_payment,
            note: self.note.filter(|n| !n.trim().is_empty()),
            channel: self.channel,
            actor: actor.unwrap_or_else(|| match self.channel { SaleChannel::Storefront => "storefront", SaleChannel::Admin => "admin" }.to_string()),
            quoted_livraison: self.livraison.map(Money::new),
            claimed_prices,
        })
    }
}

/// Body of `PUT /vente/update/:id`. Frozen fields (items, totals, promo code)
/// may be sent back unchanged and are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVenteRequest {
    #[serde(default)]
    pub status: Option<VenteStatus>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub client: Option<ClientRequest>,
}

impl UpdateVenteRequest {
    pub fn into_update(self) -> Result<VenteUpdate> {
        Ok(VenteUpdate {
            status: self.status,
            note: self.note,
            client: self.client.map(ClientRequest::validated).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

/// Promo code as shown at checkout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeView {
    pub code: String,
    pub discount_percent: Decimal,
    pub start_date: chrono::DateTime<chrono::Utc>,
    pub end_date: chrono::DateTime<chrono::Utc>,
    pub active: bool,
    pub usage_limit: Option<u32>,
    pub usage_count: u32,
}

impl From<PromoCode> for PromoCodeView {
    fn from(p: PromoCode) -> Self {
        Self {
            discount_percent: p.discount_rate.as_percent(),
            code: p.code,
            start_date: p.start_date,
            end_date: p.end_date,
            active: p.active,
            usage_limit: p.usage_limit,
            usage_count: p.usage_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(extra: serde_json::Value) -> VenteRequest {
        let mut base = json!({
            "items": [{ "type": "Product", "itemId": "P1", "quantity": 2, "price": 100 }],
            "isNewClient": false,
            "clientId": "C-1",
            "modePayment": "CASH"
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    fn fields(err: VenteError) -> Vec<String> {
        match err { VenteError::Validation(v) => v.into_iter().map(|f| f.field).collect(), other => panic!("unexpected {other:?}") }
    }

    #[test]
    fn test_minimal_request_builds_command() {
        let cmd = body(json!({ "promoCode": "  " })).into_command(None).unwrap();
        assert_eq!(cmd.client, ClientRef::Account("C-1".into()));
        assert_eq!(cmd.promo_code, None);
        assert_eq!(cmd.channel, SaleChannel::Storefront);
        assert_eq!(cmd.actor, "storefront");
        assert_eq!(cmd.cart.len(), 1);
        assert_eq!(cmd.claimed_prices.len(), 1);
    }

    #[test]
    fn test_item_violations_carry_index() {
        let err = body(json!({ "items": [{ "type": "Pack", "itemId": "K1" }, { "type": "Product", "itemId": "", "quantity": 0 }] }))
            .into_command(None)
            .unwrap_err();
        assert_eq!(fields(err), vec!["items[1].itemId", "items[1].quantity"]);
    }

    #[test]
    fn test_empty_items_rejected() {
        assert_eq!(fields(body(json!({ "items": [] })).into_command(None).unwrap_err()), vec!["items"]);
    }

    #[test]
    fn test_new_client_requires_valid_snapshot() {
        assert_eq!(fields(body(json!({ "isNewClient": true })).into_command(None).unwrap_err()), vec!["client"]);
        let err = body(json!({
            "isNewClient": true,
            "client": { "name": "Amel", "email": "nope", "phone1": "22000000", "address": "", "ville": "Tunis" }
        }))
        .into_command(None)
        .unwrap_err();
        assert_eq!(fields(err), vec!["client.address", "client.email"]);
    }

    #[test]
    fn test_negative_adjustment_rejected() {
        assert_eq!(fields(body(json!({ "additionalDiscount": -5 })).into_command(None).unwrap_err()), vec!["additionalDiscount"]);
    }

    #[test]
    fn test_amount_bounds() {
        assert!(body(json!({ "additionalCharges": "99999999999.999", "additionalDiscount": "99999999999.999" })).into_command(None).is_ok());
        let err = body(json!({ "additionalCharges": "79228162514264337593543950335", "livraison": "100000000000" })).into_command(None).unwrap_err();
        assert_eq!(fields(err), vec!["additionalCharges", "livraison"]);
    }

    #[test]
    fn test_duplicate_lines_merge() {
        let cmd = body(json!({ "items": [
            { "type": "Product", "itemId": "P1", "quantity": 1 },
            { "type": "Product", "itemId": "P1", "quantity": 2 }
        ] }))
        .into_command(Some("amine".into()))
        .unwrap();
        assert_eq!(cmd.cart.len(), 1);
        assert_eq!(cmd.cart.entries()[0].quantity.value(), 3);
        assert_eq!(cmd.actor, "amine");
    }

    #[test]
    fn test_update_ignores_frozen_fields() {
        let req: UpdateVenteRequest = serde_json::from_value(json!({
            "status": "delivered", "note": "left at door", "items": [], "netAPayer": "0.000"
        }))
        .unwrap();
        let update = req.into_update().unwrap();
        assert_eq!(update.status, Some(VenteStatus::Delivered));
        assert_eq!(update.note.as_deref(), Some("left at door"));
    }
}
