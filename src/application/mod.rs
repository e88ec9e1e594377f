//! Use cases: quote, create, update, read and delete ventes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use crate::config::StockPolicies;
use crate::domain::aggregates::{
    AppliedPromo, Cart, ClientInfo, ClientRef, DeliveryMethod, LineItem, LineKind, ModePayment, PromoCode, StatusChange, Vente, VenteDraft,
    VenteStatus, VenteTotals,
};
use crate::domain::events::VenteEvent;
use crate::domain::services::{normalize, price, promo, Adjustments, Catalog, PriceBreakdown, Shortfall, StockPolicy};
use crate::domain::value_objects::Money;
use crate::infrastructure::{EventPublisher, SettingsProvider, VenteRepository};
use crate::{Result, VenteError};

/// Where a sale is entered. Decides the stock policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleChannel { #[default] Storefront, Admin }

/// A validated order request, ready to be priced.
#[derive(Clone, Debug)]
pub struct CheckoutCommand {
    pub cart: Cart,
    pub client: ClientRef,
    pub promo_code: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub adjustments: Adjustments,
    pub mode_payment: ModePayment,
    pub note: Option<String>,
    pub channel: SaleChannel,
    pub actor: String,
    /// Shipping fee the client displayed, if it sent one.
    pub quoted_livraison: Option<Money>,
    /// Unit prices the client displayed. Informational only.
    pub claimed_prices: Vec<(LineKind, String, Money)>,
}

/// Post-creation changes. `None` leaves a field as is.
#[derive(Clone, Debug, Default)]
pub struct VenteUpdate {
    pub status: Option<VenteStatus>,
    pub note: Option<String>,
    pub client: Option<ClientInfo>,
}

/// Breakdown shown on the checkout page before the vente exists.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub items: Vec<LineItem>,
    pub promo_code: Option<String>,
    #[serde(flatten)]
    pub totals: VenteTotals,
    pub shortfalls: Vec<Shortfall>,
}

struct Priced {
    items: Vec<LineItem>,
    promo: Option<AppliedPromo>,
    breakdown: PriceBreakdown,
    shortfalls: Vec<Shortfall>,
}

#[derive(Clone)]
pub struct VenteService {
    repository: Arc<dyn VenteRepository>,
    catalog: Arc<dyn Catalog>,
    settings: Arc<dyn SettingsProvider>,
    events: EventPublisher,
    stock: StockPolicies,
}

impl VenteService {
    pub fn new(
        repository: Arc<dyn VenteRepository>,
        catalog: Arc<dyn Catalog>,
        settings: Arc<dyn SettingsProvider>,
        events: EventPublisher,
        stock: StockPolicies,
    ) -> Self {
        Self { repository, catalog, settings, events, stock }
    }

    fn stock_policy(&self, channel: SaleChannel) -> StockPolicy {
        match channel { SaleChannel::Storefront => self.stock.storefront, SaleChannel::Admin => self.stock.admin }
    }

    /// Normalize, validate the promo code, price. Nothing is written.
    async fn price_command(&self, cmd: &CheckoutCommand, now: DateTime<Utc>) -> Result<Priced> {
        let normalized = normalize(self.catalog.as_ref(), &cmd.cart).await?;
        let shortfalls = normalized.shortfalls.clone();
        let items = normalized.under_policy(self.stock_policy(cmd.channel))?;

        let promo = match cmd.promo_code.as_deref() {
            None => None,
            Some(code) => {
                let found = self.repository.find_promo_code(code).await?;
                let valid = promo::check(code, found.as_ref(), now).inspect_err(|e| tracing::warn!(code, error = %e, "promo code rejected"))?;
                Some(AppliedPromo { code: valid.code.clone(), rate: valid.discount_rate })
            }
        };

        for (kind, item_id, claimed) in &cmd.claimed_prices {
            let catalog = items.iter().find(|i| i.kind == *kind && i.reference_id == *item_id).map(|i| i.unit_price_ht);
            if let Some(catalog) = catalog.filter(|c| c.rounded() != claimed.rounded()) {
                tracing::debug!(%kind, %item_id, %claimed, %catalog, "stale client price ignored");
            }
        }

        let settings = self.settings.pricing().await?;
        let delivery = settings.delivery_option(cmd.delivery_method);
        let breakdown = price(&items, settings.tva, &delivery, promo.as_ref().map(|p| p.rate), cmd.adjustments)?;
        if let Some(quoted) = cmd.quoted_livraison {
            if quoted.rounded() != breakdown.shipping_fee.rounded() {
                tracing::warn!(%quoted, evaluated = %breakdown.shipping_fee, "client shipping quote differs, using evaluated fee");
            }
        }
        tracing::debug!(
            subtotal_ttc = %breakdown.totals.subtotal_ttc, shipping = %breakdown.shipping_fee,
            promo = %breakdown.promo_discount, net = %breakdown.net_a_payer, "cart priced"
        );
        Ok(Priced { items, promo, breakdown, shortfalls })
    }

    pub async fn quote(&self, cmd: &CheckoutCommand, now: DateTime<Utc>) -> Result<Quote> {
        let priced = self.price_command(cmd, now).await?;
        Ok(Quote {
            totals: priced.breakdown.freeze(),
            items: priced.items,
            promo_code: priced.promo.map(|p| p.code),
            shortfalls: priced.shortfalls,
        })
    }

    pub async fn create(&self, cmd: CheckoutCommand, now: DateTime<Utc>) -> Result<Vente> {
        let priced = self.price_command(&cmd, now).await?;
        let draft = VenteDraft {
            client: cmd.client,
            items: priced.items,
            delivery_method: cmd.delivery_method,
            promo: priced.promo,
            totals: priced.breakdown.freeze(),
            mode_payment: cmd.mode_payment,
            note: cmd.note,
            actor: cmd.actor,
        };
        let mut vente = self.repository.create(draft, now).await?;
        tracing::info!(
            reference = %vente.reference(), net_a_payer = %vente.totals().net_a_payer,
            promo_code = vente.promo_code().unwrap_or("-"), "vente created"
        );
        self.events.publish(vente.take_events()).await;
        Ok(vente)
    }

    pub async fn get(&self, id: Uuid) -> Result<Vente> {
        self.repository.get(id).await?.ok_or_else(|| VenteError::VenteNotFound(id.to_string()))
    }

    pub async fn list(&self, page: u32, per_page: u32) -> Result<(Vec<Vente>, i64)> {
        self.repository.list(page.max(1), per_page.clamp(1, 100)).await
    }

    pub async fn update(&self, id: Uuid, update: VenteUpdate, actor: &str, now: DateTime<Utc>) -> Result<Vente> {
        let mut vente = self.get(id).await?;
        let expected = vente.status();
        let change = match update.status {
            Some(to) => vente.transition(to, actor, now).inspect_err(|e| tracing::warn!(reference = %vente.reference(), actor, error = %e, "status change refused"))?,
            None => None,
        };
        if let Some(note) = update.note {
            vente.set_note(Some(note).filter(|n| !n.trim().is_empty()), now);
        }
        match update.client {
            Some(client) if vente.is_new_client() => vente.correct_client(client, now)?,
            Some(_) => tracing::debug!(reference = %vente.reference(), "client snapshot ignored for account-linked vente"),
            None => {}
        }
        self.repository.update(&vente, expected, change.clone()).await?;
        if let Some(StatusChange { from, to, actor, at }) = &change {
            tracing::info!(reference = %vente.reference(), from = ?from, %to, %actor, %at, "vente status changed");
        }
        self.events.publish(vente.take_events()).await;
        Ok(vente)
    }

    pub async fn delete(&self, id: Uuid) -> Result<Vente> {
        let mut vente = self.repository.delete(id).await?.ok_or_else(|| VenteError::VenteNotFound(id.to_string()))?;
        tracing::info!(reference = %vente.reference(), status = %vente.status(), "vente deleted");
        vente.raise_event(VenteEvent::Deleted { vente_id: vente.id(), reference: vente.reference().to_string() });
        self.events.publish(vente.take_events()).await;
        Ok(vente)
    }

    pub async fn history(&self, id: Uuid) -> Result<Vec<StatusChange>> {
        self.get(id).await?;
        self.repository.history(id).await
    }

    pub async fn promo_code(&self, code: &str) -> Result<PromoCode> {
        self.repository.find_promo_code(code).await?.ok_or_else(|| VenteError::PromoCodeNotFound(code.to_string()))
    }
}
