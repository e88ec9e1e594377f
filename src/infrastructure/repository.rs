//! Contracts the engine needs from durable storage and from settings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::config::PricingSettings;
use crate::domain::aggregates::{PromoCode, StatusChange, Vente, VenteDraft, VenteStatus};
use crate::Result;

#[async_trait]
pub trait VenteRepository: Send + Sync {
    async fn find_promo_code(&self, code: &str) -> Result<Option<PromoCode>>;

    /// Stores a new vente as one unit: redeems the draft's promo code (re-checked
    /// under lock), assigns the reference, writes the vente and its initial
    /// `pending` history entry. On error nothing is written.
    async fn create(&self, draft: VenteDraft, now: DateTime<Utc>) -> Result<Vente>;

    async fn get(&self, id: Uuid) -> Result<Option<Vente>>;

    /// Newest first.
    async fn list(&self, page: u32, per_page: u32) -> Result<(Vec<Vente>, i64)>;

    /// Saves mutable fields of `vente` if its stored status is still
    /// `expected`, appending `change` to the history.
    async fn update(&self, vente: &Vente, expected: VenteStatus, change: Option<StatusChange>) -> Result<()>;

    /// Hard delete. Returns the removed vente, if any.
    async fn delete(&self, id: Uuid) -> Result<Option<Vente>>;

    async fn history(&self, id: Uuid) -> Result<Vec<StatusChange>>;
}

/// The "advanced settings" collaborator.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn pricing(&self) -> Result<PricingSettings>;
}

/// Settings fixed at startup from configuration.
#[derive(Clone, Debug, Default)]
pub struct StaticSettings(pub PricingSettings);

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn pricing(&self) -> Result<PricingSettings> { Ok(self.0) }
}

pub(crate) fn concurrent_update(reference: &str) -> crate::VenteError {
    crate::VenteError::Persistence(format!("vente {} was modified concurrently, retry", reference))
}
