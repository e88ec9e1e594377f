//! In-memory storage for development and tests
//!
//! A single `RwLock` guards all state, so every write (including promo
//! redemption on create) is atomic with respect to other requests.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;
use crate::domain::aggregates::{CatalogItem, LineKind, PromoCode, StatusChange, Vente, VenteDraft, VenteStatus};
use crate::domain::services::{promo, Catalog};
use crate::domain::value_objects::VenteReference;
use crate::infrastructure::repository::{concurrent_update, VenteRepository};
use crate::{Result, VenteError};

#[derive(Default)]
struct State {
    ventes: HashMap<Uuid, Vente>,
    /// Creation order, oldest first.
    order: Vec<Uuid>,
    history: HashMap<Uuid, Vec<StatusChange>>,
    promo_codes: HashMap<String, PromoCode>,
    sequence: u64,
}

#[derive(Clone, Default)]
pub struct InMemoryVenteRepository {
    state: Arc<RwLock<State>>,
}

impl InMemoryVenteRepository {
    pub fn new() -> Self { Self::default() }

    pub fn insert_promo_code(&self, promo: PromoCode) -> Result<()> {
        self.write()?.promo_codes.insert(promo.code.clone(), promo);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|e| VenteError::Persistence(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|e| VenteError::Persistence(format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl VenteRepository for InMemoryVenteRepository {
    async fn find_promo_code(&self, code: &str) -> Result<Option<PromoCode>> {
        Ok(self.read()?.promo_codes.get(code).cloned())
    }

    async fn create(&self, draft: VenteDraft, now: DateTime<Utc>) -> Result<Vente> {
        let mut state = self.write()?;
        // Redeem on a copy so a failure leaves the counter untouched.
        let redeemed = match &draft.promo {
            Some(applied) => {
                let mut promo = state.promo_codes.get(&applied.code).cloned().ok_or_else(|| VenteError::PromoCodeNotFound(applied.code.clone()))?;
                promo::redeem(&mut promo, applied, now)?;
                Some(promo)
            }
            None => None,
        };
        state.sequence += 1;
        let reference = VenteReference::from_sequence(now.year(), state.sequence);
        let actor = draft.actor.clone();
        let vente = Vente::create(Uuid::now_v7(), reference, draft, now);
        if let Some(promo) = redeemed { state.promo_codes.insert(promo.code.clone(), promo); }
        state.history.insert(vente.id(), vec![StatusChange { from: None, to: VenteStatus::Pending, actor, at: now }]);
        let mut stored = vente.clone();
        stored.take_events();
        state.order.push(vente.id());
        state.ventes.insert(vente.id(), stored);
        Ok(vente)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Vente>> {
        Ok(self.read()?.ventes.get(&id).cloned())
    }

    async fn list(&self, page: u32, per_page: u32) -> Result<(Vec<Vente>, i64)> {
        let state = self.read()?;
        let offset = (page.saturating_sub(1) as usize) * per_page as usize;
        let ventes = state.order.iter().rev().skip(offset).take(per_page as usize).filter_map(|id| state.ventes.get(id).cloned()).collect();
        Ok((ventes, state.order.len() as i64))
    }

    async fn update(&self, vente: &Vente, expected: VenteStatus, change: Option<StatusChange>) -> Result<()> {
        let mut state = self.write()?;
        let stored = state.ventes.get_mut(&vente.id()).ok_or_else(|| VenteError::VenteNotFound(vente.id().to_string()))?;
        if stored.status() != expected {
            return Err(concurrent_update(vente.reference().as_str()));
        }
        stored.status = vente.status;
        stored.note = vente.note.clone();
        stored.client = vente.client.clone();
        stored.updated_at = vente.updated_at;
        if let Some(change) = change {
            state.history.entry(vente.id()).or_default().push(change);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Vente>> {
        let mut state = self.write()?;
        let removed = state.ventes.remove(&id);
        if removed.is_some() {
            state.order.retain(|v| *v != id);
            state.history.remove(&id);
        }
        Ok(removed)
    }

    async fn history(&self, id: Uuid) -> Result<Vec<StatusChange>> {
        Ok(self.read()?.history.get(&id).cloned().unwrap_or_default())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    items: Arc<RwLock<HashMap<(LineKind, String), CatalogItem>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&self, item: CatalogItem) -> Result<()> {
        let mut items = self.items.write().map_err(|e| VenteError::Persistence(format!("Failed to acquire write lock: {}", e)))?;
        items.insert((item.kind, item.id.clone()), item);
        Ok(())
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn find(&self, kind: LineKind, id: &str) -> Result<Option<CatalogItem>> {
        let items = self.items.read().map_err(|e| VenteError::Persistence(format!("Failed to acquire read lock: {}", e)))?;
        Ok(items.get(&(kind, id.to_string())).cloned())
    }
}
