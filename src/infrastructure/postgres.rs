//! PostgreSQL storage

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use std::fmt::Display;
use uuid::Uuid;
use crate::config::PricingSettings;
use crate::domain::aggregates::{
    CatalogItem, CatalogStatus, ClientInfo, DeliveryMethod, LineItem, LineKind, ModePayment, PromoCode, StatusChange, Vente,
    VenteDraft, VenteStatus, VenteTotals,
};
use crate::domain::services::{promo, Catalog};
use crate::domain::value_objects::{Money, Rate, VenteReference};
use crate::infrastructure::repository::{concurrent_update, SettingsProvider, VenteRepository};
use crate::{Result, VenteError};

const VENTE_COLUMNS: &str = "id, reference, is_new_client, client_id, client, items, delivery_method, promo_code, tva_rate, total_ht, tva, \
     total_ttc, products_discount, livraison, additional_charges, additional_discount, discount, net_a_payer, mode_payment, status, note, \
     created_at, updated_at";

const PROMO_COLUMNS: &str = "code, discount_rate, start_date, end_date, active, usage_limit, usage_count";

fn corrupt(what: &str, e: impl Display) -> VenteError { VenteError::Persistence(format!("corrupt {} row: {}", what, e)) }

#[derive(Debug, sqlx::FromRow)]
struct PromoCodeRow {
    code: String, discount_rate: Decimal, start_date: DateTime<Utc>, end_date: DateTime<Utc>,
    active: bool, usage_limit: Option<i32>, usage_count: i32,
}

impl TryFrom<PromoCodeRow> for PromoCode {
    type Error = VenteError;
    fn try_from(row: PromoCodeRow) -> Result<Self> {
        Ok(PromoCode {
            discount_rate: Rate::discount(row.discount_rate).map_err(|e| corrupt("promo_codes", e))?,
            usage_limit: row.usage_limit.map(|l| u32::try_from(l).map_err(|e| corrupt("promo_codes", e))).transpose()?,
            usage_count: u32::try_from(row.usage_count).map_err(|e| corrupt("promo_codes", e))?,
            code: row.code, start_date: row.start_date, end_date: row.end_date, active: row.active,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VenteRow {
    id: Uuid, reference: String, is_new_client: bool, client_id: Option<String>, client: Option<Json<ClientInfo>>,
    items: Json<Vec<LineItem>>, delivery_method: String, promo_code: Option<String>,
    tva_rate: Decimal, total_ht: Decimal, tva: Decimal, total_ttc: Decimal, products_discount: Decimal, livraison: Decimal,
    additional_charges: Decimal, additional_discount: Decimal, discount: Decimal, net_a_payer: Decimal,
    mode_payment: String, status: String, note: Option<String>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<VenteRow> for Vente {
    type Error = VenteError;
    fn try_from(row: VenteRow) -> Result<Self> {
        Ok(Vente {
            id: row.id,
            reference: VenteReference::parse(row.reference).map_err(|e| corrupt("ventes", e))?,
            is_new_client: row.is_new_client,
            client_id: row.client_id,
            client: row.client.map(|c| c.0),
            items: row.items.0,
            delivery_method: DeliveryMethod::parse(&row.delivery_method).ok_or_else(|| corrupt("ventes", &row.delivery_method))?,
            promo_code: row.promo_code,
            totals: VenteTotals {
                tva_rate: Rate::tax(row.tva_rate).map_err(|e| corrupt("ventes", e))?,
                total_ht: Money::new(row.total_ht), tva: Money::new(row.tva), total_ttc: Money::new(row.total_ttc),
                products_discount: Money::new(row.products_discount), livraison: Money::new(row.livraison),
                additional_charges: Money::new(row.additional_charges), additional_discount: Money::new(row.additional_discount),
                discount: Money::new(row.discount), net_a_payer: Money::new(row.net_a_payer),
            },
            mode_payment: ModePayment::parse(&row.mode_payment).ok_or_else(|| corrupt("ventes", &row.mode_payment))?,
            status: VenteStatus::parse(&row.status).ok_or_else(|| corrupt("ventes", &row.status))?,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
            events: Vec::new(),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatusChangeRow { from_status: Option<String>, to_status: String, actor: String, at: DateTime<Utc> }

impl TryFrom<StatusChangeRow> for StatusChange {
    type Error = VenteError;
    fn try_from(row: StatusChangeRow) -> Result<Self> {
        let parse = |s: &str| VenteStatus::parse(s).ok_or_else(|| corrupt("vente_status_history", s));
        Ok(StatusChange { from: row.from_status.as_deref().map(parse).transpose()?, to: parse(&row.to_status)?, actor: row.actor, at: row.at })
    }
}

#[derive(Clone)]
pub struct PgVenteRepository { pool: PgPool }

impl PgVenteRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl VenteRepository for PgVenteRepository {
    async fn find_promo_code(&self, code: &str) -> Result<Option<PromoCode>> {
        sqlx::query_as::<_, PromoCodeRow>(&format!("SELECT {} FROM promo_codes WHERE code = $1", PROMO_COLUMNS))
            .bind(code).fetch_optional(&self.pool).await?
            .map(PromoCode::try_from).transpose()
    }

    async fn create(&self, draft: VenteDraft, now: DateTime<Utc>) -> Result<Vente> {
        let mut tx = self.pool.begin().await?;

        if let Some(applied) = &draft.promo {
            let row = sqlx::query_as::<_, PromoCodeRow>(&format!("SELECT {} FROM promo_codes WHERE code = $1 FOR UPDATE", PROMO_COLUMNS))
                .bind(&applied.code).fetch_optional(&mut *tx).await?;
            let mut promo = row.map(PromoCode::try_from).transpose()?.ok_or_else(|| VenteError::PromoCodeNotFound(applied.code.clone()))?;
            promo::redeem(&mut promo, applied, now)?;
            sqlx::query("UPDATE promo_codes SET usage_count = $2 WHERE code = $1")
                .bind(&promo.code).bind(promo.usage_count as i32).execute(&mut *tx).await?;
        }

        let seq: i64 = sqlx::query_scalar("SELECT nextval('vente_reference_seq')").fetch_one(&mut *tx).await?;
        let actor = draft.actor.clone();
        let vente = Vente::create(Uuid::now_v7(), VenteReference::from_sequence(now.year(), seq as u64), draft, now);
        let t = vente.totals();

        sqlx::query(&format!("INSERT INTO ventes ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23)", VENTE_COLUMNS))
            .bind(vente.id()).bind(vente.reference().as_str()).bind(vente.is_new_client()).bind(vente.client_id())
            .bind(vente.client().map(Json)).bind(Json(vente.items())).bind(vente.delivery_method().as_str()).bind(vente.promo_code())
            .bind(t.tva_rate.fraction()).bind(t.total_ht.amount()).bind(t.tva.amount()).bind(t.total_ttc.amount())
            .bind(t.products_discount.amount()).bind(t.livraison.amount()).bind(t.additional_charges.amount())
            .bind(t.additional_discount.amount()).bind(t.discount.amount()).bind(t.net_a_payer.amount())
            .bind(vente.mode_payment().as_str()).bind(vente.status().as_str()).bind(vente.note())
            .bind(vente.created_at()).bind(vente.updated_at())
            .execute(&mut *tx).await?;

        sqlx::query("INSERT INTO vente_status_history (vente_id, from_status, to_status, actor, at) VALUES ($1, NULL, $2, $3, $4)")
            .bind(vente.id()).bind(VenteStatus::Pending.as_str()).bind(&actor).bind(now)
            .execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(vente)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Vente>> {
        sqlx::query_as::<_, VenteRow>(&format!("SELECT {} FROM ventes WHERE id = $1", VENTE_COLUMNS))
            .bind(id).fetch_optional(&self.pool).await?
            .map(Vente::try_from).transpose()
    }

    async fn list(&self, page: u32, per_page: u32) -> Result<(Vec<Vente>, i64)> {
        let rows = sqlx::query_as::<_, VenteRow>(&format!("SELECT {} FROM ventes ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2", VENTE_COLUMNS))
            .bind(per_page as i64).bind((page.saturating_sub(1) as i64) * per_page as i64)
            .fetch_all(&self.pool).await?;
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ventes").fetch_one(&self.pool).await?;
        Ok((rows.into_iter().map(Vente::try_from).collect::<Result<_>>()?, total.0))
    }

    async fn update(&self, vente: &Vente, expected: VenteStatus, change: Option<StatusChange>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query("UPDATE ventes SET status = $2, note = $3, client = $4, updated_at = $5 WHERE id = $1 AND status = $6")
            .bind(vente.id()).bind(vente.status().as_str()).bind(vente.note()).bind(vente.client().map(Json))
            .bind(vente.updated_at()).bind(expected.as_str())
            .execute(&mut *tx).await?;
        if updated.rows_affected() == 0 {
            let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM ventes WHERE id = $1").bind(vente.id()).fetch_optional(&mut *tx).await?;
            return Err(match exists {
                Some(_) => concurrent_update(vente.reference().as_str()),
                None => VenteError::VenteNotFound(vente.id().to_string()),
            });
        }
        if let Some(change) = change {
            sqlx::query("INSERT INTO vente_status_history (vente_id, from_status, to_status, actor, at) VALUES ($1, $2, $3, $4, $5)")
                .bind(vente.id()).bind(change.from.map(|s| s.as_str())).bind(change.to.as_str()).bind(&change.actor).bind(change.at)
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Vente>> {
        sqlx::query_as::<_, VenteRow>(&format!("DELETE FROM ventes WHERE id = $1 RETURNING {}", VENTE_COLUMNS))
            .bind(id).fetch_optional(&self.pool).await?
            .map(Vente::try_from).transpose()
    }

    async fn history(&self, id: Uuid) -> Result<Vec<StatusChange>> {
        sqlx::query_as::<_, StatusChangeRow>("SELECT from_status, to_status, actor, at FROM vente_status_history WHERE vente_id = $1 ORDER BY id")
            .bind(id).fetch_all(&self.pool).await?
            .into_iter().map(StatusChange::try_from).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CatalogRow { id: String, name: String, price_ht: Decimal, old_price_ht: Option<Decimal>, enabled: bool, stock: Option<i32> }

/// Reads the catalog service's `products` and `packs` tables.
#[derive(Clone)]
pub struct PgCatalog { pool: PgPool }

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn find(&self, kind: LineKind, id: &str) -> Result<Option<CatalogItem>> {
        let table = match kind { LineKind::Product => "products", LineKind::Pack => "packs" };
        let row = sqlx::query_as::<_, CatalogRow>(&format!("SELECT id, name, price_ht, old_price_ht, enabled, stock FROM {} WHERE id = $1", table))
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| CatalogItem {
            id: r.id, kind, name: r.name, price_ht: Money::new(r.price_ht), old_price_ht: r.old_price_ht.map(Money::new),
            status: if r.enabled { CatalogStatus::Active } else { CatalogStatus::Disabled },
            // Negative stock counts as none left.
            stock: r.stock.map(|s| s.max(0) as u32),
        }))
    }
}

/// Reads the single `advanced_settings` row, falling back to configuration.
#[derive(Clone)]
pub struct PgSettings { pool: PgPool, fallback: PricingSettings }

impl PgSettings {
    pub fn new(pool: PgPool, fallback: PricingSettings) -> Self { Self { pool, fallback } }
}

#[async_trait]
impl SettingsProvider for PgSettings {
    async fn pricing(&self) -> Result<PricingSettings> {
        let row: Option<(Decimal, Decimal, Decimal)> = sqlx::query_as("SELECT tva, livraison, free_shipping_above FROM advanced_settings WHERE id = 1")
            .fetch_optional(&self.pool).await?;
        match row {
            Some((tva, livraison, free_above)) => Ok(PricingSettings::validated(tva, livraison, free_above)?),
            None => Ok(self.fallback),
        }
    }
}
