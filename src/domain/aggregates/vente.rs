//! Vente Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use crate::domain::aggregates::{DeliveryMethod, LineItem};
use crate::domain::events::VenteEvent;
use crate::domain::value_objects::{Money, Rate, VenteReference};
use crate::{Result, VenteError};

/// A persisted order. Items and totals are frozen at creation; only the
/// status, the note and the client contact may change afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vente {
    pub(crate) id: Uuid,
    pub(crate) reference: VenteReference,
    pub(crate) is_new_client: bool,
    pub(crate) client_id: Option<String>,
    pub(crate) client: Option<ClientInfo>,
    pub(crate) items: Vec<LineItem>,
    pub(crate) delivery_method: DeliveryMethod,
    pub(crate) promo_code: Option<String>,
    #[serde(flatten)]
    pub(crate) totals: VenteTotals,
    pub(crate) mode_payment: ModePayment,
    pub(crate) status: VenteStatus,
    pub(crate) note: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<VenteEvent>,
}

/// Embedded client snapshot used when the buyer has no account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub name: String,
    pub email: String,
    pub phone1: String,
    #[serde(default)]
    pub phone2: Option<String>,
    pub address: String,
    pub ville: String,
    #[serde(default)]
    pub client_note: Option<String>,
}

/// Which client representation is authoritative for a vente.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientRef {
    Account(String),
    Snapshot(ClientInfo),
}

/// Frozen monetary breakdown, rounded to the currency scale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenteTotals {
    #[serde(deserialize_with = "Rate::deserialize_tax")]
    pub tva_rate: Rate,
    #[serde(rename = "totalHT")]
    pub total_ht: Money,
    pub tva: Money,
    #[serde(rename = "totalTTC")]
    pub total_ttc: Money,
    pub products_discount: Money,
    pub livraison: Money,
    pub additional_charges: Money,
    pub additional_discount: Money,
    pub discount: Money,
    pub net_a_payer: Money,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModePayment { Cash, CreditCard, BankTransfer, Eddahabia, D17 }

impl ModePayment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH", Self::CreditCard => "CREDIT_CARD", Self::BankTransfer => "BANK_TRANSFER",
            Self::Eddahabia => "EDDAHABIA", Self::D17 => "D17",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [Self::Cash, Self::CreditCard, Self::BankTransfer, Self::Eddahabia, Self::D17].into_iter().find(|m| m.as_str() == value)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenteStatus { #[default] Pending, Processing, Delivered, Paid, Cancelled }

impl VenteStatus {
    pub const ALL: [VenteStatus; 5] = [Self::Pending, Self::Processing, Self::Delivered, Self::Paid, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Processing => "processing", Self::Delivered => "delivered",
            Self::Paid => "paid", Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> { Self::ALL.into_iter().find(|s| s.as_str() == value) }

    pub fn is_terminal(&self) -> bool { self.allowed_targets().is_empty() }

    /// Transition table. No ordering is imposed among the open states.
    pub fn allowed_targets(&self) -> &'static [VenteStatus] {
        use VenteStatus::*;
        match self {
            Pending => &[Processing, Delivered, Paid, Cancelled],
            Processing => &[Pending, Delivered, Paid, Cancelled],
            Delivered => &[Pending, Processing, Paid, Cancelled],
            Paid => &[Pending, Processing, Delivered, Cancelled],
            Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, to: VenteStatus) -> bool { self.allowed_targets().contains(&to) }
}

impl fmt::Display for VenteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Audit record of one status change. `from` is `None` for the initial status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub from: Option<VenteStatus>,
    pub to: VenteStatus,
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// Everything needed to create a vente except its identity.
#[derive(Clone, Debug)]
pub struct VenteDraft {
    pub client: ClientRef,
    pub items: Vec<LineItem>,
    pub delivery_method: DeliveryMethod,
    pub promo: Option<AppliedPromo>,
    pub totals: VenteTotals,
    pub mode_payment: ModePayment,
    pub note: Option<String>,
    pub actor: String,
}

/// Promo code snapshot taken when the draft was priced.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedPromo {
    pub code: String,
    pub rate: Rate,
}

impl Vente {
    /// Builds the vente from a priced draft. Only the repository calls this,
    /// inside the transaction that assigns `reference`.
    pub fn create(id: Uuid, reference: VenteReference, draft: VenteDraft, now: DateTime<Utc>) -> Self {
        let (is_new_client, client_id, client) = match draft.client {
            ClientRef::Account(id) => (false, Some(id), None),
            ClientRef::Snapshot(info) => (true, None, Some(info)),
        };
        let mut vente = Self {
            id, reference, is_new_client, client_id, client, items: draft.items,
            delivery_method: draft.delivery_method, promo_code: draft.promo.map(|p| p.code),
            totals: draft.totals, mode_payment: draft.mode_payment, status: VenteStatus::Pending,
            note: draft.note, created_at: now, updated_at: now, events: vec![],
        };
        vente.raise_event(VenteEvent::Created {
            vente_id: id, reference: vente.reference.to_string(),
            net_a_payer: vente.totals.net_a_payer.amount(), promo_code: vente.promo_code.clone(),
        });
        vente
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn reference(&self) -> &VenteReference { &self.reference }
    pub fn status(&self) -> VenteStatus { self.status }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn totals(&self) -> &VenteTotals { &self.totals }
    pub fn note(&self) -> Option<&str> { self.note.as_deref() }
    pub fn promo_code(&self) -> Option<&str> { self.promo_code.as_deref() }
    pub fn mode_payment(&self) -> ModePayment { self.mode_payment }
    pub fn delivery_method(&self) -> DeliveryMethod { self.delivery_method }
    pub fn client(&self) -> Option<&ClientInfo> { self.client.as_ref() }
    pub fn client_id(&self) -> Option<&str> { self.client_id.as_deref() }
    pub fn is_new_client(&self) -> bool { self.is_new_client }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Moves the vente to `to`. Re-applying the current status is a no-op and
    /// returns `None`; leaving `cancelled` is refused.
    pub fn transition(&mut self, to: VenteStatus, actor: &str, now: DateTime<Utc>) -> Result<Option<StatusChange>> {
        if to == self.status { return Ok(None); }
        if !self.status.can_transition_to(to) {
            return Err(VenteError::InvalidTransition { from: self.status, to });
        }
        let change = StatusChange { from: Some(self.status), to, actor: actor.to_string(), at: now };
        self.raise_event(VenteEvent::StatusChanged {
            vente_id: self.id, reference: self.reference.to_string(), from: self.status, to, actor: actor.to_string(), at: now,
        });
        self.status = to;
        self.touch(now);
        Ok(Some(change))
    }

    pub fn set_note(&mut self, note: Option<String>, now: DateTime<Utc>) {
        if self.note != note { self.note = note; self.touch(now); }
    }

    /// Corrects the contact details of a guest client. Account-linked ventes
    /// are corrected on the account itself.
    pub fn correct_client(&mut self, info: ClientInfo, now: DateTime<Utc>) -> Result<()> {
        if !self.is_new_client {
            return Err(VenteError::invalid("client", "vente is linked to a client account"));
        }
        if self.client.as_ref() != Some(&info) { self.client = Some(info); self.touch(now); }
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<VenteEvent> { std::mem::take(&mut self.events) }
    pub(crate) fn raise_event(&mut self, e: VenteEvent) { self.events.push(e); }
    fn touch(&mut self, now: DateTime<Utc>) { self.updated_at = now; }
}
