//! Domain events
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::VenteStatus;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VenteEvent {
    Created { vente_id: Uuid, reference: String, net_a_payer: Decimal, promo_code: Option<String> },
    StatusChanged { vente_id: Uuid, reference: String, from: VenteStatus, to: VenteStatus, actor: String, at: DateTime<Utc> },
    Deleted { vente_id: Uuid, reference: String },
}

impl VenteEvent {
    /// Message subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Created { .. } => "vente.events.created",
            Self::StatusChanged { .. } => "vente.events.status_changed",
            Self::Deleted { .. } => "vente.events.deleted",
        }
    }
}
