//! HTTP mapping of engine errors

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use serde_json::{json, Value};
use crate::domain::services::WindowViolation;
use crate::VenteError;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl VenteError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ItemUnavailable { .. } => StatusCode::CONFLICT,
            Self::PromoCodeNotFound(_) | Self::PromoCodeInactive(_) | Self::PromoCodeExpired { .. } | Self::PromoCodeExhausted { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::VenteNotFound(_) => StatusCode::NOT_FOUND,
            Self::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ItemUnavailable { .. } => "ITEM_UNAVAILABLE",
            Self::PromoCodeNotFound(_) => "PROMO_CODE_NOT_FOUND",
            Self::PromoCodeInactive(_) => "PROMO_CODE_INACTIVE",
            Self::PromoCodeExpired { .. } => "PROMO_CODE_EXPIRED",
            Self::PromoCodeExhausted { .. } => "PROMO_CODE_EXHAUSTED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::VenteNotFound(_) => "VENTE_NOT_FOUND",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::Validation(fields) => Some(json!({ "fields": fields })),
            Self::ItemUnavailable { kind, item_id, reason } => Some(json!({ "type": kind, "itemId": item_id, "unavailable": reason })),
            Self::PromoCodeExpired { window: WindowViolation::NotYetStarted { starts_at }, .. } => Some(json!({ "startsAt": starts_at })),
            Self::PromoCodeExpired { window: WindowViolation::Ended { ended_at }, .. } => Some(json!({ "endedAt": ended_at })),
            Self::PromoCodeExhausted { limit, .. } => Some(json!({ "usageLimit": limit })),
            Self::InvalidTransition { from, to } => Some(json!({ "from": from, "to": to })),
            _ => None,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse { code: self.error_code(), message: self.to_string(), details: self.details() }
    }
}

impl IntoResponse for VenteError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }
        (status, Json(self.to_response())).into_response()
    }
}
