//! HTTP surface of the vente engine

pub mod dto;
pub mod error;

use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use crate::application::{Quote, VenteService};
use crate::domain::aggregates::{StatusChange, Vente};
use crate::{Result, VenteError};
use dto::{ListParams, PaginatedResponse, PromoCodeView, UpdateVenteRequest, VenteRequest};

pub use error::ErrorResponse;

const ACTOR_HEADER: &str = "x-actor";

#[derive(Clone)]
pub struct AppState {
    pub service: VenteService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "vente-engine"})) }))
        .route("/vente", get(list_ventes))
        .route("/vente/new", post(create_vente))
        .route("/vente/quote", post(quote_vente))
        .route("/vente/update/:id", put(update_vente))
        .route("/vente/:id", get(get_vente).delete(delete_vente))
        .route("/vente/:id/history", get(vente_history))
        .route("/promo-code/:code", get(get_promo_code))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

/// JSON body whose parse failures come back as `VALIDATION_ERROR`.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = VenteError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(VenteError::invalid("body", rejection.body_text())),
        }
    }
}

fn actor(headers: &HeaderMap) -> Option<String> {
    headers.get(ACTOR_HEADER).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

async fn create_vente(State(s): State<AppState>, headers: HeaderMap, ApiJson(r): ApiJson<VenteRequest>) -> Result<(StatusCode, Json<Vente>)> {
    let cmd = r.into_command(actor(&headers))?;
    let vente = s.service.create(cmd, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(vente)))
}

async fn quote_vente(State(s): State<AppState>, headers: HeaderMap, ApiJson(r): ApiJson<VenteRequest>) -> Result<Json<Quote>> {
    let cmd = r.into_command(actor(&headers))?;
    Ok(Json(s.service.quote(&cmd, Utc::now()).await?))
}

async fn update_vente(State(s): State<AppState>, Path(id): Path<Uuid>, headers: HeaderMap, ApiJson(r): ApiJson<UpdateVenteRequest>) -> Result<Json<Vente>> {
    let who = actor(&headers).unwrap_or_else(|| "system".to_string());
    Ok(Json(s.service.update(id, r.into_update()?, &who, Utc::now()).await?))
}

async fn get_vente(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vente>> {
    Ok(Json(s.service.get(id).await?))
}

async fn list_ventes(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<Vente>>> {
    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(20).clamp(1, 100);
    let (data, total) = s.service.list(page, per_page).await?;
    Ok(Json(PaginatedResponse { data, total, page, per_page }))
}

async fn delete_vente(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn vente_history(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<StatusChange>>> {
    Ok(Json(s.service.history(id).await?))
}

async fn get_promo_code(State(s): State<AppState>, Path(code): Path<String>) -> Result<Json<PromoCodeView>> {
    Ok(Json(s.service.promo_code(code.trim()).await?.into()))
}
