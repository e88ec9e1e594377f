//! Vente Engine - order pricing and lifecycle service

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vente_engine::api::{self, AppState};
use vente_engine::infrastructure::memory::{InMemoryCatalog, InMemoryVenteRepository};
use vente_engine::infrastructure::postgres::{PgCatalog, PgSettings, PgVenteRepository};
use vente_engine::infrastructure::{EventPublisher, StaticSettings};
use vente_engine::{AppConfig, VenteService};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, events will only be logged"); None }
        },
        None => None,
    };
    let events = EventPublisher::new(nats);

    let service = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            VenteService::new(
                Arc::new(PgVenteRepository::new(db.clone())),
                Arc::new(PgCatalog::new(db.clone())),
                Arc::new(PgSettings::new(db, config.pricing)),
                events,
                config.stock,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            VenteService::new(
                Arc::new(InMemoryVenteRepository::new()),
                Arc::new(InMemoryCatalog::new()),
                Arc::new(StaticSettings(config.pricing)),
                events,
                config.stock,
            )
        }
    };

    let app = api::router(AppState { service });
    tracing::info!("🚀 Vente engine listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
