//! Storage, settings and event publishing behind narrow traits.
pub mod events;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use events::EventPublisher;
pub use repository::{SettingsProvider, StaticSettings, VenteRepository};
