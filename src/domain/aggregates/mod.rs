//! Aggregates module
pub mod line_item;
pub mod cart;
pub mod catalog;
pub mod delivery;
pub mod promo_code;
pub mod vente;

pub use line_item::{LineItem, LineKind};
pub use cart::{Cart, CartEntry};
pub use catalog::{CatalogItem, CatalogStatus};
pub use delivery::{DeliveryMethod, DeliveryOption};
pub use promo_code::{PromoCode, PromoCodeError};
pub use vente::{AppliedPromo, ClientInfo, ClientRef, ModePayment, StatusChange, Vente, VenteDraft, VenteStatus, VenteTotals};
