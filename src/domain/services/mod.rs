//! Pricing services: each step of turning a cart into a frozen breakdown.
pub mod normalizer;
pub mod pricing;
pub mod promo;
pub mod shipping;
pub mod totals;

pub use normalizer::{normalize, Catalog, NormalizedCart, Shortfall, StockPolicy};
pub use pricing::{price, PriceBreakdown};
pub use promo::{Adjustments, WindowViolation};
pub use totals::{LineTotals, Totals};
