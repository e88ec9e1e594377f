//! Promo code aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::Rate;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    /// Unique and case-sensitive.
    pub code: String,
    #[serde(deserialize_with = "Rate::deserialize_discount")]
    pub discount_rate: Rate,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub active: bool,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub usage_count: u32,
}

impl PromoCode {
    pub fn new(code: impl Into<String>, discount_rate: Rate, start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Result<Self, PromoCodeError> {
        let code = code.into();
        if code.trim().is_empty() { return Err(PromoCodeError::EmptyCode); }
        if start_date > end_date { return Err(PromoCodeError::InvertedWindow); }
        Ok(Self { code, discount_rate, start_date, end_date, active: true, usage_limit: None, usage_count: 0 })
    }

    pub fn with_usage_limit(mut self, limit: u32) -> Self { self.usage_limit = Some(limit); self }
    pub fn deactivated(mut self) -> Self { self.active = false; self }

    pub fn is_exhausted(&self) -> bool { self.usage_limit.is_some_and(|limit| self.usage_count >= limit) }
}

#[derive(Debug, Clone, PartialEq)] pub enum PromoCodeError { EmptyCode, InvertedWindow }
impl std::error::Error for PromoCodeError {}
impl std::fmt::Display for PromoCodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::EmptyCode => write!(f, "Empty promo code"), Self::InvertedWindow => write!(f, "Start date after end date") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    #[test]
    fn test_window_must_be_ordered() {
        let now = Utc::now();
        let rate = Rate::discount(Decimal::new(10, 2)).unwrap();
        assert_eq!(PromoCode::new("SUMMER", rate, now, now - Duration::days(1)), Err(PromoCodeError::InvertedWindow));
        assert!(PromoCode::new("SUMMER", rate, now, now).is_ok());
        assert_eq!(PromoCode::new("  ", rate, now, now), Err(PromoCodeError::EmptyCode));
    }

    #[test]
    fn test_exhausted() {
        let now = Utc::now();
        let mut promo = PromoCode::new("VIP", Rate::discount(Decimal::ONE).unwrap(), now, now).unwrap().with_usage_limit(1);
        assert!(!promo.is_exhausted());
        promo.usage_count = 1;
        assert!(promo.is_exhausted());
    }

    #[test]
    fn test_deserialized_rate_is_a_discount() {
        let json = |rate: &str| serde_json::json!({
            "code": "VIP", "discountRate": rate, "startDate": "2024-06-01T00:00:00Z",
            "endDate": "2024-06-30T00:00:00Z", "active": true
        });
        assert!(serde_json::from_value::<PromoCode>(json("0.10")).is_ok());
        assert!(serde_json::from_value::<PromoCode>(json("0")).is_err());
        assert!(serde_json::from_value::<PromoCode>(json("1.5")).is_err());
    }
}
