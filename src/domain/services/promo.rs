//! Promo code validation and discount amounts

use chrono::{DateTime, Utc};
use std::fmt;
use crate::domain::aggregates::{AppliedPromo, PromoCode};
use crate::domain::value_objects::{Money, Rate};
use crate::{Result, VenteError};

/// Which side of the validity window `now` fell on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WindowViolation {
    NotYetStarted { starts_at: DateTime<Utc> },
    Ended { ended_at: DateTime<Utc> },
}

impl fmt::Display for WindowViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYetStarted { starts_at } => write!(f, "is not valid before {}", starts_at.format("%Y-%m-%d %H:%M")),
            Self::Ended { ended_at } => write!(f, "expired on {}", ended_at.format("%Y-%m-%d %H:%M")),
        }
    }
}

/// Validates a looked-up promo code. Checks run in order and the first
/// failure wins: existence, active flag, validity window, usage cap.
pub fn check<'a>(code: &str, found: Option<&'a PromoCode>, now: DateTime<Utc>) -> Result<&'a PromoCode> {
    let promo = found.ok_or_else(|| VenteError::PromoCodeNotFound(code.to_string()))?;
    if !promo.active {
        return Err(VenteError::PromoCodeInactive(promo.code.clone()));
    }
    if now < promo.start_date {
        return Err(VenteError::PromoCodeExpired { code: promo.code.clone(), window: WindowViolation::NotYetStarted { starts_at: promo.start_date } });
    }
    if now > promo.end_date {
        return Err(VenteError::PromoCodeExpired { code: promo.code.clone(), window: WindowViolation::Ended { ended_at: promo.end_date } });
    }
    if let (true, Some(limit)) = (promo.is_exhausted(), promo.usage_limit) {
        return Err(VenteError::PromoCodeExhausted { code: promo.code.clone(), limit });
    }
    Ok(promo)
}

pub fn discount_amount(subtotal_ttc: Money, rate: Rate) -> Money { subtotal_ttc * rate.fraction() }

/// Commit-time redemption. Runs under the repository's lock on the code row:
/// re-checks validity, refuses a rate that moved since the cart was priced,
/// then counts the use.
pub fn redeem(promo: &mut PromoCode, applied: &AppliedPromo, now: DateTime<Utc>) -> Result<()> {
    check(&applied.code, Some(&*promo), now)?;
    if promo.discount_rate != applied.rate {
        return Err(VenteError::Persistence(format!("promo code '{}' changed during checkout, retry", promo.code)));
    }
    promo.usage_count += 1;
    Ok(())
}

/// Manual amounts entered on the admin sale form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Adjustments {
    pub additional_charges: Money,
    pub additional_discount: Money,
}

impl Adjustments {
    pub fn new(additional_charges: Money, additional_discount: Money) -> Result<Self> {
        let mut violations = Vec::new();
        for (field, value) in [("additionalCharges", additional_charges), ("additionalDiscount", additional_discount)] {
            if value.is_negative() {
                violations.push(crate::FieldViolation { field: field.into(), message: "must not be negative".into() });
            } else if value > Money::max_storable() {
                violations.push(crate::FieldViolation { field: field.into(), message: format!("must not exceed {}", Money::max_storable()) });
            }
        }
        if !violations.is_empty() { return Err(VenteError::Validation(violations)); }
        Ok(Self { additional_charges, additional_discount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn promo() -> PromoCode {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap();
        PromoCode::new("SUMMER10", Rate::discount(Decimal::new(10, 2)).unwrap(), start, end).unwrap()
    }

    #[test]
    fn test_absent_code_is_not_found() {
        assert!(matches!(check("NOPE", None, Utc::now()), Err(VenteError::PromoCodeNotFound(c)) if c == "NOPE"));
    }

    #[test]
    fn test_inactive_wins_over_window() {
        let p = promo().deactivated();
        assert!(matches!(check("SUMMER10", Some(&p), p.end_date + Duration::days(5)), Err(VenteError::PromoCodeInactive(_))));
    }

    #[test]
    fn test_window_is_inclusive() {
        let p = promo();
        assert!(check("SUMMER10", Some(&p), p.start_date).is_ok());
        assert!(check("SUMMER10", Some(&p), p.end_date).is_ok());
        assert!(matches!(
            check("SUMMER10", Some(&p), p.start_date - Duration::seconds(1)),
            Err(VenteError::PromoCodeExpired { window: WindowViolation::NotYetStarted { .. }, .. })
        ));
        assert!(matches!(
            check("SUMMER10", Some(&p), p.end_date + Duration::seconds(1)),
            Err(VenteError::PromoCodeExpired { window: WindowViolation::Ended { .. }, .. })
        ));
    }

    #[test]
    fn test_expired_messages_differ() {
        let p = promo();
        let early = check("SUMMER10", Some(&p), p.start_date - Duration::days(1)).unwrap_err().to_string();
        let late = check("SUMMER10", Some(&p), p.end_date + Duration::days(1)).unwrap_err().to_string();
        assert!(early.contains("not valid before"));
        assert!(late.contains("expired on"));
    }

    #[test]
    fn test_usage_cap() {
        let mut p = promo().with_usage_limit(2);
        p.usage_count = 2;
        assert!(matches!(check("SUMMER10", Some(&p), p.start_date), Err(VenteError::PromoCodeExhausted { limit: 2, .. })));
    }

    #[test]
    fn test_discount_amount() {
        let amount = discount_amount(Money::new(Decimal::new(200, 0)), promo().discount_rate);
        assert_eq!(amount.rounded().amount(), Decimal::new(20, 0));
    }

    #[test]
    fn test_redeem_counts_and_caps() {
        let mut p = promo().with_usage_limit(1);
        let applied = AppliedPromo { code: p.code.clone(), rate: p.discount_rate };
        let now = p.start_date;
        redeem(&mut p, &applied, now).unwrap();
        assert_eq!(p.usage_count, 1);
        assert!(matches!(redeem(&mut p, &applied, now), Err(VenteError::PromoCodeExhausted { .. })));
        assert_eq!(p.usage_count, 1);
    }

    #[test]
    fn test_redeem_refuses_changed_rate() {
        let mut p = promo();
        let applied = AppliedPromo { code: p.code.clone(), rate: Rate::discount(Decimal::new(50, 2)).unwrap() };
        let now = p.start_date;
        assert!(matches!(redeem(&mut p, &applied, now), Err(VenteError::Persistence(_))));
        assert_eq!(p.usage_count, 0);
    }

    #[test]
    fn test_adjustments_reject_negative() {
        let err = Adjustments::new(Money::new(Decimal::new(-1, 0)), Money::new(Decimal::new(-2, 0))).unwrap_err();
        assert!(matches!(err, VenteError::Validation(v) if v.len() == 2));
        assert!(Adjustments::new(Money::ZERO, Money::new(Decimal::new(5, 0))).is_ok());
        assert!(Adjustments::new(Money::max_storable(), Money::max_storable()).is_ok());
        let err = Adjustments::new(Money::new(Decimal::MAX), Money::ZERO).unwrap_err();
        assert!(matches!(err, VenteError::Validation(v) if v[0].field == "additionalCharges"));
    }
}
