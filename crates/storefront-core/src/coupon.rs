//! # Coupon Validator
//!
//! Checks a coupon's eligibility for a cart at a given instant.
//!
//! ## Check Order
//! ```text
//! resolve(code, lookup) ── None ──► NotFound
//!      │
//!      ▼
//! validate(coupon, subtotal, now)
//!      ├── !is_active                         → Inactive
//!      ├── now < valid_from                   → NotYetValid
//!      ├── now > valid_until                  → Expired
//!      ├── usage_count ≥ usage_limit          → UsageLimitExceeded (advisory)
//!      ├── min_purchase > 0 && subtotal < min → BelowMinPurchase
//!      └── Ok
//! ```
//!
//! The validity window is inclusive at both ends. Validation never mutates
//! the coupon; usage is claimed by the commit transaction.

use chrono::{DateTime, Utc};

use crate::error::CouponError;
use crate::money::Money;
use crate::types::{Coupon, CouponWithRules};

/// Validates a coupon against the cart subtotal at `now`.
pub fn validate(coupon: &Coupon, subtotal: Money, now: DateTime<Utc>) -> Result<(), CouponError> {
    let code = || coupon.code.clone();

    if !coupon.is_active {
        return Err(CouponError::Inactive { code: code() });
    }

    if now < coupon.valid_from {
        return Err(CouponError::NotYetValid { code: code() });
    }

    if now > coupon.valid_until {
        return Err(CouponError::Expired { code: code() });
    }

    if coupon.is_exhausted() {
        return Err(CouponError::UsageLimitExceeded { code: code() });
    }

    if coupon.min_purchase.is_positive() && subtotal < coupon.min_purchase {
        return Err(CouponError::BelowMinPurchase {
            code: code(),
            minimum: coupon.min_purchase,
            subtotal,
        });
    }

    Ok(())
}

/// Turns a store lookup result into a coupon, or `NotFound` for the code.
pub fn resolve(code: &str, found: Option<CouponWithRules>) -> Result<CouponWithRules, CouponError> {
    found.ok_or_else(|| CouponError::NotFound {
        code: code.to_string(),
    })
}
