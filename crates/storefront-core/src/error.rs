//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core errors (this file)                                    │
//! │  ├── ValidationError  - Cart/input failures, rejected before charge    │
//! │  ├── CouponError      - Coupon eligibility failures                    │
//! │  └── CoreError        - Either of the above                            │
//! │                                                                         │
//! │  storefront-db errors (separate crate)                                 │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  storefront-checkout errors                                            │
//! │  └── CheckoutError    - What the caller of checkout sees               │
//! │                                                                         │
//! │  Flow: ValidationError/CouponError → DbError → CheckoutError           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything in this file is raised before any payment is attempted, so
//! every variant is recoverable by the caller changing the cart or coupon.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Any failure raised by the pure checkout logic.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Coupon error: {0}")]
    Coupon(#[from] CouponError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Cart and input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The user's cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart line references a product that is no longer sold.
    #[error("Product {product_id} is not available")]
    ProductInactive { product_id: String },

    /// Not enough stock to cover a cart line.
    ///
    /// ## When This Occurs
    /// ```text
    /// Cart: product P, qty 5
    ///      │
    ///      ▼
    /// Read-time check: stock = 3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: "P", available: 3, requested: 5 }
    /// ```
    /// The commit step re-checks stock; a failure there is a commit error,
    /// not this one.
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// The discounted total is zero or below. Orders must carry a charge.
    #[error("Order total must be positive, got {total}")]
    NonPositiveTotal { total: Money },

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (bad characters, inverted date range).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Coupon Error
// =============================================================================

/// Coupon eligibility failures. The validator never mutates the coupon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("Coupon not found: {code}")]
    NotFound { code: String },

    #[error("Coupon {code} is not active")]
    Inactive { code: String },

    #[error("Coupon {code} has expired")]
    Expired { code: String },

    #[error("Coupon {code} is not valid yet")]
    NotYetValid { code: String },

    /// Advisory at validation time; the commit step claims usage atomically.
    #[error("Coupon {code} has reached its usage limit")]
    UsageLimitExceeded { code: String },

    #[error("Coupon {code} requires a minimum purchase of {minimum}, cart subtotal is {subtotal}")]
    BelowMinPurchase {
        code: String,
        minimum: Money,
        subtotal: Money,
    },
}

impl CouponError {
    /// Stable machine-readable code, matching the error names callers switch on.
    pub fn code(&self) -> &'static str {
        match self {
            CouponError::NotFound { .. } => "NOT_FOUND",
            CouponError::Inactive { .. } => "INACTIVE",
            CouponError::Expired { .. } => "EXPIRED",
            CouponError::NotYetValid { .. } => "NOT_YET_VALID",
            CouponError::UsageLimitExceeded { .. } => "USAGE_LIMIT_EXCEEDED",
            CouponError::BelowMinPurchase { .. } => "BELOW_MIN_PURCHASE",
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
