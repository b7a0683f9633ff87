//! # Checkout Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Error Categories                            │
//! │                                                                         │
//! │  BEFORE ANY CHARGE (caller fixes input)                                │
//! │  ├── Validation   empty cart, inactive product, stock, total ≤ 0       │
//! │  └── Coupon       NOT_FOUND, INACTIVE, EXPIRED, ... (from core)        │
//! │                                                                         │
//! │  AT PAYMENT (nothing durable changed, retry is safe)                   │
//! │  └── Payment      Declined, TimedOut, Gateway                          │
//! │                                                                         │
//! │  AFTER A SUCCESSFUL CHARGE (needs an operator)                         │
//! │  └── Commit       InsufficientStock, UsageLimitExceeded, Store          │
//! │                                                                         │
//! │  ANYWHERE                                                              │
//! │  └── Internal     store unreachable, task failure                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Internal` never carries a payment outcome: a declined card is always
//! `Payment`, a charge without an order is always `Commit`.

use thiserror::Error;

use storefront_core::{CouponError, Money, ValidationError};
use storefront_db::DbError;

/// Result type alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Why a checkout attempt ended without an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Cart or total rejected before payment.
    #[error("Checkout rejected: {0}")]
    Validation(#[from] ValidationError),

    /// Coupon rejected before payment.
    #[error("Coupon rejected: {0}")]
    Coupon(#[from] CouponError),

    /// Payment was not authorized. No charge, no durable change.
    #[error("Payment failed for {amount}: {source}")]
    Payment {
        /// Empty when the gateway never answered.
        transaction_id: String,
        amount: Money,
        source: PaymentError,
    },

    /// Payment succeeded but the order could not be committed.
    #[error("Charged {amount} (transaction {transaction_id}) but order not created: {reason}")]
    Commit {
        transaction_id: String,
        amount: Money,
        reason: CommitFailure,
    },

    /// Store or runtime failure unrelated to the payment outcome.
    #[error("Internal error: {0}")]
    Internal(#[from] DbError),
}

impl CheckoutError {
    /// Returns true if the customer was charged without getting an order.
    pub fn is_charged(&self) -> bool {
        matches!(self, CheckoutError::Commit { .. })
    }

    /// Returns true if the caller may simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::Payment { .. })
    }
}

/// Payment authorizer failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentError {
    /// The gateway answered and refused the charge.
    #[error("Payment declined (transaction {transaction_id})")]
    Declined { transaction_id: String },

    /// No answer within the configured timeout.
    #[error("Payment authorization timed out after {millis}ms")]
    TimedOut { millis: u64 },

    /// Transport or gateway-side error.
    #[error("Payment gateway error: {0}")]
    Gateway(String),
}

impl PaymentError {
    /// The gateway's transaction id, if it issued one.
    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            PaymentError::Declined { transaction_id } => Some(transaction_id),
            PaymentError::TimedOut { .. } | PaymentError::Gateway(_) => None,
        }
    }
}

/// Why the commit transaction rolled back after a successful charge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommitFailure {
    #[error("insufficient stock for {product_id} (requested {requested})")]
    InsufficientStock { product_id: String, requested: i64 },

    #[error("coupon {coupon_id} reached its usage limit")]
    UsageLimitExceeded { coupon_id: String },

    #[error("store failure: {0}")]
    Store(String),
}

impl From<DbError> for CommitFailure {
    fn from(err: DbError) -> Self {
        match err {
            DbError::StockConflict {
                product_id,
                requested,
            } => CommitFailure::InsufficientStock {
                product_id,
                requested,
            },
            DbError::CouponExhausted { coupon_id } => CommitFailure::UsageLimitExceeded { coupon_id },
            other => CommitFailure::Store(other.to_string()),
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// An environment variable or flag could not be parsed or is out of range.
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
