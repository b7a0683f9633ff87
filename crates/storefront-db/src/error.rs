//! # Store Errors
//!
//! Every repository call returns [`DbResult`]. Two variants are not faults:
//! `StockConflict` and `CouponExhausted` mean the commit transaction's
//! conditional write lost a race, and the checkout layer turns them into a
//! charged-but-unfulfilled outcome instead of an internal error.
//!
//! ```text
//! sqlx::Error ──From──► DbError ──► CheckoutError::Internal      (store fault)
//!                          │
//!                          └──────► CheckoutError::Commit         (is_conflict)
//! ```

use storefront_core::ValidationError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row with that id.
    #[error("{entity} '{id}' does not exist")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation (duplicate SKU, coupon code, order number).
    #[error("{field} is already taken ('{value}')")]
    UniqueViolation { field: String, value: String },

    /// A referenced product, coupon or order is missing.
    #[error("Dangling reference: {message}")]
    ForeignKeyViolation { message: String },

    /// The conditional stock decrement matched no row.
    ///
    /// ## When This Occurs
    /// ```text
    /// Checkout A: read stock=1 ──────────────► commit: stock 1 → 0   ✓
    /// Checkout B: read stock=1 ─────────────────────► commit: 0 ≥ 1? ✗
    ///                                                  StockConflict
    /// ```
    #[error("Insufficient stock for {product_id} at commit (requested {requested})")]
    StockConflict { product_id: String, requested: i64 },

    /// The conditional coupon usage claim matched no row.
    #[error("Coupon {coupon_id} reached its usage limit at commit")]
    CouponExhausted { coupon_id: String },

    /// Input rejected before it reached SQL.
    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Cannot open store: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// SQL error that isn't a known constraint.
    #[error("SQL error: {0}")]
    QueryFailed(String),

    /// Lock wait exceeded `busy_timeout`, or COMMIT itself failed.
    #[error("Transaction aborted: {0}")]
    TransactionFailed(String),

    /// No pooled connection became free within `connect_timeout`.
    #[error("No free store connection")]
    PoolExhausted,

    #[error("Store failure: {0}")]
    Internal(String),
}

impl DbError {
    /// `NotFound` for `entity` with `id`.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether this is a failed commit-time re-check rather than a store fault.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DbError::StockConflict { .. } | DbError::CouponExhausted { .. }
        )
    }
}

/// SQLite only reports constraint kinds in the message text, so
/// classification is by substring.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "?"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if let Some(column) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    // e.g. "coupons.code"; the offending value isn't reported
                    DbError::duplicate(column, "?")
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::TransactionFailed(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("store was closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(e.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Internal(format!("JSON encoding failed: {err}"))
    }
}

pub type DbResult<T> = Result<T, DbError>;
