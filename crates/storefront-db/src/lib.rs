//! # storefront-db: Database Layer for Storefront Checkout
//!
//! SQLite persistence for the inventory ledger, carts, coupons, orders and
//! the reconciliation queue, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Storefront Checkout Data Flow                       │
//! │                                                                         │
//! │  CheckoutService::checkout                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storefront-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ CartRepo      │    │  _schema.sql │  │   │
//! │  │   │ WAL, FKs on   │    │ CouponRepo    │    │              │  │   │
//! │  │   │               │    │ OrderRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (or :memory: in tests)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("storefront.db")).await?;
//!
//! let cart = db.carts().load("user-1").await?;
//! let coupon = db.coupons().find_by_code("SAVE20").await?;
//! let order = db.orders().commit_checkout(&draft).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::cart::CartRepository;
pub use repository::coupon::CouponRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::reconciliation::ReconciliationRepository;
