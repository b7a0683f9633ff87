//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Checkout orchestrator                                                 │
//! │       │                                                                 │
//! │       │  db.orders().commit_checkout(&draft)                           │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── product::decrement_stock   ┐                                      │
//! │  ├── coupon::claim_usage        ├── same transaction                   │
//! │  └── cart::clear_cart           ┘                                      │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The conditional writes are free functions over `&mut SqliteConnection`
//! so they run on a pool connection or inside the commit transaction alike.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Inventory ledger
//! - [`CartRepository`](cart::CartRepository) - Per-user carts
//! - [`CouponRepository`](coupon::CouponRepository) - Coupons and rules
//! - [`OrderRepository`](order::OrderRepository) - Orders and the checkout commit
//! - [`ReconciliationRepository`](reconciliation::ReconciliationRepository) - Charged-but-unfulfilled queue

pub mod cart;
pub mod coupon;
pub mod order;
pub mod product;
pub mod reconciliation;
