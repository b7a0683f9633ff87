//! # storefront-checkout: Checkout Orchestrator
//!
//! Turns a user's cart into a paid order: validates the cart, applies a
//! coupon, authorizes payment, then commits order, stock, coupon usage and
//! cart clearing in one transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   HTTP layer / `checkout` CLI                                          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   ┌─────────────────────────────────────────────────────────────────┐  │
//! │   │              storefront-checkout (THIS CRATE)                   │  │
//! │   │                                                                 │  │
//! │   │   CheckoutService ──► PaymentAuthorizer (SimulatedGateway)     │  │
//! │   │        │                                                        │  │
//! │   │        ├──► CartSource / CouponStore / OrderStore (ports)       │  │
//! │   │        └──► storefront-core: validation, coupon, discount       │  │
//! │   └─────────────────────────────────────────────────────────────────┘  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   storefront-db (SQLite)                                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use storefront_checkout::{CheckoutConfig, CheckoutRequest, CheckoutService};
//! use storefront_db::Database;
//!
//! let config = CheckoutConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//! let service = CheckoutService::new(db, Arc::new(config.gateway()), config.checkout_options());
//!
//! let response = service
//!     .checkout_response("user-1", CheckoutRequest::with_coupon("SAVE20"))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod payment;
pub mod ports;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::CheckoutConfig;
pub use error::{CheckoutError, CheckoutResult, CommitFailure, ConfigError, PaymentError};
pub use orchestrator::{
    CheckoutOptions, CheckoutReceipt, CheckoutRequest, CheckoutService, CheckoutStage,
    PaymentResponse,
};
pub use payment::{Authorization, PaymentAuthorizer, SimulatedGateway};
pub use ports::{CartSource, CouponStore, OrderStore};
pub use telemetry::init_tracing;
