//! # storefront-core: Pure Checkout Logic
//!
//! This crate holds the storefront's pricing and eligibility rules as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Checkout Architecture                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              storefront-checkout (Orchestrator)                 │   │
//! │  │   load cart ──► discount ──► authorize payment ──► commit       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ storefront-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │ discount  │  │  coupon   │  │ validation│  │   │
//! │  │   │   Money   │  │ evaluator │  │ validator │  │   cart    │  │   │
//! │  │   │Percentage │  │   rules   │  │  window   │  │  charge   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO CLOCK                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 storefront-db (Database Layer)                  │   │
//! │  │        inventory ledger, carts, coupons, orders, migrations     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Exact decimal Money and Percentage
//! - [`types`] - Domain types (LineItem, Coupon, CouponRule, Order, etc.)
//! - [`discount`] - Discount Rule Evaluator
//! - [`coupon`] - Coupon Validator
//! - [`validation`] - Cart and input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::{Money, Percentage};
//!
//! let subtotal = Money::from_major(500);
//! let discount = subtotal.percent(Percentage::from_whole(20));
//!
//! assert_eq!(discount, Money::from_major(100));
//! assert_eq!(discount.to_string(), "$100.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coupon;
pub mod discount;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CouponError, ValidationError};
pub use money::{Money, Percentage};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single product in a cart.
///
/// ## Business Reason
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
