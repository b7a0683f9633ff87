//! # Store Capabilities
//!
//! What the orchestrator needs from persistence, as traits so tests can
//! swap pieces out. [`Database`] implements all three.

use async_trait::async_trait;

use storefront_core::{CartLine, CouponWithRules, Money, Order, OrderDraft, UnfulfilledCharge};
use storefront_db::{Database, DbResult};

/// Reads a user's cart joined with live product data.
#[async_trait]
pub trait CartSource: Send + Sync {
    async fn load_cart(&self, user_id: &str) -> DbResult<Vec<CartLine>>;
}

/// Looks coupons up by code.
#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn find_by_code(&self, code: &str) -> DbResult<Option<CouponWithRules>>;
}

/// The checkout unit of work plus the reconciliation queue.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Atomically: re-check and decrement stock, claim coupon usage,
    /// insert the order and its items, clear the cart.
    async fn commit(&self, draft: &OrderDraft) -> DbResult<Order>;

    /// Records a charge that has no order.
    async fn record_unfulfilled(
        &self,
        draft: &OrderDraft,
        amount: Money,
        reason: &str,
    ) -> DbResult<UnfulfilledCharge>;
}

#[async_trait]
impl CartSource for Database {
    async fn load_cart(&self, user_id: &str) -> DbResult<Vec<CartLine>> {
        self.carts().load(user_id).await
    }
}

#[async_trait]
impl CouponStore for Database {
    async fn find_by_code(&self, code: &str) -> DbResult<Option<CouponWithRules>> {
        self.coupons().find_by_code(code).await
    }
}

#[async_trait]
impl OrderStore for Database {
    async fn commit(&self, draft: &OrderDraft) -> DbResult<Order> {
        self.orders().commit_checkout(draft).await
    }

    async fn record_unfulfilled(
        &self,
        draft: &OrderDraft,
        amount: Money,
        reason: &str,
    ) -> DbResult<UnfulfilledCharge> {
        self.reconciliations().record(draft, amount, reason).await
    }
}
