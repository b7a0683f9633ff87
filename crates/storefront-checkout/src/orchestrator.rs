//! # Checkout Orchestrator
//!
//! Runs one checkout attempt from cart to order.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  load cart ──► CartValidated ──► DiscountComputed ──► total > 0 ?      │
//! │      │              │                   │                  │            │
//! │      ✗ Validation   ✗ Validation        ✗ Coupon           ✗ Validation │
//! │                                                            │            │
//! │  ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ spawned task from here on ─ ─ ─ ─ ─ ┼ ─ ─ ─ ─ ─  │
//! │                                                            ▼            │
//! │                              authorize(total, method) within timeout    │
//! │                                   │                  │                  │
//! │                                   ✗ Payment          ▼                  │
//! │                                               PaymentAuthorized         │
//! │                                                      │                  │
//! │                                              commit transaction         │
//! │                                          ┌───────────┴──────────┐       │
//! │                                          ▼                      ▼       │
//! │                                      Committed            CommitFailed  │
//! │                                                     (charged, no order, │
//! │                                                      recorded + alert)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing durable happens before payment, so a caller that goes away early
//! leaves no trace. Payment and commit run in a spawned task: once a charge
//! may exist, the commit runs to completion even if the caller is dropped.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::error::{CheckoutError, CheckoutResult, CommitFailure, PaymentError};
use crate::payment::{random_suffix, PaymentAuthorizer};
use crate::ports::{CartSource, CouponStore, OrderStore};
use crate::telemetry::RECONCILIATION_TARGET;
use storefront_core::validation::{validate_cart, validate_charge};
use storefront_core::{coupon, discount};
use storefront_core::{DiscountBreakdown, LineItem, Money, Order, OrderDraft};
use storefront_db::{Database, DbError};

pub const MSG_PAYMENT_SUCCEEDED: &str = "Payment successful. Order created.";
pub const MSG_PAYMENT_FAILED: &str = "Payment failed. Please try again.";
pub const MSG_CHARGED_NOT_FULFILLED: &str = "charged but not fulfilled";

// =============================================================================
// Request / Response
// =============================================================================

/// Input for one checkout attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub coupon_code: Option<String>,
    /// Falls back to the service's default method.
    pub payment_method: Option<String>,
}

impl CheckoutRequest {
    pub fn with_coupon(code: impl Into<String>) -> Self {
        CheckoutRequest {
            coupon_code: Some(code.into()),
            payment_method: None,
        }
    }

    /// Trimmed coupon code; blank counts as none.
    fn coupon(&self) -> Option<&str> {
        self.coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// A completed checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub transaction_id: String,
    /// Amount charged, equal to the order total.
    pub amount: Money,
    pub breakdown: DiscountBreakdown,
}

/// Caller-facing result of a checkout that reached the payment step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub success: bool,
    pub transaction_id: String,
    /// Empty unless an order was created.
    pub order_id: String,
    pub amount: Money,
    pub message: String,
}

impl PaymentResponse {
    /// Maps a checkout outcome to a response.
    ///
    /// Payment and commit failures become `success: false` responses;
    /// errors raised before any charge stay errors.
    pub fn from_outcome(outcome: CheckoutResult<CheckoutReceipt>) -> CheckoutResult<Self> {
        match outcome {
            Ok(receipt) => Ok(PaymentResponse {
                success: true,
                transaction_id: receipt.transaction_id,
                order_id: receipt.order.id,
                amount: receipt.amount,
                message: MSG_PAYMENT_SUCCEEDED.to_string(),
            }),
            Err(CheckoutError::Payment {
                transaction_id,
                amount,
                ..
            }) => Ok(PaymentResponse {
                success: false,
                transaction_id,
                order_id: String::new(),
                amount,
                message: MSG_PAYMENT_FAILED.to_string(),
            }),
            Err(CheckoutError::Commit {
                transaction_id,
                amount,
                ..
            }) => Ok(PaymentResponse {
                success: false,
                transaction_id,
                order_id: String::new(),
                amount,
                message: MSG_CHARGED_NOT_FULFILLED.to_string(),
            }),
            Err(other) => Err(other),
        }
    }
}

/// Checkout progress, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    CartValidated,
    DiscountComputed,
    PaymentAuthorized,
    Committed,
    CommitFailed,
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckoutStage::CartValidated => "CART_VALIDATED",
            CheckoutStage::DiscountComputed => "DISCOUNT_COMPUTED",
            CheckoutStage::PaymentAuthorized => "PAYMENT_AUTHORIZED",
            CheckoutStage::Committed => "COMMITTED",
            CheckoutStage::CommitFailed => "COMMIT_FAILED",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Service
// =============================================================================

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOptions {
    pub payment_timeout: Duration,
    pub default_payment_method: String,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        CheckoutOptions {
            payment_timeout: Duration::from_secs(10),
            default_payment_method: "card".to_string(),
        }
    }
}

/// Sequences cart validation, discount, payment and commit.
///
/// Holds no per-attempt state; one instance serves concurrent checkouts.
#[derive(Clone)]
pub struct CheckoutService {
    carts: Arc<dyn CartSource>,
    coupons: Arc<dyn CouponStore>,
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentAuthorizer>,
    options: CheckoutOptions,
}

impl CheckoutService {
    /// Service backed by one database for carts, coupons and orders.
    pub fn new(db: Database, payments: Arc<dyn PaymentAuthorizer>, options: CheckoutOptions) -> Self {
        let db = Arc::new(db);
        CheckoutService {
            carts: db.clone(),
            coupons: db.clone(),
            orders: db,
            payments,
            options,
        }
    }

    pub fn from_parts(
        carts: Arc<dyn CartSource>,
        coupons: Arc<dyn CouponStore>,
        orders: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentAuthorizer>,
        options: CheckoutOptions,
    ) -> Self {
        CheckoutService {
            carts,
            coupons,
            orders,
            payments,
            options,
        }
    }

    pub fn options(&self) -> &CheckoutOptions {
        &self.options
    }

    /// Checks out the user's cart at the current time.
    pub async fn checkout(&self, user_id: &str, request: CheckoutRequest) -> CheckoutResult<CheckoutReceipt> {
        self.checkout_at(user_id, request, Utc::now()).await
    }

    /// [`checkout`](Self::checkout) returning the payment response shape.
    pub async fn checkout_response(
        &self,
        user_id: &str,
        request: CheckoutRequest,
    ) -> CheckoutResult<PaymentResponse> {
        PaymentResponse::from_outcome(self.checkout(user_id, request).await)
    }

    /// Checks out the user's cart, judging coupon validity at `now`.
    #[instrument(skip(self, request, now), fields(coupon = ?request.coupon_code))]
    pub async fn checkout_at(
        &self,
        user_id: &str,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> CheckoutResult<CheckoutReceipt> {
        // 1. Cart
        let lines = self.carts.load_cart(user_id).await?;
        let items = validate_cart(&lines).map_err(|e| {
            warn!(error = %e, "Cart rejected");
            e
        })?;
        debug!(stage = %CheckoutStage::CartValidated, lines = items.len(), "Cart validated");

        // 2. Discount
        let subtotal: Money = items.iter().map(LineItem::gross).sum();
        let applied = match request.coupon() {
            Some(code) => {
                let found = self.coupons.find_by_code(code).await?;
                let applied = coupon::resolve(code, found)
                    .and_then(|c| coupon::validate(&c.coupon, subtotal, now).map(|_| c))
                    .map_err(|e| {
                        warn!(code = %code, reason = e.code(), "Coupon rejected");
                        e
                    })?;
                Some(applied)
            }
            None => None,
        };
        let breakdown = discount::evaluate(applied.as_ref(), &items);
        debug!(
            stage = %CheckoutStage::DiscountComputed,
            subtotal = %breakdown.subtotal,
            discount = %breakdown.discount,
            total = %breakdown.total,
            "Discount computed"
        );

        // 3. Total
        validate_charge(breakdown.total).map_err(|e| {
            warn!(total = %breakdown.total, "Non-positive total rejected");
            e
        })?;

        // 4 + 5. Payment and commit survive caller cancellation.
        let charge = Charge {
            user_id: user_id.to_string(),
            coupon_id: applied.map(|c| c.coupon.id),
            method: request
                .payment_method
                .unwrap_or_else(|| self.options.default_payment_method.clone()),
            breakdown,
        };
        let task = tokio::spawn(
            charge
                .run(
                    Arc::clone(&self.payments),
                    Arc::clone(&self.orders),
                    self.options.payment_timeout,
                )
                .in_current_span(),
        );

        task.await.map_err(|e| {
            error!(error = %e, "Checkout task failed");
            CheckoutError::Internal(DbError::Internal(format!("checkout task failed: {e}")))
        })?
    }
}

/// Everything the spawned payment-and-commit task owns.
struct Charge {
    user_id: String,
    coupon_id: Option<String>,
    method: String,
    breakdown: DiscountBreakdown,
}

impl Charge {
    async fn run(
        self,
        payments: Arc<dyn PaymentAuthorizer>,
        orders: Arc<dyn OrderStore>,
        timeout: Duration,
    ) -> CheckoutResult<CheckoutReceipt> {
        let amount = self.breakdown.total;

        let transaction_id = authorize(payments.as_ref(), amount, self.method.clone(), timeout)
            .await
            .map_err(|source| {
                warn!(amount = %amount, error = %source, "Payment not authorized");
                CheckoutError::Payment {
                    transaction_id: source.transaction_id().unwrap_or_default().to_string(),
                    amount,
                    source,
                }
            })?;
        debug!(stage = %CheckoutStage::PaymentAuthorized, transaction_id = %transaction_id, "Payment authorized");

        let draft = OrderDraft {
            order_number: generate_order_number(),
            user_id: self.user_id,
            subtotal: self.breakdown.subtotal,
            discount: self.breakdown.discount,
            total: amount,
            coupon_id: self.coupon_id,
            transaction_id: transaction_id.clone(),
            items: self.breakdown.lines.clone(),
        };

        match orders.commit(&draft).await {
            Ok(order) => {
                info!(
                    stage = %CheckoutStage::Committed,
                    order_id = %order.id,
                    order_number = %order.order_number,
                    transaction_id = %transaction_id,
                    amount = %amount,
                    "Checkout completed"
                );
                Ok(CheckoutReceipt {
                    order,
                    transaction_id,
                    amount,
                    breakdown: self.breakdown,
                })
            }
            Err(err) => {
                let reason = CommitFailure::from(err);
                error!(
                    target: RECONCILIATION_TARGET,
                    stage = %CheckoutStage::CommitFailed,
                    transaction_id = %transaction_id,
                    user_id = %draft.user_id,
                    amount = %amount,
                    reason = %reason,
                    "Charged but not fulfilled"
                );

                if let Err(record_err) = orders
                    .record_unfulfilled(&draft, amount, &reason.to_string())
                    .await
                {
                    error!(
                        target: RECONCILIATION_TARGET,
                        transaction_id = %transaction_id,
                        error = %record_err,
                        "Failed to record unfulfilled charge"
                    );
                }

                Err(CheckoutError::Commit {
                    transaction_id,
                    amount,
                    reason,
                })
            }
        }
    }
}

/// One bounded authorization call. A decline or timeout is an error.
async fn authorize(
    payments: &dyn PaymentAuthorizer,
    amount: Money,
    method: String,
    timeout: Duration,
) -> Result<String, PaymentError> {
    let authorization = tokio::time::timeout(timeout, payments.authorize(amount, method))
        .await
        .map_err(|_| PaymentError::TimedOut {
            millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })??;

    if !authorization.approved {
        return Err(PaymentError::Declined {
            transaction_id: authorization.transaction_id,
        });
    }

    Ok(authorization.transaction_id)
}

/// Generates an order number: `ORD-<unix millis>-<9 uppercase alphanumerics>`.
pub fn generate_order_number() -> String {
    format!(
        "ORD-{}-{}",
        Utc::now().timestamp_millis(),
        random_suffix(9).to_uppercase()
    )
}
