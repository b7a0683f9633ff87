//! # Domain Types
//!
//! Core domain types used throughout the storefront checkout.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    CartLine     │   │     Coupon      │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id     │   │  code (unique)  │   │  order_number   │       │
//! │  │  quantity       │   │  kind           │   │  subtotal       │       │
//! │  │  unit_price     │   │  value          │   │  discount       │       │
//! │  │  stock          │   │  usage_count    │   │  total          │       │
//! │  └───────┬─────────┘   └───────┬─────────┘   └───────▲─────────┘       │
//! │          │ to_line_item        │ owns                │ frozen copy     │
//! │          ▼                     ▼                     │                  │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌───────┴─────────┐       │
//! │  │    LineItem     │──►│   CouponRule    │──►│ProcessedLineItem│       │
//! │  │  (immutable)    │   │  Product/Cat/   │   │ + discount      │       │
//! │  │                 │   │  BuyXGetY       │   │ + line_total    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `LineItem` is captured once per checkout attempt and never changes.
//! `OrderItem` freezes the processed line into the order so later catalog
//! price changes never rewrite history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{Money, Percentage};

// =============================================================================
// Cart Snapshot
// =============================================================================

/// One row returned by the cart source: the cart entry joined with the
/// product's current catalog state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Stock at read time. Advisory only; the commit re-checks it.
    pub stock: i64,
    pub is_active: bool,
    pub category: Option<String>,
}

impl CartLine {
    /// Captures the immutable pricing snapshot used for this checkout attempt.
    pub fn to_line_item(&self) -> LineItem {
        LineItem {
            product_id: self.product_id.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            category: self.category.clone(),
        }
    }
}

/// A product line captured for a checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    /// Always > 0 once the cart has been validated.
    pub quantity: i64,
    pub unit_price: Money,
    pub category: Option<String>,
}

impl LineItem {
    /// `unit_price × quantity`, before any discount.
    #[inline]
    pub fn gross(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// A line item after discount evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedLineItem {
    #[serde(flatten)]
    pub item: LineItem,
    /// Sum of every rule discount that matched this line. May exceed the
    /// line's gross amount when rules stack; the order total is clamped instead.
    pub discount: Money,
    /// `gross - discount`, floored at zero.
    pub line_total: Money,
}

impl ProcessedLineItem {
    /// A line with no discount applied.
    pub fn undiscounted(item: LineItem) -> Self {
        let line_total = item.gross();
        ProcessedLineItem {
            item,
            discount: Money::zero(),
            line_total,
        }
    }
}

/// The result of running the discount evaluator over a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountBreakdown {
    pub subtotal: Money,
    pub discount: Money,
    /// `max(subtotal - discount, 0)`.
    pub total: Money,
    pub lines: Vec<ProcessedLineItem>,
    /// Set for FREE_SHIPPING coupons; the billing layer waives shipping.
    pub free_shipping: bool,
}

impl DiscountBreakdown {
    /// Breakdown for a checkout without a coupon.
    pub fn undiscounted(items: &[LineItem]) -> Self {
        let lines: Vec<ProcessedLineItem> = items
            .iter()
            .cloned()
            .map(ProcessedLineItem::undiscounted)
            .collect();
        let subtotal = items.iter().map(LineItem::gross).sum();

        DiscountBreakdown {
            subtotal,
            discount: Money::zero(),
            total: subtotal,
            lines,
            free_shipping: false,
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product. Only the fields checkout needs are modelled here;
/// `stock` is the inventory ledger entry that checkout decrements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Coupons
// =============================================================================

/// How a coupon's base discount is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// `subtotal × value / 100`, capped by `max_discount` when set.
    Percentage,
    /// Flat `value` off the order.
    Fixed,
    /// Base discount is zero; the coupon's BUY_X_GET_Y rules do the work.
    BuyXGetY,
    /// No monetary discount; flags the order for free shipping.
    FreeShipping,
}

/// A coupon definition. Shared, read-mostly across concurrent checkouts;
/// `usage_count` is the only field a checkout mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub kind: DiscountKind,
    /// Amount off for FIXED, percent points for PERCENTAGE.
    pub value: Money,
    /// Zero means no minimum.
    pub min_purchase: Money,
    /// Zero means unbounded.
    pub max_discount: Money,
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    pub is_active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Whether the usage limit has been reached.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.usage_limit, Some(limit) if self.usage_count >= limit)
    }
}

/// What a PRODUCT or CATEGORY rule takes off each matched line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "amount", rename_all = "snake_case")]
pub enum RuleReward {
    /// Fixed amount per unit: `amount × quantity`.
    FixedPerUnit(Money),
    /// Percentage of the line's gross amount.
    Percentage(Percentage),
}

/// The closed set of rule kinds. Adding a kind is a compile-checked change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    /// Applies to the first line for this product.
    Product { product_id: String, reward: RuleReward },
    /// Applies to every line in this category.
    Category { category_id: String, reward: RuleReward },
    /// Every `buy_quantity` units earn `get_quantity` free units on the same line.
    BuyXGetY {
        product_id: Option<String>,
        buy_quantity: i64,
        get_quantity: i64,
    },
}

/// A coupon sub-clause. Higher `priority` is evaluated first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRule {
    pub id: String,
    pub priority: i64,
    pub kind: RuleKind,
}

/// Storage tag for [`RuleKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    Product,
    Category,
    BuyXGetY,
}

/// Flat column shape of a coupon rule, as stored and as submitted by admins.
///
/// ## Conversion Policy
/// `TryFrom<CouponRuleRecord> for CouponRule` is the one place a flat record
/// becomes a typed rule:
/// - both `discount_fixed` and `discount_percentage` set → fixed wins
/// - neither set on PRODUCT/CATEGORY → rejected
/// - PRODUCT without `product_id`, CATEGORY without `category_id` → rejected
/// - BUY_X_GET_Y without positive `buy_quantity` and `get_quantity` → rejected
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CouponRuleRecord {
    pub id: String,
    pub coupon_id: String,
    pub rule_type: Option<RuleType>,
    pub product_id: Option<String>,
    pub category_id: Option<String>,
    pub discount_percentage: Option<Percentage>,
    pub discount_fixed: Option<Money>,
    pub buy_quantity: Option<i64>,
    pub get_quantity: Option<i64>,
    pub priority: i64,
}

impl TryFrom<CouponRuleRecord> for CouponRule {
    type Error = ValidationError;

    fn try_from(record: CouponRuleRecord) -> Result<Self, Self::Error> {
        let reward = match (record.discount_fixed, record.discount_percentage) {
            (Some(fixed), _) => Some(RuleReward::FixedPerUnit(fixed)),
            (None, Some(pct)) => Some(RuleReward::Percentage(pct)),
            (None, None) => None,
        };
        let missing_reward = || ValidationError::Required {
            field: "discount_fixed or discount_percentage".to_string(),
        };

        let kind = match record.rule_type {
            None => {
                return Err(ValidationError::Required {
                    field: "rule_type".to_string(),
                })
            }
            Some(RuleType::Product) => RuleKind::Product {
                product_id: record.product_id.ok_or_else(|| ValidationError::Required {
                    field: "product_id".to_string(),
                })?,
                reward: reward.ok_or_else(missing_reward)?,
            },
            Some(RuleType::Category) => RuleKind::Category {
                category_id: record.category_id.ok_or_else(|| ValidationError::Required {
                    field: "category_id".to_string(),
                })?,
                reward: reward.ok_or_else(missing_reward)?,
            },
            Some(RuleType::BuyXGetY) => {
                let buy_quantity = positive(record.buy_quantity, "buy_quantity")?;
                let get_quantity = positive(record.get_quantity, "get_quantity")?;
                RuleKind::BuyXGetY {
                    product_id: record.product_id,
                    buy_quantity,
                    get_quantity,
                }
            }
        };

        Ok(CouponRule {
            id: record.id,
            priority: record.priority,
            kind,
        })
    }
}

fn positive(value: Option<i64>, field: &str) -> Result<i64, ValidationError> {
    match value {
        Some(v) if v > 0 => Ok(v),
        _ => Err(ValidationError::MustBePositive {
            field: field.to_string(),
        }),
    }
}

/// A coupon with its rules in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponWithRules {
    pub coupon: Coupon,
    pub rules: Vec<CouponRule>,
}

// =============================================================================
// Orders
// =============================================================================

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Everything the commit step persists for one successful checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub order_number: String,
    pub user_id: String,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub coupon_id: Option<String>,
    pub transaction_id: String,
    pub items: Vec<ProcessedLineItem>,
}

/// A committed order. Created exactly once per successful checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub coupon_id: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<OrderItem>,
}

/// A frozen processed line belonging to an order. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
    pub line_total: Money,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Reconciliation
// =============================================================================

/// A charge that went through but whose order could not be committed.
/// Operators resolve these by refunding or fulfilling manually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UnfulfilledCharge {
    pub id: String,
    pub transaction_id: String,
    pub user_id: String,
    pub amount: Money,
    pub reason: String,
    /// The order draft as JSON, so the order can be recreated by hand.
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rule_type: RuleType) -> CouponRuleRecord {
        CouponRuleRecord {
            id: "rule-1".to_string(),
            coupon_id: "coupon-1".to_string(),
            rule_type: Some(rule_type),
            priority: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_fixed_reward_beats_percentage() {
        let mut rec = record(RuleType::Product);
        rec.product_id = Some("p1".to_string());
        rec.discount_fixed = Some(Money::from_major(2));
        rec.discount_percentage = Some(Percentage::from_whole(50));

        let rule = CouponRule::try_from(rec).unwrap();
        assert_eq!(
            rule.kind,
            RuleKind::Product {
                product_id: "p1".to_string(),
                reward: RuleReward::FixedPerUnit(Money::from_major(2)),
            }
        );
        assert_eq!(rule.priority, 3);
    }

    #[test]
    fn test_rule_without_reward_is_rejected() {
        let mut rec = record(RuleType::Category);
        rec.category_id = Some("drinks".to_string());
        assert!(CouponRule::try_from(rec).is_err());
    }

    #[test]
    fn test_rule_without_target_is_rejected() {
        let mut rec = record(RuleType::Product);
        rec.discount_fixed = Some(Money::from_major(1));
        assert!(CouponRule::try_from(rec).is_err());
    }

    #[test]
    fn test_buy_x_get_y_requires_positive_quantities() {
        let mut rec = record(RuleType::BuyXGetY);
        rec.buy_quantity = Some(0);
        rec.get_quantity = Some(1);
        assert!(CouponRule::try_from(rec.clone()).is_err());

        rec.buy_quantity = Some(2);
        let rule = CouponRule::try_from(rec).unwrap();
        assert_eq!(
            rule.kind,
            RuleKind::BuyXGetY {
                product_id: None,
                buy_quantity: 2,
                get_quantity: 1,
            }
        );
    }

    #[test]
    fn test_undiscounted_breakdown() {
        let items = vec![
            LineItem {
                product_id: "a".to_string(),
                quantity: 2,
                unit_price: Money::from_cents(250),
                category: None,
            },
            LineItem {
                product_id: "b".to_string(),
                quantity: 1,
                unit_price: Money::from_major(10),
                category: Some("books".to_string()),
            },
        ];

        let breakdown = DiscountBreakdown::undiscounted(&items);
        assert_eq!(breakdown.subtotal, Money::from_major(15));
        assert_eq!(breakdown.total, Money::from_major(15));
        assert!(breakdown.discount.is_zero());
        assert_eq!(breakdown.lines[0].line_total, Money::from_major(5));
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
    }
}
