//! # Discount Rule Evaluator
//!
//! Computes the discount breakdown for a cart snapshot and a coupon.
//!
//! ## Evaluation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    compute_discount(coupon, rules, items)               │
//! │                                                                         │
//! │  1. subtotal = Σ unit_price × quantity          (no rounding)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  2. base discount by coupon kind                                       │
//! │     ├── FIXED          → value                                         │
//! │     ├── PERCENTAGE     → subtotal × value / 100, capped by max_discount│
//! │     ├── BUY_X_GET_Y    → 0 (rules do the work)                         │
//! │     └── FREE_SHIPPING  → 0, free_shipping = true                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  3. rules, priority descending (stable)                                │
//! │     ├── PRODUCT     → first line for product_id                        │
//! │     ├── CATEGORY    → every line in category_id                        │
//! │     └── BUY_X_GET_Y → matching lines, unit_price × free units          │
//! │     each rule discount is added to its line AND to the order discount  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  4. total = max(subtotal - discount, 0)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Properties
//! - Pure: no I/O, no clock, no randomness. Re-running on the same inputs
//!   returns identical Money values, so a historical order can be re-verified.
//! - Rules are additive and each one is priced from the line's gross amount,
//!   so declaration order never changes the numeric result.
//! - A line's discount may exceed its gross amount when rules stack. Only the
//!   order total is clamped; `line_total` is floored at zero independently.
//! - The base discount is order-level and is not allocated to lines.
//!
//! ## Example
//! ```rust
//! use storefront_core::discount::compute_discount;
//! use storefront_core::money::Money;
//! use storefront_core::types::{Coupon, DiscountKind, LineItem};
//! use chrono::{Duration, Utc};
//!
//! let now = Utc::now();
//! let coupon = Coupon {
//!     id: "c1".into(),
//!     code: "FLAT50".into(),
//!     kind: DiscountKind::Fixed,
//!     value: Money::from_major(50),
//!     min_purchase: Money::zero(),
//!     max_discount: Money::zero(),
//!     usage_limit: None,
//!     usage_count: 0,
//!     is_active: true,
//!     valid_from: now - Duration::days(1),
//!     valid_until: now + Duration::days(1),
//!     created_at: now,
//! };
//! let items = vec![LineItem {
//!     product_id: "p1".into(),
//!     quantity: 2,
//!     unit_price: Money::from_major(100),
//!     category: None,
//! }];
//!
//! let breakdown = compute_discount(&coupon, &[], &items);
//! assert_eq!(breakdown.discount, Money::from_major(50));
//! assert_eq!(breakdown.total, Money::from_major(150));
//! ```

use std::cmp::Reverse;

use crate::money::{Money, Percentage};
use crate::types::{
    Coupon, CouponRule, CouponWithRules, DiscountBreakdown, DiscountKind, LineItem,
    ProcessedLineItem, RuleKind, RuleReward,
};

/// Runs the evaluator for a coupon and its rules.
pub fn compute_discount(
    coupon: &Coupon,
    rules: &[CouponRule],
    items: &[LineItem],
) -> DiscountBreakdown {
    let subtotal: Money = items.iter().map(LineItem::gross).sum();
    let mut lines: Vec<ProcessedLineItem> = items
        .iter()
        .cloned()
        .map(ProcessedLineItem::undiscounted)
        .collect();

    let mut discount = base_discount(coupon, subtotal);
    for rule in by_priority(rules) {
        discount += apply_rule(rule, &mut lines);
    }
    let discount = discount.clamp_non_negative();

    for line in &mut lines {
        line.line_total = (line.item.gross() - line.discount).clamp_non_negative();
    }

    DiscountBreakdown {
        subtotal,
        discount,
        total: (subtotal - discount).clamp_non_negative(),
        lines,
        free_shipping: coupon.kind == DiscountKind::FreeShipping,
    }
}

/// Breakdown for an optional coupon; no coupon means no discount.
pub fn evaluate(coupon: Option<&CouponWithRules>, items: &[LineItem]) -> DiscountBreakdown {
    match coupon {
        Some(c) => compute_discount(&c.coupon, &c.rules, items),
        None => DiscountBreakdown::undiscounted(items),
    }
}

/// The coupon's own discount, before rules.
pub fn base_discount(coupon: &Coupon, subtotal: Money) -> Money {
    match coupon.kind {
        DiscountKind::Fixed => coupon.value,
        DiscountKind::Percentage => {
            let raw = subtotal.percent(Percentage::from(coupon.value));
            if coupon.max_discount.is_positive() {
                raw.min(coupon.max_discount)
            } else {
                raw
            }
        }
        DiscountKind::BuyXGetY | DiscountKind::FreeShipping => Money::zero(),
    }
}

/// Rules sorted by priority descending; ties keep declaration order.
fn by_priority(rules: &[CouponRule]) -> Vec<&CouponRule> {
    let mut ordered: Vec<&CouponRule> = rules.iter().collect();
    ordered.sort_by_key(|rule| Reverse(rule.priority));
    ordered
}

/// Applies one rule to the matching lines and returns what it took off.
fn apply_rule(rule: &CouponRule, lines: &mut [ProcessedLineItem]) -> Money {
    match &rule.kind {
        RuleKind::Product { product_id, reward } => lines
            .iter_mut()
            .find(|line| &line.item.product_id == product_id)
            .map(|line| {
                let amount = reward_amount(reward, &line.item);
                credit(line, amount)
            })
            .unwrap_or_default(),

        RuleKind::Category {
            category_id,
            reward,
        } => lines
            .iter_mut()
            .filter(|line| line.item.category.as_deref() == Some(category_id.as_str()))
            .map(|line| {
                let amount = reward_amount(reward, &line.item);
                credit(line, amount)
            })
            .sum(),

        RuleKind::BuyXGetY {
            product_id,
            buy_quantity,
            get_quantity,
        } => lines
            .iter_mut()
            .filter(|line| {
                product_id
                    .as_deref()
                    .map_or(true, |p| p == line.item.product_id)
            })
            .map(|line| {
                let free = free_units(line.item.quantity, *buy_quantity, *get_quantity);
                let amount = line.item.unit_price * free;
                credit(line, amount)
            })
            .sum(),
    }
}

fn credit(line: &mut ProcessedLineItem, amount: Money) -> Money {
    line.discount += amount;
    amount
}

fn reward_amount(reward: &RuleReward, item: &LineItem) -> Money {
    match reward {
        RuleReward::FixedPerUnit(per_unit) => *per_unit * item.quantity,
        RuleReward::Percentage(pct) => item.gross().percent(*pct),
    }
}

/// `min(floor(quantity / buy) × get, quantity)`. Zero when `buy` is not positive.
pub fn free_units(quantity: i64, buy: i64, get: i64) -> i64 {
    if buy <= 0 || get <= 0 || quantity <= 0 {
        return 0;
    }
    let sets = quantity / buy;
    sets.saturating_mul(get).min(quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    fn coupon(kind: DiscountKind, value: Money, max_discount: Money) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: "c1".to_string(),
            code: "TEST".to_string(),
            kind,
            value,
            min_purchase: Money::zero(),
            max_discount,
            usage_limit: None,
            usage_count: 0,
            is_active: true,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            created_at: now,
        }
    }

    fn item(product_id: &str, quantity: i64, unit_price: Money, category: Option<&str>) -> LineItem {
        LineItem {
            product_id: product_id.to_string(),
            quantity,
            unit_price,
            category: category.map(str::to_string),
        }
    }

    fn rule(id: &str, priority: i64, kind: RuleKind) -> CouponRule {
        CouponRule {
            id: id.to_string(),
            priority,
            kind,
        }
    }

    #[test]
    fn test_save20_is_capped() {
        let save20 = coupon(
            DiscountKind::Percentage,
            Money::from_major(20),
            Money::from_major(50),
        );
        let items = vec![item("p1", 5, Money::from_major(100), None)];

        let breakdown = compute_discount(&save20, &[], &items);
        assert_eq!(breakdown.subtotal, Money::from_major(500));
        assert_eq!(breakdown.discount, Money::from_major(50));
        assert_eq!(breakdown.total, Money::from_major(450));
    }

    #[test]
    fn test_flat50() {
        let flat50 = coupon(DiscountKind::Fixed, Money::from_major(50), Money::zero());
        let items = vec![item("p1", 2, Money::from_major(100), None)];

        let breakdown = compute_discount(&flat50, &[], &items);
        assert_eq!(breakdown.discount, Money::from_major(50));
        assert_eq!(breakdown.total, Money::from_major(150));
        // Base discount stays at order level.
        assert!(breakdown.lines[0].discount.is_zero());
    }

    #[test]
    fn test_fixed_larger_than_subtotal_clamps_total() {
        let big = coupon(DiscountKind::Fixed, Money::from_major(500), Money::zero());
        let items = vec![item("p1", 1, Money::from_major(20), None)];

        let breakdown = compute_discount(&big, &[], &items);
        assert_eq!(breakdown.discount, Money::from_major(500));
        assert_eq!(breakdown.total, Money::zero());
    }

    #[test]
    fn test_buy_two_get_one() {
        let bogo = coupon(DiscountKind::BuyXGetY, Money::zero(), Money::zero());
        let rules = vec![rule(
            "r1",
            0,
            RuleKind::BuyXGetY {
                product_id: Some("sock".to_string()),
                buy_quantity: 2,
                get_quantity: 1,
            },
        )];
        let items = vec![
            item("sock", 5, Money::from_major(4), None),
            item("shoe", 1, Money::from_major(60), None),
        ];

        let breakdown = compute_discount(&bogo, &rules, &items);
        assert_eq!(breakdown.discount, Money::from_major(8));
        assert_eq!(breakdown.lines[0].discount, Money::from_major(8));
        assert_eq!(breakdown.lines[0].line_total, Money::from_major(12));
        assert!(breakdown.lines[1].discount.is_zero());
        assert_eq!(breakdown.total, Money::from_major(72));
    }

    #[test]
    fn test_buy_x_get_y_rule_applies_under_percentage_coupon() {
        let c = coupon(DiscountKind::Percentage, Money::from_major(10), Money::zero());
        let rules = vec![rule(
            "r1",
            0,
            RuleKind::BuyXGetY {
                product_id: Some("sock".to_string()),
                buy_quantity: 2,
                get_quantity: 1,
            },
        )];
        let items = vec![item("sock", 3, Money::from_major(10), None)];

        let breakdown = compute_discount(&c, &rules, &items);
        // 10% of 30 plus one free sock
        assert_eq!(breakdown.discount, Money::from_major(13));
        assert_eq!(breakdown.lines[0].discount, Money::from_major(10));
        assert_eq!(breakdown.total, Money::from_major(17));
    }

    #[test]
    fn test_free_units() {
        assert_eq!(free_units(5, 2, 1), 2);
        assert_eq!(free_units(1, 2, 1), 0);
        assert_eq!(free_units(4, 1, 3), 4);
        assert_eq!(free_units(5, 0, 1), 0);
    }

    #[test]
    fn test_product_rule_hits_first_match_only() {
        let c = coupon(DiscountKind::Fixed, Money::zero(), Money::zero());
        let rules = vec![rule(
            "r1",
            1,
            RuleKind::Product {
                product_id: "p1".to_string(),
                reward: RuleReward::FixedPerUnit(Money::from_major(1)),
            },
        )];
        let items = vec![
            item("p1", 3, Money::from_major(10), None),
            item("p1", 2, Money::from_major(10), None),
        ];

        let breakdown = compute_discount(&c, &rules, &items);
        assert_eq!(breakdown.lines[0].discount, Money::from_major(3));
        assert!(breakdown.lines[1].discount.is_zero());
        assert_eq!(breakdown.discount, Money::from_major(3));
    }

    #[test]
    fn test_duplicate_product_rules_stack() {
        let c = coupon(DiscountKind::Fixed, Money::zero(), Money::zero());
        let reward = RuleReward::Percentage(Percentage::from_whole(10));
        let rules = vec![
            rule("r1", 1, RuleKind::Product { product_id: "p1".to_string(), reward }),
            rule("r2", 1, RuleKind::Product { product_id: "p1".to_string(), reward }),
        ];
        let items = vec![item("p1", 1, Money::from_major(50), None)];

        let breakdown = compute_discount(&c, &rules, &items);
        assert_eq!(breakdown.discount, Money::from_major(10));
    }

    #[test]
    fn test_category_rule_and_base_discount_add_up() {
        let c = coupon(DiscountKind::Fixed, Money::from_major(5), Money::zero());
        let rules = vec![rule(
            "r1",
            2,
            RuleKind::Category {
                category_id: "books".to_string(),
                reward: RuleReward::Percentage(Percentage::from_whole(25)),
            },
        )];
        let items = vec![
            item("b1", 1, Money::from_major(20), Some("books")),
            item("b2", 2, Money::from_major(10), Some("books")),
            item("m1", 1, Money::from_major(30), Some("music")),
        ];

        let breakdown = compute_discount(&c, &rules, &items);
        assert_eq!(breakdown.lines[0].discount, Money::from_major(5));
        assert_eq!(breakdown.lines[1].discount, Money::from_major(5));
        assert!(breakdown.lines[2].discount.is_zero());
        assert_eq!(breakdown.discount, Money::from_major(15));
        assert_eq!(breakdown.total, Money::from_major(55));
    }

    #[test]
    fn test_stacked_rules_may_exceed_line() {
        let c = coupon(DiscountKind::Fixed, Money::zero(), Money::zero());
        let rules = vec![
            rule(
                "r1",
                1,
                RuleKind::Product {
                    product_id: "p1".to_string(),
                    reward: RuleReward::FixedPerUnit(Money::from_major(8)),
                },
            ),
            rule(
                "r2",
                1,
                RuleKind::Category {
                    category_id: "toys".to_string(),
                    reward: RuleReward::FixedPerUnit(Money::from_major(8)),
                },
            ),
        ];
        let items = vec![item("p1", 1, Money::from_major(10), Some("toys"))];

        let breakdown = compute_discount(&c, &rules, &items);
        assert_eq!(breakdown.lines[0].discount, Money::from_major(16));
        assert!(breakdown.lines[0].line_total.is_zero());
        assert!(breakdown.total.is_zero());
    }

    #[test]
    fn test_free_shipping_flag() {
        let c = coupon(DiscountKind::FreeShipping, Money::zero(), Money::zero());
        let items = vec![item("p1", 1, Money::from_major(10), None)];

        let breakdown = compute_discount(&c, &[], &items);
        assert!(breakdown.free_shipping);
        assert!(breakdown.discount.is_zero());
        assert_eq!(breakdown.total, Money::from_major(10));
    }

    #[test]
    fn test_evaluate_without_coupon() {
        let items = vec![item("p1", 3, Money::from_cents(199), None)];
        let breakdown = evaluate(None, &items);
        assert_eq!(breakdown.total, Money::from_cents(597));
        assert!(!breakdown.free_shipping);
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    fn arb_items() -> impl Strategy<Value = Vec<LineItem>> {
        prop::collection::vec(
            (0i64..100_000, 1i64..20, prop::option::of(0usize..3)),
            1..8,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (cents, qty, cat))| LineItem {
                    product_id: format!("p{i}"),
                    quantity: qty,
                    unit_price: Money::from_cents(cents),
                    category: cat.map(|c| format!("cat{c}")),
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_percentage_without_rules(
            items in arb_items(),
            pct in 0i64..=100,
            cap_cents in 0i64..50_000,
        ) {
            let c = coupon(
                DiscountKind::Percentage,
                Money::from_major(pct),
                Money::from_cents(cap_cents),
            );
            let breakdown = compute_discount(&c, &[], &items);

            let raw = breakdown.subtotal.percent(Percentage::from_whole(pct));
            let expected = if cap_cents > 0 { raw.min(Money::from_cents(cap_cents)) } else { raw };
            prop_assert_eq!(breakdown.discount, expected);
            prop_assert!(!breakdown.discount.is_negative());
        }

        #[test]
        fn prop_total_is_clamped_difference(
            items in arb_items(),
            fixed_cents in 0i64..2_000_000,
            per_unit_cents in 0i64..5_000,
        ) {
            let c = coupon(DiscountKind::Fixed, Money::from_cents(fixed_cents), Money::zero());
            let rules = vec![rule(
                "r1",
                1,
                RuleKind::Category {
                    category_id: "cat0".to_string(),
                    reward: RuleReward::FixedPerUnit(Money::from_cents(per_unit_cents)),
                },
            )];
            let breakdown = compute_discount(&c, &rules, &items);

            prop_assert!(!breakdown.total.is_negative());
            prop_assert_eq!(
                breakdown.total,
                (breakdown.subtotal - breakdown.discount).clamp_non_negative()
            );
            if breakdown.discount <= breakdown.subtotal {
                prop_assert_eq!(breakdown.total, breakdown.subtotal - breakdown.discount);
            }
        }

        #[test]
        fn prop_rule_order_is_irrelevant(
            items in arb_items(),
            pct in 0i64..=100,
            per_unit_cents in 0i64..5_000,
        ) {
            let c = coupon(DiscountKind::BuyXGetY, Money::zero(), Money::zero());
            let high = rule(
                "high",
                5,
                RuleKind::Category {
                    category_id: "cat0".to_string(),
                    reward: RuleReward::Percentage(Percentage::from_whole(pct)),
                },
            );
            let low = rule(
                "low",
                1,
                RuleKind::Category {
                    category_id: "cat1".to_string(),
                    reward: RuleReward::FixedPerUnit(Money::from_cents(per_unit_cents)),
                },
            );

            let forward = compute_discount(&c, &[high.clone(), low.clone()], &items);
            let backward = compute_discount(&c, &[low, high], &items);
            prop_assert_eq!(forward.discount, backward.discount);
            prop_assert_eq!(forward.total, backward.total);
        }

        #[test]
        fn prop_evaluation_is_deterministic(items in arb_items(), pct in 0i64..=100) {
            let c = coupon(DiscountKind::Percentage, Money::from_major(pct), Money::zero());
            let rules = vec![rule(
                "bxgy",
                3,
                RuleKind::BuyXGetY { product_id: None, buy_quantity: 2, get_quantity: 1 },
            )];
            prop_assert_eq!(
                compute_discount(&c, &rules, &items),
                compute_discount(&c, &rules, &items)
            );
        }

        #[test]
        fn prop_buy_two_get_one(q in 1i64..500) {
            prop_assert_eq!(free_units(q, 2, 1), (q / 2).min(q));
        }
    }
}
