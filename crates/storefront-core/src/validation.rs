//! # Validation Module
//!
//! Input and cart validation for storefront checkout.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Checkout orchestrator (read time)                            │
//! │  ├── validate_cart: non-empty, active products, stock ≥ quantity       │
//! │  └── validate_charge: total must be strictly positive                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Coupon administration                                        │
//! │  └── validate_coupon_definition: value ranges, dates, rule shape       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite, authoritative)                             │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  ├── conditional decrement inside the commit transaction               │
//! │  └── UNIQUE (code), foreign keys                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Layer 1 checks are advisory: they let a checkout fail before any charge,
//! but only the commit transaction can guarantee stock and usage limits.
//!
//! ## Usage
//! ```rust
//! use storefront_core::validation::{validate_coupon_code, validate_quantity};
//!
//! assert!(validate_coupon_code("SAVE20").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CartLine, Coupon, CouponRule, CouponRuleRecord, DiscountKind, LineItem};
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Cart Validators
// =============================================================================

/// Validates a loaded cart and captures its line-item snapshot.
///
/// ## Rules
/// - Cart must not be empty
/// - Every quantity must be in `1..=MAX_ITEM_QUANTITY`
/// - Every product must be active
/// - Every product must have `stock ≥ quantity` at read time
///
/// The first violation wins, in cart order. Nothing here touches the store,
/// so failing is always safe.
pub fn validate_cart(lines: &[CartLine]) -> ValidationResult<Vec<LineItem>> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyCart);
    }

    for line in lines {
        validate_quantity(line.quantity)?;

        if !line.is_active {
            return Err(ValidationError::ProductInactive {
                product_id: line.product_id.clone(),
            });
        }

        if line.stock < line.quantity {
            return Err(ValidationError::InsufficientStock {
                product_id: line.product_id.clone(),
                available: line.stock,
                requested: line.quantity,
            });
        }
    }

    Ok(lines.iter().map(CartLine::to_line_item).collect())
}

/// Rejects a checkout whose discounted total is zero or below.
///
/// ## Example
/// ```rust
/// use storefront_core::money::Money;
/// use storefront_core::validation::validate_charge;
///
/// assert!(validate_charge(Money::from_cents(1)).is_ok());
/// assert!(validate_charge(Money::zero()).is_err());
/// ```
pub fn validate_charge(total: Money) -> ValidationResult<()> {
    if !total.is_positive() {
        return Err(ValidationError::NonPositiveTotal { total });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a catalog price. Zero is allowed (free items).
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - 1 to 50 characters after trimming
/// - Letters, digits, hyphens and underscores only
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    validate_token(sku, "sku", 50)
}

/// Validates a coupon code.
///
/// ## Rules
/// - 1 to 32 characters after trimming
/// - Letters, digits, hyphens and underscores only
///
/// Codes are matched exactly; no case folding is applied.
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    validate_token(code, "code", 32)
}

fn validate_token(value: &str, field: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name: 1 to 200 characters after trimming.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Coupon Definition
// =============================================================================

/// Validates a coupon about to be created and converts its rule records.
///
/// ## Rules
/// - `code` passes [`validate_coupon_code`]
/// - `value`, `min_purchase`, `max_discount` are non-negative
/// - PERCENTAGE coupons have `value ≤ 100`
/// - `valid_from < valid_until`
/// - `usage_limit`, when set, is at least 1
/// - every rule converts into a [`CouponRule`] and percentage rewards are ≤ 100
///
/// Returns the typed rules in declaration order.
pub fn validate_coupon_definition(
    coupon: &Coupon,
    rules: Vec<CouponRuleRecord>,
) -> ValidationResult<Vec<CouponRule>> {
    validate_coupon_code(&coupon.code)?;

    for (field, amount) in [
        ("value", coupon.value),
        ("min_purchase", coupon.min_purchase),
        ("max_discount", coupon.max_discount),
    ] {
        if amount.is_negative() {
            return Err(ValidationError::MustBePositive {
                field: field.to_string(),
            });
        }
    }

    if coupon.kind == DiscountKind::Percentage && coupon.value > Money::from_major(100) {
        return Err(ValidationError::OutOfRange {
            field: "value".to_string(),
            min: 0,
            max: 100,
        });
    }

    if coupon.valid_from >= coupon.valid_until {
        return Err(ValidationError::InvalidFormat {
            field: "valid_until".to_string(),
            reason: "must be after valid_from".to_string(),
        });
    }

    if let Some(limit) = coupon.usage_limit {
        if limit < 1 {
            return Err(ValidationError::MustBePositive {
                field: "usage_limit".to_string(),
            });
        }
    }

    rules
        .into_iter()
        .map(|record| {
            if let Some(pct) = record.discount_percentage {
                if !pct.is_valid_discount() {
                    return Err(ValidationError::OutOfRange {
                        field: "discount_percentage".to_string(),
                        min: 0,
                        max: 100,
                    });
                }
            }
            if let Some(fixed) = record.discount_fixed {
                if fixed.is_negative() {
                    return Err(ValidationError::MustBePositive {
                        field: "discount_fixed".to_string(),
                    });
                }
            }
            CouponRule::try_from(record)
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Percentage;
    use crate::types::RuleType;
    use chrono::{Duration, Utc};

    fn line(product_id: &str, quantity: i64, stock: i64) -> CartLine {
        CartLine {
            product_id: product_id.to_string(),
            name: product_id.to_uppercase(),
            quantity,
            unit_price: Money::from_major(10),
            stock,
            is_active: true,
            category: None,
        }
    }

    fn coupon(kind: DiscountKind, value: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: "c1".to_string(),
            code: "SAVE20".to_string(),
            kind,
            value: Money::from_major(value),
            min_purchase: Money::zero(),
            max_discount: Money::zero(),
            usage_limit: None,
            usage_count: 0,
            is_active: true,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(30),
            created_at: now,
        }
    }

    #[test]
    fn test_validate_cart_ok() {
        let items = validate_cart(&[line("a", 2, 5), line("b", 1, 1)]).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].product_id, "b");
    }

    #[test]
    fn test_validate_cart_has_no_line_count_limit() {
        let lines: Vec<CartLine> = (0..250).map(|i| line(&format!("p{i}"), 1, 1)).collect();

        let items = validate_cart(&lines).unwrap();
        assert_eq!(items.len(), 250);
    }

    #[test]
    fn test_validate_cart_rejections() {
        assert_eq!(validate_cart(&[]), Err(ValidationError::EmptyCart));

        let mut inactive = line("a", 1, 5);
        inactive.is_active = false;
        assert_eq!(
            validate_cart(&[inactive]),
            Err(ValidationError::ProductInactive {
                product_id: "a".to_string()
            })
        );

        assert_eq!(
            validate_cart(&[line("a", 1, 5), line("b", 3, 2)]),
            Err(ValidationError::InsufficientStock {
                product_id: "b".to_string(),
                available: 2,
                requested: 3,
            })
        );

        assert!(validate_cart(&[line("a", 0, 5)]).is_err());
    }

    #[test]
    fn test_validate_charge() {
        assert!(validate_charge(Money::from_cents(1)).is_ok());
        assert!(matches!(
            validate_charge(Money::zero()),
            Err(ValidationError::NonPositiveTotal { .. })
        ));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_codes() {
        assert!(validate_coupon_code("FLAT50").is_ok());
        assert!(validate_coupon_code("BOGO_2024").is_ok());
        assert!(validate_coupon_code("").is_err());
        assert!(validate_coupon_code("has space").is_err());
        assert!(validate_coupon_code(&"A".repeat(40)).is_err());

        assert!(validate_sku("TSHIRT-RED-M").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_price(Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_coupon_definition() {
        let rules = vec![CouponRuleRecord {
            id: "r1".to_string(),
            coupon_id: "c1".to_string(),
            rule_type: Some(RuleType::Category),
            category_id: Some("shoes".to_string()),
            discount_percentage: Some(Percentage::from_whole(10)),
            priority: 1,
            ..Default::default()
        }];
        let typed = validate_coupon_definition(&coupon(DiscountKind::Percentage, 20), rules).unwrap();
        assert_eq!(typed.len(), 1);

        assert!(validate_coupon_definition(&coupon(DiscountKind::Percentage, 120), vec![]).is_err());
        assert!(validate_coupon_definition(&coupon(DiscountKind::Fixed, 120), vec![]).is_ok());

        let mut inverted = coupon(DiscountKind::Fixed, 5);
        inverted.valid_until = inverted.valid_from;
        assert!(validate_coupon_definition(&inverted, vec![]).is_err());

        let mut zero_limit = coupon(DiscountKind::Fixed, 5);
        zero_limit.usage_limit = Some(0);
        assert!(validate_coupon_definition(&zero_limit, vec![]).is_err());
    }

    #[test]
    fn test_coupon_definition_rejects_bad_rule_percentage() {
        let rules = vec![CouponRuleRecord {
            id: "r1".to_string(),
            coupon_id: "c1".to_string(),
            rule_type: Some(RuleType::Product),
            product_id: Some("p1".to_string()),
            discount_percentage: Some(Percentage::from_whole(150)),
            ..Default::default()
        }];
        assert!(validate_coupon_definition(&coupon(DiscountKind::Fixed, 5), rules).is_err());
    }
}
