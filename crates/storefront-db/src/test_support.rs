//! Shared fixtures for repository tests.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{Database, DbConfig};
use storefront_core::validation::validate_cart;
use storefront_core::{Coupon, DiscountBreakdown, DiscountKind, Money, OrderDraft, Product};

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub async fn insert_product(
    db: &Database,
    sku: &str,
    price: Money,
    stock: i64,
    category: Option<&str>,
) -> Product {
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        category: category.map(str::to_string),
        price,
        stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap()
}

pub fn coupon(code: &str, kind: DiscountKind, value: Money) -> Coupon {
    let now = Utc::now();
    Coupon {
        id: Uuid::new_v4().to_string(),
        code: code.to_string(),
        kind,
        value,
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

/// An undiscounted draft built from the user's current cart.
pub async fn draft_for(db: &Database, user_id: &str, coupon_id: Option<&str>) -> OrderDraft {
    let lines = db.carts().load(user_id).await.unwrap();
    let items = validate_cart(&lines).unwrap();
    let breakdown = DiscountBreakdown::undiscounted(&items);

    OrderDraft {
        order_number: format!("ORD-TEST-{}", Uuid::new_v4().simple()),
        user_id: user_id.to_string(),
        subtotal: breakdown.subtotal,
        discount: breakdown.discount,
        total: breakdown.total,
        coupon_id: coupon_id.map(str::to_string),
        transaction_id: format!("TXN-TEST-{}", Uuid::new_v4().simple()),
        items: breakdown.lines,
    }
}
