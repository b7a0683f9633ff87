//! # Order Repository
//!
//! Orders, their frozen line items, and the checkout commit.
//!
//! ## Checkout Commit (one transaction)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   commit_checkout(draft)                                │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   1. for each line:                                                     │
//! │        UPDATE products SET stock = stock - qty                          │
//! │        WHERE id = ? AND stock >= qty          0 rows → StockConflict    │
//! │   2. if coupon:                                                         │
//! │        UPDATE coupons SET usage_count = usage_count + 1                 │
//! │        WHERE id = ? AND under limit           0 rows → CouponExhausted  │
//! │   3. INSERT orders (PROCESSING / PAID)                                  │
//! │   4. INSERT order_items (frozen processed lines)                        │
//! │   5. DELETE cart_items for the user                                     │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure drops the transaction → ROLLBACK, nothing is visible.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transaction opens with writes so SQLite takes the write lock at the
//! first statement. Concurrent commits therefore serialize on that lock
//! instead of failing on a read-to-write upgrade, and the conditional
//! updates are the authoritative stock and usage checks.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::cart::clear_cart;
use crate::repository::coupon::claim_usage;
use crate::repository::product::decrement_stock;
use storefront_core::{Order, OrderDraft, OrderItem, OrderStatus, PaymentStatus};

const ORDER_COLUMNS: &str = r#"
    id, order_number, user_id, subtotal, discount, total, status,
    payment_status, coupon_id, transaction_id, created_at, updated_at
"#;

/// Repository for order operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Atomically turns a paid checkout into an order.
    ///
    /// ## Returns
    /// * `Ok(Order)` - Order created, stock decremented, coupon claimed, cart cleared
    /// * `Err(DbError::StockConflict)` - A line no longer fits in stock
    /// * `Err(DbError::CouponExhausted)` - The coupon hit its usage limit
    /// * `Err(_)` - Store failure; nothing was written
    pub async fn commit_checkout(&self, draft: &OrderDraft) -> DbResult<Order> {
        debug!(
            order_number = %draft.order_number,
            user_id = %draft.user_id,
            lines = draft.items.len(),
            "Committing checkout"
        );

        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;

        for line in &draft.items {
            let item = &line.item;
            if !decrement_stock(&mut tx, &item.product_id, item.quantity).await? {
                warn!(
                    product_id = %item.product_id,
                    requested = item.quantity,
                    "Stock re-check failed at commit"
                );
                return Err(DbError::StockConflict {
                    product_id: item.product_id.clone(),
                    requested: item.quantity,
                });
            }
        }

        if let Some(coupon_id) = &draft.coupon_id {
            if !claim_usage(&mut tx, coupon_id).await? {
                warn!(coupon_id = %coupon_id, "Coupon usage re-check failed at commit");
                return Err(DbError::CouponExhausted {
                    coupon_id: coupon_id.clone(),
                });
            }
        }

        let mut order = Order {
            id: order_id,
            order_number: draft.order_number.clone(),
            user_id: draft.user_id.clone(),
            subtotal: draft.subtotal,
            discount: draft.discount,
            total: draft.total,
            status: OrderStatus::Processing,
            payment_status: PaymentStatus::Paid,
            coupon_id: draft.coupon_id.clone(),
            transaction_id: Some(draft.transaction_id.clone()),
            created_at: now,
            updated_at: now,
            items: Vec::with_capacity(draft.items.len()),
        };

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ))
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.user_id)
        .bind(order.subtotal)
        .bind(order.discount)
        .bind(order.total)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(&order.coupon_id)
        .bind(&order.transaction_id)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in &draft.items {
            let item = OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                product_id: line.item.product_id.clone(),
                quantity: line.item.quantity,
                unit_price: line.item.unit_price,
                discount: line.discount,
                line_total: line.line_total,
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, quantity, unit_price,
                    discount, line_total, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.discount)
            .bind(item.line_total)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;

            order.items.push(item);
        }

        clear_cart(&mut tx, &draft.user_id).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "Order committed"
        );

        Ok(order)
    }

    /// Gets an order with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match order {
            Some(mut order) => {
                order.items = self.get_items(&order.id).await?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    /// Gets an order by its public order number.
    pub async fn get_by_number(&self, order_number: &str) -> DbResult<Option<Order>> {
        let id: Option<String> = sqlx::query_scalar("SELECT id FROM orders WHERE order_number = ?1")
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        match id {
            Some(id) => self.get_by_id(&id).await,
            None => Ok(None),
        }
    }

    /// Lists a user's orders, newest first, optionally filtered by status.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        limit: u32,
    ) -> DbResult<Vec<Order>> {
        let mut orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3
            "#
        ))
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        for order in &mut orders {
            order.items = self.get_items(&order.id).await?;
        }

        Ok(orders)
    }

    /// Counts a user's orders, optionally filtered by status.
    pub async fn count_for_user(&self, user_id: &str, status: Option<OrderStatus>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Updates fulfilment status. Line items are never touched.
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> DbResult<()> {
        info!(order_id = %id, status = ?status, "Updating order status");

        let result = sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price, discount, line_total, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{coupon, draft_for, insert_product, memory_db};
    use crate::DbError;
    use storefront_core::{DiscountKind, Money, OrderStatus, PaymentStatus};

    #[tokio::test]
    async fn test_commit_applies_every_effect() {
        let db = memory_db().await;
        let p = insert_product(&db, "LAMP", Money::from_major(40), 3, None).await;
        let mut c = coupon("FLAT5", DiscountKind::Fixed, Money::from_major(5));
        c.usage_limit = Some(1);
        db.coupons().create(&c, vec![]).await.unwrap();
        db.carts().add_item("u1", &p.id, 2).await.unwrap();

        let mut draft = draft_for(&db, "u1", Some(&c.id)).await;
        draft.discount = Money::from_major(5);
        draft.total = Money::from_major(75);

        let order = db.orders().commit_checkout(&draft).await.unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.items.len(), 1);

        assert_eq!(db.products().get_by_id(&p.id).await.unwrap().unwrap().stock, 1);
        assert_eq!(
            db.coupons().find_by_id(&c.id).await.unwrap().unwrap().coupon.usage_count,
            1
        );
        assert!(db.carts().load("u1").await.unwrap().is_empty());

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.total, Money::from_major(75));
        assert_eq!(stored.items[0].unit_price, Money::from_major(40));
        assert_eq!(stored.transaction_id.as_deref(), Some(draft.transaction_id.as_str()));
    }

    #[tokio::test]
    async fn test_stock_conflict_rolls_back_everything() {
        let db = memory_db().await;
        let plenty = insert_product(&db, "PLENTY", Money::from_major(1), 50, None).await;
        let scarce = insert_product(&db, "SCARCE", Money::from_major(1), 2, None).await;
        db.carts().add_item("u1", &plenty.id, 5).await.unwrap();
        db.carts().add_item("u1", &scarce.id, 2).await.unwrap();

        let draft = draft_for(&db, "u1", None).await;
        // Another buyer takes the scarce stock between cart read and commit.
        db.products().adjust_stock(&scarce.id, -1).await.unwrap();

        let err = db.orders().commit_checkout(&draft).await.unwrap_err();
        assert!(matches!(err, DbError::StockConflict { ref product_id, requested: 2 } if product_id == &scarce.id));

        assert_eq!(db.products().get_by_id(&plenty.id).await.unwrap().unwrap().stock, 50);
        assert_eq!(db.carts().load("u1").await.unwrap().len(), 2);
        assert_eq!(db.orders().count_for_user("u1", None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_coupon_exhausted_rolls_back_stock() {
        let db = memory_db().await;
        let p = insert_product(&db, "MUG", Money::from_major(10), 5, None).await;
        let mut c = coupon("ONEUSE", DiscountKind::Fixed, Money::from_major(1));
        c.usage_limit = Some(1);
        db.coupons().create(&c, vec![]).await.unwrap();
        assert!(db.coupons().try_claim_usage(&c.id).await.unwrap());

        db.carts().add_item("u1", &p.id, 1).await.unwrap();
        let draft = draft_for(&db, "u1", Some(&c.id)).await;

        let err = db.orders().commit_checkout(&draft).await.unwrap_err();
        assert!(matches!(err, DbError::CouponExhausted { .. }));
        assert_eq!(db.products().get_by_id(&p.id).await.unwrap().unwrap().stock, 5);
        assert_eq!(db.carts().load("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_count_and_status() {
        let db = memory_db().await;
        let p = insert_product(&db, "PEN", Money::from_major(2), 10, None).await;

        for _ in 0..2 {
            db.carts().add_item("u1", &p.id, 1).await.unwrap();
            let draft = draft_for(&db, "u1", None).await;
            db.orders().commit_checkout(&draft).await.unwrap();
        }

        let orders = db.orders().list_for_user("u1", None, 10).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.items.len() == 1));

        db.orders().update_status(&orders[0].id, OrderStatus::Shipped).await.unwrap();
        assert_eq!(
            db.orders().count_for_user("u1", Some(OrderStatus::Shipped)).await.unwrap(),
            1
        );
        assert_eq!(
            db.orders()
                .list_for_user("u1", Some(OrderStatus::Processing), 10)
                .await
                .unwrap()
                .len(),
            1
        );

        let by_number = db
            .orders()
            .get_by_number(&orders[1].order_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_number.id, orders[1].id);

        assert!(matches!(
            db.orders().update_status("missing", OrderStatus::Cancelled).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
