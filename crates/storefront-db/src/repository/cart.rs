//! # Cart Repository
//!
//! Per-user carts. A cart belongs to exactly one user and needs no
//! cross-request coordination; prices and stock are read live from
//! `products` every time the cart is loaded.
//!
//! ## Cart Source Row
//! ```text
//! cart_items c JOIN products p ON p.id = c.product_id
//!   → CartLine { product_id, name, quantity, unit_price = p.price,
//!                stock = p.stock, is_active, category }
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::validation::validate_quantity;
use storefront_core::{CartLine, ValidationError};

const CART_LINE_SELECT: &str = r#"
    SELECT
        p.id AS product_id,
        p.name,
        c.quantity,
        p.price AS unit_price,
        p.stock,
        p.is_active,
        p.category
    FROM cart_items c
    INNER JOIN products p ON p.id = c.product_id
"#;

/// Repository for cart operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Loads the user's cart joined with current product data,
    /// in the order lines were first added.
    pub async fn load(&self, user_id: &str) -> DbResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(&format!(
            "{CART_LINE_SELECT} WHERE c.user_id = ?1 ORDER BY c.created_at, c.rowid"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(user_id = %user_id, lines = lines.len(), "Loaded cart");
        Ok(lines)
    }

    /// Adds `quantity` units of a product, merging with an existing line.
    ///
    /// ## Rules
    /// - Product must exist and be active
    /// - Resulting quantity must not exceed current stock
    ///
    /// The upsert runs first and the checks read the merged row inside the
    /// same transaction; a failed check rolls the upsert back.
    pub async fn add_item(&self, user_id: &str, product_id: &str, quantity: i64) -> DbResult<CartLine> {
        validate_quantity(quantity)?;
        debug!(user_id = %user_id, product_id = %product_id, quantity, "Adding to cart");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, quantity, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = quantity + excluded.quantity, updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => DbError::not_found("Product", product_id),
            other => other,
        })?;

        let line = fetch_line(&mut tx, user_id, product_id).await?;
        check_line(&line)?;
        tx.commit().await?;

        Ok(line)
    }

    /// Replaces the quantity of an existing cart line.
    pub async fn set_quantity(&self, user_id: &str, product_id: &str, quantity: i64) -> DbResult<CartLine> {
        validate_quantity(quantity)?;
        debug!(user_id = %user_id, product_id = %product_id, quantity, "Setting cart quantity");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE cart_items SET quantity = ?3, updated_at = ?4
            WHERE user_id = ?1 AND product_id = ?2
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart item", product_id));
        }

        let line = fetch_line(&mut tx, user_id, product_id).await?;
        check_line(&line)?;
        tx.commit().await?;

        Ok(line)
    }

    /// Removes one product from the cart.
    pub async fn remove_item(&self, user_id: &str, product_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = ?1 AND product_id = ?2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart item", product_id));
        }

        Ok(())
    }

    /// Empties the user's cart. Returns the number of lines removed.
    pub async fn clear(&self, user_id: &str) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        clear_cart(&mut conn, user_id).await
    }
}

async fn fetch_line(conn: &mut SqliteConnection, user_id: &str, product_id: &str) -> DbResult<CartLine> {
    sqlx::query_as::<_, CartLine>(&format!(
        "{CART_LINE_SELECT} WHERE c.user_id = ?1 AND c.product_id = ?2"
    ))
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Cart item", product_id))
}

fn check_line(line: &CartLine) -> Result<(), ValidationError> {
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
    Ok(())
}

/// Deletes every cart line for a user on an open connection or transaction.
pub(crate) async fn clear_cart(conn: &mut SqliteConnection, user_id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = ?1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    debug!(user_id = %user_id, removed = result.rows_affected(), "Cleared cart");
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use crate::test_support::{insert_product, memory_db};
    use crate::DbError;
    use storefront_core::{Money, ValidationError};

    #[tokio::test]
    async fn test_add_merges_quantities() {
        let db = memory_db().await;
        let p = insert_product(&db, "CUP", Money::from_cents(350), 10, None).await;

        db.carts().add_item("u1", &p.id, 2).await.unwrap();
        let line = db.carts().add_item("u1", &p.id, 3).await.unwrap();

        assert_eq!(line.quantity, 5);
        assert_eq!(line.unit_price, Money::from_cents(350));

        let cart = db.carts().load("u1").await.unwrap();
        assert_eq!(cart.len(), 1);
        assert!(db.carts().load("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_beyond_stock_is_rolled_back() {
        let db = memory_db().await;
        let p = insert_product(&db, "RARE", Money::from_major(90), 2, None).await;

        db.carts().add_item("u1", &p.id, 2).await.unwrap();
        let err = db.carts().add_item("u1", &p.id, 1).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Invalid(ValidationError::InsufficientStock { available: 2, requested: 3, .. })
        ));

        let cart = db.carts().load("u1").await.unwrap();
        assert_eq!(cart[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_add_unknown_or_inactive_product() {
        let db = memory_db().await;
        assert!(matches!(
            db.carts().add_item("u1", "missing", 1).await,
            Err(DbError::NotFound { .. })
        ));

        let p = insert_product(&db, "GONE", Money::from_major(1), 5, None).await;
        db.products().soft_delete(&p.id).await.unwrap();
        assert!(matches!(
            db.carts().add_item("u1", &p.id, 1).await,
            Err(DbError::Invalid(ValidationError::ProductInactive { .. }))
        ));
    }

    #[tokio::test]
    async fn test_set_remove_clear() {
        let db = memory_db().await;
        let a = insert_product(&db, "A1", Money::from_major(1), 10, Some("misc")).await;
        let b = insert_product(&db, "B1", Money::from_major(2), 10, None).await;

        db.carts().add_item("u1", &a.id, 1).await.unwrap();
        db.carts().add_item("u1", &b.id, 1).await.unwrap();

        let line = db.carts().set_quantity("u1", &a.id, 7).await.unwrap();
        assert_eq!(line.quantity, 7);
        assert_eq!(line.category.as_deref(), Some("misc"));
        assert!(db.carts().set_quantity("u1", &a.id, 11).await.is_err());

        db.carts().remove_item("u1", &b.id).await.unwrap();
        assert!(db.carts().remove_item("u1", &b.id).await.is_err());

        assert_eq!(db.carts().clear("u1").await.unwrap(), 1);
        assert!(db.carts().load("u1").await.unwrap().is_empty());
    }
}
