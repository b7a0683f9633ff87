//! # Product Repository
//!
//! The inventory ledger: per-product stock that checkout decrements.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                            │
//! │                                                                     │
//! │  ❌ WRONG: read, then write an absolute value                       │
//! │     SELECT stock FROM products WHERE id = ?      → 1               │
//! │     UPDATE products SET stock = 0 WHERE id = ?                      │
//! │     (two checkouts both read 1, both write 0, two units sold)       │
//! │                                                                     │
//! │  ✅ CORRECT: conditional delta in one statement                     │
//! │     UPDATE products SET stock = stock - ?2                          │
//! │     WHERE id = ?1 AND stock >= ?2                                   │
//! │     rows_affected = 0 → not enough stock, nothing changed           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::validation::{validate_price, validate_product_name, validate_sku};
use storefront_core::{Money, Product};

const PRODUCT_COLUMNS: &str = r#"
    id, sku, name, category, price, stock, is_active, created_at, updated_at
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    /// * `Err(DbError::Invalid)` - Bad SKU, name or price
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_sku(&product.sku)?;
        validate_product_name(&product.name)?;
        validate_price(product.price)?;

        debug!(sku = %product.sku, stock = product.stock, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, category, price, stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Changes a product's price. Carts pick up the new price on next read;
    /// committed orders keep the price they were charged.
    pub async fn update_price(&self, id: &str, price: Money) -> DbResult<()> {
        validate_price(price)?;
        debug!(id = %id, price = %price, "Updating price");

        let result = sqlx::query("UPDATE products SET price = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(price)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Applies a stock delta (positive restocks, negative writes off).
    ///
    /// The `CHECK (stock >= 0)` constraint rejects a delta that would take
    /// stock below zero; that surfaces as `QueryFailed`.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Decrements stock by `quantity` only if at least that much is left.
    ///
    /// ## Returns
    /// * `Ok(true)` - Stock decremented
    /// * `Ok(false)` - Not enough stock (or unknown product); nothing changed
    pub async fn try_decrement(&self, id: &str, quantity: i64) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        decrement_stock(&mut conn, id, quantity).await
    }

    /// Soft-deletes a product by setting is_active = false.
    /// Orders keep referencing it; carts holding it fail validation.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Conditional decrement on an open connection or transaction.
pub(crate) async fn decrement_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    let decremented = result.rows_affected() == 1;
    debug!(id = %id, quantity, decremented, "Conditional stock decrement");
    Ok(decremented)
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn product(sku: &str, price: Money, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            category: Some("general".to_string()),
            price,
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let p = repo
            .insert(&product("MUG-01", Money::from_cents(1250), 4))
            .await
            .unwrap();

        let by_id = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(by_id.price, Money::from_cents(1250));
        assert_eq!(by_id.stock, 4);

        let by_sku = repo.get_by_sku("MUG-01").await.unwrap().unwrap();
        assert_eq!(by_sku.id, p.id);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&product("DUP", Money::from_major(1), 1)).await.unwrap();
        let err = repo
            .insert(&product("DUP", Money::from_major(1), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_conditional_decrement_never_goes_negative() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let p = repo.insert(&product("LAST", Money::from_major(5), 2)).await.unwrap();

        assert!(repo.try_decrement(&p.id, 2).await.unwrap());
        assert!(!repo.try_decrement(&p.id, 1).await.unwrap());

        let after = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(after.stock, 0);
    }

    #[tokio::test]
    async fn test_adjust_stock_and_soft_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let p = repo.insert(&product("ADJ", Money::from_major(5), 1)).await.unwrap();

        repo.adjust_stock(&p.id, 9).await.unwrap();
        assert_eq!(repo.get_by_id(&p.id).await.unwrap().unwrap().stock, 10);

        assert!(repo.adjust_stock(&p.id, -11).await.is_err());
        assert!(matches!(
            repo.adjust_stock("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));

        repo.soft_delete(&p.id).await.unwrap();
        assert!(!repo.get_by_id(&p.id).await.unwrap().unwrap().is_active);
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let p = repo.insert(&product("PRICE", Money::from_major(5), 1)).await.unwrap();

        repo.update_price(&p.id, Money::from_cents(499)).await.unwrap();
        assert_eq!(
            repo.get_by_id(&p.id).await.unwrap().unwrap().price,
            Money::from_cents(499)
        );
        assert!(repo.update_price(&p.id, Money::from_cents(-1)).await.is_err());
    }
}
