//! # Coupon Repository
//!
//! Coupons and their rules. Coupons are shared and read-mostly; the only
//! per-checkout write is the usage claim, which is a conditional increment.
//!
//! ## Usage Claim
//! ```text
//! UPDATE coupons SET usage_count = usage_count + 1
//! WHERE id = ?1 AND (usage_limit IS NULL OR usage_count < usage_limit)
//!
//! rows_affected = 1 → claimed
//! rows_affected = 0 → limit reached by a concurrent checkout
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::validation::validate_coupon_definition;
use storefront_core::{Coupon, CouponRule, CouponRuleRecord, CouponWithRules};

const COUPON_COLUMNS: &str = r#"
    id, code, kind, value, min_purchase, max_discount, usage_limit,
    usage_count, is_active, valid_from, valid_until, created_at
"#;

/// Repository for coupon operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Creates a coupon and its rules in one transaction.
    ///
    /// Rules are validated and converted first; the stored `position` keeps
    /// their declaration order so priority ties stay stable. Rules submitted
    /// with an empty `id` get a generated one.
    ///
    /// ## Returns
    /// * `Err(DbError::Invalid)` - Bad coupon fields or incomplete rule
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn create(&self, coupon: &Coupon, mut rules: Vec<CouponRuleRecord>) -> DbResult<CouponWithRules> {
        for rule in rules.iter_mut().filter(|r| r.id.is_empty()) {
            rule.id = Uuid::new_v4().to_string();
        }
        let typed = validate_coupon_definition(coupon, rules.clone())?;

        info!(code = %coupon.code, kind = ?coupon.kind, rules = rules.len(), "Creating coupon");

        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO coupons ({COUPON_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ))
        .bind(&coupon.id)
        .bind(&coupon.code)
        .bind(coupon.kind)
        .bind(coupon.value)
        .bind(coupon.min_purchase)
        .bind(coupon.max_discount)
        .bind(coupon.usage_limit)
        .bind(coupon.usage_count)
        .bind(coupon.is_active)
        .bind(coupon.valid_from)
        .bind(coupon.valid_until)
        .bind(coupon.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, rule) in rules.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO coupon_rules (
                    id, coupon_id, position, rule_type, product_id, category_id,
                    discount_percentage, discount_fixed, buy_quantity, get_quantity, priority
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&rule.id)
            .bind(&coupon.id)
            .bind(position as i64)
            .bind(rule.rule_type)
            .bind(&rule.product_id)
            .bind(&rule.category_id)
            .bind(rule.discount_percentage)
            .bind(rule.discount_fixed)
            .bind(rule.buy_quantity)
            .bind(rule.get_quantity)
            .bind(rule.priority)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(CouponWithRules {
            coupon: coupon.clone(),
            rules: typed,
        })
    }

    /// Finds a coupon by its exact code, with rules in declaration order.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<CouponWithRules>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        debug!(code = %code, found = coupon.is_some(), "Coupon lookup");

        match coupon {
            Some(coupon) => Ok(Some(self.with_rules(coupon).await?)),
            None => Ok(None),
        }
    }

    /// Finds a coupon by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<CouponWithRules>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match coupon {
            Some(coupon) => Ok(Some(self.with_rules(coupon).await?)),
            None => Ok(None),
        }
    }

    /// Lists all coupons, newest first, without rules.
    pub async fn list(&self) -> DbResult<Vec<Coupon>> {
        let coupons = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(coupons)
    }

    /// Activates or deactivates a coupon.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        info!(id = %id, active, "Updating coupon status");

        let result = sqlx::query("UPDATE coupons SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", id));
        }

        Ok(())
    }

    /// Deletes a coupon and its rules. Fails with a foreign key violation
    /// once an order references it; deactivate it instead.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", id));
        }

        Ok(())
    }

    /// Claims one use outside a checkout (admin tooling, tests).
    pub async fn try_claim_usage(&self, id: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        claim_usage(&mut conn, id).await
    }

    async fn with_rules(&self, coupon: Coupon) -> DbResult<CouponWithRules> {
        let records = sqlx::query_as::<_, CouponRuleRecord>(
            r#"
            SELECT
                id, coupon_id, rule_type, product_id, category_id,
                discount_percentage, discount_fixed, buy_quantity, get_quantity, priority
            FROM coupon_rules
            WHERE coupon_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&coupon.id)
        .fetch_all(&self.pool)
        .await?;

        let rules = records
            .into_iter()
            .map(CouponRule::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CouponWithRules { coupon, rules })
    }
}

/// Conditional usage increment on an open connection or transaction.
pub(crate) async fn claim_usage(conn: &mut SqliteConnection, coupon_id: &str) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE coupons
        SET usage_count = usage_count + 1
        WHERE id = ?1 AND (usage_limit IS NULL OR usage_count < usage_limit)
        "#,
    )
    .bind(coupon_id)
    .execute(&mut *conn)
    .await?;

    let claimed = result.rows_affected() == 1;
    debug!(coupon_id = %coupon_id, claimed, "Coupon usage claim");
    Ok(claimed)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{coupon, memory_db};
    use crate::DbError;
    use storefront_core::{
        DiscountKind, Money, Percentage, RuleKind, RuleReward, RuleType, CouponRuleRecord,
    };

    fn category_rule(id: &str, priority: i64) -> CouponRuleRecord {
        CouponRuleRecord {
            id: id.to_string(),
            coupon_id: String::new(),
            rule_type: Some(RuleType::Category),
            category_id: Some("books".to_string()),
            discount_percentage: Some(Percentage::from_whole(10)),
            priority,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_find_preserves_rule_order() {
        let db = memory_db().await;
        let c = coupon("BOOKS", DiscountKind::Percentage, Money::from_major(5));

        db.coupons()
            .create(&c, vec![category_rule("r-b", 1), category_rule("r-a", 1)])
            .await
            .unwrap();

        let found = db.coupons().find_by_code("BOOKS").await.unwrap().unwrap();
        assert_eq!(found.coupon.value, Money::from_major(5));
        let ids: Vec<&str> = found.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r-b", "r-a"]);
        assert_eq!(
            found.rules[0].kind,
            RuleKind::Category {
                category_id: "books".to_string(),
                reward: RuleReward::Percentage(Percentage::from_whole(10)),
            }
        );

        assert!(db.coupons().find_by_code("books").await.unwrap().is_none());
        assert!(db.coupons().find_by_id(&c.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_coupon_is_not_stored() {
        let db = memory_db().await;
        let c = coupon("BAD", DiscountKind::Percentage, Money::from_major(150));

        assert!(matches!(
            db.coupons().create(&c, vec![]).await,
            Err(DbError::Invalid(_))
        ));
        assert!(db.coupons().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let db = memory_db().await;
        db.coupons()
            .create(&coupon("ONCE", DiscountKind::Fixed, Money::from_major(1)), vec![])
            .await
            .unwrap();
        let err = db
            .coupons()
            .create(&coupon("ONCE", DiscountKind::Fixed, Money::from_major(1)), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_usage_claim_respects_limit() {
        let db = memory_db().await;
        let mut c = coupon("TWICE", DiscountKind::Fixed, Money::from_major(1));
        c.usage_limit = Some(2);
        db.coupons().create(&c, vec![]).await.unwrap();

        assert!(db.coupons().try_claim_usage(&c.id).await.unwrap());
        assert!(db.coupons().try_claim_usage(&c.id).await.unwrap());
        assert!(!db.coupons().try_claim_usage(&c.id).await.unwrap());

        let found = db.coupons().find_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(found.coupon.usage_count, 2);
        assert!(found.coupon.is_exhausted());
    }

    #[tokio::test]
    async fn test_set_active_and_delete() {
        let db = memory_db().await;
        let c = coupon("TOGGLE", DiscountKind::FreeShipping, Money::zero());
        db.coupons().create(&c, vec![category_rule("r1", 0)]).await.unwrap();

        db.coupons().set_active(&c.id, false).await.unwrap();
        let found = db.coupons().find_by_code("TOGGLE").await.unwrap().unwrap();
        assert!(!found.coupon.is_active);

        db.coupons().delete(&c.id).await.unwrap();
        assert!(db.coupons().find_by_id(&c.id).await.unwrap().is_none());
        assert!(matches!(
            db.coupons().set_active(&c.id, true).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
