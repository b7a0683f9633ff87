//! # Reconciliation Repository
//!
//! Queue of charges that went through but produced no order.
//!
//! ## Outbox Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  payment authorized ──► commit_checkout ──✗ (rolled back)              │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │  record(charge) ──► unfulfilled_charges (resolved_at IS NULL)          │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │  operator: pending() → refund or fulfil by hand → mark_resolved(id)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `transaction_id` is unique, so recording the same charge twice is a
//! no-op rather than a duplicate entry.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::{Money, OrderDraft, UnfulfilledCharge};

/// Repository for the unfulfilled-charge queue.
#[derive(Debug, Clone)]
pub struct ReconciliationRepository {
    pool: SqlitePool,
}

impl ReconciliationRepository {
    /// Creates a new ReconciliationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReconciliationRepository { pool }
    }

    /// Records a charge whose order could not be committed.
    ///
    /// The draft is stored as JSON so the order can be recreated by hand.
    pub async fn record(&self, draft: &OrderDraft, amount: Money, reason: &str) -> DbResult<UnfulfilledCharge> {
        let entry = UnfulfilledCharge {
            id: Uuid::new_v4().to_string(),
            transaction_id: draft.transaction_id.clone(),
            user_id: draft.user_id.clone(),
            amount: amount.round_to_cents(),
            reason: reason.to_string(),
            payload: serde_json::to_string(draft)?,
            created_at: Utc::now(),
            resolved_at: None,
        };

        info!(
            transaction_id = %entry.transaction_id,
            amount = %entry.amount,
            reason = %entry.reason,
            "Recording unfulfilled charge"
        );

        sqlx::query(
            r#"
            INSERT INTO unfulfilled_charges (
                id, transaction_id, user_id, amount, reason, payload, created_at, resolved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (transaction_id) DO NOTHING
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.transaction_id)
        .bind(&entry.user_id)
        .bind(entry.amount)
        .bind(&entry.reason)
        .bind(&entry.payload)
        .bind(entry.created_at)
        .bind(entry.resolved_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Unresolved charges, oldest first.
    pub async fn pending(&self, limit: u32) -> DbResult<Vec<UnfulfilledCharge>> {
        let entries = sqlx::query_as::<_, UnfulfilledCharge>(
            r#"
            SELECT id, transaction_id, user_id, amount, reason, payload, created_at, resolved_at
            FROM unfulfilled_charges
            WHERE resolved_at IS NULL
            ORDER BY created_at ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Marks a charge as handled (refunded or fulfilled manually).
    pub async fn mark_resolved(&self, id: &str, at: DateTime<Utc>) -> DbResult<()> {
        debug!(id = %id, "Resolving unfulfilled charge");

        let result = sqlx::query(
            "UPDATE unfulfilled_charges SET resolved_at = ?2 WHERE id = ?1 AND resolved_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Unfulfilled charge", id));
        }

        Ok(())
    }

    /// Counts unresolved charges.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM unfulfilled_charges WHERE resolved_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
