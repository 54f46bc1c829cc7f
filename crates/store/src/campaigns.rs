//! PostgreSQL-backed campaign store.
//!
//! The `claim`/`release`/`finalize` trio implements the single-flight
//! guard around campaign fan-out: `claim` is a conditional update that
//! only one concurrent dispatch pass can win, so a campaign gets at most
//! one authoritative fan-out even with overlapping scheduler triggers.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{Campaign, CampaignStatus, CampaignTally};

use crate::traits::CampaignStore;

#[derive(Clone)]
pub struct PgCampaignStore {
    pool: PgPool,
}

impl PgCampaignStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Merge a pass's failure counts additively into the stored reasons map.
///
/// The stored value is free-form JSONB; non-numeric entries are kept as-is
/// unless the pass also counted that code.
pub fn merge_failure_reasons(
    stored: &serde_json::Value,
    pass: &HashMap<String, u64>,
) -> serde_json::Value {
    let mut merged: serde_json::Map<String, serde_json::Value> = stored
        .as_object()
        .cloned()
        .unwrap_or_default();

    for (code, count) in pass {
        let prior = merged.get(code).and_then(|v| v.as_u64()).unwrap_or(0);
        merged.insert(code.clone(), serde_json::json!(prior + count));
    }

    serde_json::Value::Object(merged)
}

#[async_trait]
impl CampaignStore for PgCampaignStore {
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Campaign>, AppError> {
        let campaigns: Vec<Campaign> = sqlx::query_as(
            r#"
            SELECT * FROM campaigns
            WHERE status = $1 AND send_at <= $2
            ORDER BY send_at
            "#,
        )
        .bind(CampaignStatus::Pending.to_string())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(campaigns)
    }

    async fn claim(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE campaigns SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(CampaignStatus::Sending.to_string())
        .bind(id)
        .bind(CampaignStatus::Pending.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE campaigns SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(CampaignStatus::Pending.to_string())
        .bind(id)
        .bind(CampaignStatus::Sending.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn finalize(&self, id: Uuid, tally: &CampaignTally) -> Result<(), AppError> {
        // The claim makes this pass the sole writer for the campaign, so a
        // read-merge-write on the reasons map is race-free.
        let (stored,): (serde_json::Value,) =
            sqlx::query_as("SELECT failed_reasons FROM campaigns WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        let merged = merge_failure_reasons(&stored, &tally.failures_by_reason);

        sqlx::query(
            r#"
            UPDATE campaigns
            SET sent_count = sent_count + $1,
                success_count = success_count + $2,
                failed_count = failed_count + $3,
                failed_reasons = $4,
                status = $5,
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(tally.sent as i64)
        .bind(tally.succeeded as i64)
        .bind(tally.failed as i64)
        .bind(&merged)
        .bind(CampaignStatus::Completed.to_string())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_into_empty_map() {
        let merged = merge_failure_reasons(
            &serde_json::json!({}),
            &HashMap::from([("Unregistered".to_string(), 2u64)]),
        );
        assert_eq!(merged, serde_json::json!({"Unregistered": 2}));
    }

    #[test]
    fn test_merge_adds_to_prior_counts() {
        let merged = merge_failure_reasons(
            &serde_json::json!({"Unregistered": 3, "QuotaExceeded": 1}),
            &HashMap::from([("Unregistered".to_string(), 2u64)]),
        );
        assert_eq!(merged["Unregistered"], 5);
        assert_eq!(merged["QuotaExceeded"], 1);
    }

    #[test]
    fn test_merge_tolerates_null_stored_value() {
        let merged = merge_failure_reasons(
            &serde_json::Value::Null,
            &HashMap::from([("Unknown".to_string(), 1u64)]),
        );
        assert_eq!(merged, serde_json::json!({"Unknown": 1}));
    }
}
