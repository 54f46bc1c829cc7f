//! PostgreSQL-backed delivery ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{DeliveryRecord, DeliveryStatus, NewDeliveryRecord};

use crate::traits::DeliveryLedger;

/// SQLSTATE for `insufficient_privilege`.
const PERMISSION_DENIED: &str = "42501";

#[derive(Clone)]
pub struct PgDeliveryLedger {
    pool: PgPool,
}

impl PgDeliveryLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Surface an authorization denial from the store as a distinct error
/// kind; everything else stays a generic database failure.
fn map_db_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(PERMISSION_DENIED) {
            return AppError::Permission(db.message().to_string());
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl DeliveryLedger for PgDeliveryLedger {
    async fn batch_insert(&self, records: Vec<NewDeliveryRecord>) -> Result<(), AppError> {
        if records.is_empty() {
            return Ok(());
        }

        // One transaction so the batch is all-or-nothing.
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        for record in &records {
            sqlx::query(
                r#"
                INSERT INTO delivery_records (id, campaign_id, device_token, status, error_code, created_at)
                VALUES ($1, $2, $3, $4, $5, NOW())
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(record.campaign_id)
            .bind(&record.device_token)
            .bind(record.status.to_string())
            .bind(&record.error_code)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn find_by_token_and_campaign(
        &self,
        token: &str,
        campaign_id: Uuid,
    ) -> Result<Option<DeliveryRecord>, AppError> {
        // First match only. Earlier double-send bugs can leave duplicates;
        // the oldest record is the authoritative one.
        let record: Option<DeliveryRecord> = sqlx::query_as(
            r#"
            SELECT * FROM delivery_records
            WHERE device_token = $1 AND campaign_id = $2
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(token)
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(record)
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE delivery_records SET status = $1, delivered_at = $2 WHERE id = $3")
            .bind(DeliveryStatus::Delivered.to_string())
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }
}
