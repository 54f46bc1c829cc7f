//! PostgreSQL-backed device token store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::DeviceRegistration;

use crate::traits::TokenStore;

#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<DeviceRegistration>, AppError> {
        let reg: Option<DeviceRegistration> =
            sqlx::query_as("SELECT * FROM device_registrations WHERE token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;

        Ok(reg)
    }

    async fn insert(
        &self,
        token: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO device_registrations (id, token, created_at, updated_at, expires_at)
            VALUES ($1, $2, $3, $3, $4)
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn refresh(
        &self,
        id: Uuid,
        updated_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE device_registrations SET updated_at = $1, expires_at = $2 WHERE id = $3",
        )
        .bind(updated_at)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_tokens(&self) -> Result<Vec<String>, AppError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT token FROM device_registrations ORDER BY created_at")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(t,)| t).collect())
    }
}
