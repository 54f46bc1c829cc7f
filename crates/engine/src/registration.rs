//! Device token registration.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use herald_common::error::AppError;
use herald_store::TokenStore;

/// Whether a registration call created a new row or refreshed an
/// existing one. Carries the store id either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Created { id: Uuid },
    Updated { id: Uuid },
}

impl RegistrationOutcome {
    pub fn id(&self) -> Uuid {
        match self {
            RegistrationOutcome::Created { id } | RegistrationOutcome::Updated { id } => *id,
        }
    }
}

/// Upserts device tokens keyed by token equality.
pub struct RegistrationService {
    tokens: Arc<dyn TokenStore>,
    ttl: Duration,
}

impl RegistrationService {
    pub fn new(tokens: Arc<dyn TokenStore>, ttl_hours: i64) -> Self {
        Self {
            tokens,
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Register a device token, refreshing its expiry if it already
    /// exists. Repeated identical calls within the TTL window only move
    /// `expires_at` forward.
    pub async fn register(&self, token: &str) -> Result<RegistrationOutcome, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Validation("token is required".to_string()));
        }

        let now = Utc::now();
        let expires_at = now + self.ttl;

        match self.tokens.find_by_token(token).await? {
            Some(existing) => {
                self.tokens.refresh(existing.id, now, expires_at).await?;
                tracing::debug!(registration_id = %existing.id, "Token registration refreshed");
                Ok(RegistrationOutcome::Updated { id: existing.id })
            }
            None => {
                let id = self.tokens.insert(token, now, expires_at).await?;
                tracing::info!(registration_id = %id, "Token registered");
                Ok(RegistrationOutcome::Created { id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use herald_common::types::DeviceRegistration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemoryTokenStore {
        regs: Mutex<Vec<DeviceRegistration>>,
    }

    #[async_trait]
    impl TokenStore for MemoryTokenStore {
        async fn find_by_token(
            &self,
            token: &str,
        ) -> Result<Option<DeviceRegistration>, AppError> {
            Ok(self
                .regs
                .lock()
                .await
                .iter()
                .find(|r| r.token == token)
                .cloned())
        }

        async fn insert(
            &self,
            token: &str,
            now: DateTime<Utc>,
            expires_at: DateTime<Utc>,
        ) -> Result<Uuid, AppError> {
            let id = Uuid::new_v4();
            self.regs.lock().await.push(DeviceRegistration {
                id,
                token: token.to_string(),
                created_at: now,
                updated_at: now,
                expires_at,
            });
            Ok(id)
        }

        async fn refresh(
            &self,
            id: Uuid,
            updated_at: DateTime<Utc>,
            expires_at: DateTime<Utc>,
        ) -> Result<(), AppError> {
            let mut regs = self.regs.lock().await;
            let reg = regs
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Registration {} not found", id)))?;
            reg.updated_at = updated_at;
            reg.expires_at = expires_at;
            Ok(())
        }

        async fn list_tokens(&self) -> Result<Vec<String>, AppError> {
            Ok(self
                .regs
                .lock()
                .await
                .iter()
                .map(|r| r.token.clone())
                .collect())
        }
    }

    #[tokio::test]
    async fn test_empty_token_rejected() {
        let service = RegistrationService::new(Arc::new(MemoryTokenStore::default()), 24);

        let result = service.register("   ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_repeated_registration_is_idempotent() {
        let store = Arc::new(MemoryTokenStore::default());
        let service = RegistrationService::new(store.clone(), 24);

        let first = service.register("fcm-token-1").await.unwrap();
        let RegistrationOutcome::Created { id: first_id } = first else {
            panic!("first registration should create");
        };

        let first_expiry = store.regs.lock().await[0].expires_at;

        let second = service.register("fcm-token-1").await.unwrap();
        let RegistrationOutcome::Updated { id: second_id } = second else {
            panic!("second registration should update");
        };

        // Same stored id, strictly later expiry, still a single row.
        assert_eq!(first_id, second_id);
        let regs = store.regs.lock().await;
        assert_eq!(regs.len(), 1);
        assert!(regs[0].expires_at > first_expiry);
    }

    #[tokio::test]
    async fn test_distinct_tokens_get_distinct_rows() {
        let store = Arc::new(MemoryTokenStore::default());
        let service = RegistrationService::new(store.clone(), 24);

        let a = service.register("token-a").await.unwrap();
        let b = service.register("token-b").await.unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(store.regs.lock().await.len(), 2);
    }
}
