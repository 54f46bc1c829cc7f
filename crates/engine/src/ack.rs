//! Delivery acknowledgement.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_store::DeliveryLedger;

/// Marks ledger records as delivered when a device confirms receipt.
pub struct AckService {
    ledger: Arc<dyn DeliveryLedger>,
}

impl AckService {
    pub fn new(ledger: Arc<dyn DeliveryLedger>) -> Self {
        Self { ledger }
    }

    /// Acknowledge delivery of a campaign push on a device.
    ///
    /// Finds the first ledger record matching both token and campaign,
    /// sets its status to `delivered`, stamps `delivered_at`, and returns
    /// the record id.
    pub async fn acknowledge(&self, token: &str, campaign_id: Uuid) -> Result<Uuid, AppError> {
        let record = self
            .ledger
            .find_by_token_and_campaign(token, campaign_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No delivery record for this token and campaign {}",
                    campaign_id
                ))
            })?;

        self.ledger.mark_delivered(record.id, Utc::now()).await?;

        tracing::info!(
            record_id = %record.id,
            campaign_id = %campaign_id,
            "Delivery acknowledged"
        );

        Ok(record.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use herald_common::types::{DeliveryRecord, DeliveryStatus, NewDeliveryRecord};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemoryLedger {
        records: Mutex<Vec<DeliveryRecord>>,
    }

    impl MemoryLedger {
        async fn seed(&self, token: &str, campaign_id: Uuid, status: DeliveryStatus) -> Uuid {
            let id = Uuid::new_v4();
            self.records.lock().await.push(DeliveryRecord {
                id,
                campaign_id,
                device_token: token.to_string(),
                status,
                error_code: None,
                created_at: Utc::now(),
                delivered_at: None,
            });
            id
        }
    }

    #[async_trait]
    impl DeliveryLedger for MemoryLedger {
        async fn batch_insert(&self, _records: Vec<NewDeliveryRecord>) -> Result<(), AppError> {
            unimplemented!("not exercised by acknowledgement")
        }

        async fn find_by_token_and_campaign(
            &self,
            token: &str,
            campaign_id: Uuid,
        ) -> Result<Option<DeliveryRecord>, AppError> {
            Ok(self
                .records
                .lock()
                .await
                .iter()
                .find(|r| r.device_token == token && r.campaign_id == campaign_id)
                .cloned())
        }

        async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
            let mut records = self.records.lock().await;
            let record = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Record {} not found", id)))?;
            record.status = DeliveryStatus::Delivered;
            record.delivered_at = Some(at);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_acknowledge_transitions_to_delivered() {
        let ledger = Arc::new(MemoryLedger::default());
        let campaign_id = Uuid::new_v4();
        let record_id = ledger.seed("t1", campaign_id, DeliveryStatus::Success).await;
        let service = AckService::new(ledger.clone());

        let acked = service.acknowledge("t1", campaign_id).await.unwrap();
        assert_eq!(acked, record_id);

        let records = ledger.records.lock().await;
        assert_eq!(records[0].status, DeliveryStatus::Delivered);
        assert!(records[0].delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_acknowledge_failed_record_still_transitions() {
        // A push the gateway reported failed can still reach the device.
        let ledger = Arc::new(MemoryLedger::default());
        let campaign_id = Uuid::new_v4();
        ledger.seed("t1", campaign_id, DeliveryStatus::Failed).await;
        let service = AckService::new(ledger.clone());

        service.acknowledge("t1", campaign_id).await.unwrap();

        assert_eq!(
            ledger.records.lock().await[0].status,
            DeliveryStatus::Delivered
        );
    }

    #[tokio::test]
    async fn test_acknowledge_unknown_pair_is_not_found() {
        let ledger = Arc::new(MemoryLedger::default());
        let campaign_id = Uuid::new_v4();
        ledger.seed("t1", campaign_id, DeliveryStatus::Success).await;
        let service = AckService::new(ledger.clone());

        let result = service.acknowledge("t1", Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        // No mutation on the miss.
        assert_eq!(
            ledger.records.lock().await[0].status,
            DeliveryStatus::Success
        );
    }
}
