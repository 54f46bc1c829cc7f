//! Collaborator store traits.
//!
//! The dispatch engine and request handlers only see these seams; the
//! PostgreSQL implementations and the test fakes both plug in behind
//! `Arc<dyn …>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{
    Campaign, CampaignTally, DeliveryRecord, DeviceRegistration, NewDeliveryRecord,
};

/// Keyed mapping from device push token to registration record.
///
/// The token string is the dedup key: callers look up by equality and
/// either insert a fresh row or refresh the existing one in place.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Look up a registration by exact token match.
    async fn find_by_token(&self, token: &str) -> Result<Option<DeviceRegistration>, AppError>;

    /// Insert a new registration and return its generated id.
    async fn insert(
        &self,
        token: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Uuid, AppError>;

    /// Refresh an existing registration's `updated_at` and `expires_at`.
    async fn refresh(
        &self,
        id: Uuid,
        updated_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// All registered tokens. Expiry is advisory, expired tokens are
    /// still returned.
    async fn list_tokens(&self) -> Result<Vec<String>, AppError>;
}

/// Campaign definitions with mutable status and monotonic counters.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Campaigns with `status = pending` and `send_at <= now`.
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Campaign>, AppError>;

    /// Conditionally transition `pending -> sending`. Returns false when
    /// the campaign was already claimed by a concurrent pass.
    async fn claim(&self, id: Uuid) -> Result<bool, AppError>;

    /// Transition `sending -> pending` so the next pass retries the
    /// campaign.
    async fn release(&self, id: Uuid) -> Result<(), AppError>;

    /// Increment the campaign's counters by the tally, merge its failure
    /// reasons additively, and set `status = completed`.
    async fn finalize(&self, id: Uuid, tally: &CampaignTally) -> Result<(), AppError>;
}

/// Append-only collection of per-device delivery-attempt records.
#[async_trait]
pub trait DeliveryLedger: Send + Sync {
    /// Append all records as a single atomic batch (all-or-nothing).
    async fn batch_insert(&self, records: Vec<NewDeliveryRecord>) -> Result<(), AppError>;

    /// First record matching both token and campaign, if any.
    async fn find_by_token_and_campaign(
        &self,
        token: &str,
        campaign_id: Uuid,
    ) -> Result<Option<DeliveryRecord>, AppError>;

    /// Set a record's status to `delivered` and stamp `delivered_at`.
    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
}
