use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a push campaign.
///
/// `Sending` is a transient claim state: a dispatch pass moves a campaign
/// `pending -> sending` with a conditional update before fanning out, so a
/// concurrent pass cannot select the same campaign twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Pending,
    Sending,
    Completed,
    Failed,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Pending => write!(f, "pending"),
            CampaignStatus::Sending => write!(f, "sending"),
            CampaignStatus::Completed => write!(f, "completed"),
            CampaignStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Per-device delivery outcome recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Failed,
    Delivered,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Success => write!(f, "success"),
            DeliveryStatus::Failed => write!(f, "failed"),
            DeliveryStatus::Delivered => write!(f, "delivered"),
        }
    }
}

/// A registered device push token.
///
/// The token string is the business key: re-registering an existing token
/// refreshes `updated_at`/`expires_at` in place rather than inserting a
/// second row. Expiry is advisory, nothing evicts stale rows.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceRegistration {
    pub id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A scheduled broadcast push campaign with aggregate delivery counters.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Campaign {
    pub id: Uuid,
    pub title: String,
    pub body_text: String,
    pub image_url: Option<String>,
    pub status: CampaignStatus,
    pub send_at: DateTime<Utc>,
    pub sent_count: i64,
    pub success_count: i64,
    pub failed_count: i64,
    /// Mapping of gateway error code to occurrence count, merged additively
    /// across passes.
    pub failed_reasons: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A durable per-device delivery-attempt record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryRecord {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub device_token: String,
    pub status: DeliveryStatus,
    pub error_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// A delivery record ready to be appended to the ledger.
#[derive(Debug, Clone)]
pub struct NewDeliveryRecord {
    pub campaign_id: Uuid,
    pub device_token: String,
    pub status: DeliveryStatus,
    pub error_code: Option<String>,
}

/// Content of one campaign push, shared by every recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub image: Option<String>,
}

/// Per-token result reported by the push gateway, positionally aligned
/// with the submitted token list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    pub success: bool,
    pub error_code: Option<String>,
}

/// Sentinel reason for gateway failures that carry no error code.
pub const UNKNOWN_ERROR_CODE: &str = "Unknown";

/// Counter deltas accumulated during one campaign fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignTally {
    pub sent: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub failures_by_reason: HashMap<String, u64>,
}

/// Outcome of one campaign within a dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignOutcome {
    Success,
    Failed,
    SkippedNoDevices,
}

/// Per-campaign entry in a dispatch pass report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignResult {
    pub campaign_id: Uuid,
    pub outcome: CampaignOutcome,
    pub sent: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub failures_by_reason: HashMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated result of one dispatch pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub campaigns_processed: usize,
    pub results: Vec<CampaignResult>,
}

impl DispatchReport {
    pub fn empty() -> Self {
        Self {
            campaigns_processed: 0,
            results: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_matches_stored_text() {
        assert_eq!(CampaignStatus::Pending.to_string(), "pending");
        assert_eq!(CampaignStatus::Sending.to_string(), "sending");
        assert_eq!(CampaignStatus::Completed.to_string(), "completed");
        assert_eq!(DeliveryStatus::Delivered.to_string(), "delivered");
    }

    #[test]
    fn test_campaign_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&CampaignOutcome::SkippedNoDevices).unwrap();
        assert_eq!(json, "\"skipped_no_devices\"");
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = DispatchReport {
            campaigns_processed: 1,
            results: vec![CampaignResult {
                campaign_id: Uuid::new_v4(),
                outcome: CampaignOutcome::Success,
                sent: 2,
                succeeded: 1,
                failed: 1,
                failures_by_reason: HashMap::from([("Unregistered".to_string(), 1)]),
                error: None,
            }],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["campaignsProcessed"], 1);
        assert_eq!(value["results"][0]["failuresByReason"]["Unregistered"], 1);
        assert!(value["results"][0].get("error").is_none());
    }
}
