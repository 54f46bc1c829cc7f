//! Campaign fan-out and delivery accounting.
//!
//! One dispatch pass:
//! 1. Select campaigns with `status = pending` and `send_at <= now`
//! 2. For each, independently: claim it, load all device tokens, send one
//!    multicast through the gateway, append one ledger record per token,
//!    then fold the tally into the campaign's counters and mark it completed
//!
//! A failure in one campaign never aborts the others; it is captured in
//! that campaign's result entry and the campaign is released back to
//! `pending` for the next externally-triggered pass.

use std::sync::Arc;

use chrono::Utc;

use herald_common::error::AppError;
use herald_common::types::{
    Campaign, CampaignOutcome, CampaignResult, CampaignTally, DeliveryStatus, DispatchReport,
    NewDeliveryRecord, PushMessage, UNKNOWN_ERROR_CODE,
};
use herald_gateway::PushGateway;
use herald_store::{CampaignStore, DeliveryLedger, TokenStore};

/// Orchestrates campaign fan-out over injected collaborator handles.
pub struct DispatchEngine {
    tokens: Arc<dyn TokenStore>,
    campaigns: Arc<dyn CampaignStore>,
    ledger: Arc<dyn DeliveryLedger>,
    gateway: Arc<dyn PushGateway>,
}

impl DispatchEngine {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        campaigns: Arc<dyn CampaignStore>,
        ledger: Arc<dyn DeliveryLedger>,
        gateway: Arc<dyn PushGateway>,
    ) -> Self {
        Self {
            tokens,
            campaigns,
            ledger,
            gateway,
        }
    }

    /// Run one dispatch pass over all currently due campaigns.
    ///
    /// Returns an empty report when nothing is due. Only a failure of the
    /// due-campaign query itself propagates as an error; everything past
    /// that point is captured per campaign.
    pub async fn run_pass(&self) -> Result<DispatchReport, AppError> {
        let due = self.campaigns.find_due(Utc::now()).await?;

        if due.is_empty() {
            return Ok(DispatchReport::empty());
        }

        tracing::info!(due = due.len(), "Dispatch pass started");

        let mut results = Vec::with_capacity(due.len());

        for campaign in due {
            // Conditional pending -> sending transition. Losing the claim
            // means a concurrent pass owns this campaign.
            match self.campaigns.claim(campaign.id).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(
                        campaign_id = %campaign.id,
                        "Campaign claimed by a concurrent pass, skipping"
                    );
                    continue;
                }
                Err(e) => {
                    results.push(Self::failed_result(&campaign, &e));
                    continue;
                }
            }

            match self.fan_out(&campaign).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::warn!(
                        campaign_id = %campaign.id,
                        error = %e,
                        "Campaign fan-out failed, releasing for retry"
                    );
                    if let Err(release_err) = self.campaigns.release(campaign.id).await {
                        tracing::warn!(
                            campaign_id = %campaign.id,
                            error = %release_err,
                            "Failed to release claimed campaign"
                        );
                    }
                    results.push(Self::failed_result(&campaign, &e));
                }
            }
        }

        Ok(DispatchReport {
            campaigns_processed: results.len(),
            results,
        })
    }

    /// Fan one claimed campaign out to every registered device.
    async fn fan_out(&self, campaign: &Campaign) -> Result<CampaignResult, AppError> {
        let tokens = self.tokens.list_tokens().await?;

        if tokens.is_empty() {
            // A campaign with no audience stays pending and is retried on
            // the next pass, unlike a gateway failure it mutates nothing.
            self.campaigns.release(campaign.id).await?;
            tracing::info!(
                campaign_id = %campaign.id,
                "No registered devices, leaving campaign pending"
            );
            return Ok(CampaignResult {
                campaign_id: campaign.id,
                outcome: CampaignOutcome::SkippedNoDevices,
                sent: 0,
                succeeded: 0,
                failed: 0,
                failures_by_reason: Default::default(),
                error: None,
            });
        }

        let message = PushMessage {
            title: campaign.title.clone(),
            body: campaign.body_text.clone(),
            image: campaign.image_url.clone(),
        };

        let outcomes = self.gateway.send_multicast(&message, &tokens).await?;
        if outcomes.len() != tokens.len() {
            return Err(AppError::Gateway(format!(
                "Gateway returned {} outcomes for {} tokens",
                outcomes.len(),
                tokens.len()
            )));
        }

        let mut tally = CampaignTally {
            sent: tokens.len() as u64,
            ..Default::default()
        };
        let mut records = Vec::with_capacity(tokens.len());

        for (token, outcome) in tokens.iter().zip(&outcomes) {
            if outcome.success {
                tally.succeeded += 1;
                records.push(NewDeliveryRecord {
                    campaign_id: campaign.id,
                    device_token: token.clone(),
                    status: DeliveryStatus::Success,
                    error_code: None,
                });
            } else {
                tally.failed += 1;
                let code = outcome
                    .error_code
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_ERROR_CODE.to_string());
                *tally.failures_by_reason.entry(code.clone()).or_insert(0) += 1;
                records.push(NewDeliveryRecord {
                    campaign_id: campaign.id,
                    device_token: token.clone(),
                    status: DeliveryStatus::Failed,
                    error_code: Some(code),
                });
            }
        }

        // The pushes already went out; re-sending them to fix bookkeeping
        // would be user-visible. A ledger failure is logged and the
        // campaign still completes.
        if let Err(e) = self.ledger.batch_insert(records).await {
            tracing::warn!(
                campaign_id = %campaign.id,
                error = %e,
                "Ledger batch insert failed, completing campaign without records"
            );
        }

        self.campaigns.finalize(campaign.id, &tally).await?;

        tracing::info!(
            campaign_id = %campaign.id,
            sent = tally.sent,
            succeeded = tally.succeeded,
            failed = tally.failed,
            "Campaign completed"
        );

        Ok(CampaignResult {
            campaign_id: campaign.id,
            outcome: CampaignOutcome::Success,
            sent: tally.sent,
            succeeded: tally.succeeded,
            failed: tally.failed,
            failures_by_reason: tally.failures_by_reason,
            error: None,
        })
    }

    fn failed_result(campaign: &Campaign, error: &AppError) -> CampaignResult {
        CampaignResult {
            campaign_id: campaign.id,
            outcome: CampaignOutcome::Failed,
            sent: 0,
            succeeded: 0,
            failed: 0,
            failures_by_reason: Default::default(),
            error: Some(error.to_string()),
        }
    }
}
