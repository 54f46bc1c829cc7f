//! Delivery acknowledgement route.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use herald_common::error::AppError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/update-status", post(update_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub token: Option<String>,
    /// Accepted as a string so a malformed id is a 400, not a
    /// deserialization rejection.
    pub campaign_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub message: String,
    pub id: Uuid,
}

/// POST /api/update-status — Mark a campaign push as delivered on a
/// device.
async fn update_status(
    State(state): State<AppState>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, AppError> {
    let token = request
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("token is required".to_string()))?;
    let campaign_id = request
        .campaign_id
        .ok_or_else(|| AppError::Validation("campaignId is required".to_string()))?;
    let campaign_id = Uuid::parse_str(&campaign_id)
        .map_err(|_| AppError::Validation("campaignId must be a valid id".to_string()))?;

    let id = state.ack.acknowledge(&token, campaign_id).await?;

    Ok(Json(UpdateStatusResponse {
        success: true,
        message: "Delivery status updated".to_string(),
        id,
    }))
}
