//! Campaign dispatch trigger route.
//!
//! An external cron-like scheduler polls this endpoint; each hit runs one
//! dispatch pass.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use herald_common::error::AppError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/check-campaigns", get(check_campaigns))
}

/// GET /api/check-campaigns — Run one dispatch pass over due campaigns.
///
/// Per-campaign failures are embedded in `results`; only a failure of the
/// due-campaign query itself surfaces as a non-200.
async fn check_campaigns(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let report = state.dispatch.run_pass().await?;

    if report.campaigns_processed == 0 {
        return Ok(Json(json!({ "message": "No campaigns due" })));
    }

    Ok(Json(json!({
        "message": format!("Processed {} campaign(s)", report.campaigns_processed),
        "results": report.results,
    })))
}
