//! Device token registration route.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use herald_common::error::AppError;
use herald_engine::registration::RegistrationOutcome;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/store-fcm", post(store_fcm))
}

#[derive(Debug, Deserialize)]
pub struct StoreFcmRequest {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoreFcmResponse {
    pub id: Uuid,
    pub message: String,
}

/// POST /api/store-fcm — Upsert a device push token.
///
/// 201 when the token is new, 200 when an existing registration was
/// refreshed.
async fn store_fcm(
    State(state): State<AppState>,
    Json(request): Json<StoreFcmRequest>,
) -> Result<(StatusCode, Json<StoreFcmResponse>), AppError> {
    let token = request
        .token
        .ok_or_else(|| AppError::Validation("token is required".to_string()))?;

    match state.registration.register(&token).await? {
        RegistrationOutcome::Created { id } => Ok((
            StatusCode::CREATED,
            Json(StoreFcmResponse {
                id,
                message: "Token registered".to_string(),
            }),
        )),
        RegistrationOutcome::Updated { id } => Ok((
            StatusCode::OK,
            Json(StoreFcmResponse {
                id,
                message: "Token registration refreshed".to_string(),
            }),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_tolerates_missing_token() {
        let request: StoreFcmRequest = serde_json::from_str("{}").unwrap();
        assert!(request.token.is_none());
    }

    #[test]
    fn test_response_shape() {
        let response = StoreFcmResponse {
            id: Uuid::nil(),
            message: "Token registered".to_string(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("id").is_some());
        assert_eq!(value["message"], "Token registered");
    }
}
