pub mod deliveries;
pub mod dispatch;
pub mod health;
pub mod registrations;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(registrations::router())
        .merge(deliveries::router())
        .merge(dispatch::router())
        .with_state(state)
}
