//! Shared application state for the Axum API server.

use std::sync::Arc;

use herald_engine::ack::AckService;
use herald_engine::dispatch::DispatchEngine;
use herald_engine::registration::RegistrationService;

/// Application state shared across all route handlers via Axum `State`.
///
/// Services are constructed once at startup with their collaborator
/// handles injected, so tests can wire the same handlers over fakes.
#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<RegistrationService>,
    pub ack: Arc<AckService>,
    pub dispatch: Arc<DispatchEngine>,
}

impl AppState {
    pub fn new(
        registration: Arc<RegistrationService>,
        ack: Arc<AckService>,
        dispatch: Arc<DispatchEngine>,
    ) -> Self {
        Self {
            registration,
            ack,
            dispatch,
        }
    }
}
