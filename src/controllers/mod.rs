mod debouncer;
mod gateway_controller;
mod reconciler;
mod watchers;

use std::time::Duration;

pub use debouncer::Debouncer;
pub use gateway_controller::GatewayController;
pub use reconciler::{PassSummary, Reconciler};

pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

#[derive(thiserror::Error, Debug, PartialEq, PartialOrd)]
pub enum ControllerError {
    ListFailed(String),
    PatchFailed(String),
    InvalidPayload(String),
    InvalidBackendAddress(String),
    UnsupportedMatch(String),
}

impl std::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
