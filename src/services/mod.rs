mod gateway_api_client;
mod status_reconciler;

pub use gateway_api_client::{GatewayApiClient, KubeGatewayApiClient};
pub use status_reconciler::{accepted_condition, merge_conditions, GatewayClassStatusReconciler, StatusUpdate};
