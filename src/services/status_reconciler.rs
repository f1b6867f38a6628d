use std::sync::Arc;

use gateway_api::apis::standard::gatewayclasses::GatewayClass;
use k8s_openapi::{
    apimachinery::pkg::apis::meta::v1::{Condition, Time},
    chrono::Utc,
};
use tracing::{debug, info, span, warn, Instrument, Level};
use typed_builder::TypedBuilder;

use super::GatewayApiClient;
use crate::{common::LogContext, controllers::ControllerError};

pub const ACCEPTED_CONDITION_TYPE: &str = "Accepted";
pub const ACCEPTED_CONDITION_REASON: &str = "Accepted";
pub const CONDITION_STATUS_TRUE: &str = "True";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusUpdate {
    Unchanged,
    Updated,
}

/// Returns the merged condition list, or `None` when a condition with the same type and status
/// is already present. Unrelated conditions keep their order; the new one goes last.
pub fn merge_conditions(existing: &[Condition], new_condition: Condition) -> Option<Vec<Condition>> {
    if existing.iter().any(|c| c.type_ == new_condition.type_ && c.status == new_condition.status) {
        return None;
    }
    let mut conditions: Vec<Condition> = existing.iter().filter(|c| c.type_ != new_condition.type_).cloned().collect();
    conditions.push(new_condition);
    Some(conditions)
}

pub fn accepted_condition(controller_name: &str, gateway_class: &GatewayClass) -> Condition {
    Condition {
        last_transition_time: Time(Utc::now()),
        message: format!("Accepted by {controller_name}"),
        observed_generation: gateway_class.metadata.generation,
        reason: ACCEPTED_CONDITION_REASON.to_owned(),
        status: CONDITION_STATUS_TRUE.to_owned(),
        type_: ACCEPTED_CONDITION_TYPE.to_owned(),
    }
}

#[derive(Clone, TypedBuilder)]
pub struct GatewayClassStatusReconciler {
    client: Arc<dyn GatewayApiClient>,
    controller_name: String,
}

impl GatewayClassStatusReconciler {
    pub async fn reconcile(&self, gateway_class: &GatewayClass, new_condition: Condition) -> Result<StatusUpdate, ControllerError> {
        let log_context = LogContext::new(&self.controller_name, gateway_class);
        let existing = gateway_class.status.as_ref().and_then(|status| status.conditions.as_deref()).unwrap_or_default();

        let Some(conditions) = merge_conditions(existing, new_condition) else {
            debug!("{log_context} status already up to date");
            return Ok(StatusUpdate::Unchanged);
        };

        let mut updated = gateway_class.clone();
        let mut status = updated.status.take().unwrap_or_default();
        status.conditions = Some(conditions);
        updated.status = Some(status);
        updated.metadata.managed_fields = None;

        let span = span!(Level::INFO, "StatusReconciler", id = %log_context.resource_key);
        match self.client.replace_gateway_class_status(&updated).instrument(span.clone()).await {
            Ok(_) => {
                span.in_scope(|| info!("{log_context} status updated"));
                Ok(StatusUpdate::Updated)
            },
            Err(e) => {
                span.in_scope(|| warn!("{log_context} status update failed {e}"));
                Err(e)
            },
        }
    }
}
