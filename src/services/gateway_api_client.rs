use async_trait::async_trait;
use gateway_api::apis::standard::{gatewayclasses::GatewayClass, gateways::Gateway, httproutes::HTTPRoute};
use kube::{
    api::{ListParams, PostParams},
    core::NamespaceResourceScope,
    Api, Client, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use tracing::{debug, Instrument};
use typed_builder::TypedBuilder;

use crate::controllers::ControllerError;

/// The cluster reads and writes the reconciler depends on.
#[async_trait]
pub trait GatewayApiClient: Send + Sync {
    async fn list_gateway_classes(&self) -> Result<Vec<GatewayClass>, ControllerError>;

    async fn list_gateways(&self) -> Result<Vec<Gateway>, ControllerError>;

    async fn list_http_routes(&self) -> Result<Vec<HTTPRoute>, ControllerError>;

    /// Full document update of the status subresource, never a patch.
    async fn replace_gateway_class_status(&self, gateway_class: &GatewayClass) -> Result<GatewayClass, ControllerError>;
}

#[derive(Clone, TypedBuilder)]
pub struct KubeGatewayApiClient {
    client: Client,
    #[builder(default)]
    namespace: Option<String>,
    #[builder(default)]
    label_selector: Option<String>,
}

impl KubeGatewayApiClient {
    fn namespaced_api<R>(&self) -> Api<R>
    where
        R: Resource<Scope = NamespaceResourceScope>,
        <R as Resource>::DynamicType: Default,
    {
        match &self.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    fn list_params(&self) -> ListParams {
        match &self.label_selector {
            Some(selector) => ListParams::default().labels(selector),
            None => ListParams::default(),
        }
    }

    async fn list<R>(api: Api<R>, list_params: &ListParams) -> Result<Vec<R>, ControllerError>
    where
        R: Resource + Clone + std::fmt::Debug + DeserializeOwned,
    {
        let resource = crate::format_resource::<R>();
        let list = api
            .list(list_params)
            .instrument(tracing::debug_span!("list", resource))
            .await
            .map_err(|e| ControllerError::ListFailed(format!("{resource} {e}")))?;
        debug!("listed {} {resource}", list.items.len());
        Ok(list.items)
    }
}

#[async_trait]
impl GatewayApiClient for KubeGatewayApiClient {
    async fn list_gateway_classes(&self) -> Result<Vec<GatewayClass>, ControllerError> {
        Self::list(Api::<GatewayClass>::all(self.client.clone()), &self.list_params()).await
    }

    async fn list_gateways(&self) -> Result<Vec<Gateway>, ControllerError> {
        Self::list(self.namespaced_api::<Gateway>(), &self.list_params()).await
    }

    async fn list_http_routes(&self) -> Result<Vec<HTTPRoute>, ControllerError> {
        Self::list(self.namespaced_api::<HTTPRoute>(), &self.list_params()).await
    }

    async fn replace_gateway_class_status(&self, gateway_class: &GatewayClass) -> Result<GatewayClass, ControllerError> {
        let name = gateway_class.name_any();
        let api = Api::<GatewayClass>::all(self.client.clone());
        let data = serde_json::to_vec(gateway_class).map_err(|e| ControllerError::InvalidPayload(e.to_string()))?;
        api.replace_status(&name, &PostParams::default(), data).await.map_err(|e| ControllerError::PatchFailed(format!("{name} {e}")))
    }
}
