use std::fmt::Display;

use gateway_api::apis::standard::{gatewayclasses::GatewayClass, gateways::Gateway, httproutes::HTTPRoute};
use kube::{Resource, ResourceExt};

const DEFAULT_NAMESPACE_NAME: &str = "default";

#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct ResourceKey {
    pub namespace: Option<String>,
    pub name: String,
    pub kind: String,
}

impl ResourceKey {
    pub fn cluster_scoped(name: &str, kind: &str) -> Self {
        Self {
            namespace: None,
            name: name.to_owned(),
            kind: kind.to_owned(),
        }
    }

    pub fn namespaced(name: &str, namespace: &str, kind: &str) -> Self {
        Self {
            namespace: Some(namespace.to_owned()),
            name: name.to_owned(),
            kind: kind.to_owned(),
        }
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}.{}", self.kind, namespace, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

impl From<&GatewayClass> for ResourceKey {
    fn from(value: &GatewayClass) -> Self {
        Self::cluster_scoped(&value.name_any(), "GatewayClass")
    }
}

impl From<&Gateway> for ResourceKey {
    fn from(value: &Gateway) -> Self {
        let namespace = value.meta().namespace.clone().unwrap_or(DEFAULT_NAMESPACE_NAME.to_owned());
        Self::namespaced(&value.name_any(), &namespace, "Gateway")
    }
}

impl From<&HTTPRoute> for ResourceKey {
    fn from(value: &HTTPRoute) -> Self {
        let namespace = value.meta().namespace.clone().unwrap_or(DEFAULT_NAMESPACE_NAME.to_owned());
        Self::namespaced(&value.name_any(), &namespace, "HTTPRoute")
    }
}
