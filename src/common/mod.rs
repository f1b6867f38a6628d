mod resource_key;

use std::fmt::Display;

use kube::{Resource, ResourceExt};
pub use resource_key::ResourceKey;

/// Prefix carried by every log line that concerns a single cluster resource.
pub struct LogContext<'a> {
    pub controller_name: &'a str,
    pub resource_key: ResourceKey,
    pub version: Option<String>,
}

impl<'a> LogContext<'a> {
    pub fn new<R>(controller_name: &'a str, resource: &R) -> Self
    where
        R: Resource,
        for<'r> ResourceKey: From<&'r R>,
    {
        Self {
            controller_name,
            resource_key: ResourceKey::from(resource),
            version: resource.resource_version(),
        }
    }
}

impl Display for LogContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} resource_id: {} version: {:?}", self.controller_name, self.resource_key, self.version)
    }
}
