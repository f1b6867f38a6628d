use std::{sync::Arc, time::Duration};

use futures::{future::BoxFuture, FutureExt};
use gateway_api::apis::standard::{gatewayclasses::GatewayClass, gateways::Gateway, httproutes::HTTPRoute};
use k8s_openapi::api::core::v1::Service;
use kube::{core::NamespaceResourceScope, Api, Client, Resource};
use tokio_util::sync::CancellationToken;
use tracing::info;
use typed_builder::TypedBuilder;

use super::{
    watchers::{watch, watcher_config},
    Debouncer, Reconciler, DEFAULT_DEBOUNCE_WINDOW,
};
use crate::{
    configuration::WatchConfiguration,
    routing::Router,
    services::{GatewayApiClient, KubeGatewayApiClient},
};

/// Watches the cluster and keeps the routing table behind [`GatewayController::router`] current.
#[derive(TypedBuilder)]
pub struct GatewayController {
    controller_name: String,
    client: Client,
    #[builder(default = DEFAULT_DEBOUNCE_WINDOW)]
    debounce_window: Duration,
    #[builder(default)]
    watch: WatchConfiguration,
    #[builder(default)]
    router: Router,
}

impl GatewayController {
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(self, cancellation: CancellationToken) -> crate::Result<()> {
        info!("{} controller...started", self.controller_name);
        let gateway_api_client: Arc<dyn GatewayApiClient> = Arc::new(
            KubeGatewayApiClient::builder()
                .client(self.client.clone())
                .namespace(self.watch.namespace.clone())
                .label_selector(self.watch.label_selector.clone())
                .build(),
        );
        let reconciler = Reconciler::new(self.controller_name.clone(), gateway_api_client, self.router.clone());
        let (debouncer, triggers) = Debouncer::new(self.debounce_window);

        let mut tasks: Vec<BoxFuture<'static, ()>> = vec![
            reconciler.run(triggers, cancellation.clone()).boxed(),
            watch(Api::<GatewayClass>::all(self.client.clone()), self.watcher_config(), debouncer.clone(), cancellation.clone()).boxed(),
            watch(self.namespaced_api::<Gateway>(), self.watcher_config(), debouncer.clone(), cancellation.clone()).boxed(),
            watch(self.namespaced_api::<HTTPRoute>(), self.watcher_config(), debouncer.clone(), cancellation.clone()).boxed(),
        ];
        if self.watch.services {
            tasks.push(watch(self.namespaced_api::<Service>(), self.watcher_config(), debouncer.clone(), cancellation.clone()).boxed());
        }

        futures::future::join_all(tasks).await;
        debouncer.cancel();
        info!("{} controller...stopped", self.controller_name);
        Ok(())
    }

    fn watcher_config(&self) -> kube::runtime::watcher::Config {
        watcher_config(self.watch.label_selector.as_deref())
    }

    fn namespaced_api<R>(&self) -> Api<R>
    where
        R: Resource<Scope = NamespaceResourceScope>,
        <R as Resource>::DynamicType: Default,
    {
        match &self.watch.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }
}
