use std::sync::Arc;

use gateway_api::apis::standard::{gatewayclasses::GatewayClass, httproutes::HTTPRoute};
use kube::ResourceExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, span, warn, Instrument, Level};

use super::ControllerError;
use crate::{
    routing::{RouteBuilder, Router, RoutingTable},
    services::{accepted_condition, GatewayApiClient, GatewayClassStatusReconciler, StatusUpdate},
};

/// What a single reconciliation pass saw and produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub generation: u64,
    pub gateway_classes: usize,
    pub gateways: usize,
    pub http_routes: usize,
    pub routes: usize,
    pub status_updates: usize,
}

/// Rebuilds the routing table from the cluster and marks owned gateway classes as accepted.
///
/// Passes never overlap: the reconciler is owned by the single task that drives it.
pub struct Reconciler {
    controller_name: String,
    client: Arc<dyn GatewayApiClient>,
    status_reconciler: GatewayClassStatusReconciler,
    router: Router,
    generation: u64,
}

impl Reconciler {
    pub fn new(controller_name: String, client: Arc<dyn GatewayApiClient>, router: Router) -> Self {
        let status_reconciler = GatewayClassStatusReconciler::builder().client(Arc::clone(&client)).controller_name(controller_name.clone()).build();
        Self { controller_name, client, status_reconciler, router, generation: 0 }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Runs one full pass and installs the resulting table.
    pub async fn reconcile(&mut self) -> PassSummary {
        self.generation += 1;
        let span = span!(Level::INFO, "Reconciler", generation = self.generation);
        let summary = self.reconcile_pass(self.generation).instrument(span).await;
        info!(
            "{} pass {} done: gateway classes {} gateways {} http routes {} routes {} status updates {}",
            self.controller_name,
            summary.generation,
            summary.gateway_classes,
            summary.gateways,
            summary.http_routes,
            summary.routes,
            summary.status_updates
        );
        summary
    }

    /// Consumes reconciliation triggers until cancelled. A pass in flight is always completed.
    pub async fn run(mut self, mut triggers: mpsc::Receiver<()>, cancellation: CancellationToken) {
        info!("{} reconciler...started", self.controller_name);
        loop {
            tokio::select! {
                biased;
                () = cancellation.cancelled() => break,
                trigger = triggers.recv() => match trigger {
                    Some(()) => {
                        self.reconcile().await;
                    },
                    None => break,
                },
            }
        }
        info!("{} reconciler...stopped", self.controller_name);
    }

    async fn reconcile_pass(&self, generation: u64) -> PassSummary {
        let mut summary = PassSummary { generation, ..Default::default() };
        let mut table = RoutingTable::new(generation);
        let route_builder = RouteBuilder::new(&self.controller_name);

        let gateway_classes = Self::or_empty("GatewayClass", self.client.list_gateway_classes().await);
        let owned_classes = gateway_classes.iter().filter(|gateway_class| gateway_class.spec.controller_name == self.controller_name);

        for gateway_class in owned_classes {
            summary.gateway_classes += 1;
            let class_name = gateway_class.name_any();

            let gateways = Self::or_empty("Gateway", self.client.list_gateways().await);
            for gateway in gateways.iter().filter(|gateway| gateway.spec.gateway_class_name == class_name) {
                summary.gateways += 1;
                let gateway_name = gateway.name_any();

                let http_routes = Self::or_empty("HTTPRoute", self.client.list_http_routes().await);
                for http_route in http_routes.iter().filter(|http_route| Self::is_attached(http_route, &gateway_name)) {
                    summary.http_routes += 1;
                    summary.routes += route_builder.append(&mut table, http_route);
                }
            }

            if let Ok(StatusUpdate::Updated) = self.accept(gateway_class).await {
                summary.status_updates += 1;
            }
        }

        self.router.install(table);
        summary
    }

    async fn accept(&self, gateway_class: &GatewayClass) -> Result<StatusUpdate, ControllerError> {
        let condition = accepted_condition(&self.controller_name, gateway_class);
        let result = self.status_reconciler.reconcile(gateway_class, condition).await;
        if let Err(e) = &result {
            warn!("{} unable to accept gateway class {} {e}", self.controller_name, gateway_class.name_any());
        }
        result
    }

    fn is_attached(http_route: &HTTPRoute, gateway_name: &str) -> bool {
        http_route.spec.parent_refs.iter().flatten().any(|parent| parent.name == gateway_name)
    }

    fn or_empty<R>(kind: &str, listed: Result<Vec<R>, ControllerError>) -> Vec<R> {
        listed.unwrap_or_else(|e| {
            warn!("unable to list {kind}, continuing with none {e}");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use gateway_api::apis::standard::httproutes::HTTPRoute;
    use tokio::{
        sync::Notify,
        time::{sleep, timeout},
    };
    use tokio_util::sync::CancellationToken;

    use super::{PassSummary, Reconciler};
    use crate::{
        common::test::{condition_types, gateway, gateway_class, http_route},
        controllers::Debouncer,
        routing::Router,
        services::{test::FakeGatewayApiClient, GatewayApiClient},
    };

    const CONTROLLER_NAME: &str = "faros.io/gateway-controller";
    const FOREIGN_CONTROLLER_NAME: &str = "example.com/other-controller";

    fn route(name: &str, parent: &str, host: &str, backend: &str) -> HTTPRoute {
        http_route(&format!(
            r"
apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata:
  name: {name}
  namespace: default
spec:
  parentRefs:
  - name: {parent}
  hostnames:
  - {host}
  rules:
  - matches:
    - path:
        type: PathPrefix
        value: /
    backendRefs:
    - name: {backend}
      port: 8080
"
        ))
    }

    fn reconciler(client: &Arc<FakeGatewayApiClient>) -> Reconciler {
        Reconciler::new(CONTROLLER_NAME.to_owned(), client.clone() as Arc<dyn GatewayApiClient>, Router::new())
    }

    fn host(router: &Router, host: &str, path: &str) -> Option<String> {
        router.route(host, path).and_then(|uri| uri.host().map(str::to_owned))
    }

    fn cluster() -> FakeGatewayApiClient {
        FakeGatewayApiClient::default()
            .with_gateway_classes(vec![gateway_class("faros", CONTROLLER_NAME, None), gateway_class("other", FOREIGN_CONTROLLER_NAME, None)])
            .with_gateways(vec![gateway("edge", "faros"), gateway("foreign", "other")])
            .with_http_routes(vec![
                route("web", "edge", "example.com", "web"),
                route("api", "edge", "api.example.com", "api"),
                route("stray", "foreign", "stray.example.com", "stray"),
                route("orphan", "missing", "orphan.example.com", "orphan"),
            ])
    }

    #[tokio::test]
    async fn test_pass_routes_only_owned_resources() {
        let client = Arc::new(cluster());
        let mut reconciler = reconciler(&client);

        let summary = reconciler.reconcile().await;
        assert_eq!(
            summary,
            PassSummary { generation: 1, gateway_classes: 1, gateways: 1, http_routes: 2, routes: 2, status_updates: 1 }
        );

        let router = reconciler.router().clone();
        assert_eq!(host(&router, "example.com", "/index.html"), Some("web".to_owned()));
        assert_eq!(host(&router, "api.example.com:8443", "/v1"), Some("api".to_owned()));
        assert_eq!(host(&router, "stray.example.com", "/"), None);
        assert_eq!(host(&router, "orphan.example.com", "/"), None);
        assert_eq!(router.snapshot().generation(), 1);
    }

    #[tokio::test]
    async fn test_pass_accepts_only_owned_classes_once() {
        let client = Arc::new(cluster());
        let mut reconciler = reconciler(&client);

        reconciler.reconcile().await;
        let second = reconciler.reconcile().await;
        assert_eq!(second.status_updates, 0);

        let writes = client.status_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].spec.controller_name, CONTROLLER_NAME);
        let conditions = writes[0].status.clone().and_then(|s| s.conditions).unwrap();
        assert_eq!(condition_types(&conditions), vec![("Accepted".to_owned(), "True".to_owned())]);
    }

    #[tokio::test]
    async fn test_routes_follow_listing_order() {
        let client = Arc::new(
            FakeGatewayApiClient::default()
                .with_gateway_classes(vec![gateway_class("faros", CONTROLLER_NAME, None)])
                .with_gateways(vec![gateway("edge", "faros")])
                .with_http_routes(vec![route("first", "edge", "example.com", "first"), route("second", "edge", "example.com", "second")]),
        );
        let mut reconciler = reconciler(&client);
        reconciler.reconcile().await;

        let router = reconciler.router().clone();
        for _ in 0..3 {
            assert_eq!(host(&router, "example.com", "/"), Some("first".to_owned()));
        }
    }

    #[tokio::test]
    async fn test_list_failure_degrades_to_empty() {
        let client = Arc::new(cluster().failing_http_route_lists());
        let mut reconciler = reconciler(&client);

        let summary = reconciler.reconcile().await;
        assert_eq!(summary.gateways, 1);
        assert_eq!(summary.routes, 0);
        assert_eq!(summary.status_updates, 1);
        assert!(reconciler.router().snapshot().is_empty());
        assert_eq!(reconciler.router().snapshot().generation(), 1);
    }

    #[tokio::test]
    async fn test_gateway_list_failure_still_accepts_class() {
        let client = Arc::new(cluster().failing_gateway_lists());
        let mut reconciler = reconciler(&client);

        let summary = reconciler.reconcile().await;
        assert_eq!(summary.gateways, 0);
        assert_eq!(summary.status_updates, 1);
        assert_eq!(client.status_writes().len(), 1);
    }

    #[tokio::test]
    async fn test_status_failure_does_not_abort_pass() {
        let client = Arc::new(cluster().failing_status_writes());
        let mut reconciler = reconciler(&client);

        let summary = reconciler.reconcile().await;
        assert_eq!(summary.status_updates, 0);
        assert_eq!(summary.routes, 2);
        assert_eq!(host(reconciler.router(), "example.com", "/"), Some("web".to_owned()));
    }

    #[tokio::test]
    async fn test_next_pass_replaces_table() {
        let client = Arc::new(cluster());
        let mut reconciler = reconciler(&client);
        reconciler.reconcile().await;

        client.set_http_routes(vec![route("docs", "edge", "docs.example.com", "docs")]);
        let summary = reconciler.reconcile().await;
        assert_eq!(summary.generation, 2);

        let router = reconciler.router().clone();
        assert_eq!(host(&router, "example.com", "/"), None);
        assert_eq!(host(&router, "docs.example.com", "/guide"), Some("docs".to_owned()));
    }

    #[tokio::test]
    async fn test_gateway_class_list_failure_installs_empty_table() {
        let client = Arc::new(cluster().failing_gateway_class_lists());
        let mut reconciler = reconciler(&client);

        let summary = reconciler.reconcile().await;
        assert_eq!(summary, PassSummary { generation: 1, ..Default::default() });
        assert!(reconciler.router().snapshot().is_empty());
        assert_eq!(reconciler.router().snapshot().generation(), 1);
        assert!(client.status_writes().is_empty());
    }

    #[tokio::test]
    async fn test_lists_once_per_class_and_per_gateway() {
        let client = Arc::new(
            FakeGatewayApiClient::default()
                .with_gateway_classes(vec![
                    gateway_class("faros", CONTROLLER_NAME, None),
                    gateway_class("faros-internal", CONTROLLER_NAME, None),
                    gateway_class("other", FOREIGN_CONTROLLER_NAME, None),
                ])
                .with_gateways(vec![gateway("edge", "faros"), gateway("edge-2", "faros"), gateway("internal", "faros-internal"), gateway("foreign", "other")]),
        );
        let mut reconciler = reconciler(&client);

        let summary = reconciler.reconcile().await;
        assert_eq!(summary.gateway_classes, 2);
        assert_eq!(summary.gateways, 3);
        // one class list, one gateway list per owned class, one route list per retained gateway
        assert_eq!(client.list_calls(), 1 + 2 + 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_lets_pass_in_flight_finish() {
        let gate = Arc::new(Notify::new());
        let client = Arc::new(cluster().with_http_route_gate(Arc::clone(&gate)));
        let reconciler = reconciler(&client);
        let router = reconciler.router().clone();
        let (debouncer, triggers) = Debouncer::new(Duration::from_millis(100));
        let cancellation = CancellationToken::new();
        let task = tokio::spawn(reconciler.run(triggers, cancellation.clone()));

        debouncer.notify();
        while client.list_calls() < 3 {
            sleep(Duration::from_millis(10)).await;
        }
        cancellation.cancel();
        sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());
        assert_eq!(router.snapshot().generation(), 0);

        gate.notify_one();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert_eq!(router.snapshot().generation(), 1);
        assert_eq!(host(&router, "example.com", "/"), Some("web".to_owned()));
        assert_eq!(host(&router, "api.example.com", "/"), Some("api".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_coalesces_bursts_and_stops_on_cancel() {
        let client = Arc::new(cluster());
        let reconciler = reconciler(&client);
        let router = reconciler.router().clone();
        let (debouncer, triggers) = Debouncer::new(Duration::from_millis(100));
        let cancellation = CancellationToken::new();
        let task = tokio::spawn(reconciler.run(triggers, cancellation.clone()));

        for _ in 0..10 {
            debouncer.notify();
            sleep(Duration::from_millis(10)).await;
        }
        sleep(Duration::from_millis(500)).await;

        assert_eq!(router.snapshot().generation(), 1);
        assert_eq!(host(&router, "example.com", "/"), Some("web".to_owned()));

        cancellation.cancel();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
