use std::{collections::BTreeSet, fmt::Display, sync::Arc};

use serde::Serialize;

use super::backend::{Backend, BackendSelector};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MatchKind {
    Exact,
    PathPrefix,
}

impl MatchKind {
    /// Raw string comparison; a prefix is not aligned on path segments.
    pub fn matches(self, match_path: &str, path: &str) -> bool {
        match self {
            MatchKind::Exact => path == match_path,
            MatchKind::PathPrefix => path.starts_with(match_path),
        }
    }
}

impl Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchKind::Exact => f.write_str("Exact"),
            MatchKind::PathPrefix => f.write_str("PathPrefix"),
        }
    }
}

#[derive(Debug)]
pub struct Route {
    hostnames: BTreeSet<String>,
    kind: MatchKind,
    path: String,
    selector: BackendSelector,
}

impl Route {
    pub fn new(hostnames: BTreeSet<String>, kind: MatchKind, path: String, selector: BackendSelector) -> Self {
        Self { hostnames, kind, path, selector }
    }

    /// An empty hostname set admits every host. Hosts compare case-insensitively.
    pub fn admits_host(&self, host: &str) -> bool {
        self.hostnames.is_empty() || self.hostnames.iter().any(|hostname| hostname.eq_ignore_ascii_case(host))
    }

    pub fn matches(&self, host: &str, path: &str) -> bool {
        self.admits_host(host) && self.kind.matches(&self.path, path)
    }

    pub fn next_backend(&self) -> &Backend {
        self.selector.next()
    }

    pub fn hostnames(&self) -> &BTreeSet<String> {
        &self.hostnames
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn backends(&self) -> &[Backend] {
        self.selector.backends()
    }
}

/// Ordered routes; the position of a route is its precedence.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: Vec<Route>,
    generation: u64,
}

impl RoutingTable {
    pub fn new(generation: u64) -> Self {
        Self { routes: Vec::new(), generation }
    }

    pub fn push(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn lookup(&self, host: &str, path: &str) -> Option<&Backend> {
        self.routes.iter().find(|route| route.matches(host, path)).map(Route::next_backend)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Reconciliation pass that produced this table, zero for the initial empty table.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn view(&self) -> Vec<RouteView> {
        self.routes.iter().map(RouteView::from).collect()
    }
}

pub type SharedRoutingTable = Arc<RoutingTable>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RouteView {
    pub hostnames: Vec<String>,
    pub kind: MatchKind,
    pub path: String,
    pub backends: Vec<String>,
}

impl From<&Route> for RouteView {
    fn from(route: &Route) -> Self {
        Self {
            hostnames: route.hostnames().iter().cloned().collect(),
            kind: route.kind(),
            path: route.path().to_owned(),
            backends: route.backends().iter().map(ToString::to_string).collect(),
        }
    }
}
