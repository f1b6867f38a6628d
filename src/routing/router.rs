use std::sync::Arc;

use arc_swap::ArcSwap;
use http::Uri;

use super::table::{RoutingTable, SharedRoutingTable};

/// Lock-free access to the installed routing table.
///
/// Clones share the same table; a reconciliation pass installs a new one with [`Router::install`].
#[derive(Clone, Debug)]
pub struct Router {
    table: Arc<ArcSwap<RoutingTable>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self { table: Arc::new(ArcSwap::from_pointee(RoutingTable::default())) }
    }

    /// Picks the backend for an inbound request, `None` when no route matches. The host may carry
    /// a port and is compared case-insensitively.
    pub fn route(&self, host: &str, path: &str) -> Option<Uri> {
        let host = strip_port(host);
        let table = self.table.load();
        table.lookup(host, path).map(|backend| backend.address().clone())
    }

    pub fn install(&self, table: RoutingTable) {
        self.table.store(Arc::new(table));
    }

    pub fn snapshot(&self) -> SharedRoutingTable {
        self.table.load_full()
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}
