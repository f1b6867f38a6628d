mod backend;
mod builder;
mod router;
mod table;

pub use backend::{Backend, BackendSelector};
pub use builder::RouteBuilder;
pub use router::Router;
pub use table::{MatchKind, Route, RouteView, RoutingTable, SharedRoutingTable};
