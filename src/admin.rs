use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    configuration::AdminInterfaceConfiguration,
    routing::{RouteView, Router as RequestRouter},
    Result,
};

#[derive(Clone)]
pub struct AppState {
    router: RequestRouter,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub generation: u64,
    pub routes: Vec<RouteView>,
}

pub async fn admin(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = AdminResponse { status: "ok".to_owned(), message: "Admin endpoint is running".to_owned() };

    (StatusCode::OK, Json(response))
}

/// The installed routing table in precedence order.
pub async fn routes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let table = state.router.snapshot();
    let response = RoutesResponse { generation: table.generation(), routes: table.view() };

    (StatusCode::OK, Json(response))
}

fn create_router(state: Arc<AppState>) -> Router {
    Router::new().route("/admin", get(admin)).route("/routes", get(routes)).with_state(state)
}

pub async fn start(configuration: Option<AdminInterfaceConfiguration>, router: RequestRouter, cancellation: CancellationToken) -> Result<()> {
    let state = Arc::new(AppState { router });
    let app = create_router(state);
    info!("Faros Admin interface... ");
    if let Some(configuration) = configuration {
        let listener = TcpListener::bind(configuration.address.to_ip()?).await?;
        let local_addr = listener.local_addr()?;
        info!("Admin server listening on http://{local_addr}");

        axum::serve(listener, app).with_graceful_shutdown(async move { cancellation.cancelled().await }).await?;
        info!("Faros Admin interface...stopped");
    } else {
        info!("Faros Admin interface not configured");
    }

    Ok(())
}
