pub mod admin;
mod common;
pub mod configuration;
mod controllers;
pub mod routing;
mod services;

use configuration::Configuration;
use controllers::GatewayController;
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use controllers::{ControllerError, PassSummary, DEFAULT_DEBOUNCE_WINDOW};
pub use routing::Router;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

pub fn format_resource<R>() -> &'static str {
    std::any::type_name::<R>().split("::").last().unwrap_or_default()
}

/// Runs the controller and the admin interface until `cancellation` fires.
pub async fn start(configuration: Configuration, cancellation: CancellationToken) -> Result<()> {
    info!("Faros started");
    let client = Client::try_default().await?;

    let gateway_controller = GatewayController::builder()
        .controller_name(configuration.controller_name.clone())
        .client(client)
        .debounce_window(configuration.debounce_window())
        .watch(configuration.watch.clone())
        .build();
    let router = gateway_controller.router();

    futures::future::try_join(
        gateway_controller.run(cancellation.clone()),
        admin::start(configuration.admin_interface.clone(), router, cancellation.clone()),
    )
    .await?;

    info!("Faros stopped");
    Ok(())
}
