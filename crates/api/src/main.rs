use std::sync::Arc;

use tracing::{error, info, warn};

use userhub_api::app::{self, services};
use userhub_events::EventPublisher;
use userhub_infra::AppConfig;
use userhub_infra::event_bus::RedisConnector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    userhub_observability::init();

    let config = AppConfig::from_env()?;

    let store = services::build_store(&config).await?;

    if !config.events.is_complete() {
        warn!("REDIS_URL or USER_EVENTS_TOPIC not set; user events will not be published");
    }
    let publisher = Arc::new(EventPublisher::new(config.events.clone(), RedisConnector));

    let services = Arc::new(services::AppServices::new(store, publisher));
    let router = app::build_app(services.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    services.shutdown().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}
