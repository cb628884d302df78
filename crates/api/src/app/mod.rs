//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/publisher/writer/reader wiring
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use userhub_events::BusConnector;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app<C>(services: Arc<AppServices<C>>) -> Router
where
    C: BusConnector + 'static,
{
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/users", routes::users::router::<C>())
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
