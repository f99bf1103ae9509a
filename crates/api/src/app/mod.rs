//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage and notification wiring behind the checkout service
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use teashop_infra::AppConfig;
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Upper bound on requests handled at once; excess requests wait for a slot.
const MAX_IN_FLIGHT_REQUESTS: usize = 512;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    Ok(router(Arc::new(services)))
}

/// Router over already-wired services.
pub fn router(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(services))
        .layer(ServiceBuilder::new().concurrency_limit(MAX_IN_FLIGHT_REQUESTS))
}

pub use services::AppServices;
