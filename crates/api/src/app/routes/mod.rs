use axum::Router;

pub mod common;
pub mod delivery;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod system;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .nest("/orders", orders::router())
        .nest("/delivery", delivery::router())
        .nest("/products", products::router())
        .nest("/inventory", inventory::router())
}
