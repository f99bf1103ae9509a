use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use teashop_orders::{CheckoutRequest, OrderStatus};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/status", post(update_status))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> axum::response::Response {
    let request = match common::body(payload) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.checkout.checkout(request).await {
        Ok(receipt) => {
            (StatusCode::CREATED, Json(dto::CheckoutResponse::from(receipt))).into_response()
        }
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match common::parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.checkout.order(&id).await {
        Ok(order) => (StatusCode::OK, Json(dto::OrderResponse::from(&order))).into_response(),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::StatusUpdateRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match common::parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body = match common::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let next: OrderStatus = match body.status.parse() {
        Ok(s) => s,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation",
                format!("unknown status '{}'", body.status),
            );
        }
    };

    match services.checkout.update_status(&id, next).await {
        Ok(order) => (StatusCode::OK, Json(dto::OrderResponse::from(&order))).into_response(),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}
