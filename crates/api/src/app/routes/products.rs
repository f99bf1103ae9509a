use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use teashop_inventory::Product;

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/:id", get(get_product).put(upsert_product))
}

pub async fn upsert_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpsertProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match common::parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body = match common::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let unit_price = match u64::try_from(body.unit_price) {
        Ok(p) => p,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation",
                "unitPrice must be positive",
            );
        }
    };
    let product = match Product::new(id, body.sku, body.name, unit_price) {
        Ok(p) => p,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation", e.to_string()),
    };

    if let Err(e) = services.checkout.upsert_product(product).await {
        return errors::fulfillment_error_to_response(e);
    }

    match services.checkout.product(id).await {
        Ok(product) => (StatusCode::OK, Json(dto::ProductResponse::from(&product))).into_response(),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match common::parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.checkout.product(id).await {
        Ok(product) => (StatusCode::OK, Json(dto::ProductResponse::from(&product))).into_response(),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}
