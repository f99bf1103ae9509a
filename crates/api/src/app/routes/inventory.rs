use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/:product_id/restock", post(restock))
        .route("/:product_id/ledger", get(get_ledger))
}

pub async fn restock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
    payload: Result<Json<dto::RestockRequest>, JsonRejection>,
) -> axum::response::Response {
    let product_id = match common::parse_product_id(&product_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body = match common::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let city = match common::parse_city(&body.city) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let quantity = match common::parse_quantity("quantity", body.quantity) {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.checkout.restock(product_id, city, quantity).await {
        Ok(stock) => (
            StatusCode::OK,
            Json(dto::RestockResponse {
                product_id: product_id.to_string(),
                city: city.to_string(),
                stock,
            }),
        )
            .into_response(),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn get_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
    Query(query): Query<dto::LedgerQuery>,
) -> axum::response::Response {
    let product_id = match common::parse_product_id(&product_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(raw_city) = query.city else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation",
            "city query parameter is required",
        );
    };
    let city = match common::parse_city(&raw_city) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.checkout.ledger(product_id, city).await {
        Ok(entries) => {
            let out: Vec<dto::LedgerEntryResponse> =
                entries.iter().map(dto::LedgerEntryResponse::from).collect();
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}
