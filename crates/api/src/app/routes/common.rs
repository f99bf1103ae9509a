use axum::{Json, extract::rejection::JsonRejection, http::StatusCode};

use teashop_core::{City, OrderId, ProductId};

use crate::app::errors;

/// Unwrap a JSON body, answering malformed input in the shared error envelope.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| {
            errors::json_error(StatusCode::BAD_REQUEST, "validation", rejection.body_text())
        })
}

pub fn parse_product_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation", "invalid product id")
    })
}

/// A malformed order id can never match an order, so it reads as not found.
pub fn parse_order_id(raw: &str) -> Result<OrderId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::NOT_FOUND, "not_found", "order not found"))
}

pub fn parse_city(raw: &str) -> Result<City, axum::response::Response> {
    raw.parse().map_err(|e: teashop_core::DomainError| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation", e.to_string())
    })
}

/// Positive quantity that fits the ledger's `u32`.
pub fn parse_quantity(field: &str, raw: i64) -> Result<u32, axum::response::Response> {
    u32::try_from(raw)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| {
            errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation",
                format!("{field} must be a positive integer"),
            )
        })
}
