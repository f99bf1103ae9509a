use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value, json};

use teashop_infra::FulfillmentError;

/// Every failure uses the same envelope so the storefront can show one toast:
/// `{ success: false, errorKind, details, retryable, message, messageAr }`.
pub fn fulfillment_error_to_response(err: FulfillmentError) -> axum::response::Response {
    let status = match &err {
        FulfillmentError::Validation(_) | FulfillmentError::InvalidInput(_) => {
            StatusCode::BAD_REQUEST
        }
        FulfillmentError::UnsupportedLocation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FulfillmentError::InsufficientStock { .. }
        | FulfillmentError::InvalidTransition(_)
        | FulfillmentError::Conflict(_) => StatusCode::CONFLICT,
        FulfillmentError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        FulfillmentError::NotFound => StatusCode::NOT_FOUND,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }

    let details = match &err {
        FulfillmentError::Validation(rejected) => Value::Array(
            rejected
                .issues
                .iter()
                .map(|issue| {
                    json!({
                        "field": issue.field,
                        "code": issue.code,
                        "message": issue.code.message_en(),
                        "messageAr": issue.code.message_ar(),
                    })
                })
                .collect(),
        ),
        FulfillmentError::UnsupportedLocation(u) => json!({
            "gpsCoordinates": u.coordinates.map(|c| c.to_string()),
            "distanceKm": u.distance_km,
        }),
        FulfillmentError::InsufficientStock {
            product_id,
            product_name,
            city,
            available,
            requested,
        } => json!({
            "productId": product_id.to_string(),
            "productName": product_name,
            "city": city.to_string(),
            "available": available,
            "requested": requested,
        }),
        // Storage detail stays in the logs.
        FulfillmentError::Persistence(_) | FulfillmentError::NotFound => Value::Null,
        FulfillmentError::InvalidInput(msg)
        | FulfillmentError::InvalidTransition(msg)
        | FulfillmentError::Conflict(msg) => Value::String(msg.clone()),
    };

    failure(
        status,
        err.kind(),
        details,
        err.retryable(),
        err.message_en(),
        err.message_ar(),
    )
}

/// Failure outside the checkout service (bad path, malformed body).
pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    let message_ar = match status {
        StatusCode::NOT_FOUND => "غير موجود.",
        s if s.is_client_error() => "الطلب غير صالح.",
        _ => "حدث خطأ غير متوقع.",
    };
    failure(status, code, Value::Null, false, message.into(), message_ar.to_string())
}

fn failure(
    status: StatusCode,
    kind: &str,
    details: Value,
    retryable: bool,
    message: String,
    message_ar: String,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "errorKind": kind,
            "details": details,
            "retryable": retryable,
            "message": message,
            "messageAr": message_ar,
        })),
    )
        .into_response()
}
