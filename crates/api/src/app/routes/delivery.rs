use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use teashop_core::City;
use teashop_geofence::{LatLng, LocationInput};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/eligibility", post(check_eligibility))
}

/// Cart-page preview of the fee; checkout re-evaluates on submit.
pub async fn check_eligibility(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::EligibilityRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match common::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let total_packs = match u32::try_from(body.total_packs) {
        Ok(n) => n,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation",
                "totalPacks must be a non-negative integer",
            );
        }
    };

    let coordinates = match body.gps_coordinates.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<LatLng>() {
            Ok(c) => Some(c),
            Err(e) => {
                return errors::json_error(StatusCode::BAD_REQUEST, "validation", e.to_string());
            }
        },
    };

    // Cities we do not serve fall back to the coordinates alone.
    let declared_city = body
        .delivery_city
        .as_deref()
        .and_then(|c| c.parse::<City>().ok());

    let location = LocationInput {
        coordinates,
        declared_city,
    };

    match services.checkout.evaluate_eligibility(&location, total_packs) {
        Ok(eligibility) => {
            (StatusCode::OK, Json(dto::EligibilityResponse::from(&eligibility))).into_response()
        }
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}
