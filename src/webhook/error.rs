use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Duration;

use crate::core::booking::BookingError;

use super::responses;

/// Failures that end a webhook call with something other than 200.
///
/// Anything a user can fix by rephrasing is answered with a normal 200
/// fulfillment by the handlers; only unreadable requests and backend failures
/// end up here.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Malformed webhook request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error("Webhook handling took longer than {0:?}")]
    TimedOut(Duration),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            WebhookError::BadRequest(reason) => {
                tracing::warn!(%reason, "Rejected webhook request");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "fulfillmentText": responses::BAD_REQUEST,
                        "error": reason,
                    })),
                )
                    .into_response()
            }
            WebhookError::Booking(err) => {
                tracing::error!(error = %err, "Webhook failed");
                server_error()
            }
            WebhookError::TimedOut(limit) => {
                tracing::error!(?limit, "Webhook timed out waiting on the spreadsheet");
                server_error()
            }
        }
    }
}

fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "fulfillmentText": responses::SERVER_ERROR,
            "error": "internal error",
        })),
    )
        .into_response()
}
