// CancelBooking: cancels every active booking a student has on a date.

use serde_json::json;

use crate::core::booking::booking_models::format_date;
use crate::webhook::contexts::{BookingState, Turn};
use crate::webhook::dialogflow::WebhookResponse;
use crate::webhook::error::WebhookError;
use crate::webhook::responses;
use crate::webhook::server::AppState;

use super::inputs::student_and_date;

pub async fn cancel_booking(
    app: &AppState,
    turn: &Turn<'_>,
) -> Result<WebhookResponse, WebhookError> {
    let (Some(student_id), Some(date)) = student_and_date(turn, &app.sessions, app.today()) else {
        let contexts = turn.sticky_contexts(&app.sessions, &BookingState::new(), &[], false);
        return Ok(WebhookResponse::text(responses::ASK_CANCEL_DETAILS).with_contexts(contexts));
    };

    let cancelled = app.booking.cancel(&student_id, date).await?;
    let text = if cancelled > 0 {
        responses::cancelled(&student_id, &format_date(date), cancelled)
    } else {
        responses::NO_ACTIVE_BOOKING.to_string()
    };

    let mut remembered = BookingState::new();
    remembered.insert("student_id".into(), json!(student_id));
    let contexts = turn.sticky_contexts(&app.sessions, &remembered, &[], false);
    Ok(WebhookResponse::text(text).with_contexts(contexts))
}
