// CheckBooking: shows a student's active bookings for a date.

use serde_json::json;

use crate::core::booking::booking_models::format_date;
use crate::webhook::contexts::{BookingState, Turn};
use crate::webhook::dialogflow::WebhookResponse;
use crate::webhook::error::WebhookError;
use crate::webhook::responses;
use crate::webhook::server::AppState;

use super::inputs::student_and_date;

pub async fn check_booking(
    app: &AppState,
    turn: &Turn<'_>,
) -> Result<WebhookResponse, WebhookError> {
    let (Some(student_id), Some(date)) = student_and_date(turn, &app.sessions, app.today()) else {
        let contexts = turn.sticky_contexts(&app.sessions, &BookingState::new(), &[], false);
        return Ok(WebhookResponse::text(responses::ASK_LOOKUP_DETAILS).with_contexts(contexts));
    };

    let bookings = app.booking.find_active(&student_id, date).await?;

    let mut remembered = BookingState::new();
    remembered.insert("student_id".into(), json!(student_id));
    let contexts = turn.sticky_contexts(&app.sessions, &remembered, &[], false);

    let response = if bookings.is_empty() {
        WebhookResponse::text(responses::NO_ACTIVE_BOOKING)
    } else {
        WebhookResponse::lines(responses::booking_lines(&student_id, &format_date(date), &bookings))
    };
    Ok(response.with_contexts(contexts))
}
