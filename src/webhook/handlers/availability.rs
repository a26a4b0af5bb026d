// CheckAvailability: fills in date, time and group size one at a time.
//
// Only the first missing or invalid input is asked for; everything already
// known is kept in booking_info. Once all three are valid the conversation is
// handed to book_room through EVT_BOOK.

use crate::core::booking::RoomCategory;
use crate::webhook::contexts::{non_blank, BookingState, Turn, CTX_PROMPT_TIME};
use crate::webhook::dialogflow::WebhookResponse;
use crate::webhook::params;
use crate::webhook::responses;
use crate::webhook::server::AppState;

use super::inputs::{commit_date, commit_size, commit_time, date_from, window_from};
use super::EVT_BOOK;

const TIME_PROMPT_LIFESPAN: u32 = 3;

pub fn check_availability(app: &AppState, turn: &Turn<'_>) -> WebhookResponse {
    let mut booking = turn.collect_state();
    let reply = |booking: &BookingState, text: &str, extra: &[(&str, u32)]| {
        WebhookResponse::text(text)
            .with_contexts(turn.sticky_contexts(&app.sessions, booking, extra, true))
    };

    // Date
    let Some(date) = date_from(&booking, app.today()) else {
        return reply(&booking, responses::ASK_DATE, &[]);
    };
    commit_date(&mut booking, date);
    turn.invalidate_stale_room(&mut booking);

    // Time
    if non_blank(&booking, "booking_time").is_none() {
        return reply(
            &booking,
            responses::ASK_TIME,
            &[(CTX_PROMPT_TIME, TIME_PROMPT_LIFESPAN)],
        );
    }
    let window = match window_from(&booking, date, app.booking.hours()) {
        Ok(window) => window,
        Err(err) => {
            return reply(
                &booking,
                &responses::flow_time_error(err),
                &[(CTX_PROMPT_TIME, TIME_PROMPT_LIFESPAN)],
            );
        }
    };
    commit_time(&mut booking, &window);
    turn.invalidate_stale_room(&mut booking);

    // Size
    let Some(raw_size) = non_blank(&booking, "room_size") else {
        return reply(&booking, responses::ASK_SIZE, &[]);
    };
    let Some(size) = params::group_size(raw_size) else {
        return reply(&booking, responses::BAD_FLOW_SIZE, &[]);
    };
    commit_size(&mut booking, size);
    turn.invalidate_stale_room(&mut booking);

    let category = RoomCategory::from_group_size(size)
        .map(|c| c.as_str())
        .unwrap_or("discussion");
    tracing::debug!(session = turn.session(), %date, size, "Availability inputs complete");

    reply(&booking, &responses::assigning_category(category), &[])
        .with_event(EVT_BOOK, turn.language_code())
}
