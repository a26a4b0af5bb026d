// book_room holds a room and asks for confirmation, ConfirmBooking turns the
// hold into a booking, CancelAfterConfirmation lets the hold go.

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::core::booking::booking_models::format_date;
use crate::core::booking::{BookingError, BookingWindow, FinalizeRequest, RoomType};
use crate::infra::session::is_blank;
use crate::webhook::contexts::{
    clear_staged_room, non_blank, BookingState, Turn, CTX_AWAIT_CONFIRM, CTX_BOOKING,
    STEP_LIFESPAN,
};
use crate::webhook::dialogflow::WebhookResponse;
use crate::webhook::error::WebhookError;
use crate::webhook::params;
use crate::webhook::responses::{self, Confirmation};
use crate::webhook::server::AppState;

use super::inputs::{commit_date, commit_size, commit_time, date_from, window_from};
use super::EVT_BOOK;

/// A held room as recorded in booking_info.
struct StagedRoom {
    date: NaiveDate,
    room_id: String,
    slots: Vec<u32>,
    hold_tag: Option<String>,
}

impl StagedRoom {
    fn from_state(state: &BookingState, today: NaiveDate) -> Option<Self> {
        // The hold lives on the day it was taken, even if `date` moved since.
        let date = non_blank(state, "hold_date")
            .or_else(|| non_blank(state, "date"))
            .and_then(|v| params::parse_date(v, today))?;
        let room_id = non_blank(state, "room_id")?.as_str()?.to_string();
        let slots = non_blank(state, "slots")
            .and_then(params::slots_from_value)
            .or_else(|| non_blank(state, "slots_json").and_then(params::slots_from_value))
            .filter(|slots| !slots.is_empty())?;
        let hold_tag = non_blank(state, "hold_tag")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Self {
            date,
            room_id,
            slots,
            hold_tag,
        })
    }

    /// Clears our hold, leaving anything else in those cells alone.
    async fn release(&self, app: &AppState) -> Result<(), WebhookError> {
        let Some(tag) = &self.hold_tag else {
            return Ok(());
        };
        app.booking
            .release_hold(self.date, &self.room_id, &self.slots, tag)
            .await?;
        Ok(())
    }
}

fn reply(app: &AppState, turn: &Turn<'_>, booking: &BookingState, text: &str) -> WebhookResponse {
    WebhookResponse::text(text).with_contexts(turn.sticky_contexts(&app.sessions, booking, &[], false))
}

pub async fn book_room(app: &AppState, turn: &Turn<'_>) -> Result<WebhookResponse, WebhookError> {
    let mut booking = turn.collect_state();
    let today = app.today();

    let Some(date) = date_from(&booking, today) else {
        return Ok(reply(app, turn, &booking, responses::INVALID_DATE));
    };
    let window = match window_from(&booking, date, app.booking.hours()) {
        Ok(window) => window,
        Err(err) => return Ok(reply(app, turn, &booking, responses::time_error(err))),
    };
    commit_date(&mut booking, date);
    commit_time(&mut booking, &window);

    // A room staged earlier in this conversation is about to be replaced.
    if let Some(previous) = StagedRoom::from_state(&turn.context_params(CTX_BOOKING), today) {
        previous.release(app).await?;
    }
    clear_staged_room(&mut booking);

    let Some(size) = non_blank(&booking, "room_size").and_then(params::group_size) else {
        return Ok(reply(app, turn, &booking, responses::BAD_GROUP_SIZE));
    };
    commit_size(&mut booking, size);
    let Some(room_type) = RoomType::for_group(size) else {
        return Ok(reply(app, turn, &booking, responses::UNSUPPORTED_GROUP_SIZE));
    };

    let student_id = non_blank(&booking, "student_id").and_then(params::normalize_student_id);
    if let Some(sid) = &student_id {
        booking.insert("student_id".into(), json!(sid));
    }

    let held = match app
        .booking
        .hold_room(&window, room_type, student_id.as_deref())
        .await
    {
        Ok(held) => held,
        Err(BookingError::AlreadyBooked(_)) => {
            return Ok(reply(app, turn, &booking, responses::STUDENT_ALREADY_BOOKED));
        }
        Err(BookingError::NoAvailability(_)) => {
            return Ok(reply(app, turn, &booking, responses::NO_ROOMS));
        }
        Err(BookingError::InvalidWindow) => {
            return Ok(reply(app, turn, &booking, responses::OUTSIDE_HOURS));
        }
        Err(err) => return Err(err.into()),
    };

    booking.insert("room_type".into(), json!(held.room_type.code()));
    booking.insert("room_id".into(), json!(held.room_id));
    booking.insert("slots".into(), json!(held.slots));
    booking.insert("slots_json".into(), Value::String(json!(held.slots).to_string()));
    booking.insert("hold_tag".into(), json!(held.hold_tag));
    booking.insert("hold_date".into(), json!(format_date(date)));

    tracing::debug!(
        session = turn.session(),
        room_id = %held.room_id,
        slots = ?held.slots,
        "Room staged for confirmation"
    );

    let date_label = format_date(date);
    let time_label = window.label();
    let text = Confirmation {
        room_type_code: held.room_type.code(),
        room_id: &held.room_id,
        group_size: size,
        date: &date_label,
        time: &time_label,
        student_id: student_id.as_deref(),
    }
    .text();

    let contexts = turn.sticky_contexts(
        &app.sessions,
        &booking,
        &[(CTX_AWAIT_CONFIRM, STEP_LIFESPAN)],
        false,
    );
    Ok(WebhookResponse::text(text).with_contexts(contexts))
}

/// Session store, then booking_info, then what was said this turn. Blank
/// values never override.
fn confirmation_params(app: &AppState, turn: &Turn<'_>) -> BookingState {
    let mut merged = app.sessions.get(turn.session());
    for (key, value) in turn
        .context_params(CTX_BOOKING)
        .into_iter()
        .chain(turn.turn_params())
    {
        if !is_blank(&value) {
            merged.insert(key, value);
        }
    }
    merged
}

pub async fn confirm_booking(
    app: &AppState,
    turn: &Turn<'_>,
) -> Result<WebhookResponse, WebhookError> {
    let mut known = confirmation_params(app, turn);
    let today = app.today();

    let Some(student_id) = non_blank(&known, "student_id").and_then(params::normalize_student_id)
    else {
        let contexts = turn.sticky_contexts(
            &app.sessions,
            &known,
            &[(CTX_AWAIT_CONFIRM, STEP_LIFESPAN)],
            false,
        );
        return Ok(WebhookResponse::text(responses::ASK_STUDENT_ID).with_contexts(contexts));
    };

    let Some(date) = date_from(&known, today) else {
        return Ok(reply(app, turn, &known, responses::INVALID_DATE));
    };
    let window = match window_from(&known, date, app.booking.hours()) {
        Ok(window) => window,
        Err(err) => return Ok(reply(app, turn, &known, responses::time_error(err))),
    };

    let room_type = non_blank(&known, "room_type")
        .and_then(Value::as_str)
        .map(str::to_string);
    let staged = StagedRoom::from_state(&known, today);
    let (Some(room_type), Some(staged)) = (room_type, staged) else {
        let have_inputs = ["date", "booking_time", "room_size"]
            .iter()
            .all(|key| non_blank(&known, key).is_some());
        if have_inputs {
            return Ok(reply(app, turn, &known, responses::RESTAGING)
                .with_event(EVT_BOOK, turn.language_code()));
        }
        return Ok(reply(app, turn, &known, responses::NOTHING_STAGED));
    };

    // The user may have changed the date or time after the room was held.
    let held_for_window = staged.date == date
        && app.booking.hours().slots_for(&window).as_ref() == Some(&staged.slots);
    if !held_for_window {
        return restage(app, turn, known, &staged, date, &window).await;
    }

    let request = FinalizeRequest {
        student_id,
        window,
        room_type,
        room_id: staged.room_id.clone(),
        slots: staged.slots.clone(),
    };
    match app.booking.finalize(request).await {
        Ok(record) => {
            tracing::info!(
                session = turn.session(),
                booking_id = %record.booking_id,
                "Booking confirmed"
            );
            let mut done = BookingState::new();
            clear_staged_room(&mut done);
            done.insert("student_id".into(), Value::Null);
            let contexts =
                turn.sticky_contexts(&app.sessions, &done, &[(CTX_AWAIT_CONFIRM, 0)], false);
            Ok(WebhookResponse::text(responses::BOOKING_SAVED).with_contexts(contexts))
        }
        Err(BookingError::AlreadyBooked(_)) => {
            staged.release(app).await?;
            clear_staged_room(&mut known);
            Ok(reply(app, turn, &known, responses::ALREADY_BOOKED))
        }
        Err(BookingError::SlotTaken { .. }) => {
            clear_staged_room(&mut known);
            Ok(reply(app, turn, &known, responses::ROOM_TAKEN))
        }
        Err(BookingError::InvalidWindow) => restage(app, turn, known, &staged, date, &window).await,
        Err(BookingError::UnknownRoom(room_id)) => {
            tracing::warn!(%room_id, "Staged room no longer exists");
            clear_staged_room(&mut known);
            Ok(reply(app, turn, &known, responses::NOTHING_STAGED))
        }
        Err(err) => Err(err.into()),
    }
}

/// Drops a hold that no longer matches the requested date and time, then
/// sends the conversation back through book_room with the new details.
async fn restage(
    app: &AppState,
    turn: &Turn<'_>,
    mut known: BookingState,
    staged: &StagedRoom,
    date: NaiveDate,
    window: &BookingWindow,
) -> Result<WebhookResponse, WebhookError> {
    tracing::info!(
        session = turn.session(),
        room_id = %staged.room_id,
        held_on = %format_date(staged.date),
        requested = %window.label(),
        "Staged room no longer matches the booking details"
    );
    staged.release(app).await?;
    clear_staged_room(&mut known);
    commit_date(&mut known, date);
    commit_time(&mut known, window);
    Ok(reply(app, turn, &known, responses::DETAILS_CHANGED).with_event(EVT_BOOK, turn.language_code()))
}

/// The user said "No" to the confirmation.
pub async fn cancel_after_confirmation(
    app: &AppState,
    turn: &Turn<'_>,
) -> Result<WebhookResponse, WebhookError> {
    let known = confirmation_params(app, turn);
    if let Some(staged) = StagedRoom::from_state(&known, app.today()) {
        staged.release(app).await?;
    }

    let mut cleared = BookingState::new();
    clear_staged_room(&mut cleared);
    let contexts = turn.sticky_contexts(&app.sessions, &cleared, &[(CTX_AWAIT_CONFIRM, 0)], false);
    Ok(WebhookResponse::text(responses::BOOKING_ABANDONED).with_contexts(contexts))
}
