// Reading and committing the date / time / size inputs shared by the booking
// intents. "Committing" writes the normalized value back into the booking
// state so it is carried forward in booking_info.

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::core::booking::booking_models::format_date;
use crate::core::booking::{BookingWindow, OpeningHours, RoomCategory};
use crate::infra::session::InMemorySessionStore;
use crate::webhook::contexts::{non_blank, BookingState, Turn, CTX_BOOKING};
use crate::webhook::params::{self, TimeError};

/// A fresh `explicit_date` wins over a committed `date`.
pub fn date_from(state: &BookingState, today: NaiveDate) -> Option<NaiveDate> {
    non_blank(state, "explicit_date")
        .and_then(|v| params::parse_date(v, today))
        .or_else(|| non_blank(state, "date").and_then(|v| params::parse_date(v, today)))
}

/// Validates `booking_time` and moves the window onto `date`.
pub fn window_from(
    state: &BookingState,
    date: NaiveDate,
    hours: &OpeningHours,
) -> Result<BookingWindow, TimeError> {
    let period = state.get("booking_time").unwrap_or(&Value::Null);
    params::parse_time_period(period, hours).map(|window| window.on_date(date))
}

pub fn commit_date(state: &mut BookingState, date: NaiveDate) {
    state.insert("date".into(), json!(format_date(date)));
    state.insert("explicit_date".into(), Value::Null);
}

pub fn commit_time(state: &mut BookingState, window: &BookingWindow) {
    let label = window.label();
    state.insert("startTime".into(), json!(params::iso_datetime(window.start)));
    state.insert("endTime".into(), json!(params::iso_datetime(window.end)));
    state.insert("time_str".into(), json!(label));
    state.insert("time".into(), json!(label));
}

pub fn commit_size(state: &mut BookingState, size: u32) {
    state.insert("room_size".into(), json!(size));
    let category = RoomCategory::from_group_size(size).map(|c| c.as_str());
    state.insert("room_category".into(), json!(category));
}

/// Date, time and size, all valid.
pub struct ReadyInputs {
    pub date: NaiveDate,
    pub window: BookingWindow,
    pub size: u32,
}

impl ReadyInputs {
    pub fn from_state(state: &BookingState, today: NaiveDate, hours: &OpeningHours) -> Option<Self> {
        let date = date_from(state, today)?;
        let window = window_from(state, date, hours).ok()?;
        let size = non_blank(state, "room_size").and_then(params::group_size)?;
        Some(Self { date, window, size })
    }

    pub fn commit(&self, state: &mut BookingState) {
        commit_date(state, self.date);
        commit_time(state, &self.window);
        commit_size(state, self.size);
    }
}

/// Student id and date for the cancel and lookup intents: the current turn
/// first, then booking_info, then the session store.
pub fn student_and_date(
    turn: &Turn<'_>,
    sessions: &InMemorySessionStore,
    today: NaiveDate,
) -> (Option<String>, Option<NaiveDate>) {
    let mut known = turn.context_params(CTX_BOOKING);
    if known.is_empty() {
        known = sessions.get(turn.session());
    }

    let student_id = turn
        .turn_param("student_id")
        .or_else(|| non_blank(&known, "student_id"))
        .and_then(params::normalize_student_id);
    let date = turn
        .turn_param("date")
        .or_else(|| non_blank(&known, "date"))
        .and_then(|v| params::parse_date(v, today));
    (student_id, date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 15).unwrap()
    }

    fn state(value: Value) -> BookingState {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn ready_inputs_are_committed_normalized() {
        let hours = OpeningHours::new(false);
        let mut booking = state(json!({
            "explicit_date": "tomorrow",
            "date": "01/01/2030",
            "booking_time": {
                "startTime": "2030-01-15T14:00:00+08:00",
                "endTime": "2030-01-15T15:30:00+08:00"
            },
            "room_size": 4.0
        }));

        let ready = ReadyInputs::from_state(&booking, today(), &hours).unwrap();
        assert_eq!(ready.date, NaiveDate::from_ymd_opt(2030, 1, 16).unwrap());
        assert_eq!(ready.window.date(), ready.date);

        ready.commit(&mut booking);
        assert_eq!(booking["date"], json!("16/01/2030"));
        assert_eq!(booking["explicit_date"], Value::Null);
        assert_eq!(booking["startTime"], json!("2030-01-16T14:00:00"));
        assert_eq!(booking["time"], json!("02:00 PM to 03:30 PM"));
        assert_eq!(booking["room_size"], json!(4));
        assert_eq!(booking["room_category"], json!("discussion"));
    }

    #[test]
    fn incomplete_inputs_are_not_ready() {
        let hours = OpeningHours::new(false);
        let booking = state(json!({ "date": "today", "room_size": 2 }));
        assert!(ReadyInputs::from_state(&booking, today(), &hours).is_none());
        assert_eq!(
            window_from(&booking, today(), &hours),
            Err(TimeError::Missing)
        );
    }
}
