// Every user-facing text the bot sends.
// Kept in one place so wording changes don't mean hunting through handlers.

use crate::core::booking::{display_room_type, BookingRecord, PeriodError};

use super::params::TimeError;

pub const WELCOME: [&str; 5] = [
    "Hi! Welcome to the Library Booking Bot.",
    "1️⃣ Check availability",
    "2️⃣ Make a booking",
    "3️⃣ Cancel a booking",
    "4️⃣ Library information",
];

pub const LIBRARY_INFO: [&str; 6] = [
    "📚 Library Information:",
    "🕘 Opening Hours: 8:00 AM – 8:00 PM daily (extended until midnight during exam periods).",
    "📚 Borrowing Rules: Students can borrow up to 5 books for 14 days. Renewal is allowed online if no reservations exist. Overdue items incur daily fines.",
    "🛎 Help Desk: Assistance is available at the Service Counter (Level G) for borrowing, membership, or locating resources.",
    "👥 Discussion Rooms: 43 rooms available (2–3 pax, 4–6 pax, 7–9 pax) plus 18 solo rooms. Each booking is limited to 2 hours per session.",
    "🎫 Lost Student ID: Report immediately to the service counter to deactivate your account and apply for a replacement card.",
];

pub const FALLBACK: &str = "Sorry, I didn't understand that.";
pub const SERVER_ERROR: &str = "Something went wrong on our side. Please try again in a moment.";
pub const BAD_REQUEST: &str = "Sorry, I couldn't read that request.";

pub const MISSING_TIME: &str = "⚠ Please provide a time range, e.g. 2 PM to 5 PM.";
pub const INVALID_TIME: &str = "⚠ Invalid time format. Please provide both start and end clearly.";
pub const TOO_LONG: &str =
    "⚠ You can only book up to 2 hours per session. Re-enter your booking time.";
pub const OFF_BOUNDARY: &str =
    "⚠ Please book on 30-minute boundaries (e.g., 2:00–4:00 or 2:30–4:30).";
pub const OUTSIDE_HOURS: &str =
    "⚠ Booking time must be between 8 AM and 8 PM (or until midnight during exam period).";

pub const BOOKING_SAVED: &str =
    "✅ Your booking has been saved successfully. Enter hi to go back to main menu.";
pub const BOOKING_ABANDONED: &str = "Got it. The booking has been cancelled.";
pub const NO_ACTIVE_BOOKING: &str = "No active booking found for that student and date.";

pub const ASK_CANCEL_DETAILS: &str =
    "Please provide your 7-digit student ID and the date to cancel (today/tomorrow or dd/mm/YYYY).";
pub const ASK_LOOKUP_DETAILS: &str =
    "Please provide your 7-digit student ID and the date of the booking (today/tomorrow or dd/mm/YYYY).";
pub const MENU_CANCEL: &str =
    "Okay, let's cancel a booking. Please provide your 7-digit student ID and the date.";
pub const ASK_STUDENT_ID: &str = "Please enter your 7-digit student ID.";
pub const INVALID_DATE: &str = "⚠ Please provide a valid date (today/tomorrow or dd/mm/YYYY).";
pub const BAD_GROUP_SIZE: &str =
    "I couldn't understand the group size. Please enter a number (e.g., 1 or 3).";
pub const UNSUPPORTED_GROUP_SIZE: &str = "Unsupported group size for available rooms.";
pub const STUDENT_ALREADY_BOOKED: &str =
    "⚠ This student ID has already been used in another booking for that day. Try a different ID.";
pub const NO_ROOMS: &str =
    "No available rooms for this time. Please try a different time or room size.";
pub const ALREADY_BOOKED: &str = "⚠ You already booked for that day (one per day).";
pub const ROOM_TAKEN: &str =
    "⚠ Sorry, that room was just taken by someone else. Please try booking again.";

pub const ASK_DATE: &str = "📅 Which date would you like to book — today or tomorrow?";
pub const ASK_TIME: &str = "🕒 What time would you like? (e.g., 2 PM to 4 PM)";
pub const ASK_SIZE: &str = "👥 How many people will use the room? (e.g., 1 or 3)";
pub const BAD_FLOW_SIZE: &str =
    "I couldn't understand the group size. Please enter a number between 1 and 9.";

pub const RESTAGING: &str = "I couldn’t find a staged room. Re-checking and holding a room now…";
pub const NOTHING_STAGED: &str = "I couldn't find a staged room. Please try booking again.";
pub const DETAILS_CHANGED: &str =
    "The date or time changed since I held your room. Holding a room for the new details now…";

pub fn time_error(error: TimeError) -> &'static str {
    match error {
        TimeError::Missing => MISSING_TIME,
        TimeError::Unreadable | TimeError::Period(PeriodError::DifferentDays) => INVALID_TIME,
        TimeError::Period(PeriodError::TooLong) => TOO_LONG,
        TimeError::Period(PeriodError::OffBoundary) => OFF_BOUNDARY,
        TimeError::Period(PeriodError::OutsideHours) => OUTSIDE_HOURS,
    }
}

/// Re-prompt used by the step-wise availability flow.
pub fn flow_time_error(error: TimeError) -> String {
    format!("⏱ {}", time_error(error))
}

pub fn assigning_category(category: &str) -> String {
    format!(
        "Great, assigning a {} room and checking availability…",
        category.to_uppercase()
    )
}

pub struct Confirmation<'a> {
    pub room_type_code: &'a str,
    pub room_id: &'a str,
    pub group_size: u32,
    pub date: &'a str,
    pub time: &'a str,
    pub student_id: Option<&'a str>,
}

impl Confirmation<'_> {
    pub fn text(&self) -> String {
        let plural = if self.group_size == 1 { "" } else { "s" };
        let student_line = self
            .student_id
            .map(|sid| format!(" Student ID: {}.", sid))
            .unwrap_or_default();
        format!(
            "Let me confirm your booking: a {} in room {} for {} person{} on {} from {}.{} Say 'Yes' to confirm or 'No' to cancel.",
            display_room_type(self.room_type_code),
            self.room_id,
            self.group_size,
            plural,
            self.date,
            self.time,
            student_line,
        )
    }
}

pub fn cancelled(student_id: &str, date: &str, count: usize) -> String {
    let verb = if count == 1 { "has" } else { "have" };
    format!("Got it. Booking for {} on {} {} been cancelled.", student_id, date, verb)
}

/// One line per booking, plus a header line.
pub fn booking_lines(student_id: &str, date: &str, bookings: &[BookingRecord]) -> Vec<String> {
    let mut lines = vec![format!(
        "📋 Bookings for {} on {}:",
        student_id, date
    )];
    lines.extend(bookings.iter().map(|b| {
        format!(
            "• {} {} from {} to {} (booking {})",
            display_room_type(&b.room_type),
            b.room_id,
            b.start_time,
            b.end_time,
            b.booking_id
        )
    }));
    lines
}
