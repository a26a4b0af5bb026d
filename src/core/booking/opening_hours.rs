// Opening hours and slot math.
//
// The library opens at 08:00 and closes at 20:00 (or midnight during exam
// periods). Each day is cut into 30-minute slots numbered from 1, so S1 is
// 08:00-08:30 and a normal day has 24 slots.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

use super::booking_models::TIME_FORMAT;

pub const OPEN_HOUR: u32 = 8;
pub const CLOSE_HOUR: u32 = 20;
pub const SLOT_MINUTES: i64 = 30;
pub const MAX_BOOKING_MINUTES: i64 = 120;

/// Why a requested time period cannot be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("start and end are on different days")]
    DifferentDays,

    #[error("longer than {} minutes", MAX_BOOKING_MINUTES)]
    TooLong,

    #[error("not on 30-minute boundaries")]
    OffBoundary,

    #[error("outside opening hours")]
    OutsideHours,
}

/// A validated booking period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl BookingWindow {
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// The same times moved onto another day. An end of 24:00 stays at the
    /// following midnight.
    pub fn on_date(&self, date: NaiveDate) -> Self {
        let start = date.and_time(self.start.time());
        Self {
            start,
            end: start + (self.end - self.start),
        }
    }

    pub fn start_label(&self) -> String {
        self.start.format(TIME_FORMAT).to_string()
    }

    pub fn end_label(&self) -> String {
        self.end.format(TIME_FORMAT).to_string()
    }

    /// `02:00 PM to 04:00 PM`
    pub fn label(&self) -> String {
        format!("{} to {}", self.start_label(), self.end_label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningHours {
    allow_until_midnight: bool,
}

impl OpeningHours {
    pub fn new(allow_until_midnight: bool) -> Self {
        Self {
            allow_until_midnight,
        }
    }

    fn close_hour(&self) -> u32 {
        if self.allow_until_midnight {
            24
        } else {
            CLOSE_HOUR
        }
    }

    /// Number of slot columns a day has: 24 normally, 32 when open until midnight.
    pub fn slots_per_day(&self) -> u32 {
        ((self.close_hour() - OPEN_HOUR) as i64 * 60 / SLOT_MINUTES) as u32
    }

    fn opening(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(NaiveTime::MIN) + Duration::hours(OPEN_HOUR as i64)
    }

    fn closing(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(NaiveTime::MIN) + Duration::hours(self.close_hour() as i64)
    }

    /// Validates a requested period.
    ///
    /// Checks, in order: same day (or ending exactly at midnight when that is
    /// allowed), at most two hours, 30-minute boundaries, inside opening hours.
    /// If the only problem is the opening hours, the hours are folded onto the
    /// daytime clock and checked once more, so "10 to 12" parsed as 22:00-00:00
    /// becomes 10:00-12:00.
    pub fn validate(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<BookingWindow, PeriodError> {
        let day = start.date();
        let same_day = day == end.date();
        let ends_at_midnight = self.allow_until_midnight
            && day
                .succ_opt()
                .is_some_and(|next| end == next.and_time(NaiveTime::MIN));
        if !same_day && !ends_at_midnight {
            return Err(PeriodError::DifferentDays);
        }

        let opening = self.opening(day);
        let closing = self.closing(day);

        match Self::check(start, end, opening, closing) {
            Err(PeriodError::OutsideHours) => {
                let duration = end - start;
                let start_alt = start
                    .with_hour(daytime_hour(start.hour()))
                    .unwrap_or(start);
                let mut end_alt = end.with_hour(daytime_hour(end.hour())).unwrap_or(end);
                if end_alt <= start_alt {
                    end_alt = start_alt + duration;
                }
                Self::check(start_alt, end_alt, opening, closing)
            }
            other => other,
        }
    }

    fn check(
        start: NaiveDateTime,
        end: NaiveDateTime,
        opening: NaiveDateTime,
        closing: NaiveDateTime,
    ) -> Result<BookingWindow, PeriodError> {
        if end - start > Duration::minutes(MAX_BOOKING_MINUTES) {
            return Err(PeriodError::TooLong);
        }
        if !on_boundary(start) || !on_boundary(end) {
            return Err(PeriodError::OffBoundary);
        }
        if !(opening <= start && start < end && end <= closing) {
            return Err(PeriodError::OutsideHours);
        }
        Ok(BookingWindow { start, end })
    }

    /// 1-based slot index of the slot starting at or containing `at`.
    pub fn slot_index(&self, at: NaiveDateTime) -> Option<u32> {
        let minutes_since_open = (at.hour() as i64 - OPEN_HOUR as i64) * 60 + at.minute() as i64;
        if minutes_since_open < 0 {
            return None;
        }
        let index = (minutes_since_open / SLOT_MINUTES + 1) as u32;
        (index <= self.slots_per_day()).then_some(index)
    }

    /// The slot indices a window covers. `None` when the window does not
    /// start inside the day's slots.
    pub fn slots_for(&self, window: &BookingWindow) -> Option<Vec<u32>> {
        let first = self.slot_index(window.start)?;
        let count = ((window.end - window.start).num_minutes() / SLOT_MINUTES) as u32;
        if count == 0 || first + count - 1 > self.slots_per_day() {
            return None;
        }
        Some((first..first + count).collect())
    }
}

fn on_boundary(at: NaiveDateTime) -> bool {
    matches!(at.minute(), 0 | 30)
}

/// 22 -> 10, 12 -> 12, 0 -> 12
fn daytime_hour(hour: u32) -> u32 {
    match hour % 12 {
        0 => 12,
        h => h,
    }
}
