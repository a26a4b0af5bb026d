// Booking rules on top of a BookingStore.
//
// Booking is two-phase: `hold_room` marks a free room's slots with a
// `HOLD:<student>` tag, `finalize` swaps the tag for a booking id and records
// the booking. Nothing here is atomic across calls; two users racing for the
// same room can both see it free.

use super::booking_models::{
    BookingRecord, BookingStatus, RoomType, SlotWrite, HOLD_PREFIX,
};
use super::booking_store::{BookingStore, StoreError};
use super::opening_hours::{BookingWindow, OpeningHours};
use chrono::{NaiveDate, SecondsFormat, Utc};
use rand::Rng;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Student {0} already has a booking that day")]
    AlreadyBooked(String),
    #[error("No {0} is free for that time")]
    NoAvailability(String),
    #[error("Booking window does not fit the opening hours")]
    InvalidWindow,
    #[error("Unknown room {0}")]
    UnknownRoom(String),
    #[error("Slot S{slot} of room {room_id} is already taken")]
    SlotTaken { room_id: String, slot: u32 },
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// A room whose slots now carry a hold tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldRoom {
    pub room_id: String,
    pub room_type: RoomType,
    pub slots: Vec<u32>,
    pub hold_tag: String,
}

/// Everything needed to turn a hold into a booking.
#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    pub student_id: String,
    pub window: BookingWindow,
    pub room_type: String,
    pub room_id: String,
    pub slots: Vec<u32>,
}

pub struct BookingService<S: BookingStore> {
    store: S,
    hours: OpeningHours,
}

impl<S: BookingStore> BookingService<S> {
    pub fn new(store: S, hours: OpeningHours) -> Self {
        Self { store, hours }
    }

    pub fn hours(&self) -> &OpeningHours {
        &self.hours
    }

    /// `HOLD:1234567`, or `HOLD:PENDING` before the student id is known.
    pub fn hold_tag(student_id: Option<&str>) -> String {
        format!("{}{}", HOLD_PREFIX, student_id.unwrap_or("PENDING"))
    }

    pub async fn find_active(
        &self,
        student_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<BookingRecord>, BookingError> {
        let bookings = self.store.list_bookings(date).await?;
        Ok(bookings
            .into_iter()
            .filter(|b| b.is_active_for(student_id, date))
            .collect())
    }

    pub async fn has_active_booking(
        &self,
        student_id: &str,
        date: NaiveDate,
    ) -> Result<bool, BookingError> {
        Ok(!self.find_active(student_id, date).await?.is_empty())
    }

    /// Holds the first room of `room_type` (in Rooms order) whose slots are all
    /// free for `window`.
    pub async fn hold_room(
        &self,
        window: &BookingWindow,
        room_type: RoomType,
        student_id: Option<&str>,
    ) -> Result<HeldRoom, BookingError> {
        let date = window.date();

        if let Some(student) = student_id {
            if self.has_active_booking(student, date).await? {
                return Err(BookingError::AlreadyBooked(student.to_string()));
            }
        }

        let slots = self
            .hours
            .slots_for(window)
            .ok_or(BookingError::InvalidWindow)?;

        let rooms: Vec<_> = self
            .store
            .list_rooms()
            .await?
            .into_iter()
            .filter(|room| room.bucket == room_type.bucket())
            .collect();
        if rooms.is_empty() {
            return Err(BookingError::NoAvailability(
                room_type.display_name().to_lowercase(),
            ));
        }

        let schedule = self.store.load_schedule(date, &rooms).await?;
        let Some(free) = schedule.iter().find(|row| row.is_free(&slots)) else {
            tracing::info!(
                room_type = room_type.code(),
                date = %date,
                "No free room for requested window"
            );
            return Err(BookingError::NoAvailability(
                room_type.display_name().to_lowercase(),
            ));
        };

        let hold_tag = Self::hold_tag(student_id);
        self.store
            .write_slots(
                date,
                &[SlotWrite {
                    room_id: free.room_id.clone(),
                    slots: slots.clone(),
                    value: hold_tag.clone(),
                }],
            )
            .await?;

        tracing::info!(room_id = %free.room_id, ?slots, %hold_tag, "Room held");

        Ok(HeldRoom {
            room_id: free.room_id.clone(),
            room_type,
            slots,
            hold_tag,
        })
    }

    /// Turns a held room into a booking and records it.
    ///
    /// The slots must be exactly the ones the window covers, otherwise
    /// `InvalidWindow`. Every slot must still be empty or held; a slot that
    /// already carries another booking id fails with `SlotTaken` and nothing
    /// is written.
    pub async fn finalize(&self, request: FinalizeRequest) -> Result<BookingRecord, BookingError> {
        let date = request.window.date();

        if self.hours.slots_for(&request.window).as_ref() != Some(&request.slots) {
            tracing::warn!(
                room_id = %request.room_id,
                slots = ?request.slots,
                window = %request.window.label(),
                "Held slots do not match the booking window"
            );
            return Err(BookingError::InvalidWindow);
        }

        if self.has_active_booking(&request.student_id, date).await? {
            return Err(BookingError::AlreadyBooked(request.student_id));
        }

        let rooms: Vec<_> = self
            .store
            .list_rooms()
            .await?
            .into_iter()
            .filter(|room| room.room_id == request.room_id)
            .collect();
        if rooms.is_empty() {
            return Err(BookingError::UnknownRoom(request.room_id));
        }

        let schedule = self.store.load_schedule(date, &rooms).await?;
        if let Some(row) = schedule.first() {
            for slot in &request.slots {
                let cell = row.cell(*slot);
                if !cell.is_empty() && !cell.starts_with(HOLD_PREFIX) {
                    return Err(BookingError::SlotTaken {
                        room_id: request.room_id,
                        slot: *slot,
                    });
                }
            }
        }

        let booking_id = new_booking_id();
        self.store
            .write_slots(
                date,
                &[SlotWrite {
                    room_id: request.room_id.clone(),
                    slots: request.slots.clone(),
                    value: booking_id.clone(),
                }],
            )
            .await?;

        let record = BookingRecord {
            booking_id,
            student_id: request.student_id,
            date,
            start_time: request.window.start_label(),
            end_time: request.window.end_label(),
            room_type: request.room_type,
            room_id: request.room_id,
            slots: request.slots,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            status: BookingStatus::Active,
        };
        self.store.append_booking(&record).await?;

        tracing::info!(
            booking_id = %record.booking_id,
            room_id = %record.room_id,
            student_id = %record.student_id,
            "Booking saved"
        );

        Ok(record)
    }

    /// Cancels every active booking the student has on `date`, freeing their
    /// slots. Returns how many were cancelled.
    pub async fn cancel(&self, student_id: &str, date: NaiveDate) -> Result<usize, BookingError> {
        let active = self.find_active(student_id, date).await?;
        if active.is_empty() {
            return Ok(0);
        }

        let writes: Vec<SlotWrite> = active
            .iter()
            .map(|b| SlotWrite {
                room_id: b.room_id.clone(),
                slots: b.slots.clone(),
                value: String::new(),
            })
            .collect();
        self.store.write_slots(date, &writes).await?;

        let ids: Vec<String> = active.iter().map(|b| b.booking_id.clone()).collect();
        self.store.set_status(&ids, BookingStatus::Cancelled).await?;

        tracing::info!(student_id, date = %date, count = ids.len(), "Bookings cancelled");
        Ok(ids.len())
    }

    /// Clears the slots of `room_id` that still carry exactly `hold_tag`.
    /// Returns how many slots were cleared.
    pub async fn release_hold(
        &self,
        date: NaiveDate,
        room_id: &str,
        slots: &[u32],
        hold_tag: &str,
    ) -> Result<usize, BookingError> {
        let rooms: Vec<_> = self
            .store
            .list_rooms()
            .await?
            .into_iter()
            .filter(|room| room.room_id == room_id)
            .collect();
        if rooms.is_empty() {
            return Ok(0);
        }

        let schedule = self.store.load_schedule(date, &rooms).await?;
        let held: Vec<u32> = match schedule.first() {
            Some(row) => slots
                .iter()
                .copied()
                .filter(|slot| row.cell(*slot) == hold_tag)
                .collect(),
            None => Vec::new(),
        };
        if held.is_empty() {
            return Ok(0);
        }

        self.store
            .write_slots(
                date,
                &[SlotWrite {
                    room_id: room_id.to_string(),
                    slots: held.clone(),
                    value: String::new(),
                }],
            )
            .await?;

        tracing::info!(room_id, ?held, "Hold released");
        Ok(held.len())
    }
}

/// `BKG-` followed by 10 upper-case hex digits.
fn new_booking_id() -> String {
    let bits = rand::thread_rng().gen::<u64>() & 0xFF_FFFF_FFFF;
    format!("BKG-{:010X}", bits)
}
