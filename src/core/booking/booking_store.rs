use super::booking_models::{BookingRecord, BookingStatus, Room, ScheduleRow, SlotWrite};
use async_trait::async_trait;
use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence port for rooms, the daily slot schedule and booking rows.
///
/// The Google Sheets store is the production implementation; the in-memory
/// store backs tests. Neither does any locking across calls.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// All rooms, in inventory order.
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError>;

    /// The schedule rows for `date`, one per room in `rooms` and in the same
    /// order. Rows that don't exist yet are created empty.
    async fn load_schedule(
        &self,
        date: NaiveDate,
        rooms: &[Room],
    ) -> Result<Vec<ScheduleRow>, StoreError>;

    /// Writes values into slot cells on `date`. Writes for rooms without a
    /// schedule row that day are skipped.
    async fn write_slots(&self, date: NaiveDate, writes: &[SlotWrite]) -> Result<(), StoreError>;

    /// Booking rows for `date`, in any status.
    async fn list_bookings(&self, date: NaiveDate) -> Result<Vec<BookingRecord>, StoreError>;

    async fn append_booking(&self, record: &BookingRecord) -> Result<(), StoreError>;

    /// Sets the status of the given bookings. Unknown ids are ignored.
    async fn set_status(
        &self,
        booking_ids: &[String],
        status: BookingStatus,
    ) -> Result<(), StoreError>;
}

// Lets `BookingService<Box<dyn BookingStore>>` pick its backend at runtime.
#[async_trait]
impl BookingStore for Box<dyn BookingStore> {
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        (**self).list_rooms().await
    }

    async fn load_schedule(
        &self,
        date: NaiveDate,
        rooms: &[Room],
    ) -> Result<Vec<ScheduleRow>, StoreError> {
        (**self).load_schedule(date, rooms).await
    }

    async fn write_slots(&self, date: NaiveDate, writes: &[SlotWrite]) -> Result<(), StoreError> {
        (**self).write_slots(date, writes).await
    }

    async fn list_bookings(&self, date: NaiveDate) -> Result<Vec<BookingRecord>, StoreError> {
        (**self).list_bookings(date).await
    }

    async fn append_booking(&self, record: &BookingRecord) -> Result<(), StoreError> {
        (**self).append_booking(record).await
    }

    async fn set_status(
        &self,
        booking_ids: &[String],
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        (**self).set_status(booking_ids, status).await
    }
}
