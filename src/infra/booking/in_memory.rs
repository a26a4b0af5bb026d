// In-memory implementation of BookingStore.
//
// Backs the service and webhook tests. It behaves like the Sheets store:
// schedule rows appear on first read, writes to rooms without a row are
// skipped.

use crate::core::booking::booking_models::default_room_inventory;
use crate::core::booking::{
    BookingRecord, BookingStatus, BookingStore, Room, ScheduleRow, SlotWrite, StoreError,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;

/// Schedule cells are keyed by (date, room id).
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
struct ScheduleKey {
    date: NaiveDate,
    room_id: String,
}

pub struct InMemoryBookingStore {
    rooms: Vec<Room>,
    slots_per_day: u32,
    schedule: DashMap<ScheduleKey, Vec<String>>,
    /// Bookings per date, in insertion order.
    bookings: DashMap<NaiveDate, Vec<BookingRecord>>,
}

impl InMemoryBookingStore {
    /// A store seeded with the library's full room inventory.
    pub fn new(slots_per_day: u32) -> Self {
        Self::with_rooms(default_room_inventory(), slots_per_day)
    }

    pub fn with_rooms(rooms: Vec<Room>, slots_per_day: u32) -> Self {
        Self {
            rooms,
            slots_per_day,
            schedule: DashMap::new(),
            bookings: DashMap::new(),
        }
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        Ok(self.rooms.clone())
    }

    async fn load_schedule(
        &self,
        date: NaiveDate,
        rooms: &[Room],
    ) -> Result<Vec<ScheduleRow>, StoreError> {
        Ok(rooms
            .iter()
            .map(|room| {
                let key = ScheduleKey {
                    date,
                    room_id: room.room_id.clone(),
                };
                let cells = self
                    .schedule
                    .entry(key)
                    .or_insert_with(|| vec![String::new(); self.slots_per_day as usize])
                    .value()
                    .clone();
                ScheduleRow {
                    room_id: room.room_id.clone(),
                    cells,
                }
            })
            .collect())
    }

    async fn write_slots(&self, date: NaiveDate, writes: &[SlotWrite]) -> Result<(), StoreError> {
        for write in writes {
            let key = ScheduleKey {
                date,
                room_id: write.room_id.clone(),
            };
            let Some(mut cells) = self.schedule.get_mut(&key) else {
                tracing::warn!(room_id = %write.room_id, %date, "No schedule row, skipping write");
                continue;
            };
            for &slot in write.slots.iter().filter(|s| **s > 0) {
                if let Some(cell) = cells.get_mut(slot as usize - 1) {
                    *cell = write.value.clone();
                }
            }
        }
        Ok(())
    }

    async fn list_bookings(&self, date: NaiveDate) -> Result<Vec<BookingRecord>, StoreError> {
        Ok(self
            .bookings
            .get(&date)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn append_booking(&self, record: &BookingRecord) -> Result<(), StoreError> {
        self.bookings
            .entry(record.date)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn set_status(
        &self,
        booking_ids: &[String],
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        for mut entry in self.bookings.iter_mut() {
            for record in entry.value_mut().iter_mut() {
                if booking_ids.contains(&record.booking_id) {
                    record.status = status;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::booking::RoomBucket;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 5, 6).unwrap()
    }

    #[tokio::test]
    async fn schedule_rows_are_created_on_first_read() {
        let store = InMemoryBookingStore::new(24);
        let rooms = store.list_rooms().await.unwrap();
        assert_eq!(rooms.len(), 61);

        let rows = store.load_schedule(day(), &rooms[..2]).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].room_id, "SOLO-01");
        assert_eq!(rows[0].cells.len(), 24);
        assert!(rows[0].is_free(&[1, 24]));
    }

    #[tokio::test]
    async fn writes_only_land_on_existing_rows() {
        let store = InMemoryBookingStore::with_rooms(vec![Room::new("M-01", RoomBucket::Medium)], 24);
        let rooms = store.list_rooms().await.unwrap();

        let write = SlotWrite {
            room_id: "M-01".to_string(),
            slots: vec![3, 4],
            value: "HOLD:PENDING".to_string(),
        };
        // No row yet for this date
        store.write_slots(day(), &[write.clone()]).await.unwrap();
        assert!(store.load_schedule(day(), &rooms).await.unwrap()[0].is_free(&[3, 4]));

        store.write_slots(day(), &[write]).await.unwrap();
        let rows = store.load_schedule(day(), &rooms).await.unwrap();
        let row = &rows[0];
        assert_eq!(row.cell(3), "HOLD:PENDING");
        assert_eq!(row.cell(4), "HOLD:PENDING");
        assert_eq!(row.cell(5), "");
    }

    #[tokio::test]
    async fn set_status_updates_matching_bookings() {
        let store = InMemoryBookingStore::new(24);
        let record = BookingRecord {
            booking_id: "BKG-00000000AA".to_string(),
            student_id: "1234567".to_string(),
            date: day(),
            start_time: "09:00 AM".to_string(),
            end_time: "10:00 AM".to_string(),
            room_type: "SOLO-1".to_string(),
            room_id: "SOLO-01".to_string(),
            slots: vec![3, 4],
            created_at: "2030-05-01T10:00:00Z".to_string(),
            status: BookingStatus::Active,
        };
        store.append_booking(&record).await.unwrap();
        store
            .set_status(&["BKG-00000000AA".to_string()], BookingStatus::Cancelled)
            .await
            .unwrap();

        let stored = store.list_bookings(day()).await.unwrap();
        assert_eq!(stored[0].status, BookingStatus::Cancelled);
        assert!(store.list_bookings(day().succ_opt().unwrap()).await.unwrap().is_empty());
    }
}
