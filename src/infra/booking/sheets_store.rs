// Google Sheets implementation of BookingStore.
//
// Layout (row 1 is always the header row):
//
//   Rooms:    room_id | room_type | capacity_min | capacity_max
//   Schedule: date | room_id | room_type | S1 .. Sn
//   Bookings: booking_id | student_id | date | start_time | end_time |
//             room_type | room_id | slots_json | created_at | status
//
// Schedule rows are created lazily, one per (date, room), the first time a
// date is looked at. Slot S1 lives in column D.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::core::booking::booking_models::{
    default_room_inventory, format_date, parse_date, slot_runs,
};
use crate::core::booking::{
    BookingRecord, BookingStatus, BookingStore, Room, RoomBucket, ScheduleRow, SlotWrite,
    StoreError,
};
use crate::infra::google_sheets::a1;
use crate::infra::google_sheets::{SheetsClient, SheetsError};

pub const ROOMS_SHEET: &str = "Rooms";
pub const SCHEDULE_SHEET: &str = "Schedule";
pub const BOOKINGS_SHEET: &str = "Bookings";

pub const ROOMS_HEADERS: [&str; 4] = ["room_id", "room_type", "capacity_min", "capacity_max"];
pub const BOOKINGS_HEADERS: [&str; 10] = [
    "booking_id",
    "student_id",
    "date",
    "start_time",
    "end_time",
    "room_type",
    "room_id",
    "slots_json",
    "created_at",
    "status",
];

/// Columns before S1 in the Schedule sheet.
const SCHEDULE_LEAD_COLUMNS: u32 = 3;
const STATUS_COLUMN: u32 = 10;

impl From<SheetsError> for StoreError {
    fn from(err: SheetsError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub fn schedule_headers(slots_per_day: u32) -> Vec<String> {
    ["date", "room_id", "room_type"]
        .iter()
        .map(|h| h.to_string())
        .chain((1..=slots_per_day).map(|n| format!("S{}", n)))
        .collect()
}

pub struct SheetsBookingStore {
    client: SheetsClient,
    slots_per_day: u32,
}

impl SheetsBookingStore {
    /// Wraps the client and makes sure the spreadsheet is ready: all three
    /// worksheets exist with their header rows, and Rooms has the inventory.
    pub async fn connect(client: SheetsClient, slots_per_day: u32) -> Result<Self, StoreError> {
        let store = Self {
            client,
            slots_per_day,
        };
        store.ensure_layout().await?;
        store.seed_rooms_if_empty().await?;
        tracing::debug!(
            spreadsheet_id = store.client.spreadsheet_id(),
            "Worksheets and headers in place"
        );
        Ok(store)
    }

    async fn ensure_layout(&self) -> Result<(), StoreError> {
        let existing = self.client.sheet_properties().await?;
        let layouts: [(&str, Vec<String>, u32); 3] = [
            (ROOMS_SHEET, to_strings(&ROOMS_HEADERS), 200),
            (SCHEDULE_SHEET, schedule_headers(self.slots_per_day), 2000),
            (BOOKINGS_SHEET, to_strings(&BOOKINGS_HEADERS), 200),
        ];

        for (title, headers, default_rows) in layouts {
            let width = headers.len() as u32;
            match existing.iter().find(|sheet| sheet.title == title) {
                None => {
                    self.client
                        .add_sheet(title, default_rows, width.max(26))
                        .await?;
                }
                Some(sheet) if sheet.column_count < width => {
                    tracing::info!(title, from = sheet.column_count, to = width, "Growing worksheet");
                    self.client.set_column_count(sheet.sheet_id, width).await?;
                }
                Some(_) => {}
            }

            let header_range = a1::range(title, &a1::cell(1, 1), &a1::cell(1, width));
            self.client.update_values(&header_range, vec![headers]).await?;
        }
        Ok(())
    }

    async fn seed_rooms_if_empty(&self) -> Result<(), StoreError> {
        let values = self.client.get_values(&rooms_range()).await?;
        if values.len() > 1 {
            return Ok(());
        }

        let rows: Vec<Vec<String>> = default_room_inventory().iter().map(room_to_row).collect();
        tracing::info!(count = rows.len(), "Seeding Rooms worksheet");
        self.client.append_rows(&rooms_range(), rows).await?;
        Ok(())
    }

    /// room_id -> 1-based sheet row for every Schedule row on `date`.
    async fn schedule_index(&self, date: NaiveDate) -> Result<HashMap<String, u32>, StoreError> {
        let date_str = format_date(date);
        let values = self
            .client
            .get_values(&a1::columns(SCHEDULE_SHEET, 1, 2))
            .await?;

        Ok(values
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, row)| row.first().map(|d| d.trim()) == Some(date_str.as_str()))
            .filter_map(|(i, row)| {
                let room_id = row.get(1)?.trim();
                (!room_id.is_empty()).then(|| (room_id.to_string(), i as u32 + 1))
            })
            .collect())
    }

    fn slot_range(&self, row: u32, first: u32, last: u32) -> String {
        a1::range(
            SCHEDULE_SHEET,
            &a1::cell(row, SCHEDULE_LEAD_COLUMNS + first),
            &a1::cell(row, SCHEDULE_LEAD_COLUMNS + last),
        )
    }

    /// Every Bookings row with its 1-based sheet row number.
    async fn booking_rows(&self) -> Result<Vec<(u32, Vec<String>)>, StoreError> {
        let values = self.client.get_values(&bookings_range()).await?;
        Ok(values
            .into_iter()
            .enumerate()
            .skip(1)
            .map(|(i, row)| (i as u32 + 1, row))
            .collect())
    }
}

#[async_trait]
impl BookingStore for SheetsBookingStore {
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let values = self.client.get_values(&rooms_range()).await?;
        Ok(values.iter().skip(1).filter_map(|row| row_to_room(row)).collect())
    }

    async fn load_schedule(
        &self,
        date: NaiveDate,
        rooms: &[Room],
    ) -> Result<Vec<ScheduleRow>, StoreError> {
        let mut index = self.schedule_index(date).await?;

        let missing: Vec<&Room> = rooms
            .iter()
            .filter(|room| !index.contains_key(&room.room_id))
            .collect();
        if !missing.is_empty() {
            let date_str = format_date(date);
            let rows: Vec<Vec<String>> = missing
                .iter()
                .map(|room| {
                    let mut row = vec![
                        date_str.clone(),
                        room.room_id.clone(),
                        room.bucket.as_str().to_string(),
                    ];
                    row.extend(std::iter::repeat(String::new()).take(self.slots_per_day as usize));
                    row
                })
                .collect();
            tracing::debug!(date = %date_str, count = rows.len(), "Creating schedule rows");
            self.client
                .append_rows(&a1::columns(SCHEDULE_SHEET, 1, SCHEDULE_LEAD_COLUMNS), rows)
                .await?;
            index = self.schedule_index(date).await?;
        }

        let mut located = Vec::with_capacity(rooms.len());
        let mut ranges = Vec::with_capacity(rooms.len());
        for room in rooms {
            match index.get(&room.room_id) {
                Some(row) => {
                    ranges.push(self.slot_range(*row, 1, self.slots_per_day));
                    located.push(room);
                }
                None => {
                    tracing::warn!(room_id = %room.room_id, "Schedule row missing after append");
                }
            }
        }
        if ranges.is_empty() {
            return Ok(Vec::new());
        }

        let blocks = self.client.batch_get(&ranges).await?;
        Ok(located
            .into_iter()
            .zip(blocks.into_iter().chain(std::iter::repeat(Vec::new())))
            .map(|(room, block)| ScheduleRow {
                room_id: room.room_id.clone(),
                cells: block.into_iter().next().unwrap_or_default(),
            })
            .collect())
    }

    async fn write_slots(&self, date: NaiveDate, writes: &[SlotWrite]) -> Result<(), StoreError> {
        let index = self.schedule_index(date).await?;

        let mut data = Vec::new();
        for write in writes {
            let Some(row) = index.get(&write.room_id) else {
                tracing::warn!(room_id = %write.room_id, %date, "No schedule row, skipping write");
                continue;
            };
            for (first, last) in slot_runs(&write.slots) {
                let width = (last - first + 1) as usize;
                data.push((
                    self.slot_range(*row, first, last),
                    vec![vec![write.value.clone(); width]],
                ));
            }
        }

        self.client.batch_update_values(data).await?;
        Ok(())
    }

    async fn list_bookings(&self, date: NaiveDate) -> Result<Vec<BookingRecord>, StoreError> {
        Ok(self
            .booking_rows()
            .await?
            .iter()
            .filter_map(|(_, row)| row_to_booking(row))
            .filter(|booking| booking.date == date)
            .collect())
    }

    async fn append_booking(&self, record: &BookingRecord) -> Result<(), StoreError> {
        let row = booking_to_row(record)?;
        self.client.append_rows(&bookings_range(), vec![row]).await?;
        Ok(())
    }

    async fn set_status(
        &self,
        booking_ids: &[String],
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        let data: Vec<(String, Vec<Vec<String>>)> = self
            .booking_rows()
            .await?
            .into_iter()
            .filter(|(_, row)| {
                row.first()
                    .is_some_and(|id| booking_ids.iter().any(|b| b == id.trim()))
            })
            .map(|(row_number, _)| {
                let cell = a1::cell(row_number, STATUS_COLUMN);
                (
                    a1::range(BOOKINGS_SHEET, &cell, &cell),
                    vec![vec![status.as_str().to_string()]],
                )
            })
            .collect();

        self.client.batch_update_values(data).await?;
        Ok(())
    }
}

// =============================================================================
// ROW CONVERSIONS
// =============================================================================

fn rooms_range() -> String {
    a1::columns(ROOMS_SHEET, 1, ROOMS_HEADERS.len() as u32)
}

fn bookings_range() -> String {
    a1::columns(BOOKINGS_SHEET, 1, BOOKINGS_HEADERS.len() as u32)
}

fn to_strings(headers: &[&str]) -> Vec<String> {
    headers.iter().map(|h| h.to_string()).collect()
}

fn room_to_row(room: &Room) -> Vec<String> {
    vec![
        room.room_id.clone(),
        room.bucket.as_str().to_string(),
        room.capacity_min.to_string(),
        room.capacity_max.to_string(),
    ]
}

fn row_to_room(row: &[String]) -> Option<Room> {
    let room_id = row.first()?.trim();
    if room_id.is_empty() {
        return None;
    }
    let Some(bucket) = row.get(1).and_then(|b| RoomBucket::parse(b)) else {
        tracing::warn!(room_id, "Skipping room with unknown room_type");
        return None;
    };

    let mut room = Room::new(room_id, bucket);
    if let Some(min) = row.get(2).and_then(|v| v.trim().parse().ok()) {
        room.capacity_min = min;
    }
    if let Some(max) = row.get(3).and_then(|v| v.trim().parse().ok()) {
        room.capacity_max = max;
    }
    Some(room)
}

fn booking_to_row(record: &BookingRecord) -> Result<Vec<String>, serde_json::Error> {
    Ok(vec![
        record.booking_id.clone(),
        record.student_id.clone(),
        format_date(record.date),
        record.start_time.clone(),
        record.end_time.clone(),
        record.room_type.clone(),
        record.room_id.clone(),
        serde_json::to_string(&record.slots)?,
        record.created_at.clone(),
        record.status.as_str().to_string(),
    ])
}

/// Rows with an unparsable date or status are skipped. A broken `slots_json`
/// reads as no slots.
fn row_to_booking(row: &[String]) -> Option<BookingRecord> {
    let field = |i: usize| row.get(i).map(|v| v.trim().to_string()).unwrap_or_default();

    let booking_id = field(0);
    if booking_id.is_empty() {
        return None;
    }
    let date = parse_date(&field(2))?;
    let status = BookingStatus::parse(&field(9))?;
    let slots = serde_json::from_str::<Vec<u32>>(&field(7)).unwrap_or_else(|_| {
        tracing::warn!(%booking_id, "Unreadable slots_json");
        Vec::new()
    });

    Some(BookingRecord {
        booking_id,
        student_id: field(1),
        date,
        start_time: field(3),
        end_time: field(4),
        room_type: field(5),
        room_id: field(6),
        slots,
        created_at: field(8),
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::google_sheets::sheets_client::tests::client_for;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 8, 4).unwrap()
    }

    #[test]
    fn schedule_headers_follow_slot_count() {
        let headers = schedule_headers(24);
        assert_eq!(headers.len(), 27);
        assert_eq!(headers[3], "S1");
        assert_eq!(headers[26], "S24");
        assert_eq!(schedule_headers(32).last().unwrap(), "S32");
    }

    #[test]
    fn booking_rows_round_trip() {
        let record = BookingRecord {
            booking_id: "BKG-0123456789".to_string(),
            student_id: "1234567".to_string(),
            date: day(),
            start_time: "02:00 PM".to_string(),
            end_time: "03:00 PM".to_string(),
            room_type: "DISCUSSION-S".to_string(),
            room_id: "S-03".to_string(),
            slots: vec![13, 14],
            created_at: "2030-08-01T09:00:00Z".to_string(),
            status: BookingStatus::Active,
        };
        let sheet_row = booking_to_row(&record).unwrap();
        assert_eq!(sheet_row[2], "04/08/2030");
        assert_eq!(sheet_row[7], "[13,14]");
        assert_eq!(row_to_booking(&sheet_row), Some(record));
    }

    #[test]
    fn unreadable_booking_rows_are_skipped() {
        assert_eq!(row_to_booking(&row(&["", "1234567"])), None);
        assert_eq!(
            row_to_booking(&row(&["BKG-1", "1234567", "2030-08-04", "", "", "", "", "[]", "", "active"])),
            None
        );
        let partial = row_to_booking(&row(&[
            "BKG-1", "1234567", "04/08/2030", "", "", "", "S-01", "oops", "", "cancelled",
        ]))
        .unwrap();
        assert!(partial.slots.is_empty());
        assert_eq!(partial.status, BookingStatus::Cancelled);
    }

    #[test]
    fn room_rows_parse_with_fallback_capacity() {
        let room = row_to_room(&row(&["M-02", "medium", "4", "6"])).unwrap();
        assert_eq!(room, Room::new("M-02", RoomBucket::Medium));
        let room = row_to_room(&row(&["L-01", "large"])).unwrap();
        assert_eq!(room.capacity_max, 9);
        assert_eq!(row_to_room(&row(&["X-01", "attic", "1", "1"])), None);
    }

    fn all_sheets_present() -> serde_json::Value {
        json!({
            "sheets": [
                { "properties": { "sheetId": 1, "title": "Rooms",
                  "gridProperties": { "rowCount": 200, "columnCount": 26 } } },
                { "properties": { "sheetId": 2, "title": "Schedule",
                  "gridProperties": { "rowCount": 2000, "columnCount": 26 } } },
                { "properties": { "sheetId": 3, "title": "Bookings",
                  "gridProperties": { "rowCount": 200, "columnCount": 26 } } }
            ]
        })
    }

    #[tokio::test]
    async fn connect_grows_schedule_and_seeds_rooms() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(all_sheets_present()))
            .mount(&server)
            .await;
        // Schedule needs 27 columns, it only has 26
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-1:batchUpdate"))
            .and(body_partial_json(json!({
                "requests": [{ "updateSheetProperties": {
                    "properties": { "sheetId": 2, "gridProperties": { "columnCount": 27 } }
                } }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "replies": [{}] })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/'Rooms'!A:D"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [["room_id", "room_type", "capacity_min", "capacity_max"]]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-1/values/'Rooms'!A:D:append"))
            .and(body_partial_json(json!({ "values": [["SOLO-01", "solo", "1", "1"]] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        SheetsBookingStore::connect(client_for(&server), 24)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn load_schedule_reads_existing_rows_in_room_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/'Schedule'!A:B"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [
                    ["date", "room_id"],
                    ["03/08/2030", "S-01"],
                    ["04/08/2030", "S-02"],
                    ["04/08/2030", "S-01"]
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values:batchGet"))
            .and(query_param("ranges", "'Schedule'!D4:AA4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "valueRanges": [
                    { "range": "Schedule!D4:AA4", "values": [["", "BKG-1"]] },
                    { "range": "Schedule!D3:AA3" }
                ]
            })))
            .mount(&server)
            .await;

        let store = SheetsBookingStore {
            client: client_for(&server),
            slots_per_day: 24,
        };
        let rooms = vec![
            Room::new("S-01", RoomBucket::Small),
            Room::new("S-02", RoomBucket::Small),
        ];
        let rows = store.load_schedule(day(), &rooms).await.unwrap();

        assert_eq!(rows[0].room_id, "S-01");
        assert_eq!(rows[0].cell(2), "BKG-1");
        assert!(!rows[0].is_free(&[1, 2]));
        assert_eq!(rows[1].room_id, "S-02");
        assert!(rows[1].is_free(&[1, 2, 3, 4]));
    }

    #[tokio::test]
    async fn write_slots_sends_one_range_per_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/'Schedule'!A:B"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [["date", "room_id"], ["04/08/2030", "M-01"]]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-1/values:batchUpdate"))
            .and(body_partial_json(json!({
                "data": [
                    { "range": "'Schedule'!F2:G2", "values": [["HOLD:1234567", "HOLD:1234567"]] }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let store = SheetsBookingStore {
            client: client_for(&server),
            slots_per_day: 24,
        };
        store
            .write_slots(
                day(),
                &[
                    SlotWrite {
                        room_id: "M-01".to_string(),
                        slots: vec![3, 4],
                        value: "HOLD:1234567".to_string(),
                    },
                    SlotWrite {
                        room_id: "M-09".to_string(),
                        slots: vec![1],
                        value: "HOLD:1234567".to_string(),
                    },
                ],
            )
            .await
            .unwrap();
    }
}
