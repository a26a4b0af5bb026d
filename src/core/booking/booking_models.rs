// Domain models for the study-room booking system.
// Nothing in here knows about Dialogflow or Google Sheets; the sheet layout
// lives in the infra layer and the conversation handling in the webhook layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dates are stored and displayed as `dd/mm/YYYY`.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Times are displayed (and stored in Bookings) as `02:00 PM`.
pub const TIME_FORMAT: &str = "%I:%M %p";

/// Schedule cells starting with this prefix are temporary holds.
pub const HOLD_PREFIX: &str = "HOLD:";

/// Smallest and largest group the library has rooms for.
pub const MIN_GROUP: u32 = 1;
pub const MAX_GROUP: u32 = 9;

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

// ============================================================================
// ROOMS
// ============================================================================

/// The pool a room belongs to. This is the `room_type` column of the Rooms sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomBucket {
    Solo,
    Small,
    Medium,
    Large,
}

impl RoomBucket {
    pub const ALL: [RoomBucket; 4] = [
        RoomBucket::Solo,
        RoomBucket::Small,
        RoomBucket::Medium,
        RoomBucket::Large,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomBucket::Solo => "solo",
            RoomBucket::Small => "small",
            RoomBucket::Medium => "medium",
            RoomBucket::Large => "large",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "solo" => Some(RoomBucket::Solo),
            "small" => Some(RoomBucket::Small),
            "medium" => Some(RoomBucket::Medium),
            "large" => Some(RoomBucket::Large),
            _ => None,
        }
    }

    /// How many rooms of this kind the library has.
    pub fn room_count(&self) -> u32 {
        match self {
            RoomBucket::Solo => 18,
            RoomBucket::Small => 22,
            RoomBucket::Medium => 13,
            RoomBucket::Large => 8,
        }
    }

    /// Inclusive (min, max) group size.
    pub fn capacity(&self) -> (u32, u32) {
        match self {
            RoomBucket::Solo => (1, 1),
            RoomBucket::Small => (2, 3),
            RoomBucket::Medium => (4, 6),
            RoomBucket::Large => (7, 9),
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            RoomBucket::Solo => "SOLO",
            RoomBucket::Small => "S",
            RoomBucket::Medium => "M",
            RoomBucket::Large => "L",
        }
    }

    /// Room id for the n-th room of this bucket, e.g. `S-07`.
    pub fn room_id(&self, n: u32) -> String {
        format!("{}-{:02}", self.id_prefix(), n)
    }
}

/// What the user asked for: a room to themselves or a discussion room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomCategory {
    Solo,
    Discussion,
}

impl RoomCategory {
    /// 1 person gets a solo room, 2..=9 a discussion room, anything else is unsupported.
    pub fn from_group_size(size: u32) -> Option<Self> {
        match size {
            1 => Some(RoomCategory::Solo),
            n if (MIN_GROUP..=MAX_GROUP).contains(&n) => Some(RoomCategory::Discussion),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomCategory::Solo => "solo",
            RoomCategory::Discussion => "discussion",
        }
    }
}

/// Internal room type code stored on bookings (`SOLO-1`, `DISCUSSION-S`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomType {
    Solo,
    DiscussionSmall,
    DiscussionMedium,
    DiscussionLarge,
}

impl RoomType {
    pub fn code(&self) -> &'static str {
        match self {
            RoomType::Solo => "SOLO-1",
            RoomType::DiscussionSmall => "DISCUSSION-S",
            RoomType::DiscussionMedium => "DISCUSSION-M",
            RoomType::DiscussionLarge => "DISCUSSION-L",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "SOLO-1" => Some(RoomType::Solo),
            "DISCUSSION-S" => Some(RoomType::DiscussionSmall),
            "DISCUSSION-M" => Some(RoomType::DiscussionMedium),
            "DISCUSSION-L" => Some(RoomType::DiscussionLarge),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RoomType::Solo => "Solo room",
            RoomType::DiscussionSmall => "Small discussion room",
            RoomType::DiscussionMedium => "Medium discussion room",
            RoomType::DiscussionLarge => "Large discussion room",
        }
    }

    pub fn bucket(&self) -> RoomBucket {
        match self {
            RoomType::Solo => RoomBucket::Solo,
            RoomType::DiscussionSmall => RoomBucket::Small,
            RoomType::DiscussionMedium => RoomBucket::Medium,
            RoomType::DiscussionLarge => RoomBucket::Large,
        }
    }

    pub fn from_size_and_category(size: u32, category: RoomCategory) -> Option<Self> {
        match (category, size) {
            (RoomCategory::Solo, _) => Some(RoomType::Solo),
            (RoomCategory::Discussion, 2..=3) => Some(RoomType::DiscussionSmall),
            (RoomCategory::Discussion, 4..=6) => Some(RoomType::DiscussionMedium),
            (RoomCategory::Discussion, 7..=9) => Some(RoomType::DiscussionLarge),
            _ => None,
        }
    }

    /// Picks the room type for a group, using the auto category for that size.
    pub fn for_group(size: u32) -> Option<Self> {
        RoomCategory::from_group_size(size)
            .and_then(|category| Self::from_size_and_category(size, category))
    }
}

/// Display name for a stored room type code, falling back to the raw code.
pub fn display_room_type(code: &str) -> String {
    match RoomType::from_code(code) {
        Some(room_type) => room_type.display_name().to_string(),
        None if code.is_empty() => "room".to_string(),
        None => code.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub room_id: String,
    pub bucket: RoomBucket,
    pub capacity_min: u32,
    pub capacity_max: u32,
}

impl Room {
    pub fn new(room_id: impl Into<String>, bucket: RoomBucket) -> Self {
        let (capacity_min, capacity_max) = bucket.capacity();
        Self {
            room_id: room_id.into(),
            bucket,
            capacity_min,
            capacity_max,
        }
    }
}

/// The rooms seeded into an empty Rooms sheet: solo, small, medium, then large.
pub fn default_room_inventory() -> Vec<Room> {
    RoomBucket::ALL
        .iter()
        .flat_map(|bucket| (1..=bucket.room_count()).map(move |n| Room::new(bucket.room_id(n), *bucket)))
        .collect()
}

// ============================================================================
// SCHEDULE
// ============================================================================

/// One room's slot cells for one day. `cells[0]` is slot S1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub room_id: String,
    pub cells: Vec<String>,
}

impl ScheduleRow {
    /// The cell for a 1-based slot index. Missing trailing cells read as empty.
    pub fn cell(&self, slot: u32) -> &str {
        slot.checked_sub(1)
            .and_then(|i| self.cells.get(i as usize))
            .map(|c| c.trim())
            .unwrap_or("")
    }

    pub fn is_free(&self, slots: &[u32]) -> bool {
        slots.iter().all(|slot| self.cell(*slot).is_empty())
    }
}

/// A value to write into some of a room's slot cells on a given day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotWrite {
    pub room_id: String,
    pub slots: Vec<u32>,
    pub value: String,
}

/// Merges slot indices into inclusive runs of consecutive slots.
///
/// `[18, 17, 19, 22]` becomes `[(17, 19), (22, 22)]`, which lets the sheet
/// store write each run as a single range.
pub fn slot_runs(slots: &[u32]) -> Vec<(u32, u32)> {
    let mut sorted = slots.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut runs: Vec<(u32, u32)> = Vec::new();
    for slot in sorted {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == slot => *end = slot,
            _ => runs.push((slot, slot)),
        }
    }
    runs
}

// ============================================================================
// BOOKINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Active,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "active",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(BookingStatus::Active),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// One row of the Bookings sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRecord {
    pub booking_id: String,
    pub student_id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    /// Room type code, kept as text so unknown codes in the sheet survive a round trip.
    pub room_type: String,
    pub room_id: String,
    pub slots: Vec<u32>,
    pub created_at: String,
    pub status: BookingStatus,
}

impl BookingRecord {
    pub fn is_active_for(&self, student_id: &str, date: NaiveDate) -> bool {
        self.status == BookingStatus::Active && self.student_id == student_id && self.date == date
    }
}
