pub mod booking_models;
pub mod booking_service;
pub mod booking_store;
pub mod opening_hours;

pub use booking_models::{
    display_room_type, BookingRecord, BookingStatus, Room, RoomBucket, RoomCategory, RoomType,
    ScheduleRow, SlotWrite,
};
pub use booking_service::{BookingError, BookingService, FinalizeRequest, HeldRoom};
pub use booking_store::{BookingStore, StoreError};
pub use opening_hours::{BookingWindow, OpeningHours, PeriodError};
