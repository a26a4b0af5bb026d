// The core module contains all business logic.
// Nothing in here knows about Dialogflow or Google Sheets.

#[path = "booking/mod.rs"]
pub mod booking;
