// The infra module contains implementations of core traits and the clients
// for external services. Each feature implementation goes in its own submodule.

#[path = "google_sheets/mod.rs"]
pub mod google_sheets;

#[path = "booking/mod.rs"]
pub mod booking;

#[path = "session/session_store.rs"]
pub mod session;
