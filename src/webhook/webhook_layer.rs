// Webhook layer - the Dialogflow-facing adapter.
// Turns fulfillment requests into calls on the booking service and back.

pub mod contexts;
pub mod dialogflow;
pub mod error;
pub mod params;
pub mod responses;
pub mod server;

#[path = "handlers/intent_catalog.rs"]
pub mod handlers;

#[cfg(test)]
mod tests;
