// Intent handlers.
// Each group of intents gets its own file; `dispatch` routes by display name.

pub mod availability;
pub mod booking;
pub mod cancellation;
pub mod inputs;
pub mod lookup;
pub mod menu;

use super::contexts::Turn;
use super::dialogflow::{WebhookRequest, WebhookResponse};
use super::error::WebhookError;
use super::server::AppState;

/// Follow-up events that send the conversation into another intent.
pub const EVT_BOOK: &str = "EVT_BOOK";
pub const EVT_CHECK: &str = "EVT_CHECK";
pub const EVT_CANCEL: &str = "EVT_CANCEL";

/// Intents the agent is set up with, by display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownIntent {
    Welcome,
    MenuCheckAvailability,
    MenuBookRoom,
    MenuCancelBooking,
    MenuLibraryInfo,
    CheckAvailability,
    BookRoom,
    ConfirmBooking,
    CancelBooking,
    CancelAfterConfirmation,
    LibraryInfo,
    CheckBooking,
}

impl KnownIntent {
    pub fn from_display_name(name: &str) -> Option<Self> {
        let intent = match name {
            "Welcome" => KnownIntent::Welcome,
            "Menu_CheckAvailability" => KnownIntent::MenuCheckAvailability,
            "Menu_BookRoom" => KnownIntent::MenuBookRoom,
            "Menu_CancelBooking" => KnownIntent::MenuCancelBooking,
            "Menu_LibraryInfo" => KnownIntent::MenuLibraryInfo,
            "CheckAvailability" => KnownIntent::CheckAvailability,
            "book_room" => KnownIntent::BookRoom,
            "ConfirmBooking" => KnownIntent::ConfirmBooking,
            "CancelBooking" => KnownIntent::CancelBooking,
            "CancelAfterConfirmation" => KnownIntent::CancelAfterConfirmation,
            "LibraryInfo" => KnownIntent::LibraryInfo,
            "CheckBooking" => KnownIntent::CheckBooking,
            _ => return None,
        };
        Some(intent)
    }
}

pub async fn dispatch(
    app: &AppState,
    request: &WebhookRequest,
) -> Result<WebhookResponse, WebhookError> {
    let turn = Turn::new(request);
    let Some(intent) = KnownIntent::from_display_name(turn.intent()) else {
        tracing::warn!(intent = turn.intent(), "No handler for intent, sending fallback");
        return Ok(menu::fallback());
    };

    match intent {
        KnownIntent::Welcome => Ok(menu::welcome(app, &turn)),
        KnownIntent::MenuCheckAvailability | KnownIntent::MenuBookRoom => {
            Ok(menu::menu_start(app, &turn))
        }
        KnownIntent::MenuCancelBooking => Ok(menu::menu_cancel(&turn)),
        KnownIntent::MenuLibraryInfo | KnownIntent::LibraryInfo => {
            Ok(menu::library_info(app, &turn))
        }
        KnownIntent::CheckAvailability => Ok(availability::check_availability(app, &turn)),
        KnownIntent::BookRoom => booking::book_room(app, &turn).await,
        KnownIntent::ConfirmBooking => booking::confirm_booking(app, &turn).await,
        KnownIntent::CancelAfterConfirmation => {
            booking::cancel_after_confirmation(app, &turn).await
        }
        KnownIntent::CancelBooking => cancellation::cancel_booking(app, &turn).await,
        KnownIntent::CheckBooking => lookup::check_booking(app, &turn).await,
    }
}
