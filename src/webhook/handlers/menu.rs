// Main menu intents.

use crate::webhook::contexts::{
    clear_staged_room, BookingState, Turn, CTX_AWAIT_CONFIRM, CTX_BOOKING, CTX_CHECK_FLOW,
    CTX_MENU, CTX_READY_TO_BOOK, STEP_LIFESPAN,
};
use crate::webhook::dialogflow::WebhookResponse;
use crate::webhook::responses;
use crate::webhook::server::AppState;

use super::inputs::ReadyInputs;
use super::{EVT_BOOK, EVT_CANCEL, EVT_CHECK};

/// Starts over: forgets the session and shows the menu.
pub fn welcome(app: &AppState, turn: &Turn<'_>) -> WebhookResponse {
    app.sessions.reset(turn.session());

    WebhookResponse::lines(responses::WELCOME).with_contexts(vec![
        turn.bare_context(CTX_BOOKING, 0),
        turn.bare_context(CTX_CHECK_FLOW, 0),
        turn.bare_context(CTX_READY_TO_BOOK, 0),
        turn.bare_context(CTX_AWAIT_CONFIRM, 0),
        turn.bare_context(CTX_MENU, STEP_LIFESPAN),
    ])
}

/// Menu options 1 and 2. If the user already gave everything, go straight to
/// booking; otherwise start the step-wise availability flow.
pub fn menu_start(app: &AppState, turn: &Turn<'_>) -> WebhookResponse {
    let mut booking = turn.collect_state();

    match ReadyInputs::from_state(&booking, app.today(), app.booking.hours()) {
        Some(ready) => {
            ready.commit(&mut booking);
            clear_staged_room(&mut booking);
            let contexts = turn.sticky_contexts(
                &app.sessions,
                &booking,
                &[(CTX_READY_TO_BOOK, STEP_LIFESPAN)],
                true,
            );
            WebhookResponse::text("")
                .with_contexts(contexts)
                .with_event(EVT_BOOK, turn.language_code())
        }
        None => {
            let contexts = turn.sticky_contexts(&app.sessions, &booking, &[], true);
            WebhookResponse::text("")
                .with_contexts(contexts)
                .with_event(EVT_CHECK, turn.language_code())
        }
    }
}

pub fn menu_cancel(turn: &Turn<'_>) -> WebhookResponse {
    WebhookResponse::text(responses::MENU_CANCEL).with_event(EVT_CANCEL, turn.language_code())
}

pub fn library_info(app: &AppState, turn: &Turn<'_>) -> WebhookResponse {
    let contexts = turn.sticky_contexts(&app.sessions, &BookingState::new(), &[], false);
    WebhookResponse::lines(responses::LIBRARY_INFO).with_contexts(contexts)
}

pub fn fallback() -> WebhookResponse {
    WebhookResponse::text(responses::FALLBACK)
}
