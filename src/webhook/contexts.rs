// Context handling for a single webhook turn.
//
// Booking parameters travel between turns in the long-lived `booking_info`
// output context. Each prompt step also has its own short context
// (`prompt_time`, `prompt_size`, ...) that carries what the user said for that
// step. Lookups go: current turn, then the step context, then booking_info.

use serde_json::{Map, Value};

use crate::infra::session::{is_blank, InMemorySessionStore};

use super::dialogflow::{Context, WebhookRequest};

pub const CTX_MENU: &str = "awaiting_menu";
pub const CTX_BOOKING: &str = "booking_info";
pub const CTX_CHECK_FLOW: &str = "check_flow";
pub const CTX_READY_TO_BOOK: &str = "ready_to_book";
pub const CTX_AWAIT_CONFIRM: &str = "awaiting_confirmation";
pub const CTX_PROMPT_TIME: &str = "prompt_time";
pub const CTX_PROMPT_SIZE: &str = "prompt_size";
pub const CTX_PROMPT_CATEGORY: &str = "prompt_category";

pub const STICKY_LIFESPAN: u32 = 50;
pub const STEP_LIFESPAN: u32 = 5;

/// Fields describing a held room. They go stale as soon as the date, time or
/// group size changes.
pub const STAGED_ROOM_KEYS: [&str; 6] = [
    "room_id",
    "room_type",
    "slots",
    "slots_json",
    "hold_tag",
    "hold_date",
];

/// Booking parameters gathered so far. A `null` value means "clear this key"
/// when the state is written back.
pub type BookingState = Map<String, Value>;

/// Which step context backs each booking parameter.
const STEP_KEYS: [(&str, &str); 10] = [
    ("date", CTX_PROMPT_TIME),
    ("explicit_date", CTX_PROMPT_TIME),
    ("booking_time", CTX_PROMPT_SIZE),
    ("room_size", CTX_PROMPT_CATEGORY),
    ("room_category", CTX_AWAIT_CONFIRM),
    ("student_id", CTX_AWAIT_CONFIRM),
    ("room_type", CTX_AWAIT_CONFIRM),
    ("room_id", CTX_AWAIT_CONFIRM),
    ("slots", CTX_AWAIT_CONFIRM),
    ("time", CTX_AWAIT_CONFIRM),
];

/// Read-only view of one webhook request.
pub struct Turn<'a> {
    request: &'a WebhookRequest,
}

impl<'a> Turn<'a> {
    pub fn new(request: &'a WebhookRequest) -> Self {
        Self { request }
    }

    pub fn session(&self) -> &'a str {
        &self.request.session
    }

    pub fn intent(&self) -> &'a str {
        self.request.intent_name()
    }

    pub fn language_code(&self) -> &'a str {
        self.request.language_code()
    }

    pub fn context_name(&self, short_name: &str) -> String {
        format!("{}/contexts/{}", self.request.session, short_name)
    }

    fn context(&self, short_name: &str) -> Option<&'a Context> {
        self.request
            .query_result
            .output_contexts
            .iter()
            .find(|ctx| ctx.short_name().eq_ignore_ascii_case(short_name))
    }

    /// Parameters of an incoming context, empty if the context is absent.
    pub fn context_params(&self, short_name: &str) -> BookingState {
        self.context(short_name)
            .map(|ctx| ctx.parameters.clone())
            .unwrap_or_default()
    }

    /// A non-blank parameter from the current turn only.
    pub fn turn_param(&self, key: &str) -> Option<&'a Value> {
        self.request
            .query_result
            .parameters
            .get(key)
            .filter(|v| !is_blank(v))
    }

    /// Non-blank parameters of the current turn.
    pub fn turn_params(&self) -> BookingState {
        self.request
            .query_result
            .parameters
            .iter()
            .filter(|(_, v)| !is_blank(v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn context_param(&self, short_name: &str, key: &str) -> Option<&'a Value> {
        self.context(short_name)
            .and_then(|ctx| ctx.parameters.get(key))
            .filter(|v| !is_blank(v))
    }

    /// Current turn, then the step context, then booking_info.
    pub fn param_from_steps(&self, key: &str, step: &str) -> Option<&'a Value> {
        self.turn_param(key)
            .or_else(|| self.context_param(step, key))
            .or_else(|| self.context_param(CTX_BOOKING, key))
    }

    /// Every booking parameter that can be found for this turn.
    pub fn collect_state(&self) -> BookingState {
        STEP_KEYS
            .iter()
            .filter_map(|(key, step)| {
                self.param_from_steps(key, step)
                    .map(|v| (key.to_string(), v.clone()))
            })
            .collect()
    }

    /// Clears staged room fields when the date, time or size in `state` no
    /// longer match the incoming booking_info.
    pub fn invalidate_stale_room(&self, state: &mut BookingState) {
        let previous = self.context_params(CTX_BOOKING);
        let date_of = |m: &BookingState| {
            non_blank(m, "date")
                .or_else(|| non_blank(m, "explicit_date"))
                .cloned()
        };

        let changed = date_of(&previous) != date_of(state)
            || non_blank(&previous, "booking_time") != non_blank(state, "booking_time")
            || non_blank(&previous, "room_size") != non_blank(state, "room_size");
        if changed {
            clear_staged_room(state);
            tracing::debug!(session = self.session(), "Inputs changed, dropped staged room");
        }
    }

    /// Output contexts that keep booking_info alive.
    ///
    /// The incoming booking_info parameters are merged with `state` (state
    /// wins) and also written to the session store. `extra` contexts are
    /// opened with the given lifespans. The menu context is closed unless
    /// `keep_menu` is set.
    pub fn sticky_contexts(
        &self,
        sessions: &InMemorySessionStore,
        state: &BookingState,
        extra: &[(&str, u32)],
        keep_menu: bool,
    ) -> Vec<Context> {
        let mut merged = self.context_params(CTX_BOOKING);
        for (key, value) in state {
            merged.insert(key.clone(), value.clone());
        }
        sessions.merge(self.session(), &merged);

        let mut contexts = vec![Context {
            name: self.context_name(CTX_BOOKING),
            lifespan_count: Some(STICKY_LIFESPAN),
            parameters: merged,
        }];
        contexts.extend(extra.iter().map(|(name, lifespan)| self.bare_context(name, *lifespan)));
        if !keep_menu {
            contexts.push(self.bare_context(CTX_MENU, 0));
        }
        contexts
    }

    /// A context without parameters. Lifespan 0 closes it.
    pub fn bare_context(&self, short_name: &str, lifespan: u32) -> Context {
        Context {
            name: self.context_name(short_name),
            lifespan_count: Some(lifespan),
            parameters: Map::new(),
        }
    }
}

pub fn non_blank<'m>(state: &'m BookingState, key: &str) -> Option<&'m Value> {
    state.get(key).filter(|v| !is_blank(v))
}

pub fn clear_staged_room(state: &mut BookingState) {
    for key in STAGED_ROOM_KEYS {
        state.insert(key.to_string(), Value::Null);
    }
}
