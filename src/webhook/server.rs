// HTTP surface of the bot: the Dialogflow fulfillment endpoint plus a health
// probe and an optional session dump.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::core::booking::{BookingService, BookingStore};
use crate::infra::session::InMemorySessionStore;

use super::dialogflow::{WebhookRequest, WebhookResponse};
use super::error::WebhookError;
use super::handlers;

/// Dialogflow requests are a few KiB at most.
pub const MAX_BODY_SIZE: usize = 65_536;

pub type SharedBookingService = Arc<BookingService<Box<dyn BookingStore>>>;

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub booking: SharedBookingService,
    pub sessions: Arc<InMemorySessionStore>,
    pub timezone: Tz,
    pub debug_endpoints: bool,
    /// Deadline for handling one webhook call, spreadsheet round trips included.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(booking: SharedBookingService, timezone: Tz, debug_endpoints: bool) -> Self {
        Self {
            booking,
            sessions: Arc::new(InMemorySessionStore::new()),
            timezone,
            debug_endpoints,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Today's date at the library.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let state = AppState {
        request_timeout,
        ..state
    };
    let mut router = Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/healthz", get(handle_health));
    if state.debug_endpoints {
        router = router.route("/debug/session", get(handle_debug_session));
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        // Only slow clients hit this; handler deadlines answer with a 500 first.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout * 2,
        ))
        // Dialogflow Messenger embeds call from arbitrary origins.
        .layer(CorsLayer::permissive())
}

/// POST /webhook
async fn handle_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookError> {
    let started = Instant::now();

    let request: WebhookRequest = serde_json::from_slice(&body)
        .map_err(|e| WebhookError::BadRequest(e.to_string()))?;
    let intent = request.intent_name().to_string();
    let response_id = request.response_id.as_deref().unwrap_or("-");
    tracing::info!(%intent, session = %request.session, response_id, "Incoming intent");

    let result = tokio::time::timeout(state.request_timeout, handlers::dispatch(&state, &request))
        .await
        .unwrap_or(Err(WebhookError::TimedOut(state.request_timeout)));

    tracing::info!(
        %intent,
        session = %request.session,
        response_id,
        ok = result.is_ok(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Webhook handled"
    );
    result.map(Json)
}

/// GET /healthz
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

/// GET /debug/session
async fn handle_debug_session(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sessions.snapshot())
}
