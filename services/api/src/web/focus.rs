//! services/api/src/web/focus.rs
//!
//! The focus-zone timer: control endpoints plus the background task that
//! advances the countdown once a second.

use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use study_planner_core::focus::{FocusTimer, TickOutcome, TimerState, FOCUS_PRESETS};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;
use utoipa::ToSchema;

use crate::web::state::AppState;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Serialize)]
pub struct FocusStatus {
    pub state: TimerState,
    pub duration_minutes: u32,
    /// `MM:SS`
    pub remaining: String,
    pub progress_percent: f64,
    pub presets: [u32; 3],
}

impl From<&FocusTimer> for FocusStatus {
    fn from(timer: &FocusTimer) -> Self {
        Self {
            state: timer.state(),
            duration_minutes: timer.duration_minutes(),
            remaining: timer.remaining_display(),
            progress_percent: timer.progress_percent(),
            presets: FOCUS_PRESETS,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct DurationRequest {
    /// Clamped to 1..=180.
    pub minutes: u32,
}

/// Advances `timer` every [`TICK_INTERVAL`] until the handle is aborted.
pub fn spawn_focus_ticker(timer: Arc<Mutex<FocusTimer>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let mut timer = timer.lock().await;
            if timer.tick(TICK_INTERVAL) == TickOutcome::Finished {
                info!(
                    "Focus session of {} minutes finished",
                    timer.duration_minutes()
                );
            }
        }
    })
}

async fn apply(state: &AppState, action: impl FnOnce(&mut FocusTimer)) -> Json<FocusStatus> {
    let mut timer = state.focus.lock().await;
    action(&mut timer);
    Json(FocusStatus::from(&*timer))
}

/// GET /focus
#[utoipa::path(get, path = "/focus", responses((status = 200, description = "Timer status")))]
pub async fn focus_status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    apply(&state, |_| {}).await
}

/// PUT /focus/duration - Set the length; ignored while running
#[utoipa::path(
    put,
    path = "/focus/duration",
    request_body = DurationRequest,
    responses((status = 200, description = "Timer status"))
)]
pub async fn focus_duration_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DurationRequest>,
) -> impl IntoResponse {
    apply(&state, |timer| timer.set_duration(req.minutes)).await
}

/// POST /focus/toggle - Start or pause
#[utoipa::path(post, path = "/focus/toggle", responses((status = 200, description = "Timer status")))]
pub async fn focus_toggle_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    apply(&state, FocusTimer::toggle).await
}

/// POST /focus/reset
#[utoipa::path(post, path = "/focus/reset", responses((status = 200, description = "Timer status")))]
pub async fn focus_reset_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    apply(&state, FocusTimer::reset).await
}
