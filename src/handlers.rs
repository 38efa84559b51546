use crate::config::Settings;
use crate::errors::AppError;
use crate::models::{
    DiagnosticsResponse, MotionBatch, MotionResponse, ResetResponse, SessionRequest, VisitDraft,
};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    extract::{Path, State},
    response::Html,
    Json,
};
use chrono::Local;
use tokio::time::Instant;
use tracing::{debug, info};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.settings))
}

pub async fn get_config(State(state): State<AppState>) -> Json<Settings> {
    Json(state.settings.as_ref().clone())
}

/// Feeds a batch into the session's detector. Readings without
/// `timestamp_ms` are stamped with the server clock on arrival, so they are
/// only accepted when the batch holds a single reading; otherwise all but
/// the first would land inside the throttle interval.
pub async fn motion(
    State(state): State<AppState>,
    Json(payload): Json<MotionBatch>,
) -> Result<Json<MotionResponse>, AppError> {
    let session = session_id(&payload.session)?;
    if payload.samples.len() > 1
        && payload
            .samples
            .iter()
            .any(|reading| reading.timestamp_ms.is_none())
    {
        return Err(AppError::bad_request(
            "timestamp_ms is required on every sample of a multi-sample batch",
        ));
    }
    let response = apply_batch(&state, session, &payload).await;
    Ok(Json(response))
}

pub async fn reset(
    State(state): State<AppState>,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<ResetResponse>, AppError> {
    let session = session_id(&payload.session)?;
    let mut sessions = state.sessions.lock().await;
    let reset = match sessions.get_mut(session) {
        Some(entry) => {
            entry.detector.reset();
            true
        }
        None => false,
    };
    debug!(session, reset, "motion session reset requested");

    Ok(Json(ResetResponse {
        session: session.to_string(),
        reset,
    }))
}

pub async fn diagnostics(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<DiagnosticsResponse>, AppError> {
    let session = session_id(&raw)?;
    let sessions = state.sessions.lock().await;
    let entry = sessions
        .get(session)
        .ok_or_else(|| AppError::not_found(format!("unknown session '{session}'")))?;

    let detector_state = entry.detector.state();
    Ok(Json(DiagnosticsResponse {
        stats: entry.detector.stats().clone(),
        has_baseline: detector_state.last.is_some(),
        shaking: detector_state.shaking,
        consecutive: detector_state.consecutive,
        cooling_down: detector_state.cooldown_until_ms.is_some(),
        idle_ms: entry
            .last_batch
            .map(|at| u64::try_from(at.elapsed().as_millis()).unwrap_or(u64::MAX)),
        session: session.to_string(),
    }))
}

async fn apply_batch(state: &AppState, session: &str, batch: &MotionBatch) -> MotionResponse {
    let mut sessions = state.sessions.lock().await;
    state.prune_sessions(&mut sessions, Instant::now(), session);
    let entry = sessions
        .entry(session.to_string())
        .or_insert_with(|| state.new_session());

    let mut events = Vec::new();
    for reading in &batch.samples {
        let sample = reading.to_sample(state.now_ms());
        if entry.detector.on_sample(&sample).is_some() {
            let draft = VisitDraft::at(Local::now().naive_local(), &state.settings.annotation);
            info!(session, date = %draft.date, time = %draft.time, "visit logged via shake");
            events.push(draft);
        }
    }
    if !batch.samples.is_empty() {
        entry.last_batch = Some(Instant::now());
    }

    MotionResponse {
        session: session.to_string(),
        events,
        stats: entry.detector.stats().clone(),
    }
}

fn session_id(raw: &str) -> Result<&str, AppError> {
    let session = raw.trim();
    if session.is_empty() {
        return Err(AppError::bad_request("session must not be empty"));
    }
    Ok(session)
}
