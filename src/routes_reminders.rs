use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::lifecycle::{AdherenceSummary, adherence};
use crate::models::{MAX_DUE_WINDOW_MIN, MAX_SNOOZE_MIN, Medication, MedicationLogEntry, ReminderSettings};
use crate::notify::{format_dose_time, notification_message};
use crate::routes_medications::parse_id;
use crate::scanner::get_due_medications;
use crate::state::SharedState;
use crate::ticker::{ScanReport, scan};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderView {
    pub medication: Medication,
    pub message: String,
    pub next_dose_label: String,
}

impl ReminderView {
    fn new(medication: Medication, now: DateTime<FixedOffset>) -> Self {
        Self {
            message: notification_message(&medication),
            next_dose_label: format_dose_time(medication.next_dose, now),
            medication,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DueQuery {
    pub window_min: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DueResponse {
    pub now: String,
    pub window_min: i64,
    pub due: Vec<ReminderView>,
}

// GET /api/reminders/due?window_min=N
// Read-only lookahead; defaults to settings.dueWindowMin
pub async fn get_due(
    State(state): State<SharedState>,
    Query(q): Query<DueQuery>,
) -> Result<Json<DueResponse>, ApiError> {
    let now = state.now();
    let db = state.read()?;
    if q.window_min.is_some_and(|w| !(0..=MAX_DUE_WINDOW_MIN).contains(&w)) {
        return Err(ApiError::BadRequest(format!(
            "window_min must be between 0 and {MAX_DUE_WINDOW_MIN}"
        )));
    }
    let window_min = q.window_min.unwrap_or(db.settings.due_window_min);

    let due = get_due_medications(&db.medications, now, window_min)
        .into_iter()
        .map(|m| ReminderView::new(m, now))
        .collect();

    Ok(Json(DueResponse {
        now: now.to_rfc3339(),
        window_min,
        due,
    }))
}

// GET /api/reminders/active
// Reminders currently surfaced to the user, in activation order
pub async fn get_active(State(state): State<SharedState>) -> Result<Json<Vec<ReminderView>>, ApiError> {
    let now = state.now();
    let db = state.read()?;

    let active = db
        .active_reminders
        .iter()
        .filter_map(|id| db.medications.iter().find(|m| m.id == *id))
        .map(|m| ReminderView::new(m.clone(), now))
        .collect();

    Ok(Json(active))
}

// DELETE /api/reminders/active/:id
// Dismiss without completing or snoozing; the next scan may raise it again
pub async fn dismiss_active(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;

    let removed = state
        .update(|db, _| {
            let before = db.active_reminders.len();
            db.active_reminders.retain(|a| *a != id);
            Ok(db.active_reminders.len() != before)
        })
        .await?;

    if !removed {
        return Err(ApiError::NotFound("reminder not active".to_string()));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

// POST /api/reminders/scan
// Same scan the ticker runs, on demand
pub async fn run_scan(State(state): State<SharedState>) -> Result<Json<ScanReport>, ApiError> {
    let report = state.update(|db, now| Ok(scan(db, now))).await?;
    info!(overdue = report.overdue, newly_active = report.newly_active.len(), "manual scan");
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub entries: Vec<MedicationLogEntry>,
    pub summary: AdherenceSummary,
}

// GET /api/log
pub async fn get_log(State(state): State<SharedState>) -> Result<Json<LogResponse>, ApiError> {
    let db = state.read()?;
    let summary = adherence(&db.medication_log);
    Ok(Json(LogResponse {
        entries: db.medication_log,
        summary,
    }))
}

// GET /api/settings
pub async fn get_settings(State(state): State<SharedState>) -> Result<Json<ReminderSettings>, ApiError> {
    Ok(Json(state.read()?.settings))
}

// PUT /api/settings
pub async fn put_settings(
    State(state): State<SharedState>,
    Json(s): Json<ReminderSettings>,
) -> Result<Json<ReminderSettings>, ApiError> {
    if !(0..=MAX_DUE_WINDOW_MIN).contains(&s.due_window_min) {
        return Err(ApiError::BadRequest(format!(
            "dueWindowMin must be between 0 and {MAX_DUE_WINDOW_MIN}"
        )));
    }
    if !(1..=MAX_SNOOZE_MIN).contains(&s.snooze_min) {
        return Err(ApiError::BadRequest(format!(
            "snoozeMin must be between 1 and {MAX_SNOOZE_MIN}"
        )));
    }

    let saved = state
        .update(|db, _| {
            db.settings = s;
            Ok(db.settings.clone())
        })
        .await?;

    Ok(Json(saved))
}
