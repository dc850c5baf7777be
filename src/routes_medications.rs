// --------------------------------------------------
// Handles API endpoints for medication records.
//
// Responsibilities:
// - Create / read / update / delete medications
// - Mark the current dose taken (and log it)
// - Snooze the current dose
// - Today / upcoming split for the tracker view
// --------------------------------------------------

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::lifecycle::{dose_log_entry, mark_complete, snooze_medication};
use crate::models::{
    Frequency, MAX_SNOOZE_MIN, Medication, MedicationLogEntry, MedicationStatus, RecurrenceRule,
};
use crate::notify::format_dose_time;
use crate::recurrence::{calculate_next_dose, parse_time_of_day};
use crate::scanner::{days_left, today_and_upcoming};
use crate::state::SharedState;

pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest("invalid id".to_string()))
}

fn not_found() -> ApiError {
    ApiError::NotFound("medication not found".to_string())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationInput {
    pub name: String,
    pub dosage: String,
    pub instructions: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(flatten)]
    pub rule: RecurrenceRule, // frequency, timeOfDay "HH:MM", selectedDays
}

impl MedicationInput {
    fn validate(&self) -> Result<(), ApiError> {
        let bad = |msg: &str| Err(ApiError::BadRequest(msg.to_string()));

        if self.name.trim().is_empty() {
            return bad("name required");
        }
        if self.dosage.trim().is_empty() {
            return bad("dosage required");
        }
        if self.instructions.trim().is_empty() {
            return bad("instructions required");
        }
        let rule = &self.rule;
        if parse_time_of_day(&rule.time_of_day).is_none() {
            return bad("timeOfDay must be HH:MM");
        }
        match rule.frequency {
            Frequency::Weekly if rule.selected_days.is_empty() => {
                bad("select at least one day of the week")
            }
            Frequency::Weekly if rule.selected_days.iter().any(|d| *d > 6) => {
                bad("weekdays must be 0..=6")
            }
            Frequency::Monthly if rule.selected_days.first().is_some_and(|d| !(1..=31).contains(d)) => {
                bad("day of month must be 1..=31")
            }
            _ => Ok(()),
        }
    }
}

// -----------------------------
// GET /api/medications
// -----------------------------
pub async fn list_medications(State(state): State<SharedState>) -> Result<Json<Vec<Medication>>, ApiError> {
    Ok(Json(state.read()?.medications))
}

// -----------------------------
// POST /api/medications
// Validates input, schedules the first dose, stores the record
// -----------------------------
pub async fn create_medication(
    State(state): State<SharedState>,
    Json(input): Json<MedicationInput>,
) -> Result<Json<Medication>, ApiError> {
    input.validate()?;

    let med = state
        .update(|db, now| {
            let next_dose = calculate_next_dose(&input.rule, now);
            let med = Medication {
                id: Uuid::new_v4(),
                name: input.name,
                dosage: input.dosage,
                instructions: input.instructions,
                icon: input.icon,
                color: input.color,
                frequency: input.rule.frequency,
                time_of_day: input.rule.time_of_day,
                selected_days: input.rule.selected_days,
                next_dose,
                status: MedicationStatus::Upcoming,
                days_left: days_left(next_dose, now),
                progress: 0,
            };
            db.medications.push(med.clone());
            Ok(med)
        })
        .await?;

    info!(medication_id = %med.id, next_dose = %med.next_dose, "medication added");
    Ok(Json(med))
}

// -----------------------------
// PUT /api/medications/:id
// Replaces details and rule; the next dose is recomputed from the new rule
// -----------------------------
pub async fn update_medication(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(input): Json<MedicationInput>,
) -> Result<Json<Medication>, ApiError> {
    let id = parse_id(&id)?;
    input.validate()?;

    let updated = state
        .update(|db, now| {
            let m = db.medications.iter_mut().find(|m| m.id == id).ok_or_else(not_found)?;
            let next_dose = calculate_next_dose(&input.rule, now);

            m.name = input.name;
            m.dosage = input.dosage;
            m.instructions = input.instructions;
            m.icon = input.icon;
            m.color = input.color;
            m.frequency = input.rule.frequency;
            m.time_of_day = input.rule.time_of_day;
            m.selected_days = input.rule.selected_days;
            m.next_dose = next_dose;
            m.status = MedicationStatus::Upcoming;
            m.days_left = days_left(next_dose, now);
            m.progress = 0;
            Ok(m.clone())
        })
        .await?;

    Ok(Json(updated))
}

// -----------------------------
// DELETE /api/medications/:id
// -----------------------------
pub async fn delete_medication(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;

    state
        .update(|db, _| {
            let before = db.medications.len();
            db.medications.retain(|m| m.id != id);
            if db.medications.len() == before {
                return Err(not_found());
            }
            db.active_reminders.retain(|a| *a != id);
            Ok(())
        })
        .await?;

    info!(medication_id = %id, "medication removed");
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub medication: Medication,
    pub log_entry: MedicationLogEntry,
}

// -----------------------------
// POST /api/medications/:id/complete
// Logs the dose against its pre-completion nextDose, then advances the schedule
// -----------------------------
pub async fn complete_medication(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let id = parse_id(&id)?;

    let resp = state
        .update(|db, now| {
            let m = db.medications.iter_mut().find(|m| m.id == id).ok_or_else(not_found)?;

            let log_entry = dose_log_entry(m, now);
            *m = mark_complete(m, now);
            let medication = m.clone();

            db.medication_log.push(log_entry.clone());
            db.active_reminders.retain(|a| *a != id);
            Ok(CompletionResponse {
                medication,
                log_entry,
            })
        })
        .await?;

    Ok(Json(resp))
}

#[derive(Debug, Deserialize)]
pub struct SnoozeQuery {
    pub minutes: Option<i64>,
}

// -----------------------------
// POST /api/medications/:id/snooze?minutes=N
// Defaults to settings.snoozeMin
// -----------------------------
pub async fn snooze(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(q): Query<SnoozeQuery>,
) -> Result<Json<Medication>, ApiError> {
    let id = parse_id(&id)?;
    if q.minutes.is_some_and(|m| !(1..=MAX_SNOOZE_MIN).contains(&m)) {
        return Err(ApiError::BadRequest(format!(
            "minutes must be between 1 and {MAX_SNOOZE_MIN}"
        )));
    }

    let snoozed = state
        .update(|db, now| {
            let minutes = q.minutes.unwrap_or(db.settings.snooze_min);
            let m = db.medications.iter_mut().find(|m| m.id == id).ok_or_else(not_found)?;

            *m = snooze_medication(m, now, minutes);
            m.days_left = days_left(m.next_dose, now);
            let snoozed = m.clone();

            db.active_reminders.retain(|a| *a != id);
            Ok(snoozed)
        })
        .await?;

    info!(medication_id = %id, next_dose = %snoozed.next_dose, "reminder snoozed");
    Ok(Json(snoozed))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoseView {
    pub medication: Medication,
    pub next_dose_label: String, // "Today at 8:00 AM"
}

impl DoseView {
    pub fn new(medication: Medication, now: DateTime<FixedOffset>) -> Self {
        let next_dose_label = format_dose_time(medication.next_dose, now);
        Self {
            medication,
            next_dose_label,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TodayResponse {
    pub now: String,
    pub today: Vec<DoseView>,
    pub upcoming: Vec<DoseView>,
}

// -----------------------------
// GET /api/medications/today
// -----------------------------
pub async fn get_today(State(state): State<SharedState>) -> Result<Json<TodayResponse>, ApiError> {
    let now = state.now();
    let db = state.read()?;
    let view = today_and_upcoming(&db.medications, now);

    let to_views = |meds: Vec<Medication>| -> Vec<DoseView> {
        meds.into_iter().map(|m| DoseView::new(m, now)).collect()
    };

    Ok(Json(TodayResponse {
        now: now.to_rfc3339(),
        today: to_views(view.today),
        upcoming: to_views(view.upcoming),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{call, daily_input, test_app, ts, ts_field};
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn create_schedules_first_dose() {
        // now = 2024-01-01T10:00Z, 08:00 already passed
        let (app, state) = test_app();

        let (status, body) = call(&app, "POST", "/api/medications", Some(daily_input("08:00"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ts_field(&body["nextDose"]), ts("2024-01-02T08:00:00+00:00"));
        assert_eq!(body["status"], "upcoming");
        assert_eq!(body["daysLeft"], 1);
        assert_eq!(state.read().unwrap().medications.len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let (app, _) = test_app();

        let mut blank = daily_input("08:00");
        blank["name"] = json!("  ");
        let (status, body) = call(&app, "POST", "/api/medications", Some(blank)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let (status, _) = call(&app, "POST", "/api/medications", Some(daily_input("25:00"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut weekly = daily_input("08:00");
        weekly["frequency"] = json!("weekly");
        let (status, body) = call(&app, "POST", "/api/medications", Some(weekly)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "select at least one day of the week");
    }

    #[tokio::test]
    async fn complete_logs_and_advances() {
        let (app, state) = test_app();
        let (_, created) = call(&app, "POST", "/api/medications", Some(daily_input("08:00"))).await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, "POST", &format!("/api/medications/{id}/complete"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["medication"]["status"], "upcoming");
        assert_eq!(body["medication"]["progress"], 0);
        // completed at 10:00 before the 2024-01-02 08:00 slot
        assert_eq!(ts_field(&body["logEntry"]["scheduledFor"]), ts("2024-01-02T08:00:00+00:00"));
        assert_eq!(body["logEntry"]["onTime"], true);

        let db = state.read().unwrap();
        assert_eq!(db.medication_log.len(), 1);
    }

    #[tokio::test]
    async fn snooze_uses_settings_default_and_query_override() {
        let (app, _) = test_app();
        let (_, created) = call(&app, "POST", "/api/medications", Some(daily_input("08:00"))).await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, "POST", &format!("/api/medications/{id}/snooze"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ts_field(&body["nextDose"]), ts("2024-01-01T11:00:00+00:00"));

        let (_, body) = call(&app, "POST", &format!("/api/medications/{id}/snooze?minutes=15"), None).await;
        assert_eq!(ts_field(&body["nextDose"]), ts("2024-01-01T10:15:00+00:00"));

        let (status, _) = call(&app, "POST", &format!("/api/medications/{id}/snooze?minutes=0"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn snooze_rejects_oversized_minutes() {
        let (app, state) = test_app();
        let (_, created) = call(&app, "POST", "/api/medications", Some(daily_input("08:00"))).await;
        let id = created["id"].as_str().unwrap().to_string();

        for minutes in ["9223372036854775807", "1441"] {
            let uri = format!("/api/medications/{id}/snooze?minutes={minutes}");
            let (status, body) = call(&app, "POST", &uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "BAD_REQUEST");
        }
        assert_eq!(
            state.read().unwrap().medications[0].next_dose,
            ts("2024-01-02T08:00:00+00:00")
        );

        let (status, body) = call(&app, "POST", &format!("/api/medications/{id}/snooze?minutes=1440"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ts_field(&body["nextDose"]), ts("2024-01-02T10:00:00+00:00"));
    }

    #[tokio::test]
    async fn update_recomputes_next_dose() {
        let (app, _) = test_app();
        let (_, created) = call(&app, "POST", "/api/medications", Some(daily_input("08:00"))).await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, "PUT", &format!("/api/medications/{id}"), Some(daily_input("18:30"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ts_field(&body["nextDose"]), ts("2024-01-01T18:30:00+00:00"));
        assert_eq!(body["id"], created["id"]);
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids() {
        let (app, _) = test_app();

        let (status, _) = call(&app, "DELETE", "/api/medications/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let missing = Uuid::new_v4();
        let (status, body) = call(&app, "POST", &format!("/api/medications/{missing}/complete"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let (app, state) = test_app();
        let (_, created) = call(&app, "POST", "/api/medications", Some(daily_input("08:00"))).await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, "DELETE", &format!("/api/medications/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
        assert!(state.read().unwrap().medications.is_empty());
    }

    #[tokio::test]
    async fn today_view_labels_doses() {
        let (app, _) = test_app();
        call(&app, "POST", "/api/medications", Some(daily_input("20:00"))).await;
        call(&app, "POST", "/api/medications", Some(daily_input("08:00"))).await;

        let (status, body) = call(&app, "GET", "/api/medications/today", None).await;
        assert_eq!(status, StatusCode::OK);
        let today: &Vec<Value> = body["today"].as_array().unwrap();
        let upcoming: &Vec<Value> = body["upcoming"].as_array().unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0]["nextDoseLabel"], "Today at 8:00 PM");
        assert_eq!(upcoming[0]["nextDoseLabel"], "Tomorrow at 8:00 AM");
    }
}
