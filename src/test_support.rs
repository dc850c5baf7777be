// Shared fixtures for router tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, FixedOffset};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::build_router;
use crate::clock::FixedClock;
use crate::state::{AppState, SharedState};
use crate::store::MemoryStore;

// Monday 2024-01-01 10:00 UTC
pub const NOW: &str = "2024-01-01T10:00:00+00:00";

pub fn test_app() -> (Router, SharedState) {
    let now = ts(NOW);
    let state = AppState::new(Arc::new(MemoryStore::default()), Arc::new(FixedClock(now)));
    (build_router(state.clone()), state)
}

pub fn ts(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

// Timestamps come back as "...Z" for a zero offset; compare instants instead of text.
pub fn ts_field(v: &Value) -> DateTime<FixedOffset> {
    ts(v.as_str().unwrap())
}

pub fn daily_input(time_of_day: &str) -> Value {
    json!({
        "name": "Metformin",
        "dosage": "500mg",
        "instructions": "Take with breakfast.",
        "frequency": "daily",
        "timeOfDay": time_of_day,
    })
}

pub async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}
