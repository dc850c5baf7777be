// Define data modules
mod clock; // Injectable "now"
mod config; // Server configuration from environment
mod error; // Store / API error types
mod lifecycle; // Mark-complete, snooze, dose log
mod models; // Data structures (Medication, Settings, Db, etc.)
mod notify; // Reminder message / dose time text
mod recurrence; // Next-dose calculation
mod routes_medications; // HTTP handlers for medication APIs
mod routes_reminders; // HTTP handlers for reminder, log and settings APIs
mod scanner; // Overdue / due-window / daysLeft scans
mod state; // Shared state with single-writer updates
mod store; // Persistent storage (load/save db.json)
mod ticker; // Periodic reminder scan
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::clock::SystemClock;
use crate::config::{APP_NAME, APP_VERSION, ServerConfig};
use crate::state::{AppState, SharedState};
use crate::store::JsonFileStore;

pub fn build_router(state: SharedState) -> Router {
    let api = Router::new()
        // medications
        .route(
            "/medications",
            get(routes_medications::list_medications).post(routes_medications::create_medication),
        )
        .route("/medications/today", get(routes_medications::get_today))
        .route(
            "/medications/:id",
            put(routes_medications::update_medication).delete(routes_medications::delete_medication),
        )
        .route("/medications/:id/complete", post(routes_medications::complete_medication))
        .route("/medications/:id/snooze", post(routes_medications::snooze))
        // reminders
        .route("/reminders/due", get(routes_reminders::get_due))
        .route("/reminders/active", get(routes_reminders::get_active))
        .route("/reminders/active/:id", delete(routes_reminders::dismiss_active))
        .route("/reminders/scan", post(routes_reminders::run_scan))
        // log & settings
        .route("/log", get(routes_reminders::get_log))
        .route(
            "/settings",
            get(routes_reminders::get_settings).put(routes_reminders::put_settings),
        );

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let cfg = ServerConfig::from_env();
    tracing::info!("{APP_NAME} starting v{APP_VERSION}");

    let store = JsonFileStore::new(&cfg.db_path);
    let state = AppState::new(Arc::new(store), Arc::new(SystemClock));

    tokio::spawn(ticker::run(state.clone(), cfg.tick));

    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(cfg.addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %cfg.addr, error = %e, "bind failed");
            std::process::exit(1);
        }
    };

    tracing::info!(
        addr = %cfg.addr,
        db = %cfg.db_path.display(),
        tick_secs = cfg.tick.as_secs(),
        "server running at http://{}/api",
        cfg.addr
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
    }
}
