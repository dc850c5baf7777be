// Periodic reminder scan.
//
// A missed tick (sleep, slow disk) is harmless: every scan compares against the
// current time instead of counting elapsed ticks.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Db, MedicationStatus};
use crate::notify::notification_message;
use crate::scanner::{check_overdue_medications, get_due_medications, update_days_left};
use crate::state::SharedState;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub overdue: usize,
    pub due: Vec<Uuid>,
    pub newly_active: Vec<Uuid>,
}

// One scan over the stored blob: refresh statuses and daysLeft, then activate
// reminders for medications inside the due window.
pub fn scan(db: &mut Db, now: DateTime<FixedOffset>) -> ScanReport {
    let checked = check_overdue_medications(&db.medications, now);
    db.medications = update_days_left(&checked, now);

    let overdue = db
        .medications
        .iter()
        .filter(|m| m.status == MedicationStatus::Overdue)
        .count();

    let due = get_due_medications(&db.medications, now, db.settings.due_window_min);
    let mut report = ScanReport {
        overdue,
        due: due.iter().map(|m| m.id).collect(),
        newly_active: Vec::new(),
    };

    if !db.settings.notifications_enabled {
        debug!(due = due.len(), "notifications disabled, not activating reminders");
        return report;
    }

    for med in &due {
        if db.active_reminders.contains(&med.id) {
            continue;
        }
        info!(
            medication_id = %med.id,
            next_dose = %med.next_dose,
            message = %notification_message(med),
            "medication due"
        );
        db.active_reminders.push(med.id);
        report.newly_active.push(med.id);
    }

    report
}

pub async fn run(state: SharedState, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match state.update(|db, now| Ok(scan(db, now))).await {
            Ok(report) => debug!(?report, "reminder scan finished"),
            // keep polling, the next tick may succeed
            Err(e) => warn!(error = %e, "reminder scan failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{Frequency, Medication};
    use crate::state::AppState;
    use crate::store::MemoryStore;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn med(name: &str, next_dose: DateTime<FixedOffset>) -> Medication {
        Medication {
            id: Uuid::new_v4(),
            name: name.to_string(),
            dosage: "10mg".to_string(),
            instructions: "Before bed".to_string(),
            icon: String::new(),
            color: String::new(),
            frequency: Frequency::Daily,
            time_of_day: "22:00".to_string(),
            selected_days: Vec::new(),
            next_dose,
            status: MedicationStatus::Upcoming,
            days_left: 0,
            progress: 0,
        }
    }

    fn db_with(meds: Vec<Medication>) -> Db {
        Db {
            medications: meds,
            ..Db::default()
        }
    }

    #[test]
    fn scan_flags_overdue_and_activates_due() {
        let now = ts("2024-01-01T10:00:00+00:00");
        let missed = med("missed", now - ChronoDuration::hours(1));
        let soon = med("soon", now + ChronoDuration::minutes(10));
        let later = med("later", now + ChronoDuration::hours(5));
        let mut db = db_with(vec![missed.clone(), soon.clone(), later.clone()]);

        let report = scan(&mut db, now);
        assert_eq!(report.overdue, 1);
        assert_eq!(report.due, vec![soon.id]);
        assert_eq!(report.newly_active, vec![soon.id]);
        assert_eq!(db.active_reminders, vec![soon.id]);
        assert_eq!(db.medications[0].status, MedicationStatus::Overdue);
        assert_eq!(db.medications[2].days_left, 1);
    }

    #[test]
    fn repeated_scan_is_a_fixed_point() {
        let now = ts("2024-01-01T10:00:00+00:00");
        let mut db = db_with(vec![
            med("missed", now - ChronoDuration::hours(1)),
            med("soon", now + ChronoDuration::minutes(10)),
        ]);

        scan(&mut db, now);
        let after_first = db.clone();
        let second = scan(&mut db, now);
        assert_eq!(db, after_first);
        assert!(second.newly_active.is_empty());
    }

    #[test]
    fn disabled_notifications_still_update_statuses() {
        let now = ts("2024-01-01T10:00:00+00:00");
        let mut db = db_with(vec![
            med("missed", now - ChronoDuration::hours(1)),
            med("soon", now + ChronoDuration::minutes(10)),
        ]);
        db.settings.notifications_enabled = false;

        let report = scan(&mut db, now);
        assert_eq!(report.due.len(), 1);
        assert!(report.newly_active.is_empty());
        assert!(db.active_reminders.is_empty());
        assert_eq!(db.medications[0].status, MedicationStatus::Overdue);
    }

    #[test]
    fn scan_survives_out_of_range_window() {
        let now = ts("2024-01-01T10:00:00+00:00");
        let mut db = db_with(vec![
            med("missed", now - ChronoDuration::hours(1)),
            med("soon", now + ChronoDuration::minutes(10)),
        ]);
        db.settings.due_window_min = 9_000_000_000_000;

        let report = scan(&mut db, now);
        assert_eq!(report.overdue, 1);
        assert!(report.due.is_empty());
        assert!(db.active_reminders.is_empty());
    }

    #[tokio::test]
    async fn run_scans_on_first_tick() {
        let now = ts("2024-01-01T10:00:00+00:00");
        let soon = med("soon", now + ChronoDuration::minutes(5));
        let store = Arc::new(MemoryStore::new(db_with(vec![soon.clone()])));
        let state = AppState::new(store, Arc::new(FixedClock(now)));

        let handle = tokio::spawn(run(state.clone(), Duration::from_secs(60)));
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert_eq!(state.read().unwrap().active_reminders, vec![soon.id]);
    }
}
