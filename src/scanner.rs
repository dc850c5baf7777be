// Status classification and list scans run on every host tick.
//
// Every function takes a snapshot and returns a new Vec; nothing is mutated in place,
// and running a scan twice with the same `now` gives the same list.

use chrono::{DateTime, Duration, FixedOffset};
use tracing::warn;

use crate::models::{Medication, MedicationStatus};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

// Status a medication should have at `now`.
// Completed passes through, a past nextDose is overdue, anything else is upcoming.
pub fn classify_status(med: &Medication, now: DateTime<FixedOffset>) -> MedicationStatus {
    match med.status {
        MedicationStatus::Completed => MedicationStatus::Completed,
        _ if med.next_dose < now => MedicationStatus::Overdue,
        _ => MedicationStatus::Upcoming,
    }
}

// Flag every non-completed medication whose nextDose is before `now` as overdue.
// Others are returned unchanged.
pub fn check_overdue_medications(meds: &[Medication], now: DateTime<FixedOffset>) -> Vec<Medication> {
    meds.iter()
        .map(|m| {
            if classify_status(m, now) == MedicationStatus::Overdue {
                Medication {
                    status: MedicationStatus::Overdue,
                    ..m.clone()
                }
            } else {
                m.clone()
            }
        })
        .collect()
}

// End of the lookahead window, None when now + window is not representable.
fn window_end(now: DateTime<FixedOffset>, window_minutes: i64) -> Option<DateTime<FixedOffset>> {
    now.checked_add_signed(Duration::try_minutes(window_minutes)?)
}

// Whether `med` should surface a reminder: not completed and nextDose in [now, now + window].
pub fn is_due(med: &Medication, now: DateTime<FixedOffset>, window_minutes: i64) -> bool {
    if med.status == MedicationStatus::Completed {
        return false;
    }
    match window_end(now, window_minutes) {
        Some(until) => med.next_dose >= now && med.next_dose <= until,
        None => false,
    }
}

// Medications due within the lookahead window, in input order.
pub fn get_due_medications(
    meds: &[Medication],
    now: DateTime<FixedOffset>,
    window_minutes: i64,
) -> Vec<Medication> {
    if window_minutes < 0 {
        warn!(window_minutes, "negative due window, nothing can be due");
        return Vec::new();
    }
    if window_end(now, window_minutes).is_none() {
        warn!(window_minutes, "due window out of range, nothing reported");
        return Vec::new();
    }
    meds.iter()
        .filter(|m| is_due(m, now, window_minutes))
        .cloned()
        .collect()
}

// Ceiling of the absolute whole days between now and nextDose.
// Overdue and upcoming doses of the same distance report the same value.
pub fn days_left(next_dose: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> i64 {
    let ms = (next_dose - now).num_milliseconds().abs();
    (ms + DAY_MS - 1) / DAY_MS
}

pub fn update_days_left(meds: &[Medication], now: DateTime<FixedOffset>) -> Vec<Medication> {
    meds.iter()
        .map(|m| Medication {
            days_left: days_left(m.next_dose, now),
            ..m.clone()
        })
        .collect()
}

// Split for the tracker view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodayView {
    pub today: Vec<Medication>,    // nextDose on today's date, input order
    pub upcoming: Vec<Medication>, // later dates, soonest first
}

pub fn today_and_upcoming(meds: &[Medication], now: DateTime<FixedOffset>) -> TodayView {
    let offset = *now.offset();
    let today = now.date_naive();

    let (mut due_today, mut later): (Vec<Medication>, Vec<Medication>) = (Vec::new(), Vec::new());
    for m in meds {
        let date = m.next_dose.with_timezone(&offset).date_naive();
        if date == today {
            due_today.push(m.clone());
        } else if date > today {
            later.push(m.clone());
        }
    }
    later.sort_by_key(|m| m.next_dose);

    TodayView {
        today: due_today,
        upcoming: later,
    }
}
