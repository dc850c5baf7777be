// Lifecycle transitions applied on user actions.
//
// upcoming / overdue --mark_complete--> completed --(same call)--> upcoming
// any status         --snooze--------->  upcoming, nextDose = now + minutes
//
// Each function returns a new record; the host decides when to store it.

use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Medication, MedicationLogEntry, MedicationStatus};
use crate::recurrence::{calculate_next_dose, resolve_rule};

pub const DEFAULT_SNOOZE_MIN: i64 = 60;

// A dose counts as on time when taken no later than its scheduled instant.
pub fn is_on_time(scheduled_for: DateTime<FixedOffset>, completed_at: DateTime<FixedOffset>) -> bool {
    completed_at <= scheduled_for
}

/// Mark the current dose of `med` as taken at `now` and advance to the next one.
///
/// The completed snapshot only exists inside this call; the returned record is
/// already `upcoming` with `progress = 0` and a freshly computed `next_dose`.
/// Callers that log the dose must read `med.next_dose` before storing the result
/// (see [`dose_log_entry`]).
pub fn mark_complete(med: &Medication, now: DateTime<FixedOffset>) -> Medication {
    let completed = Medication {
        status: MedicationStatus::Completed,
        progress: 100,
        ..med.clone()
    };

    // defaulted weekday / day of month is kept on the record from here on
    let rule = resolve_rule(&completed.rule(), now);
    let next_dose = calculate_next_dose(&rule, now);
    info!(
        medication_id = %med.id,
        scheduled_for = %med.next_dose,
        next_dose = %next_dose,
        "dose marked complete"
    );

    Medication {
        next_dose,
        status: MedicationStatus::Upcoming,
        progress: 0,
        selected_days: rule.selected_days,
        ..completed
    }
}

// Log entry for a dose of `med` (pre-completion record) taken at `now`.
pub fn dose_log_entry(med: &Medication, now: DateTime<FixedOffset>) -> MedicationLogEntry {
    MedicationLogEntry {
        id: Uuid::new_v4(),
        medication_id: med.id,
        medication_name: med.name.clone(),
        dosage: med.dosage.clone(),
        scheduled_for: med.next_dose,
        completed_at: now,
        on_time: is_on_time(med.next_dose, now),
    }
}

fn snoozed_until(now: DateTime<FixedOffset>, minutes: i64) -> Option<DateTime<FixedOffset>> {
    if minutes <= 0 {
        return None;
    }
    now.checked_add_signed(Duration::try_minutes(minutes)?)
}

// Push nextDose to now + snooze_minutes without touching the recurrence rule.
// Non-positive or out-of-range minutes fall back to DEFAULT_SNOOZE_MIN.
pub fn snooze_medication(med: &Medication, now: DateTime<FixedOffset>, snooze_minutes: i64) -> Medication {
    let next_dose = snoozed_until(now, snooze_minutes).unwrap_or_else(|| {
        warn!(snooze_minutes, "unusable snooze, using {DEFAULT_SNOOZE_MIN} minutes");
        now + Duration::minutes(DEFAULT_SNOOZE_MIN)
    });

    Medication {
        next_dose,
        status: MedicationStatus::Upcoming,
        progress: 0,
        ..med.clone()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdherenceSummary {
    pub total: usize,
    pub on_time: usize,
    pub on_time_pct: u8, // rounded, 0 for an empty log
}

pub fn adherence(log: &[MedicationLogEntry]) -> AdherenceSummary {
    let total = log.len();
    let on_time = log.iter().filter(|e| e.on_time).count();
    let on_time_pct = if total == 0 {
        0
    } else {
        ((on_time * 100 + total / 2) / total) as u8
    };
    AdherenceSummary {
        total,
        on_time,
        on_time_pct,
    }
}
