use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Recurrence frequency of a medication.
// Anything the host sends that we do not recognise lands in Unspecified,
// which the calculator treats as "tomorrow at timeOfDay".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    #[default]
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MedicationStatus {
    #[default]
    Upcoming,
    Overdue,
    Completed, // transient, never stored past a mark-complete
}

// The part of a medication that decides when doses happen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    #[serde(default)]
    pub frequency: Frequency,
    pub time_of_day: String, // "HH:MM", 24-hour
    // weekly: weekday indices (0 = Sunday), monthly: [day-of-month], daily: unused
    #[serde(default)]
    pub selected_days: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    pub dosage: String,
    pub instructions: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub frequency: Frequency,
    pub time_of_day: String,
    #[serde(default)]
    pub selected_days: Vec<u32>,
    pub next_dose: DateTime<FixedOffset>,
    #[serde(default)]
    pub status: MedicationStatus,
    #[serde(default)]
    pub days_left: i64,
    #[serde(default)]
    pub progress: u8, // 0..=100
}

impl Medication {
    pub fn rule(&self) -> RecurrenceRule {
        RecurrenceRule {
            frequency: self.frequency,
            time_of_day: self.time_of_day.clone(),
            selected_days: self.selected_days.clone(),
        }
    }
}

// One taken dose, appended by the host on mark-complete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationLogEntry {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub medication_name: String,
    pub dosage: String,
    pub scheduled_for: DateTime<FixedOffset>,
    pub completed_at: DateTime<FixedOffset>,
    pub on_time: bool,
}

// Largest lookahead and snooze accepted from clients: one week, one day.
pub const MAX_DUE_WINDOW_MIN: i64 = 7 * 24 * 60;
pub const MAX_SNOOZE_MIN: i64 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSettings {
    pub due_window_min: i64,
    pub snooze_min: i64,
    pub notifications_enabled: bool,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            due_window_min: 15,
            snooze_min: 60,
            notifications_enabled: true,
        }
    }
}

// Whole persisted blob, read and written back as one unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Db {
    #[serde(default)]
    pub settings: ReminderSettings,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub medication_log: Vec<MedicationLogEntry>,
    #[serde(default)]
    pub active_reminders: Vec<Uuid>,
}
