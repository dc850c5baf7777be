use chrono::{DateTime, Duration, FixedOffset};

use crate::models::Medication;

pub fn notification_message(med: &Medication) -> String {
    format!(
        "Time to take your {} ({}). {}",
        med.name, med.dosage, med.instructions
    )
}

// "Today at 8:00 AM", "Tomorrow at 8:00 AM", otherwise "Mon, Jan 8, 9:00 AM".
// Day boundaries are taken in now's offset.
pub fn format_dose_time(next_dose: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> String {
    let dose = next_dose.with_timezone(now.offset());
    let today = now.date_naive();
    let time = dose.format("%-I:%M %p");

    if dose.date_naive() == today {
        format!("Today at {time}")
    } else if dose.date_naive() == today + Duration::days(1) {
        format!("Tomorrow at {time}")
    } else {
        dose.format("%a, %b %-d, %-I:%M %p").to_string()
    }
}
