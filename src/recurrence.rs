/*
Recurrence calculation for medication doses.
Kept free of HTTP / storage so it can be tested against a fixed "now".
*/

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveTime};
use tracing::{debug, warn};

use crate::models::{Frequency, RecurrenceRule};

// Used when timeOfDay is missing or malformed
const FALLBACK_HOUR: u32 = 8;

// Parse a "HH:MM" string into a wall-clock time.
pub fn parse_time_of_day(hhmm: &str) -> Option<NaiveTime> {
    let (h, m) = hhmm.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0)
}

fn time_or_fallback(hhmm: &str) -> NaiveTime {
    parse_time_of_day(hhmm).unwrap_or_else(|| {
        warn!(time_of_day = hhmm, "unparseable timeOfDay, using 08:00");
        NaiveTime::from_hms_opt(FALLBACK_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
    })
}

// Wall-clock date + time interpreted in the given fixed offset.
fn at(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let local = date.and_time(time);
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// The rule `calculate_next_dose` actually schedules from.
///
/// Weekly indices outside 0..=6 are dropped and an empty selection becomes
/// today's weekday; a monthly rule without a usable day gets today's day.
/// Hosts store the result back on the record so the default is chosen once.
pub fn resolve_rule(rule: &RecurrenceRule, now: DateTime<FixedOffset>) -> RecurrenceRule {
    let today = now.date_naive();
    let selected_days = match rule.frequency {
        Frequency::Weekly => {
            let mut days: Vec<u32> = rule.selected_days.iter().copied().filter(|d| *d <= 6).collect();
            if days.len() != rule.selected_days.len() {
                warn!(selected_days = ?rule.selected_days, "dropping weekday indices outside 0..=6");
            }
            if days.is_empty() {
                let current = now.weekday().num_days_from_sunday();
                warn!(weekday = current, "weekly rule has no selected days, defaulting to today's weekday");
                days.push(current);
            }
            days
        }
        Frequency::Monthly => match rule.selected_days.first() {
            Some(&day) if day >= 1 => rule.selected_days.clone(),
            _ => {
                warn!(day = today.day(), "monthly rule has no day of month, using today's");
                vec![today.day()]
            }
        },
        _ => rule.selected_days.clone(),
    };

    RecurrenceRule {
        selected_days,
        ..rule.clone()
    }
}

/// Compute the next dose instant for `rule`, evaluated at `now`.
///
/// All calendar arithmetic happens in `now`'s offset. The result is strictly
/// after `now`; the only same-day result is the weekly branch when today is
/// the sole selected weekday and its slot has not passed yet.
///
/// Malformed rules never fail, they take a logged fallback:
/// - daily: today's slot, or tomorrow's once it is `<= now`
/// - weekly: nearest selected weekday (0 = Sunday); empty selection means today's weekday
/// - monthly: `selected_days[0]` (today's day if unset) this month, else next month,
///   clamped to the month's last day
/// - unspecified: tomorrow at timeOfDay
pub fn calculate_next_dose(rule: &RecurrenceRule, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let rule = resolve_rule(rule, now);
    let offset = *now.offset();
    let time = time_or_fallback(&rule.time_of_day);
    let today = now.date_naive();

    match rule.frequency {
        Frequency::Daily => {
            let slot = at(today, time, offset);
            if slot <= now {
                at(today + Duration::days(1), time, offset)
            } else {
                slot
            }
        }
        Frequency::Weekly => {
            let days_until = days_until_weekly(&rule.selected_days, now, time);
            at(today + Duration::days(days_until), time, offset)
        }
        Frequency::Monthly => {
            let target = rule.selected_days.first().copied().unwrap_or(today.day());

            let first_of_month = today - Duration::days(i64::from(today.day0()));
            let this_month = at(clamp_day(first_of_month, target), time, offset);
            if this_month > now {
                return this_month;
            }

            let next_first = first_of_month
                .checked_add_months(Months::new(1))
                .unwrap_or(first_of_month + Duration::days(31));
            at(clamp_day(next_first, target), time, offset)
        }
        Frequency::Unspecified => {
            warn!("recurrence rule has no frequency, scheduling for tomorrow");
            at(today + Duration::days(1), time, offset)
        }
    }
}

// Offset in days (0..=7) from today to the next selected weekday.
// `selected_days` has already been through `resolve_rule`.
//
// Only strictly positive offsets are considered first. Today is used when it
// is the only selected weekday and the slot is still ahead; otherwise a week out.
fn days_until_weekly(selected_days: &[u32], now: DateTime<FixedOffset>, time: NaiveTime) -> i64 {
    let current = now.weekday().num_days_from_sunday();

    let nearest = selected_days
        .iter()
        .map(|d| (d + 7 - current) % 7)
        .filter(|diff| *diff > 0)
        .min();

    match nearest {
        Some(diff) => i64::from(diff),
        None => {
            // every selected day is today
            if at(now.date_naive(), time, *now.offset()) > now { 0 } else { 7 }
        }
    }
}

// Day `day` of the month starting at `first_of_month`, clamped to its last day.
fn clamp_day(first_of_month: NaiveDate, day: u32) -> NaiveDate {
    if let Some(date) = first_of_month.with_day(day) {
        return date;
    }
    let last = (28..=31)
        .rev()
        .find_map(|d| first_of_month.with_day(d))
        .unwrap_or(first_of_month);
    debug!(day, clamped_to = %last, "day of month past month end, clamping");
    last
}
