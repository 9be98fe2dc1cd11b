/*
Recurrence date arithmetic.
Module is independent from storage and HTTP so it can be tested on its own.
*/

use chrono::{Datelike, Days, NaiveDate};

use crate::models::{Frequency, RecurrencePattern};

/// Compute the date of the next occurrence after `base_date`.
///
/// Returns `None` when the computed date falls after `pattern.end_date`
/// (the series has ended) or lies outside the representable calendar.
pub fn calculate_next_date(pattern: &RecurrencePattern, base_date: NaiveDate) -> Option<NaiveDate> {
    let next = match pattern.frequency {
        Frequency::Daily | Frequency::Custom => {
            base_date.checked_add_days(Days::new(u64::from(pattern.interval)))
        }
        Frequency::Weekly => next_weekly(pattern, base_date),
        Frequency::Monthly => next_monthly(pattern, base_date),
    }?;

    match pattern.end_date {
        Some(end) if next > end => None,
        _ => Some(next),
    }
}

/// Walk the pattern forward from `base_date`, collecting at most `count` dates.
pub fn upcoming_dates(pattern: &RecurrencePattern, base_date: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut cursor = base_date;
    while dates.len() < count {
        let Some(next) = calculate_next_date(pattern, cursor) else {
            break;
        };
        dates.push(next);
        cursor = next;
    }
    dates
}

// Weekly:
// - no weekdays given -> same weekday, `interval` weeks later
// - otherwise the first matching weekday after base, then (interval - 1)
//   further weeks
fn next_weekly(pattern: &RecurrencePattern, base_date: NaiveDate) -> Option<NaiveDate> {
    let interval = u64::from(pattern.interval);
    if pattern.days_of_week.is_empty() {
        return base_date.checked_add_days(Days::new(7 * interval));
    }

    let candidate = (1..=7)
        .filter_map(|i| base_date.checked_add_days(Days::new(i)))
        .find(|d| pattern.days_of_week.contains(&weekday_index(*d)))?;

    candidate.checked_add_days(Days::new(7 * interval.saturating_sub(1)))
}

// Monthly: same (or configured) day, `interval` months later, clamped to
// the last day of a shorter month
fn next_monthly(pattern: &RecurrencePattern, base_date: NaiveDate) -> Option<NaiveDate> {
    let target_day = pattern.day_of_month.unwrap_or_else(|| base_date.day());

    let months = i64::from(base_date.month0()) + i64::from(pattern.interval);
    let year = base_date.year().checked_add(i32::try_from(months / 12).ok()?)?;
    let month = (months % 12) as u32 + 1;

    let last_day = last_day_of_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, target_day.min(last_day))
}

/// 0 = Monday ... 6 = Sunday
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }?;
    first_of_next.pred_opt().map(|d| d.day())
}
