use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

use crate::models::Timeframe;

/// Share of daily volume by hour of day (0-23).
pub const HOUR_WEIGHTS: [f64; 24] = [
    0.03, 0.02, 0.01, 0.01, 0.01, 0.01, 0.01, 0.02, //
    0.03, 0.04, 0.03, 0.05, 0.11, 0.09, 0.05, 0.03, //
    0.04, 0.06, 0.13, 0.11, 0.07, 0.05, 0.04, 0.03,
];

/// Share of weekly volume by weekday, Sunday first.
pub const WEEKDAY_WEIGHTS: [f64; 7] = [0.06, 0.15, 0.16, 0.17, 0.18, 0.21, 0.07];

/// Share of monthly volume by day of month, starting at the 1st. The 31st has no entry.
pub const MONTH_DAY_WEIGHTS: [f64; 30] = [
    0.032, 0.033, 0.035, 0.037, 0.041, 0.029, 0.026, 0.031, 0.034, 0.033, //
    0.034, 0.036, 0.038, 0.040, 0.032, 0.033, 0.035, 0.037, 0.036, 0.032, //
    0.035, 0.033, 0.037, 0.042, 0.031, 0.028, 0.034, 0.040, 0.024, 0.022,
];

fn lookup(table: &[f64], index: usize, slots: u32) -> f64 {
    table
        .get(index)
        .copied()
        .unwrap_or(1.0 / f64::from(slots))
}

/// Scaling weight for `timeframe` at the wall-clock instant `now`.
///
/// `hour` is the elapsed fraction of the current clock hour; the other
/// timeframes read fixed empirical shares for the current hour, weekday or
/// day of month.
pub fn time_weight<Tz: TimeZone>(timeframe: Timeframe, now: &DateTime<Tz>) -> f64 {
    match timeframe {
        Timeframe::Hour => (f64::from(now.minute()) + f64::from(now.second()) / 60.0) / 60.0,
        Timeframe::Day => lookup(&HOUR_WEIGHTS, now.hour() as usize, 24),
        Timeframe::Week => lookup(
            &WEEKDAY_WEIGHTS,
            now.weekday().num_days_from_sunday() as usize,
            7,
        ),
        Timeframe::Month => lookup(&MONTH_DAY_WEIGHTS, now.day0() as usize, 31),
    }
}

/// Same as [`time_weight`] for a raw label; unrecognised labels weigh 1.
/// Typed callers never reach the fallback arm.
#[cfg(test)]
fn time_weight_for_label<Tz: TimeZone>(label: &str, now: &DateTime<Tz>) -> f64 {
    match label.parse::<Timeframe>() {
        Ok(timeframe) => time_weight(timeframe, now),
        Err(_) => 1.0,
    }
}

/// Start of the period `now` falls in: top of the hour, local midnight,
/// Monday of the current week, or the 1st of the month.
pub fn period_start<Tz: TimeZone>(timeframe: Timeframe, now: &DateTime<Tz>) -> DateTime<Utc> {
    let local = now.naive_local();
    let today = local.date();

    let start: NaiveDateTime = match timeframe {
        Timeframe::Hour => today.and_hms_opt(local.hour(), 0, 0).unwrap_or(local),
        Timeframe::Day => midnight(today),
        Timeframe::Week => {
            let back = i64::from(today.weekday().num_days_from_monday());
            midnight(today - Duration::days(back))
        }
        Timeframe::Month => midnight(today.with_day(1).unwrap_or(today)),
    };

    match now.timezone().from_local_datetime(&start).earliest() {
        Some(resolved) => resolved.with_timezone(&Utc),
        // Falls inside a DST gap; treat the wall-clock value as UTC.
        None => start.and_utc(),
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}
