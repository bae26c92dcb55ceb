use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::{AppTotal, SubmissionRecord};
use crate::normalize::normalize_app_name;

/// Sums orders and earnings per normalized app for submissions made at or
/// after `cutoff`. Records without a creation time are ignored.
pub fn aggregate_submissions(
    records: &[SubmissionRecord],
    cutoff: DateTime<Utc>,
) -> BTreeMap<String, AppTotal> {
    let mut totals: BTreeMap<String, AppTotal> = BTreeMap::new();

    for record in records {
        match record.created_at {
            Some(created_at) if created_at >= cutoff => {}
            _ => continue,
        }

        let app = normalize_app_name(&record.app);
        let entry = totals.entry(app).or_default();
        entry.orders += record.orders;
        entry.earnings += record.earnings;
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Timeframe, Vehicle};
    use chrono::{Duration, TimeZone};

    fn record(app: &str, orders: i64, earnings: f64, created_at: Option<DateTime<Utc>>) -> SubmissionRecord {
        SubmissionRecord {
            app: app.to_string(),
            orders,
            earnings,
            vehicle: Vehicle::Bike,
            timeframe: Timeframe::Day,
            created_at,
        }
    }

    #[test]
    fn sums_per_normalized_app() {
        let cutoff = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let later = Some(cutoff + Duration::hours(2));
        let records = vec![
            record("deliveroo", 4, 50.0, later),
            record("DELIVEROO", 5, 67.0, later),
            record("uber eats", 2, 21.5, later),
        ];

        let totals = aggregate_submissions(&records, cutoff);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals["Deliveroo"].orders, 9);
        assert!((totals["Deliveroo"].earnings - 117.0).abs() < 1e-9);
        assert_eq!(totals["Uber Eats"].orders, 2);
    }

    #[test]
    fn drops_records_before_cutoff_or_without_timestamp() {
        let cutoff = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let records = vec![
            record("Zapp", 3, 30.0, Some(cutoff - Duration::seconds(1))),
            record("Zapp", 1, 12.0, Some(cutoff)),
            record("Zapp", 7, 70.0, None),
        ];

        let totals = aggregate_submissions(&records, cutoff);
        assert_eq!(totals["Zapp"], AppTotal { orders: 1, earnings: 12.0 });
    }

    #[test]
    fn input_is_left_untouched() {
        let cutoff = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let records = vec![record("just  eat", 2, 20.0, Some(cutoff))];
        let _ = aggregate_submissions(&records, cutoff);
        assert_eq!(records[0].app, "just  eat");
    }
}
