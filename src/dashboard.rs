use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, TimeZone};
use tracing::{debug, warn};

use crate::aggregate::aggregate_submissions;
use crate::fallback::FallbackTable;
use crate::merge::merged_view;
use crate::models::{MergedRow, SubmissionRecord, Timeframe, Vehicle};
use crate::weights::{period_start, time_weight};

/// A (timeframe, vehicle) choice, tagged with the order it was made in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub timeframe: Timeframe,
    pub vehicle: Vehicle,
    generation: u64,
}

/// Turns fetched submissions into the ranked view for the latest selection.
///
/// Only the most recent selection's fetch is rendered; results that resolve
/// after a newer selection was made are dropped.
pub struct Dashboard<'a> {
    fallback: &'a FallbackTable,
    current: AtomicU64,
}

impl<'a> Dashboard<'a> {
    pub fn new(fallback: &'a FallbackTable) -> Self {
        Self {
            fallback,
            current: AtomicU64::new(0),
        }
    }

    pub fn select(&self, timeframe: Timeframe, vehicle: Vehicle) -> Selection {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        Selection {
            timeframe,
            vehicle,
            generation,
        }
    }

    pub fn is_current(&self, selection: &Selection) -> bool {
        self.current.load(Ordering::SeqCst) == selection.generation
    }

    /// Applies a finished fetch. Returns `None` when the selection is stale.
    /// A failed fetch degrades to the fallback-only view.
    pub fn resolve<Tz: TimeZone, E: std::fmt::Display>(
        &self,
        selection: &Selection,
        fetched: Result<Vec<SubmissionRecord>, E>,
        now: &DateTime<Tz>,
    ) -> Option<Vec<MergedRow>> {
        if !self.is_current(selection) {
            debug!(
                timeframe = %selection.timeframe,
                vehicle = %selection.vehicle,
                "discarding result for outdated selection"
            );
            return None;
        }

        let submissions = fetched.unwrap_or_else(|err| {
            warn!(error = %err, "failed to read submissions, showing fallback data only");
            Vec::new()
        });

        Some(self.view(selection.timeframe, selection.vehicle, &submissions, now))
    }

    pub fn view<Tz: TimeZone>(
        &self,
        timeframe: Timeframe,
        vehicle: Vehicle,
        submissions: &[SubmissionRecord],
        now: &DateTime<Tz>,
    ) -> Vec<MergedRow> {
        let cutoff = period_start(timeframe, now);
        let relevant: Vec<SubmissionRecord> = submissions
            .iter()
            .filter(|s| s.timeframe == timeframe && s.vehicle == vehicle)
            .cloned()
            .collect();
        let submitted = aggregate_submissions(&relevant, cutoff);
        let weight = time_weight(timeframe, now);

        merged_view(
            self.fallback.bucket(timeframe, vehicle),
            &submitted,
            timeframe,
            weight,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table() -> FallbackTable {
        FallbackTable::synthesize(&mut StdRng::seed_from_u64(42))
    }

    fn submission(app: &str, orders: i64, earnings: f64, created_at: DateTime<Utc>) -> SubmissionRecord {
        SubmissionRecord {
            app: app.to_string(),
            orders,
            earnings,
            vehicle: Vehicle::Bike,
            timeframe: Timeframe::Day,
            created_at: Some(created_at),
        }
    }

    #[test]
    fn day_bike_without_submissions_leads_with_just_eat() {
        let table = table();
        let dashboard = Dashboard::new(&table);
        let now = Utc.with_ymd_and_hms(2026, 6, 10, 15, 20, 0).unwrap();

        let rows = dashboard.view(Timeframe::Day, Vehicle::Bike, &[], &now);
        // Jitter can swap the two closest seeds, nothing else.
        assert!(["Just Eat", "Uber Eats"].contains(&rows[0].app.as_str()));
        let just_eat = rows.iter().find(|row| row.app == "Just Eat").unwrap();
        assert_eq!(just_eat.orders / 10, 3);
        assert_eq!(just_eat.earnings, None);
        assert!((just_eat.avg_pay - 105.5).abs() <= 105.5 * 0.02 + 0.01);
        assert!(rows.windows(2).all(|pair| pair[0].avg_pay >= pair[1].avg_pay));
    }

    #[test]
    fn hour_view_scales_fallback_orders() {
        let table = table();
        let dashboard = Dashboard::new(&table);
        let now = Utc.with_ymd_and_hms(2026, 6, 10, 15, 30, 0).unwrap();

        let rows = dashboard.view(Timeframe::Hour, Vehicle::Bike, &[], &now);
        let just_eat = rows.iter().find(|row| row.app == "Just Eat").unwrap();
        assert_eq!(just_eat.orders, 3);
    }

    #[test]
    fn submissions_inside_the_period_override_fallback() {
        let table = table();
        let dashboard = Dashboard::new(&table);
        let now = Utc.with_ymd_and_hms(2026, 6, 10, 15, 30, 0).unwrap();
        let fallback_pay = table
            .bucket(Timeframe::Day, Vehicle::Bike)
            .iter()
            .find(|record| record.app == "Deliveroo")
            .unwrap()
            .avg_pay;

        let submissions = vec![
            submission("deliveroo", 9, 117.0, now - Duration::hours(2)),
            submission("deliveroo", 50, 500.0, now - Duration::days(1)),
        ];
        let rows = dashboard.view(Timeframe::Day, Vehicle::Bike, &submissions, &now);
        let deliveroo = rows.iter().find(|row| row.app == "Deliveroo").unwrap();
        assert_eq!(deliveroo.orders, 9);
        assert_eq!(deliveroo.earnings, Some(117.0));
        assert_eq!(deliveroo.avg_pay, fallback_pay);
    }

    #[test]
    fn stale_selection_is_discarded() {
        let table = table();
        let dashboard = Dashboard::new(&table);
        let now = Utc::now();

        let first = dashboard.select(Timeframe::Day, Vehicle::Bike);
        let second = dashboard.select(Timeframe::Week, Vehicle::Car);

        assert!(dashboard
            .resolve(&first, Ok::<_, String>(Vec::new()), &now)
            .is_none());
        assert!(dashboard
            .resolve(&second, Ok::<_, String>(Vec::new()), &now)
            .is_some());
    }

    #[test]
    fn failed_fetch_falls_back_to_seed_view() {
        let table = table();
        let dashboard = Dashboard::new(&table);
        let now = Utc.with_ymd_and_hms(2026, 6, 10, 15, 30, 0).unwrap();
        let selection = dashboard.select(Timeframe::Week, Vehicle::Car);

        let rows = dashboard
            .resolve(&selection, Err("connection refused"), &now)
            .unwrap();
        assert_eq!(rows, dashboard.view(Timeframe::Week, Vehicle::Car, &[], &now));
        assert!(!rows.is_empty());
    }
}
