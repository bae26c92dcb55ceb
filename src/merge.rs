use std::collections::{BTreeMap, HashSet};

use crate::fallback::round2;
use crate::models::{AppStatRecord, AppTotal, MergedRow, OrderShare, Timeframe};
use crate::normalize::normalize_app_name;

// Only the in-progress hour is scaled; the other buckets are whole periods.
fn weigh_orders(orders: i64, timeframe: Timeframe, weight: f64) -> i64 {
    match timeframe {
        Timeframe::Hour => (orders as f64 * weight).round() as i64,
        _ => orders,
    }
}

fn weigh_earnings(earnings: f64, timeframe: Timeframe, weight: f64) -> f64 {
    match timeframe {
        Timeframe::Hour => round2(earnings * weight),
        _ => earnings,
    }
}

/// Overlays submitted totals on the fallback rows of one bucket.
///
/// A submitted app replaces its fallback row's orders and earnings but keeps
/// the fallback average pay. Submitted apps with no fallback row are appended
/// with an average pay of zero. Nothing is filtered or sorted here.
pub fn merge_rows(
    fallback: &[AppStatRecord],
    submitted: &BTreeMap<String, AppTotal>,
    timeframe: Timeframe,
    weight: f64,
) -> Vec<MergedRow> {
    let mut rows = Vec::with_capacity(fallback.len() + submitted.len());
    let mut seen = HashSet::new();

    for record in fallback {
        let app = normalize_app_name(&record.app);
        if !seen.insert(app.clone()) {
            continue;
        }

        let row = match submitted.get(&app) {
            Some(total) => MergedRow {
                app,
                orders: weigh_orders(total.orders, timeframe, weight),
                earnings: Some(weigh_earnings(total.earnings, timeframe, weight)),
                avg_pay: record.avg_pay,
            },
            None => MergedRow {
                app,
                orders: weigh_orders(i64::from(record.orders), timeframe, weight),
                earnings: None,
                avg_pay: record.avg_pay,
            },
        };
        rows.push(row);
    }

    for (app, total) in submitted {
        if seen.contains(app) {
            continue;
        }
        rows.push(MergedRow {
            app: app.clone(),
            orders: weigh_orders(total.orders, timeframe, weight),
            earnings: Some(weigh_earnings(total.earnings, timeframe, weight)),
            avg_pay: 0.0,
        });
    }

    rows
}

/// Hides rows without signal and orders the rest by average pay, highest
/// first. Equal pay keeps the incoming order.
pub fn rank_rows(rows: Vec<MergedRow>) -> Vec<MergedRow> {
    let mut ranked: Vec<MergedRow> = rows
        .into_iter()
        .filter(|row| row.orders > 0 && row.avg_pay > 0.0)
        .collect();
    ranked.sort_by(|a, b| {
        b.avg_pay
            .partial_cmp(&a.avg_pay)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

pub fn merged_view(
    fallback: &[AppStatRecord],
    submitted: &BTreeMap<String, AppTotal>,
    timeframe: Timeframe,
    weight: f64,
) -> Vec<MergedRow> {
    rank_rows(merge_rows(fallback, submitted, timeframe, weight))
}

/// Each app's fraction of total orders, largest share first.
pub fn order_shares(rows: &[MergedRow]) -> Vec<OrderShare> {
    let total: i64 = rows.iter().map(|row| row.orders).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut shares: Vec<OrderShare> = rows
        .iter()
        .filter(|row| row.orders > 0)
        .map(|row| OrderShare {
            app: row.app.clone(),
            orders: row.orders,
            share: row.orders as f64 / total as f64,
        })
        .collect();
    shares.sort_by(|a, b| {
        b.share
            .partial_cmp(&a.share)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    shares
}

/// Logo edge length in pixels for a zero-based share rank.
pub fn logo_size(rank: usize) -> u32 {
    match rank {
        0..=2 => 160,
        3..=5 => 120,
        6..=8 => 80,
        _ => 50,
    }
}
