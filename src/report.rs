use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::admin::{orders_by_app, verification_counts};
use crate::merge::{logo_size, order_shares};
use crate::models::{MergedRow, StoredSubmission, Timeframe, Vehicle};
use crate::normalize::logo_filename;

pub fn render_table(rows: &[MergedRow]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "| App | Orders | Avg Pay (£) |");
    let _ = writeln!(output, "|---|---:|---:|");
    for row in rows {
        let _ = writeln!(output, "| {} | {} | £{:.2} |", row.app, row.orders, row.avg_pay);
    }
    output
}

pub fn build_report(
    timeframe: Timeframe,
    vehicle: Vehicle,
    generated_at: DateTime<Utc>,
    rows: &[MergedRow],
    submissions: &[StoredSubmission],
) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "# Top Delivery Apps in London ({})",
        timeframe.label()
    );
    let _ = writeln!(
        output,
        "Vehicle: {} · generated {}",
        vehicle.label(),
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Ranking");

    if rows.is_empty() {
        let _ = writeln!(output, "No apps with data for this selection.");
    } else {
        output.push_str(&render_table(rows));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Share of Orders");

    let shares = order_shares(rows);
    if shares.is_empty() {
        let _ = writeln!(output, "No orders recorded for this selection.");
    } else {
        for (rank, share) in shares.iter().enumerate() {
            let _ = writeln!(
                output,
                "- {}: {:.1}% of orders (logo {} at {}px)",
                share.app,
                share.share * 100.0,
                logo_filename(&share.app),
                logo_size(rank)
            );
        }
    }

    let counts = verification_counts(submissions);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Community Submissions");
    let _ = writeln!(
        output,
        "{} reports ({} verified, {} awaiting review)",
        counts.total, counts.verified, counts.unverified
    );

    let totals = orders_by_app(submissions);
    if !totals.is_empty() {
        let mut totals: Vec<(String, i64)> = totals.into_iter().collect();
        totals.sort_by(|a, b| b.1.cmp(&a.1));
        for (app, orders) in totals {
            let _ = writeln!(output, "- {app}: {orders} orders reported");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(app: &str, orders: i64, avg_pay: f64) -> MergedRow {
        MergedRow {
            app: app.to_string(),
            orders,
            earnings: None,
            avg_pay,
        }
    }

    #[test]
    fn table_lists_rows_in_given_order() {
        let table = render_table(&[row("Just Eat", 30, 105.5), row("Uber Eats", 28, 102.0)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[2], "| Just Eat | 30 | £105.50 |");
        assert_eq!(lines[3], "| Uber Eats | 28 | £102.00 |");
    }

    #[test]
    fn report_mentions_shares_and_empty_community() {
        let report = build_report(
            Timeframe::Day,
            Vehicle::Bike,
            Utc::now(),
            &[row("Just Eat", 3, 105.5), row("Uber Eats", 1, 102.0)],
            &[],
        );
        assert!(report.contains("(Today)"));
        assert!(report.contains("- Just Eat: 75.0% of orders (logo /delivery-logos/justeat.png at 160px)"));
        assert!(report.contains("0 reports (0 verified, 0 awaiting review)"));
    }

    #[test]
    fn empty_ranking_is_called_out() {
        let report = build_report(Timeframe::Hour, Vehicle::Foot, Utc::now(), &[], &[]);
        assert!(report.contains("No apps with data for this selection."));
        assert!(report.contains("No orders recorded for this selection."));
    }
}
