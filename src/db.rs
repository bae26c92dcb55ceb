use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    AppSuggestion, NewSubmission, StoredSubmission, SubmissionRecord, Timeframe, Vehicle,
};
use crate::validate::{SubmissionForm, ValidationError};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn insert_row(
    pool: &PgPool,
    submission: &NewSubmission,
    created_at: Option<DateTime<Utc>>,
    source_key: Option<&str>,
) -> anyhow::Result<Option<Uuid>> {
    let id = Uuid::new_v4();
    let result = sqlx::query(
        r#"
        INSERT INTO courier_stats.submissions
        (id, app, orders, vehicle, hours_worked, earnings, avg_pay, timeframe,
         user_id, user_email, created_at, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, COALESCE($11, now()), $12)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(&submission.app)
    .bind(submission.orders)
    .bind(submission.vehicle.as_str())
    .bind(submission.hours_worked)
    .bind(submission.earnings)
    .bind(submission.avg_pay)
    .bind(submission.timeframe.as_str())
    .bind(&submission.user_id)
    .bind(&submission.user_email)
    .bind(created_at)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok((result.rows_affected() > 0).then_some(id))
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let now = Utc::now();
    let samples = [
        ("seed-001", "Deliveroo", "9", "5", "117", Vehicle::Bike, Timeframe::Day, "seed-courier-1", 2),
        ("seed-002", "uber eats", "14", "6", "168.40", Vehicle::Ebike, Timeframe::Day, "seed-courier-2", 3),
        ("seed-003", "Just Eat", "3", "1", "41.50", Vehicle::Bike, Timeframe::Hour, "seed-courier-3", 0),
        ("seed-004", "Stuart", "62", "22", "810", Vehicle::Scooter, Timeframe::Week, "seed-courier-1", 26),
        ("seed-005", "snappy shopper", "240", "24", "2950", Vehicle::Car, Timeframe::Month, "seed-courier-2", 72),
    ];

    let mut inserted = 0usize;
    for (source_key, app, orders, hours, earnings, vehicle, timeframe, user, hours_ago) in samples {
        let form = SubmissionForm {
            app: app.to_string(),
            orders: orders.to_string(),
            hours_worked: hours.to_string(),
            earnings: earnings.to_string(),
            vehicle,
            timeframe,
            user_id: Some(user.to_string()),
            user_email: Some(format!("{user}@deliverystats.example")),
        };
        let submission = form
            .validate()
            .with_context(|| format!("seed row {source_key} is invalid"))?;

        let created_at = now - Duration::hours(hours_ago);
        if insert_row(pool, &submission, Some(created_at), Some(source_key))
            .await?
            .is_some()
        {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Validates and stores a courier's report, enforcing one report per user and
/// timeframe.
pub async fn submit(pool: &PgPool, form: &SubmissionForm) -> anyhow::Result<Uuid> {
    let submission = form.validate()?;

    if let Some(user_id) = submission.user_id.as_deref() {
        if user_has_submission(pool, user_id, submission.timeframe).await? {
            return Err(ValidationError::AlreadySubmitted.into());
        }
    }

    insert_row(pool, &submission, None, None)
        .await?
        .context("submission was not stored")
}

pub async fn user_has_submission(
    pool: &PgPool,
    user_id: &str,
    timeframe: Timeframe,
) -> anyhow::Result<bool> {
    let exists: bool = sqlx::query(
        "SELECT EXISTS (SELECT 1 FROM courier_stats.submissions \
         WHERE user_id = $1 AND timeframe = $2) AS present",
    )
    .bind(user_id)
    .bind(timeframe.as_str())
    .fetch_one(pool)
    .await?
    .get("present");

    Ok(exists)
}

pub async fn fetch_submissions(
    pool: &PgPool,
    timeframe: Timeframe,
    vehicle: Vehicle,
) -> anyhow::Result<Vec<SubmissionRecord>> {
    let rows = sqlx::query(
        "SELECT app, orders, earnings, vehicle, timeframe, created_at \
         FROM courier_stats.submissions \
         WHERE timeframe = $1 AND vehicle = $2",
    )
    .bind(timeframe.as_str())
    .bind(vehicle.as_str())
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(SubmissionRecord {
            app: row.get("app"),
            orders: row.get("orders"),
            earnings: row.get("earnings"),
            vehicle: row.get::<String, _>("vehicle").parse()?,
            timeframe: row.get::<String, _>("timeframe").parse()?,
            created_at: row.get("created_at"),
        });
    }

    Ok(records)
}

fn stored_submission(row: &PgRow) -> anyhow::Result<StoredSubmission> {
    Ok(StoredSubmission {
        id: row.get("id"),
        app: row.get("app"),
        orders: row.get("orders"),
        vehicle: row.get::<String, _>("vehicle").parse()?,
        hours_worked: row.get("hours_worked"),
        earnings: row.get("earnings"),
        avg_pay: row.get("avg_pay"),
        timeframe: row.get::<String, _>("timeframe").parse()?,
        user_id: row.get("user_id"),
        user_email: row.get("user_email"),
        created_at: row.get("created_at"),
        verified: row.get("verified"),
    })
}

/// Every submission, newest first.
pub async fn list_submissions(pool: &PgPool) -> anyhow::Result<Vec<StoredSubmission>> {
    let rows = sqlx::query(
        "SELECT id, app, orders, vehicle, hours_worked, earnings, avg_pay, timeframe, \
         user_id, user_email, created_at, verified \
         FROM courier_stats.submissions \
         ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(stored_submission).collect()
}

/// Flips the verified flag. Returns the new value, or `None` if no such row.
pub async fn toggle_verified(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<bool>> {
    let row = sqlx::query(
        "UPDATE courier_stats.submissions SET verified = NOT verified \
         WHERE id = $1 RETURNING verified",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| row.get("verified")))
}

pub async fn delete_submission(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM courier_stats.submissions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn insert_suggestion(pool: &PgPool, suggestion: &AppSuggestion) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO courier_stats.app_suggestions (id, app, submitted_by, notes)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(&suggestion.app)
    .bind(&suggestion.submitted_by)
    .bind(&suggestion.notes)
    .execute(pool)
    .await?;
    Ok(id)
}

#[derive(serde::Deserialize)]
struct CsvRow {
    app: String,
    orders: String,
    hours_worked: String,
    earnings: String,
    vehicle: Vehicle,
    timeframe: Timeframe,
    user_id: Option<String>,
    user_email: Option<String>,
    created_at: Option<DateTime<Utc>>,
    source_key: Option<String>,
}

/// A CSV row that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub submission: NewSubmission,
    pub created_at: Option<DateTime<Utc>>,
    pub source_key: Option<String>,
}

/// Parses and validates submission rows. Rows that fail either step are
/// logged and skipped.
pub fn read_import_rows<R: std::io::Read>(input: R) -> Vec<ImportRow> {
    let mut reader = csv::Reader::from_reader(input);
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!(line, error = %err, "skipping unreadable row");
                continue;
            }
        };

        let form = SubmissionForm {
            app: row.app,
            orders: row.orders,
            hours_worked: row.hours_worked,
            earnings: row.earnings,
            vehicle: row.vehicle,
            timeframe: row.timeframe,
            user_id: row.user_id,
            user_email: row.user_email,
        };

        match form.validate() {
            Ok(submission) => rows.push(ImportRow {
                submission,
                created_at: row.created_at,
                source_key: row.source_key,
            }),
            Err(err) => warn!(line, error = %err, "skipping invalid row"),
        }
    }

    rows
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for row in read_import_rows(file) {
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_row(pool, &row.submission, row.created_at, Some(&source_key))
            .await?
            .is_some()
        {
            inserted += 1;
        }
    }

    info!(inserted, path = %csv_path.display(), "csv import finished");
    Ok(inserted)
}
