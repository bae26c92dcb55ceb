use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod admin;
mod aggregate;
mod config;
mod dashboard;
mod db;
mod fallback;
mod merge;
mod models;
mod normalize;
mod report;
mod validate;
mod weights;

use admin::{SubmissionFilter, VerifiedFilter};
use dashboard::Dashboard;
use models::{Timeframe, Vehicle};
use validate::SubmissionForm;

#[derive(Parser)]
#[command(name = "courier-stats")]
#[command(about = "Crowdsourced order volume and pay per delivery app", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample community submissions
    Seed,
    /// Import submissions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show the ranked apps for a timeframe and vehicle
    Stats {
        #[arg(long, value_enum, default_value_t = Timeframe::Hour)]
        timeframe: Timeframe,
        #[arg(long, value_enum, default_value_t = Vehicle::Bike)]
        vehicle: Vehicle,
        #[arg(long)]
        json: bool,
    },
    /// Submit an order report
    Submit {
        #[arg(long)]
        app: String,
        #[arg(long)]
        orders: String,
        #[arg(long)]
        hours: String,
        #[arg(long)]
        earnings: String,
        #[arg(long, value_enum)]
        vehicle: Vehicle,
        #[arg(long, value_enum)]
        timeframe: Timeframe,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        user_email: Option<String>,
    },
    /// Suggest a delivery app that is missing
    Suggest {
        #[arg(long)]
        app: String,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Write a markdown report for a timeframe and vehicle
    Report {
        #[arg(long, value_enum, default_value_t = Timeframe::Day)]
        timeframe: Timeframe,
        #[arg(long, value_enum, default_value_t = Vehicle::Bike)]
        vehicle: Vehicle,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Review community submissions
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// List submissions, newest first
    List {
        #[arg(long, value_enum, default_value = "all")]
        verified: VerifiedFilter,
        #[arg(long)]
        app: Option<String>,
        #[arg(long, value_enum)]
        vehicle: Option<Vehicle>,
    },
    /// List submitters and how many reports each sent
    Users,
    /// Toggle the verified flag of a submission
    Verify {
        #[arg(long)]
        id: Uuid,
    },
    /// Delete a submission
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("courier_stats=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&pool).await?;
            println!("Inserted {inserted} sample submissions.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} submissions from {}.", csv.display());
        }
        Commands::Stats {
            timeframe,
            vehicle,
            json,
        } => {
            let dashboard = Dashboard::new(fallback::fallback_table());
            let selection = dashboard.select(timeframe, vehicle);
            let fetched = db::fetch_submissions(&pool, timeframe, vehicle).await;
            let Some(rows) = dashboard.resolve(&selection, fetched, &Local::now()) else {
                return Ok(());
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!(
                    "Top delivery apps ({}, {}):",
                    timeframe.label(),
                    vehicle.label()
                );
                print!("{}", report::render_table(&rows));
            }
        }
        Commands::Submit {
            app,
            orders,
            hours,
            earnings,
            vehicle,
            timeframe,
            user_id,
            user_email,
        } => {
            let form = SubmissionForm {
                app,
                orders,
                hours_worked: hours,
                earnings,
                vehicle,
                timeframe,
                user_id,
                user_email,
            };
            let id = db::submit(&pool, &form).await?;
            info!(%id, "submission stored");
            println!("Report submitted successfully ({id}).");
        }
        Commands::Suggest {
            app,
            notes,
            user_id,
        } => {
            let suggestion = validate::validate_suggestion(&app, notes.as_deref(), user_id)?;
            db::insert_suggestion(&pool, &suggestion).await?;
            println!("Thanks! We're reviewing your suggestion for {}.", suggestion.app);
        }
        Commands::Report {
            timeframe,
            vehicle,
            out,
        } => {
            let dashboard = Dashboard::new(fallback::fallback_table());
            let selection = dashboard.select(timeframe, vehicle);
            let fetched = db::fetch_submissions(&pool, timeframe, vehicle).await;
            let rows = dashboard
                .resolve(&selection, fetched, &Local::now())
                .unwrap_or_default();
            let submissions = db::list_submissions(&pool).await?;
            let report = report::build_report(timeframe, vehicle, Utc::now(), &rows, &submissions);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Admin { command } => run_admin(&pool, command).await?,
    }

    Ok(())
}

async fn run_admin(pool: &sqlx::PgPool, command: AdminCommands) -> anyhow::Result<()> {
    match command {
        AdminCommands::List {
            verified,
            app,
            vehicle,
        } => {
            let submissions = db::list_submissions(pool).await?;
            let counts = admin::verification_counts(&submissions);
            println!(
                "{} reports ({} verified, {} unverified)",
                counts.total, counts.verified, counts.unverified
            );
            for (name, orders) in admin::orders_by_app(&submissions) {
                println!("  {name}: {orders} orders");
            }

            let filter = SubmissionFilter {
                verified,
                app,
                vehicle,
            };
            let hits = filter.apply(&submissions);
            if hits.is_empty() {
                println!("No reports found.");
            }
            for s in hits {
                println!(
                    "- {} {} | {} | {} orders | £{:.2} | {}h | {} {} | {} | {}",
                    s.id,
                    s.created_at.format("%Y-%m-%d %H:%M"),
                    s.app,
                    s.orders,
                    s.earnings,
                    s.hours_worked,
                    s.vehicle.label(),
                    s.timeframe.label(),
                    s.user_email.as_deref().unwrap_or("anonymous"),
                    if s.verified { "Verified" } else { "Unverified" }
                );
            }
        }
        AdminCommands::Users => {
            let submissions = db::list_submissions(pool).await?;
            let users = admin::users(&submissions);
            if users.is_empty() {
                println!("No users found.");
            }
            for user in users {
                println!("- {} ({}) {} reports", user.user_email, user.user_id, user.count);
            }
        }
        AdminCommands::Verify { id } => match db::toggle_verified(pool, id).await? {
            Some(true) => println!("Submission {id} verified."),
            Some(false) => println!("Submission {id} unverified."),
            None => anyhow::bail!("no submission with id {id}"),
        },
        AdminCommands::Delete { id } => {
            if !db::delete_submission(pool, id).await? {
                anyhow::bail!("no submission with id {id}");
            }
            println!("Submission {id} deleted.");
        }
    }

    Ok(())
}
