use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Aggregation period a statistic or submission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Hour,
    Day,
    Week,
    Month,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::Hour,
        Timeframe::Day,
        Timeframe::Week,
        Timeframe::Month,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Hour => "hour",
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Timeframe::Hour => "Last Hour",
            Timeframe::Day => "Today",
            Timeframe::Week => "This Week",
            Timeframe::Month => "This Month",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "timeframe",
                value: s.to_string(),
            })
    }
}

/// Delivery transport category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Vehicle {
    Bike,
    Ebike,
    Scooter,
    Foot,
    Motor,
    Car,
}

impl Vehicle {
    pub const ALL: [Vehicle; 6] = [
        Vehicle::Bike,
        Vehicle::Ebike,
        Vehicle::Scooter,
        Vehicle::Foot,
        Vehicle::Motor,
        Vehicle::Car,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Vehicle::Bike => "bike",
            Vehicle::Ebike => "ebike",
            Vehicle::Scooter => "scooter",
            Vehicle::Foot => "foot",
            Vehicle::Motor => "motor",
            Vehicle::Car => "car",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Vehicle::Bike => "Bike",
            Vehicle::Ebike => "Ebike",
            Vehicle::Scooter => "Scooter",
            Vehicle::Foot => "Foot",
            Vehicle::Motor => "Motor",
            Vehicle::Car => "Car",
        }
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vehicle {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vehicle::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "vehicle",
                value: s.to_string(),
            })
    }
}

/// One platform's baseline figures for a (timeframe, vehicle) bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct AppStatRecord {
    pub app: String,
    pub orders: u32,
    pub avg_pay: f64,
}

/// The slice of a stored submission the stats pipeline reads.
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub app: String,
    pub orders: i64,
    pub earnings: f64,
    pub vehicle: Vehicle,
    pub timeframe: Timeframe,
    pub created_at: Option<DateTime<Utc>>,
}

/// A submission row as the admin panel sees it.
#[derive(Debug, Clone)]
pub struct StoredSubmission {
    pub id: Uuid,
    pub app: String,
    pub orders: i64,
    pub vehicle: Vehicle,
    pub hours_worked: i32,
    pub earnings: f64,
    pub avg_pay: f64,
    pub timeframe: Timeframe,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub verified: bool,
}

/// A validated report ready to be written to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub app: String,
    pub orders: i64,
    pub vehicle: Vehicle,
    pub hours_worked: i32,
    pub earnings: f64,
    pub avg_pay: f64,
    pub timeframe: Timeframe,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppTotal {
    pub orders: i64,
    pub earnings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRow {
    pub app: String,
    pub orders: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earnings: Option<f64>,
    pub avg_pay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderShare {
    pub app: String,
    pub orders: i64,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppSuggestion {
    pub app: String,
    pub submitted_by: Option<String>,
    pub notes: String,
}
