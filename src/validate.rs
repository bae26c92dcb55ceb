use thiserror::Error;

use crate::models::{AppSuggestion, NewSubmission, Timeframe, Vehicle};
use crate::normalize::normalize_app_name;

pub const MAX_ORDERS: f64 = 1000.0;
pub const MAX_HOURS: f64 = 24.0;
pub const MAX_EARNINGS: f64 = 10_000.0;
pub const MAX_PAY_PER_ORDER: f64 = 500.0;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("please fill in all required fields ({0} is missing)")]
    Missing(&'static str),
    #[error("{field} must be a number, got '{value}'")]
    NotNumeric { field: &'static str, value: String },
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("average pay of {0:.2} per order is not realistic")]
    ImplausiblePay(f64),
    #[error("you have already submitted a report for this timeframe")]
    AlreadySubmitted,
}

/// Raw report fields as typed by a courier.
#[derive(Debug, Clone)]
pub struct SubmissionForm {
    pub app: String,
    pub orders: String,
    pub hours_worked: String,
    pub earnings: String,
    pub vehicle: Vehicle,
    pub timeframe: Timeframe,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
}

fn number(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ValidationError::NotNumeric {
            field,
            value: raw.to_string(),
        }),
    }
}

fn whole_number(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    let value = number(field, raw)?;
    if value.fract() != 0.0 {
        return Err(ValidationError::NotNumeric {
            field,
            value: raw.trim().to_string(),
        });
    }
    Ok(value)
}

fn bounded(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64, ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(value)
}

impl SubmissionForm {
    /// Applies the anti-spam rules and normalizes the app name.
    pub fn validate(&self) -> Result<NewSubmission, ValidationError> {
        let app = normalize_app_name(&self.app);
        if app.is_empty() {
            return Err(ValidationError::Missing("app"));
        }

        let orders = bounded(
            "orders",
            whole_number("orders", &self.orders)?,
            1.0,
            MAX_ORDERS,
        )?;
        let hours = bounded(
            "hours worked",
            whole_number("hours worked", &self.hours_worked)?,
            1.0,
            MAX_HOURS,
        )?;
        let earnings = bounded(
            "earnings",
            number("earnings", &self.earnings)?,
            0.0,
            MAX_EARNINGS,
        )?;

        let avg_pay = earnings / orders;
        if avg_pay > MAX_PAY_PER_ORDER {
            return Err(ValidationError::ImplausiblePay(avg_pay));
        }

        Ok(NewSubmission {
            app,
            orders: orders as i64,
            vehicle: self.vehicle,
            hours_worked: hours as i32,
            earnings,
            avg_pay,
            timeframe: self.timeframe,
            user_id: self.user_id.clone(),
            user_email: self.user_email.clone(),
        })
    }
}

/// Checks a suggested app name; suggestions never create fallback rows.
pub fn validate_suggestion(
    app: &str,
    notes: Option<&str>,
    submitted_by: Option<String>,
) -> Result<AppSuggestion, ValidationError> {
    let app = app.trim();
    if app.is_empty() {
        return Err(ValidationError::Missing("app"));
    }

    Ok(AppSuggestion {
        app: normalize_app_name(app),
        submitted_by,
        notes: notes.map(str::trim).unwrap_or_default().to_string(),
    })
}
