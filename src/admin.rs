use std::collections::BTreeMap;

use clap::ValueEnum;

use crate::models::{StoredSubmission, Vehicle};
use crate::normalize::normalize_app_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum VerifiedFilter {
    #[default]
    All,
    Verified,
    Unverified,
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub verified: VerifiedFilter,
    pub app: Option<String>,
    pub vehicle: Option<Vehicle>,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &StoredSubmission) -> bool {
        match self.verified {
            VerifiedFilter::Verified if !submission.verified => return false,
            VerifiedFilter::Unverified if submission.verified => return false,
            _ => {}
        }
        if let Some(app) = &self.app {
            if normalize_app_name(&submission.app) != normalize_app_name(app) {
                return false;
            }
        }
        if let Some(vehicle) = self.vehicle {
            if submission.vehicle != vehicle {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, submissions: &'a [StoredSubmission]) -> Vec<&'a StoredSubmission> {
        submissions.iter().filter(|s| self.matches(s)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerificationCounts {
    pub total: usize,
    pub verified: usize,
    pub unverified: usize,
}

pub fn verification_counts(submissions: &[StoredSubmission]) -> VerificationCounts {
    let verified = submissions.iter().filter(|s| s.verified).count();
    VerificationCounts {
        total: submissions.len(),
        verified,
        unverified: submissions.len() - verified,
    }
}

/// Total orders per normalized app across every submission.
pub fn orders_by_app(submissions: &[StoredSubmission]) -> BTreeMap<String, i64> {
    let mut totals = BTreeMap::new();
    for submission in submissions {
        let app = normalize_app_name(&submission.app);
        if app.is_empty() {
            continue;
        }
        *totals.entry(app).or_insert(0) += submission.orders;
    }
    totals
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub user_email: String,
    pub user_id: String,
    pub count: usize,
}

/// Distinct submitters by email, in first-seen order.
pub fn users(submissions: &[StoredSubmission]) -> Vec<UserSummary> {
    let mut summaries: Vec<UserSummary> = Vec::new();
    for submission in submissions {
        let Some(email) = submission.user_email.as_deref() else {
            continue;
        };
        match summaries.iter_mut().find(|u| u.user_email == email) {
            Some(summary) => summary.count += 1,
            None => summaries.push(UserSummary {
                user_email: email.to_string(),
                user_id: submission.user_id.clone().unwrap_or_default(),
                count: 1,
            }),
        }
    }
    summaries
}
