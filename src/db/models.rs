/// Portal database models
use crate::error::{PortalError, PortalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Seeker,
    Poster,
    Referrer,
    Admin,
}

/// Seeker onboarding progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OnboardingStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Account activation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
}

/// Job posting status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Inactive,
    Closed,
}

/// Application status; a fixed closed set, anything else is rejected
/// at the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ApplicationStatus {
    #[serde(rename = "Received")]
    #[sqlx(rename = "Received")]
    Received,
    #[serde(rename = "Interview Scheduled")]
    #[sqlx(rename = "Interview Scheduled")]
    InterviewScheduled,
    #[serde(rename = "Rejected")]
    #[sqlx(rename = "Rejected")]
    Rejected,
    #[serde(rename = "Hired")]
    #[sqlx(rename = "Hired")]
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Received => "Received",
            ApplicationStatus::InterviewScheduled => "Interview Scheduled",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Hired => "Hired",
        }
    }

    pub fn parse(s: &str) -> PortalResult<Self> {
        match s {
            "Received" => Ok(ApplicationStatus::Received),
            "Interview Scheduled" => Ok(ApplicationStatus::InterviewScheduled),
            "Rejected" => Ok(ApplicationStatus::Rejected),
            "Hired" => Ok(ApplicationStatus::Hired),
            _ => Err(PortalError::Validation(format!(
                "Unknown application status: {}",
                s
            ))),
        }
    }
}

/// Account record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub is_super_admin: bool,
    pub first_login: bool,
    pub onboarding_status: OnboardingStatus,
    pub status: AccountStatus,
    pub resume_url: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Access code record
///
/// A code is either unused (used_by and used_at NULL) or used exactly once;
/// it never goes back to unused and is never deleted (kept for audit).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AccessCode {
    pub code: String,
    pub candidate_email: String,
    pub expires_at: DateTime<Utc>,
    pub generated_by: String,
    pub is_used: bool,
    pub used_by: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccessCode {
    /// Derived status label, always recomputed at read time, never stored
    pub fn status_label(&self, now: DateTime<Utc>) -> &'static str {
        match (self.is_used, self.expires_at >= now) {
            (true, true) => "used and valid",
            (true, false) => "used and expired",
            (false, false) => "unused and expired",
            (false, true) => "unused and valid",
        }
    }
}

/// Job record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub posted_by: String,
    pub title: String,
    pub status: JobStatus,
    pub number_of_openings: i64,
    pub created_at: DateTime<Utc>,
}

/// Application record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub job_id: String,
    pub applicant_id: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_application_status_parse_round_trip() {
        for s in ["Received", "Interview Scheduled", "Rejected", "Hired"] {
            assert_eq!(ApplicationStatus::parse(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn test_application_status_rejects_unknown() {
        assert!(ApplicationStatus::parse("Shortlisted").is_err());
        assert!(ApplicationStatus::parse("hired").is_err());
        assert!(ApplicationStatus::parse("").is_err());
    }

    #[test]
    fn test_status_label_derivation() {
        let now = Utc::now();
        let mut code = AccessCode {
            code: "abc123XYZ0".to_string(),
            candidate_email: "a@x.com".to_string(),
            expires_at: now + Duration::days(1),
            generated_by: "admin-1".to_string(),
            is_used: false,
            used_by: None,
            used_at: None,
            created_at: now,
        };

        assert_eq!(code.status_label(now), "unused and valid");

        code.is_used = true;
        assert_eq!(code.status_label(now), "used and valid");

        code.expires_at = now - Duration::hours(1);
        assert_eq!(code.status_label(now), "used and expired");

        code.is_used = false;
        assert_eq!(code.status_label(now), "unused and expired");
    }
}
