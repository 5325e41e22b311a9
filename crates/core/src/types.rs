use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role attached to every portal account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Recruiter,
    Candidate,
}

impl UserRole {
    /// Returns the canonical wire/database representation for the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recruiter => "Recruiter",
            Self::Candidate => "Candidate",
        }
    }
}

impl FromStr for UserRole {
    type Err = RoleParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Recruiter" => Ok(Self::Recruiter),
            "Candidate" => Ok(Self::Candidate),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// Error returned when a role string is neither `Recruiter` nor `Candidate`.
#[derive(Debug, Error)]
#[error("unknown user role '{0}'")]
pub struct RoleParseError(pub String);

/// Free-form profile details attached to a user account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
}

/// User account as it appears on the wire. Password digests never leave
/// the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub fullname: String,
    pub email: String,
    pub phone_number: String,
    pub role: UserRole,
    #[serde(default)]
    pub profile: Profile,
}

/// Company registered by a recruiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Job opening posted against a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub salary: i64,
    pub experience_level: i64,
    pub location: String,
    pub job_type: String,
    pub position: i64,
    pub company_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Candidate application against a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    #[serde(rename = "_id")]
    pub id: String,
    pub job_id: String,
    pub applicant_id: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

/// Application status persisted in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    /// Returns the canonical database representation for the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = StatusParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Pending" => Ok(Self::Pending),
            "Accepted" => Ok(Self::Accepted),
            "Rejected" => Ok(Self::Rejected),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// Error returned when an application status string is not recognised.
#[derive(Debug, Error)]
#[error("unknown application status '{0}'")]
pub struct StatusParseError(pub String);
