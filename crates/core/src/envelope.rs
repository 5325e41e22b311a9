use serde::{Deserialize, Serialize};

use crate::types::{Application, Company, Job, PublicUser};

/// Response body shape shared by every portal endpoint.
///
/// The payload is flattened into the envelope under a resource-specific key
/// (`companies`, `jobs`, `user`, ...), matching the wire contract consumed
/// by the client. Behaviour is gated on `success` alone; payload fields all
/// default so a `{success:false, message}` body parses for any `T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: Option<T>,
}

impl<T> Envelope<T> {
    /// Builds a successful envelope carrying a payload.
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            message: None,
            payload: Some(payload),
        }
    }

    /// Builds a successful envelope carrying only a message.
    pub fn ok_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            payload: None,
        }
    }

    /// Builds a failure envelope carrying a diagnostic message.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            payload: None,
        }
    }
}

/// Payload key for the company collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyList {
    #[serde(default)]
    pub companies: Vec<Company>,
}

/// Payload key for the job collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobList {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// Payload key for the application collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationList {
    #[serde(default)]
    pub applications: Vec<Application>,
}

/// Payload key for a single user record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserBody {
    #[serde(default)]
    pub user: Option<PublicUser>,
}

/// Payload key for a single company record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyBody {
    #[serde(default)]
    pub company: Option<Company>,
}

/// Payload key for a single job record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobBody {
    #[serde(default)]
    pub job: Option<Job>,
}

/// Payload key for a single application record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationBody {
    #[serde(default)]
    pub application: Option<Application>,
}
