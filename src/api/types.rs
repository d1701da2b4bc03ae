//! Review service wire types
//!
//! JSON payloads exchanged with the REST endpoints. Every response is wrapped
//! in an [`ApiEnvelope`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard response envelope: `{success, data?, message?}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the server handled the request
    pub success: bool,

    /// Payload, absent on acknowledgements and most errors
    pub data: Option<T>,

    /// Human-readable status or error message
    pub message: Option<String>,
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// New employee submitting code
    #[default]
    User,
    /// Administrator (quota management, analytics, unlimited usage)
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Authenticated account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

/// Body of `POST /api/auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/auth/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login/register response payload
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

/// A code review thread owned by one employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/reviews`
#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `POST /api/submissions`
#[derive(Debug, Clone, Serialize)]
pub struct NewSubmission {
    pub review_id: i64,
    pub code_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectation: Option<String>,
}

/// Body of `PATCH /api/usage-limits/:featureKey`
#[derive(Debug, Clone, Serialize)]
pub struct DailyLimitUpdate {
    pub daily_limit: u32,
}

/// Body of `PATCH /api/feedback/:id/status`
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackStatusUpdate {
    pub is_resolved: bool,
}

/// Usage entry exactly as the server sends it
///
/// `remaining` and `canUse` are accepted but not trusted; see
/// [`crate::usage::FeatureUsage::new`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawFeatureUsage {
    pub used: u32,
    #[serde(alias = "daily_limit")]
    pub limit: u32,
    #[serde(default)]
    pub remaining: Option<u32>,
    #[serde(default, alias = "canUse")]
    pub can_use: Option<bool>,
}
