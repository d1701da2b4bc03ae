//! Usage-Limit Tracking Module
//!
//! This module mirrors the signed-in user's daily feature quotas so the CLI
//! can tell, without a round trip, whether an action is still allowed.
//!
//! # Features
//!
//! - Short-lived cache with a staleness window (30 s by default)
//! - Single-flight refresh: concurrent callers share one request
//! - Fallback quotas when the server cannot be reached or answers garbage
//! - Optimistic local adjustment after an action succeeds
//! - Unlimited usage for administrators
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 UsageTracker                 │
//! │  role ─┐   entries   last_success  in_flight │
//! │        └─► get_usage_info / refresh / patch  │
//! ├──────────────────────────────────────────────┤
//! │        UsageSource (ApiClient, mocks)        │
//! └──────────────────────────────────────────────┘
//! ```

pub mod quota;
pub mod tracker;

pub use quota::{FeatureUsage, UsagePatch, UsageSnapshot};
pub use tracker::{UsageSource, UsageTracker};

use serde::{Deserialize, Serialize};

/// Feature key for code review submissions
pub const CODE_REVIEW: &str = "code_review";

/// Feature key for AI chat messages
pub const AI_CHAT: &str = "ai_chat";

/// Identifier of a quota-limited capability
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureKey(String);

impl FeatureKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn code_review() -> Self {
        Self::new(CODE_REVIEW)
    }

    pub fn ai_chat() -> Self {
        Self::new(AI_CHAT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_key_helpers() {
        assert_eq!(FeatureKey::code_review().as_str(), "code_review");
        assert_eq!(FeatureKey::ai_chat().to_string(), "ai_chat");
        assert_eq!(FeatureKey::from("ai_chat"), FeatureKey::ai_chat());
    }

    #[test]
    fn test_feature_key_serializes_as_plain_string() {
        let json = serde_json::to_string(&FeatureKey::code_review()).unwrap();
        assert_eq!(json, "\"code_review\"");
    }
}
