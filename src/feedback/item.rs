//! Feedback and Submission Types
//!
//! Server-origin records. The client never mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Feedback priority; the derived order is the display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Display rank, lower first
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn all() -> [Priority; 3] {
        [Priority::High, Priority::Medium, Priority::Low]
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// One AI review comment on a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub id: i64,
    pub submission_id: i64,
    pub problem_point: String,
    pub suggestion: String,
    pub priority: Priority,
    #[serde(default)]
    pub line_number: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// One version of the code submitted to a review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSubmission {
    pub id: i64,
    pub review_id: i64,
    pub code_content: String,
    #[serde(default)]
    pub expectation: Option<String>,
    /// Monotonic per review
    pub version: u32,
    #[serde(default)]
    pub feedbacks: Vec<FeedbackItem>,
}

/// The submission with the highest version; its feedback is the current set
pub fn latest_submission(submissions: &[CodeSubmission]) -> Option<&CodeSubmission> {
    submissions.iter().max_by_key(|s| s.version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(id: i64, version: u32) -> CodeSubmission {
        CodeSubmission {
            id,
            review_id: 1,
            code_content: format!("// v{}", version),
            expectation: None,
            version,
            feedbacks: Vec::new(),
        }
    }

    #[test]
    fn test_priority_order() {
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert_eq!(Priority::Low.rank(), 2);
    }

    #[test]
    fn test_priority_wire_format() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        let p: Priority = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(p, Priority::Medium);
        assert!(serde_json::from_str::<Priority>("\"urgent\"").is_err());
    }

    #[test]
    fn test_latest_submission_by_version() {
        let submissions = vec![submission(10, 1), submission(12, 3), submission(11, 2)];
        assert_eq!(latest_submission(&submissions).unwrap().id, 12);
        assert!(latest_submission(&[]).is_none());
    }

    #[test]
    fn test_submission_deserializes_without_optional_fields() {
        let json = r#"{"id":4,"review_id":2,"code_content":"x = 1","version":1}"#;
        let submission: CodeSubmission = serde_json::from_str(json).unwrap();
        assert!(submission.expectation.is_none());
        assert!(submission.feedbacks.is_empty());
    }

    #[test]
    fn test_feedback_deserializes() {
        let json = r#"{
            "id": 7,
            "submission_id": 4,
            "problem_point": "unwrap on user input",
            "suggestion": "propagate the error",
            "priority": "high",
            "line_number": 12,
            "created_at": "2026-03-02T09:30:00Z"
        }"#;
        let item: FeedbackItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.priority, Priority::High);
        assert_eq!(item.line_number, Some(12));
    }
}
