//! Feedback Resolution Module
//!
//! Tracks which AI review comments the user has addressed.
//!
//! - **Items** (`item`): feedback, priorities, versioned submissions
//! - **Resolution sets** (`resolution`): per-review persisted ids
//! - **View** (`view`): counts, ordering and summaries for display

pub mod item;
pub mod resolution;
pub mod view;

pub use item::{latest_submission, CodeSubmission, FeedbackItem, Priority};
pub use resolution::ResolutionSet;
pub use view::{FeedbackSummary, FeedbackView, PriorityBreakdown};

// Property-based tests module
#[cfg(test)]
mod proptests;
