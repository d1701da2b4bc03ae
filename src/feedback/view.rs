//! Feedback Resolution View
//!
//! Joins the current submission's feedback with the locally persisted
//! resolution set. Ids in the set that no longer match a feedback item are
//! kept on disk but never counted.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::item::{latest_submission, CodeSubmission, FeedbackItem, Priority};
use super::resolution::ResolutionSet;
use crate::error::Result;
use crate::metrics;
use crate::storage::KeyValueStore;

/// Resolution state of one review's current feedback
pub struct FeedbackView {
    review_id: i64,
    feedbacks: Vec<FeedbackItem>,
    resolved: ResolutionSet,
    store: Arc<dyn KeyValueStore>,
}

impl FeedbackView {
    /// Open the view for a review's feedback list
    pub fn open(
        review_id: i64,
        feedbacks: Vec<FeedbackItem>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let resolved = ResolutionSet::load(store.as_ref(), review_id)?;
        Ok(Self {
            review_id,
            feedbacks,
            resolved,
            store,
        })
    }

    /// Open the view on the latest submission of a review
    pub fn for_latest(
        review_id: i64,
        submissions: &[CodeSubmission],
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let feedbacks = latest_submission(submissions)
            .map(|s| s.feedbacks.clone())
            .unwrap_or_default();
        Self::open(review_id, feedbacks, store)
    }

    pub fn review_id(&self) -> i64 {
        self.review_id
    }

    /// Feedback in server order
    pub fn feedbacks(&self) -> &[FeedbackItem] {
        &self.feedbacks
    }

    /// Whether a feedback id belongs to the current set
    pub fn contains(&self, id: i64) -> bool {
        self.feedbacks.iter().any(|f| f.id == id)
    }

    pub fn is_resolved(&self, id: i64) -> bool {
        self.resolved.contains(id)
    }

    /// Mark or unmark an id and persist the set under the review's key
    ///
    /// The in-memory state only changes once the store accepted the write.
    pub fn mark_resolved(&mut self, id: i64, resolved: bool) -> Result<()> {
        let mut next = self.resolved.clone();
        let changed = next.set(id, resolved);
        next.save(self.store.as_ref(), self.review_id)?;
        self.resolved = next;
        if changed {
            metrics::record_resolution_update(resolved);
            tracing::debug!(
                "Feedback {} in review {} marked {}",
                id,
                self.review_id,
                if resolved { "resolved" } else { "unresolved" }
            );
        }
        Ok(())
    }

    /// Current feedback items not marked resolved
    pub fn unresolved_count(&self) -> usize {
        self.feedbacks
            .iter()
            .filter(|f| !self.resolved.contains(f.id))
            .count()
    }

    /// Current feedback items marked resolved (stale ids excluded)
    pub fn resolved_count(&self) -> usize {
        self.feedbacks.len() - self.unresolved_count()
    }

    /// Feedback ordered high, medium, low; server order within a priority
    pub fn sorted(&self) -> Vec<&FeedbackItem> {
        let mut items: Vec<&FeedbackItem> = self.feedbacks.iter().collect();
        items.sort_by_key(|f| f.priority.rank());
        items
    }

    /// Sorted feedback that still needs attention
    pub fn unresolved(&self) -> Vec<&FeedbackItem> {
        self.sorted()
            .into_iter()
            .filter(|f| !self.resolved.contains(f.id))
            .collect()
    }

    /// Totals per priority for the current feedback
    pub fn summary(&self) -> FeedbackSummary {
        let mut by_priority: BTreeMap<Priority, PriorityBreakdown> = Priority::all()
            .into_iter()
            .map(|p| (p, PriorityBreakdown::default()))
            .collect();

        for item in &self.feedbacks {
            let entry = by_priority.entry(item.priority).or_default();
            entry.total += 1;
            if !self.resolved.contains(item.id) {
                entry.unresolved += 1;
            }
        }

        let unresolved = self.unresolved_count();
        FeedbackSummary {
            review_id: self.review_id,
            total: self.feedbacks.len(),
            resolved: self.feedbacks.len() - unresolved,
            unresolved,
            by_priority,
        }
    }
}

/// Count of feedback at one priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityBreakdown {
    pub total: usize,
    pub unresolved: usize,
}

/// Resolution statistics for one review
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackSummary {
    pub review_id: i64,
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub by_priority: BTreeMap<Priority, PriorityBreakdown>,
}

impl FeedbackSummary {
    /// Resolved share in percent; 100 when there is nothing to resolve
    pub fn resolution_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.resolved as f64 / self.total as f64) * 100.0
        }
    }
}
