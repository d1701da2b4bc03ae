//! Resolution Sets
//!
//! Feedback ids the user has marked as addressed, one set per review,
//! persisted as a JSON array under `resolved_feedbacks_<reviewId>`.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::storage::{resolved_feedbacks_key, KeyValueStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSet {
    ids: BTreeSet<i64>,
}

impl ResolutionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the set for a review
    ///
    /// A missing or unreadable entry yields an empty set.
    pub fn load(store: &dyn KeyValueStore, review_id: i64) -> Result<Self> {
        let key = resolved_feedbacks_key(review_id);
        let Some(raw) = store.get(&key)? else {
            return Ok(Self::new());
        };

        match serde_json::from_str::<Vec<i64>>(&raw) {
            Ok(ids) => Ok(Self {
                ids: ids.into_iter().collect(),
            }),
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {}", key, e);
                Ok(Self::new())
            }
        }
    }

    /// Persist the set for a review
    pub fn save(&self, store: &dyn KeyValueStore, review_id: i64) -> Result<()> {
        let ids: Vec<i64> = self.ids.iter().copied().collect();
        let json = serde_json::to_string(&ids)?;
        store.set(&resolved_feedbacks_key(review_id), &json)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Add or remove an id; returns whether the set changed
    pub fn set(&mut self, id: i64, resolved: bool) -> bool {
        if resolved {
            self.ids.insert(id)
        } else {
            self.ids.remove(&id)
        }
    }
}

impl FromIterator<i64> for ResolutionSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
