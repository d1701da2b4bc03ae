//! Feature Usage Types
//!
//! Per-feature daily quota state and the fallback quotas used when the
//! server cannot provide them.

use serde::Serialize;
use std::collections::BTreeMap;

use super::FeatureKey;

/// Cached usage, keyed by feature
pub type UsageSnapshot = BTreeMap<FeatureKey, FeatureUsage>;

/// Daily usage of one feature
///
/// `remaining` and `can_use` are always derived from `used` and `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureUsage {
    used: u32,
    limit: u32,
    remaining: u32,
    can_use: bool,
}

impl FeatureUsage {
    /// Build an entry; `remaining` saturates at 0 when `used > limit`
    pub fn new(used: u32, limit: u32) -> Self {
        let remaining = limit.saturating_sub(used);
        Self {
            used,
            limit,
            remaining,
            can_use: remaining > 0,
        }
    }

    /// Sentinel reported for administrators
    pub fn unlimited() -> Self {
        Self::new(0, u32::MAX)
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn can_use(&self) -> bool {
        self.can_use
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit == u32::MAX
    }

    /// Merge a partial update and recompute derived fields
    pub fn apply(&mut self, patch: &UsagePatch) {
        *self = Self::new(
            patch.used.unwrap_or(self.used),
            patch.limit.unwrap_or(self.limit),
        );
    }

    /// Calculate utilization percentage
    pub fn utilization_percent(&self) -> f64 {
        if self.limit > 0 {
            (self.used as f64 / self.limit as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Partial update for an optimistic local adjustment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsagePatch {
    pub used: Option<u32>,
    pub limit: Option<u32>,
}

impl UsagePatch {
    /// Patch only the used count
    pub fn used(used: u32) -> Self {
        Self {
            used: Some(used),
            limit: None,
        }
    }

    /// Patch only the limit
    pub fn limit(limit: u32) -> Self {
        Self {
            used: None,
            limit: Some(limit),
        }
    }
}

/// Fresh quota for every configured default
pub fn default_snapshot(defaults: &BTreeMap<String, u32>) -> UsageSnapshot {
    defaults
        .iter()
        .map(|(key, limit)| (FeatureKey::new(key.as_str()), FeatureUsage::new(0, *limit)))
        .collect()
}

/// Insert a fresh default quota for each known key the server omitted
pub fn fill_missing_defaults(snapshot: &mut UsageSnapshot, defaults: &BTreeMap<String, u32>) {
    for (key, limit) in defaults {
        snapshot
            .entry(FeatureKey::new(key.as_str()))
            .or_insert_with(|| FeatureUsage::new(0, *limit));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UsageConfig;

    #[test]
    fn test_derived_fields() {
        let usage = FeatureUsage::new(5, 20);
        assert_eq!(usage.remaining(), 15);
        assert!(usage.can_use());

        let exhausted = FeatureUsage::new(20, 20);
        assert_eq!(exhausted.remaining(), 0);
        assert!(!exhausted.can_use());
    }

    #[test]
    fn test_overdrawn_saturates() {
        let usage = FeatureUsage::new(25, 20);
        assert_eq!(usage.remaining(), 0);
        assert!(!usage.can_use());
    }

    #[test]
    fn test_apply_patch_recomputes() {
        let mut usage = FeatureUsage::new(5, 20);
        usage.apply(&UsagePatch::used(6));
        assert_eq!(usage, FeatureUsage::new(6, 20));
        assert_eq!(usage.remaining(), usage.limit() - usage.used());

        usage.apply(&UsagePatch::limit(6));
        assert_eq!(usage.remaining(), 0);
        assert!(!usage.can_use());

        usage.apply(&UsagePatch::default());
        assert_eq!(usage, FeatureUsage::new(6, 6));
    }

    #[test]
    fn test_unlimited_sentinel() {
        let usage = FeatureUsage::unlimited();
        assert!(usage.is_unlimited());
        assert!(usage.can_use());
        assert_eq!(usage.remaining(), u32::MAX);
    }

    #[test]
    fn test_default_snapshot() {
        let snapshot = default_snapshot(&UsageConfig::default().default_limits);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[&FeatureKey::ai_chat()], FeatureUsage::new(0, 30));
        assert_eq!(
            snapshot[&FeatureKey::code_review()],
            FeatureUsage::new(0, 20)
        );
    }

    #[test]
    fn test_fill_missing_defaults_keeps_server_values() {
        let mut snapshot = UsageSnapshot::new();
        snapshot.insert(FeatureKey::code_review(), FeatureUsage::new(5, 20));
        snapshot.insert(FeatureKey::new("mentor_call"), FeatureUsage::new(1, 2));

        fill_missing_defaults(&mut snapshot, &UsageConfig::default().default_limits);

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[&FeatureKey::code_review()], FeatureUsage::new(5, 20));
        let ai_chat = snapshot[&FeatureKey::ai_chat()];
        assert_eq!(ai_chat.used(), 0);
        assert_eq!(ai_chat.limit(), 30);
        assert_eq!(ai_chat.remaining(), 30);
        assert!(ai_chat.can_use());
    }

    #[test]
    fn test_utilization() {
        assert_eq!(FeatureUsage::new(5, 20).utilization_percent(), 25.0);
        assert_eq!(FeatureUsage::new(0, 0).utilization_percent(), 0.0);
    }
}
