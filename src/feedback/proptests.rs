//! Property-Based Tests for Feedback Resolution
//!
//! - **Counting**: unresolved = total - |resolved ∩ feedback ids|, whatever
//!   stale ids the persisted set holds
//! - **Ordering**: sorted output is grouped by priority and keeps server order
//!   within a group
//! - **Persistence**: whatever was marked survives reopening the view
//! - **Usage invariant**: remaining == limit - used after any patch

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use crate::feedback::view::tests::item;
use crate::feedback::{FeedbackView, Priority};
use crate::storage::{KeyValueStore, MemoryStore};
use crate::usage::{FeatureUsage, UsagePatch};

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low),
    ]
}

// Unique ids with random priorities
fn arb_feedbacks() -> impl Strategy<Value = Vec<(i64, Priority)>> {
    prop::collection::btree_set(0i64..200, 0..25).prop_flat_map(|ids| {
        let ids: Vec<i64> = ids.into_iter().collect();
        let len = ids.len();
        prop::collection::vec(arb_priority(), len)
            .prop_map(move |priorities| ids.iter().copied().zip(priorities).collect())
    })
}

fn open(
    feedbacks: &[(i64, Priority)],
    resolved: &[i64],
) -> (FeedbackView, Arc<dyn KeyValueStore>) {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    store
        .set(
            "resolved_feedbacks_1",
            &serde_json::to_string(resolved).unwrap(),
        )
        .unwrap();
    let items = feedbacks.iter().map(|(id, p)| item(*id, *p)).collect();
    let view = FeedbackView::open(1, items, Arc::clone(&store)).unwrap();
    (view, store)
}

proptest! {
    #[test]
    fn prop_unresolved_count_ignores_stale_ids(
        feedbacks in arb_feedbacks(),
        resolved in prop::collection::vec(0i64..400, 0..40)
    ) {
        let (view, _) = open(&feedbacks, &resolved);

        let ids: BTreeSet<i64> = feedbacks.iter().map(|(id, _)| *id).collect();
        let resolved: BTreeSet<i64> = resolved.into_iter().collect();
        let overlap = ids.intersection(&resolved).count();

        prop_assert_eq!(view.unresolved_count(), feedbacks.len() - overlap);
        prop_assert_eq!(view.resolved_count() + view.unresolved_count(), feedbacks.len());
    }

    #[test]
    fn prop_sorted_groups_by_priority_stably(feedbacks in arb_feedbacks()) {
        let (view, _) = open(&feedbacks, &[]);
        let sorted = view.sorted();

        prop_assert_eq!(sorted.len(), feedbacks.len());
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].priority.rank() <= pair[1].priority.rank());
        }

        for priority in Priority::all() {
            let expected: Vec<i64> = feedbacks
                .iter()
                .filter(|(_, p)| *p == priority)
                .map(|(id, _)| *id)
                .collect();
            let actual: Vec<i64> = sorted
                .iter()
                .filter(|f| f.priority == priority)
                .map(|f| f.id)
                .collect();
            prop_assert_eq!(expected, actual);
        }
    }

    #[test]
    fn prop_marks_survive_reopen(
        feedbacks in arb_feedbacks(),
        marks in prop::collection::vec((0usize..25, any::<bool>()), 0..30)
    ) {
        prop_assume!(!feedbacks.is_empty());
        let (mut view, store) = open(&feedbacks, &[]);

        let mut expected = BTreeSet::new();
        for (index, resolved) in marks {
            let id = feedbacks[index % feedbacks.len()].0;
            view.mark_resolved(id, resolved).unwrap();
            if resolved {
                expected.insert(id);
            } else {
                expected.remove(&id);
            }
        }

        let items = feedbacks.iter().map(|(id, p)| item(*id, *p)).collect();
        let reopened = FeedbackView::open(1, items, store).unwrap();
        for (id, _) in &feedbacks {
            prop_assert_eq!(reopened.is_resolved(*id), expected.contains(id));
        }
        prop_assert_eq!(reopened.unresolved_count(), feedbacks.len() - expected.len());
    }

    #[test]
    fn prop_usage_patch_keeps_remaining_consistent(
        used in 0u32..1000,
        limit in 1u32..1000,
        new_used in prop::option::of(0u32..1000),
        new_limit in prop::option::of(1u32..1000)
    ) {
        let mut usage = FeatureUsage::new(used.min(limit), limit);
        usage.apply(&UsagePatch { used: new_used, limit: new_limit });

        prop_assert_eq!(usage.remaining(), usage.limit().saturating_sub(usage.used()));
        prop_assert_eq!(usage.can_use(), usage.remaining() > 0);
    }
}
