//! Usage Tracker
//!
//! Cache of the signed-in user's feature quotas.
//!
//! Refresh rules:
//!
//! - A non-forced refresh within `stale_after` of the last successful fetch
//!   returns the cache untouched.
//! - While a fetch is in flight every caller, forced or not, awaits that
//!   fetch. At most one request is in flight.
//! - A fetch runs on its own task and finishes even if every caller gives up
//!   waiting.
//! - A failed or malformed fetch fills the cache with default quotas and does
//!   not count as a successful fetch.
//! - A completed fetch overwrites optimistic local values (last writer wins).

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::quota::{default_snapshot, fill_missing_defaults, FeatureUsage, UsagePatch, UsageSnapshot};
use super::FeatureKey;
use crate::api::Role;
use crate::config::UsageConfig;
use crate::error::{ClientError, Result};
use crate::metrics;

/// Where usage data comes from
#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Fetch the current user's usage for every feature
    async fn fetch_usage(&self) -> Result<UsageSnapshot>;

    /// Change a feature's daily limit (admin only, enforced server-side)
    async fn update_daily_limit(&self, feature: &FeatureKey, daily_limit: u32) -> Result<()>;
}

type PendingRefresh = Shared<BoxFuture<'static, UsageSnapshot>>;

#[derive(Default)]
struct TrackerState {
    entries: UsageSnapshot,
    last_success: Option<Instant>,
    in_flight: Option<PendingRefresh>,
    role: Role,
}

/// Per-feature quota cache with single-flight refresh
#[derive(Clone)]
pub struct UsageTracker {
    source: Arc<dyn UsageSource>,
    config: UsageConfig,
    state: Arc<RwLock<TrackerState>>,
    changes: Arc<watch::Sender<UsageSnapshot>>,
}

impl UsageTracker {
    /// Create a tracker for a user with the given role
    pub fn new(source: Arc<dyn UsageSource>, config: UsageConfig, role: Role) -> Self {
        let (changes, _) = watch::channel(UsageSnapshot::new());
        Self {
            source,
            config,
            state: Arc::new(RwLock::new(TrackerState {
                role,
                ..TrackerState::default()
            })),
            changes: Arc::new(changes),
        }
    }

    /// Change the role, e.g. after login or logout
    pub async fn set_role(&self, role: Role) {
        self.state.write().await.role = role;
    }

    /// Role currently used for the admin override
    pub async fn role(&self) -> Role {
        self.state.read().await.role
    }

    /// Usage for one feature
    ///
    /// Administrators always get [`FeatureUsage::unlimited`]. Otherwise the
    /// cached entry, or `None` if the feature is unknown or nothing has been
    /// fetched yet.
    pub async fn get_usage_info(&self, feature: &FeatureKey) -> Option<FeatureUsage> {
        let state = self.state.read().await;
        if state.role.is_admin() {
            return Some(FeatureUsage::unlimited());
        }
        state.entries.get(feature).copied()
    }

    /// All cached entries, with the admin override applied
    pub async fn snapshot(&self) -> UsageSnapshot {
        let state = self.state.read().await;
        if state.role.is_admin() {
            return state
                .entries
                .keys()
                .map(|key| (key.clone(), FeatureUsage::unlimited()))
                .collect();
        }
        state.entries.clone()
    }

    /// Whether the last successful fetch is inside the staleness window
    pub async fn is_fresh(&self) -> bool {
        let state = self.state.read().await;
        self.within_window(&state)
    }

    fn within_window(&self, state: &TrackerState) -> bool {
        state
            .last_success
            .map(|at| at.elapsed() < self.config.stale_after())
            .unwrap_or(false)
    }

    /// Refresh the cache from the source
    ///
    /// Returns the raw cached entries once the cache is up to date.
    pub async fn refresh(&self, force: bool) -> UsageSnapshot {
        let pending = {
            let mut state = self.state.write().await;

            // A finished handle still in place means the task died before cleanup
            let in_flight = state.in_flight.clone().filter(|p| p.peek().is_none());

            if let Some(pending) = in_flight {
                debug!("Usage refresh already in flight, joining");
                metrics::record_usage_refresh("joined");
                pending
            } else if !force && self.within_window(&state) {
                debug!("Usage cache is fresh, skipping refresh");
                metrics::record_usage_refresh("cached");
                return state.entries.clone();
            } else {
                let pending = self.start_fetch();
                state.in_flight = Some(pending.clone());
                pending
            }
        };

        pending.await
    }

    fn start_fetch(&self) -> PendingRefresh {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let changes = Arc::clone(&self.changes);
        let defaults = self.config.default_limits.clone();
        let fallback = default_snapshot(&defaults);

        // Runs to completion even if every caller stops waiting
        let task = tokio::spawn(async move {
            let (entries, succeeded) = match source.fetch_usage().await {
                Ok(mut fetched) => {
                    fill_missing_defaults(&mut fetched, &defaults);
                    metrics::record_usage_refresh("fetched");
                    (fetched, true)
                }
                Err(ClientError::Unauthorized) => {
                    warn!("Usage fetch rejected the session token, using default quotas");
                    metrics::record_usage_refresh("unauthorized");
                    (default_snapshot(&defaults), false)
                }
                Err(e) => {
                    warn!("Usage fetch failed, using default quotas: {}", e);
                    metrics::record_usage_refresh("fallback");
                    (default_snapshot(&defaults), false)
                }
            };

            {
                let mut state = state.write().await;
                state.entries = entries.clone();
                if succeeded {
                    state.last_success = Some(Instant::now());
                }
                state.in_flight = None;
            }

            changes.send_replace(entries.clone());
            entries
        });

        task.map(move |joined| {
            joined.unwrap_or_else(|e| {
                warn!("Usage refresh task failed, using default quotas: {}", e);
                fallback
            })
        })
        .boxed()
        .shared()
    }

    /// Merge a partial update into a cached entry without a round trip
    ///
    /// Returns false (and changes nothing) if the feature is not cached.
    pub async fn update_local_usage_count(&self, feature: &FeatureKey, patch: UsagePatch) -> bool {
        debug!("Applying local usage patch to {}: {:?}", feature, patch);
        self.modify_entry(feature, |entry| entry.apply(&patch)).await
    }

    /// Count one successful use of a feature until the next refresh confirms it
    pub async fn record_use(&self, feature: &FeatureKey) -> bool {
        self.modify_entry(feature, |entry| {
            entry.apply(&UsagePatch::used(entry.used().saturating_add(1)))
        })
        .await
    }

    // Read-modify-write of one entry under a single write guard
    async fn modify_entry<F>(&self, feature: &FeatureKey, f: F) -> bool
    where
        F: FnOnce(&mut FeatureUsage),
    {
        let updated = {
            let mut state = self.state.write().await;
            match state.entries.get_mut(feature) {
                Some(entry) => {
                    f(entry);
                    Some(state.entries.clone())
                }
                None => None,
            }
        };

        match updated {
            Some(entries) => {
                self.changes.send_replace(entries);
                true
            }
            None => false,
        }
    }

    /// Change a feature's daily limit, then force a refresh
    pub async fn set_daily_limit(
        &self,
        feature: &FeatureKey,
        daily_limit: u32,
    ) -> Result<UsageSnapshot> {
        if daily_limit == 0 {
            return Err(ClientError::InvalidInput(
                "daily limit must be greater than zero".to_string(),
            ));
        }

        self.source.update_daily_limit(feature, daily_limit).await?;
        info!("Daily limit for {} set to {}", feature, daily_limit);
        Ok(self.refresh(true).await)
    }

    /// Receive every cache change (refreshes and local patches)
    pub fn subscribe(&self) -> watch::Receiver<UsageSnapshot> {
        self.changes.subscribe()
    }
}
