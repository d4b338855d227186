//! Monthly cloud OCR call budget.

mod store;

pub use store::{JsonQuotaStore, MemoryQuotaStore, QuotaStore};

use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Period key for the current local calendar month ("YYYY-MM").
pub fn current_period() -> String {
    Local::now().format("%Y-%m").to_string()
}

/// Usage snapshot for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    pub period: String,
    /// Monthly budget, 0 for unlimited.
    pub limit: u32,
    pub used: u32,
    /// `None` when unlimited.
    pub remaining: Option<u32>,
}

impl QuotaState {
    fn new(period: String, limit: u32, used: u32) -> Self {
        if limit == 0 {
            return Self {
                period,
                limit,
                used,
                remaining: None,
            };
        }
        let used = used.min(limit);
        Self {
            period,
            limit,
            used,
            remaining: Some(limit.saturating_sub(used)),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit == 0
    }

    pub fn is_exhausted(&self) -> bool {
        !self.is_unlimited() && self.used >= self.limit
    }
}

/// Tracks the monthly call budget over a [`QuotaStore`].
///
/// Store failures never fail a call: they are logged and the tracker
/// reports the state it could establish. A counter that cannot be read
/// counts as exhausted, so an unreadable store never lifts the limit.
#[derive(Clone)]
pub struct QuotaTracker {
    limit: u32,
    store: Arc<dyn QuotaStore>,
}

impl QuotaTracker {
    pub fn new(limit: u32, store: Arc<dyn QuotaStore>) -> Self {
        Self { limit, store }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn resolve(period: Option<&str>) -> String {
        period.map(str::to_string).unwrap_or_else(current_period)
    }

    fn load_used(&self, period: &str) -> u32 {
        match self.store.load(period) {
            Ok(used) => used,
            Err(e) => {
                warn!(
                    "Failed to load quota for {}: {}; treating it as exhausted",
                    period, e
                );
                self.limit
            }
        }
    }

    /// Usage for `period` (current month when `None`).
    pub fn status(&self, period: Option<&str>) -> QuotaState {
        let period = Self::resolve(period);
        let used = self.load_used(&period);
        QuotaState::new(period, self.limit, used)
    }

    /// True when another cloud call fits in the budget.
    pub fn allowed(&self, period: Option<&str>) -> bool {
        !self.status(period).is_exhausted()
    }

    /// Record one completed cloud call. A no-op on the counter when
    /// unlimited.
    pub fn increment(&self, period: Option<&str>) -> QuotaState {
        let before = self.status(period);
        if before.is_unlimited() {
            return before;
        }

        let after = QuotaState::new(before.period.clone(), self.limit, before.used.saturating_add(1));
        match self.store.save(&after.period, after.used) {
            Ok(()) => {
                debug!("Cloud OCR quota {}: {}/{}", after.period, after.used, after.limit);
                after
            }
            Err(e) => {
                warn!("Failed to save quota for {}: {}", before.period, e);
                before
            }
        }
    }

    /// Administrative override: set the remaining calls, clamped to
    /// `[0, limit]`. A no-op when unlimited.
    pub fn set_remaining(&self, value: u32, period: Option<&str>) -> QuotaState {
        let before = self.status(period);
        if before.is_unlimited() {
            return before;
        }

        let remaining = value.min(self.limit);
        let after = QuotaState::new(before.period.clone(), self.limit, self.limit - remaining);
        match self.store.save(&after.period, after.used) {
            Ok(()) => {
                info!(
                    "Cloud OCR quota {} set to {} remaining",
                    after.period, remaining
                );
                after
            }
            Err(e) => {
                warn!("Failed to save quota for {}: {}", before.period, e);
                before
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use pretty_assertions::assert_eq;

    const PERIOD: Option<&str> = Some("2024-01");

    fn tracker(limit: u32, used: u32) -> QuotaTracker {
        QuotaTracker::new(limit, Arc::new(MemoryQuotaStore::with_used("2024-01", used)))
    }

    fn assert_invariant(state: &QuotaState) {
        if state.limit > 0 {
            assert!(state.used <= state.limit);
            assert_eq!(state.remaining, Some(state.limit - state.used));
        } else {
            assert_eq!(state.remaining, None);
        }
    }

    struct BrokenStore;

    impl QuotaStore for BrokenStore {
        fn load(&self, _period: &str) -> Result<u32, StoreError> {
            Ok(3)
        }

        fn save(&self, _period: &str, _used: u32) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[test]
    fn test_status_and_allowed() {
        let t = tracker(100, 40);
        let state = t.status(PERIOD);
        assert_eq!(
            state,
            QuotaState {
                period: "2024-01".to_string(),
                limit: 100,
                used: 40,
                remaining: Some(60),
            }
        );
        assert!(t.allowed(PERIOD));
    }

    #[test]
    fn test_exhausted_quota_not_allowed() {
        let t = tracker(100, 100);
        assert!(!t.allowed(PERIOD));
        assert_eq!(t.status(PERIOD).remaining, Some(0));
    }

    #[test]
    fn test_new_period_starts_empty() {
        let t = tracker(100, 100);
        assert_eq!(t.status(Some("2024-02")).used, 0);
        assert!(t.allowed(Some("2024-02")));
    }

    #[test]
    fn test_increment_never_exceeds_limit() {
        let t = tracker(2, 0);
        for _ in 0..5 {
            assert_invariant(&t.increment(PERIOD));
        }
        let state = t.status(PERIOD);
        assert_eq!(state.used, 2);
        assert_eq!(state.remaining, Some(0));
    }

    #[test]
    fn test_invariant_over_mixed_operations() {
        let t = tracker(10, 3);
        let ops: [Box<dyn Fn(&QuotaTracker) -> QuotaState>; 6] = [
            Box::new(|t: &QuotaTracker| t.increment(PERIOD)),
            Box::new(|t: &QuotaTracker| t.set_remaining(50, PERIOD)),
            Box::new(|t: &QuotaTracker| t.increment(PERIOD)),
            Box::new(|t: &QuotaTracker| t.set_remaining(0, PERIOD)),
            Box::new(|t: &QuotaTracker| t.increment(PERIOD)),
            Box::new(|t: &QuotaTracker| t.set_remaining(4, PERIOD)),
        ];
        for op in &ops {
            assert_invariant(&op(&t));
        }
        assert_eq!(t.status(PERIOD).used, 6);
    }

    #[test]
    fn test_set_remaining_clamps() {
        let t = tracker(100, 10);
        assert_eq!(t.set_remaining(250, PERIOD).remaining, Some(100));
        assert_eq!(t.status(PERIOD).used, 0);
        assert_eq!(t.set_remaining(0, PERIOD).used, 100);
    }

    #[test]
    fn test_unlimited() {
        let t = tracker(0, 5);
        assert!(t.allowed(PERIOD));
        let state = t.increment(PERIOD);
        assert_eq!(state.used, 5);
        assert_eq!(state.remaining, None);
        assert_eq!(t.set_remaining(3, PERIOD).used, 5);
    }

    #[test]
    fn test_store_failure_is_not_fatal() {
        let t = QuotaTracker::new(10, Arc::new(BrokenStore));
        let state = t.increment(PERIOD);
        assert_eq!(state.used, 3);
        assert_eq!(state.remaining, Some(7));
    }

    #[test]
    fn test_unreadable_counter_blocks_cloud() {
        struct UnreadableStore;

        impl QuotaStore for UnreadableStore {
            fn load(&self, _period: &str) -> Result<u32, StoreError> {
                Err(StoreError::Poisoned)
            }

            fn save(&self, _period: &str, _used: u32) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let t = QuotaTracker::new(10, Arc::new(UnreadableStore));
        assert!(!t.allowed(PERIOD));
        assert_eq!(t.status(PERIOD).remaining, Some(0));
        assert_eq!(t.increment(PERIOD).used, 10);

        let unlimited = QuotaTracker::new(0, Arc::new(UnreadableStore));
        assert!(unlimited.allowed(PERIOD));
    }

    #[test]
    fn test_corrupt_file_fails_closed_until_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quota.json");
        std::fs::write(&path, "{not json").unwrap();

        let t = QuotaTracker::new(5, Arc::new(JsonQuotaStore::new(&path)));
        assert!(!t.allowed(PERIOD));
        assert!(t.status(PERIOD).is_exhausted());

        // An explicit reset rewrites the file
        assert_eq!(t.set_remaining(5, PERIOD).remaining, Some(5));
        assert!(t.allowed(PERIOD));
        assert_eq!(t.increment(PERIOD).used, 1);
    }

    #[test]
    fn test_current_period_format() {
        let period = current_period();
        assert_eq!(period.len(), 7);
        assert_eq!(&period[4..5], "-");
    }
}
