//! Deferred release of finished resources.
//!
//! When a non-pinned, non-looping handle starts or resumes, the system arms
//! a release at the time its clip will end. The task carries the handle's
//! lifetime generation; any later stop, pause or play bumps that generation
//! and the task is discarded when it comes due.

use crate::handle::HandleKey;

/// Shortest delay used when re-arming a release the host is still playing.
pub const REARM_MIN_DELAY: f32 = 0.05;

/// One pending release.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReapTask {
    pub key: HandleKey,
    pub generation: u64,
    pub due: f64,
}

/// Pending releases, in no particular order.
#[derive(Debug, Default)]
pub struct LifecycleReaper {
    tasks: Vec<ReapTask>,
}

impl LifecycleReaper {
    /// Create an empty reaper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of armed releases (including stale ones not yet swept).
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is armed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn arm(&mut self, key: HandleKey, generation: u64, due: f64) {
        self.tasks.push(ReapTask {
            key,
            generation,
            due,
        });
    }

    /// Disarm every release for `key`.
    pub(crate) fn cancel(&mut self, key: &HandleKey) {
        self.tasks.retain(|t| &t.key != key);
    }

    /// Remove and return every task due at `now`.
    pub(crate) fn take_due(&mut self, now: f64) -> Vec<ReapTask> {
        let (due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.tasks).into_iter().partition(|t| t.due <= now);
        self.tasks = pending;
        due
    }
}
