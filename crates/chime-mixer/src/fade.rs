//! Tick-driven fade ramps.
//!
//! A fade is plain data: which handle, the transition generation it was
//! started under, the gain endpoints and the time window. The system
//! advances every task once per tick and drops a task as soon as its
//! handle's generation has moved on. A dropped task never runs its
//! completion.

use std::fmt;

use crate::handle::HandleKey;

/// Clamp a fade time into `[0, duration]`. NaN reads as no fade.
#[must_use]
pub fn clamp_fade_time(seconds: f32, duration: f32) -> f32 {
    if seconds.is_nan() {
        0.0
    } else {
        seconds.clamp(0.0, duration.max(0.0))
    }
}

/// What happens when a fade reaches its target.
#[derive(Default)]
pub enum FadeCompletion {
    /// Nothing.
    #[default]
    None,
    /// Pause the handle.
    Pause,
    /// Stop the handle.
    Stop,
    /// Run a caller-supplied callback.
    Call(Box<dyn FnOnce() + Send>),
}

impl fmt::Debug for FadeCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Pause => write!(f, "Pause"),
            Self::Stop => write!(f, "Stop"),
            Self::Call(_) => write!(f, "Call(..)"),
        }
    }
}

impl FadeCompletion {
    /// Wrap a callback.
    pub fn call(f: impl FnOnce() + Send + 'static) -> Self {
        Self::Call(Box::new(f))
    }
}

/// One in-flight ramp.
#[derive(Debug)]
pub(crate) struct FadeTask {
    pub key: HandleKey,
    pub generation: u64,
    pub from: f32,
    pub to: f32,
    pub start: f64,
    pub duration: f32,
    pub completion: FadeCompletion,
}

impl FadeTask {
    /// Progress in `[0, 1]` at time `now`.
    pub fn progress(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.start) as f32 / self.duration).clamp(0.0, 1.0)
    }

    /// Gain at time `now`.
    pub fn gain_at(&self, now: f64) -> f32 {
        self.from + (self.to - self.from) * self.progress(now)
    }

    pub fn is_done(&self, now: f64) -> bool {
        self.progress(now) >= 1.0
    }
}

/// Result of checking a task against its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FadeCheck {
    /// Handle gone or generation moved on.
    Superseded,
    /// Gain applied, ramp still running.
    Running,
    /// Gain applied, target reached.
    Finished,
}

/// Pending fade tasks.
#[derive(Debug, Default)]
pub struct FadeScheduler {
    tasks: Vec<FadeTask>,
}

impl FadeScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks still queued (including stale ones not yet swept).
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn schedule(&mut self, task: FadeTask) {
        self.tasks.push(task);
    }

    /// Drop every task for `key` without running completions.
    pub(crate) fn cancel(&mut self, key: &HandleKey) {
        self.tasks.retain(|t| &t.key != key);
    }

    /// Advance every task to `now`.
    ///
    /// `apply` receives each task's key, generation and current gain; it
    /// writes the gain and reports whether the task is still current.
    /// Finished tasks are returned with their completions, in queue order,
    /// so the caller can run them after the sweep.
    pub(crate) fn advance<F>(&mut self, now: f64, mut apply: F) -> Vec<(HandleKey, FadeCompletion)>
    where
        F: FnMut(&HandleKey, u64, f32) -> bool,
    {
        let mut finished = Vec::new();
        let tasks = std::mem::take(&mut self.tasks);

        for task in tasks {
            match Self::check(&task, now, &mut apply) {
                FadeCheck::Superseded => {},
                FadeCheck::Running => self.tasks.push(task),
                FadeCheck::Finished => finished.push((task.key, task.completion)),
            }
        }
        finished
    }

    fn check<F>(task: &FadeTask, now: f64, apply: &mut F) -> FadeCheck
    where
        F: FnMut(&HandleKey, u64, f32) -> bool,
    {
        if !apply(&task.key, task.generation, task.gain_at(now)) {
            FadeCheck::Superseded
        } else if task.is_done(now) {
            FadeCheck::Finished
        } else {
            FadeCheck::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chime_common::{Category, HandleRef};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn key() -> HandleKey {
        HandleKey::Cached(HandleRef::new(Category::Music, "theme"))
    }

    fn task(from: f32, to: f32, duration: f32) -> FadeTask {
        FadeTask {
            key: key(),
            generation: 1,
            from,
            to,
            start: 10.0,
            duration,
            completion: FadeCompletion::None,
        }
    }

    #[test]
    fn test_gain_interpolates() {
        let t = task(0.0, 1.0, 2.0);
        assert_relative_eq!(t.gain_at(10.0), 0.0);
        assert_relative_eq!(t.gain_at(11.0), 0.5);
        assert_relative_eq!(t.gain_at(13.0), 1.0);
        assert!(!t.is_done(11.9));
        assert!(t.is_done(12.0));
    }

    #[test]
    fn test_fade_time_is_clamped() {
        assert_relative_eq!(clamp_fade_time(-1.0, 3.0), 0.0);
        assert_relative_eq!(clamp_fade_time(5.0, 3.0), 3.0);
        assert_relative_eq!(clamp_fade_time(f32::INFINITY, 3.0), 3.0);
        assert_relative_eq!(clamp_fade_time(f32::NAN, 3.0), 0.0);
    }

    #[test]
    fn test_zero_duration_is_instant() {
        let t = task(0.8, 0.0, 0.0);
        assert!(t.is_done(10.0));
        assert_relative_eq!(t.gain_at(10.0), 0.0);
    }

    #[test]
    fn test_advance_keeps_running_tasks() {
        let mut scheduler = FadeScheduler::new();
        scheduler.schedule(task(0.0, 1.0, 2.0));

        let mut seen = Vec::new();
        let done = scheduler.advance(11.0, |_, _, gain| {
            seen.push(gain);
            true
        });
        assert!(done.is_empty());
        assert_eq!(scheduler.len(), 1);
        assert_relative_eq!(seen[0], 0.5);

        let done = scheduler.advance(12.5, |_, _, _| true);
        assert_eq!(done.len(), 1);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_superseded_task_drops_completion() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let mut scheduler = FadeScheduler::new();
        let mut t = task(1.0, 0.0, 1.0);
        t.completion = FadeCompletion::call(move || flag.store(true, Ordering::SeqCst));
        scheduler.schedule(t);

        // Generation moved on: the apply callback rejects it.
        let done = scheduler.advance(20.0, |_, generation, _| generation == 2);
        assert!(done.is_empty());
        assert!(scheduler.is_empty());
        assert!(!fired.load(Ordering::SeqCst));
    }
}
