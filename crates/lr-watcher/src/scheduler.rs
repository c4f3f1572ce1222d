//! Frame-driven scheduling of check and reconcile passes.
//!
//! The host calls in once per frame with the elapsed time. A [`Clock`]
//! turns frames into check passes at a fixed interval, and a
//! [`DeferredQueue`] runs a registry reconcile a short delay after each
//! check so the host has settled after any reloads.
//!
//! ```text
//! frame ─► poll(delta) ─► deferred due? ─► DuePasses::reconcile
//!                     └─► clock fired? ─► DuePasses::check
//!                                     └─► schedule Reconcile after delay
//! ```

use std::time::Duration;

use lr_core::ScheduleConfig;
use smallvec::SmallVec;

/// Fires once every `interval` of accumulated time.
///
/// # Examples
///
/// ```
/// use lr_watcher::Clock;
/// use std::time::Duration;
///
/// let mut clock = Clock::new(Duration::from_millis(1000));
/// assert!(!clock.advance(Duration::from_millis(600)));
/// assert!(clock.advance(Duration::from_millis(600)));
/// assert_eq!(clock.elapsed(), Duration::ZERO);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    interval: Duration,
    elapsed: Duration,
}

impl Clock {
    /// Creates a clock with nothing accumulated.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
        }
    }

    /// Adds `delta`. Returns `true` and starts over from zero once the
    /// interval is reached; any excess is dropped.
    pub fn advance(&mut self, delta: Duration) -> bool {
        self.elapsed = self.elapsed.saturating_add(delta);
        if self.elapsed >= self.interval {
            self.elapsed = Duration::ZERO;
            true
        } else {
            false
        }
    }

    /// Returns the time accumulated since the last firing.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the firing interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Changes the firing interval, keeping what has accumulated.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }
}

/// Runs tasks after a delay, with at most one pending task per kind.
///
/// # Examples
///
/// ```
/// use lr_watcher::DeferredQueue;
/// use std::time::Duration;
///
/// let mut queue = DeferredQueue::new();
/// assert!(queue.schedule("rebuild", Duration::from_millis(500)));
/// assert!(!queue.schedule("rebuild", Duration::from_millis(10)));
///
/// assert!(queue.advance(Duration::from_millis(400)).is_empty());
/// assert_eq!(queue.advance(Duration::from_millis(100)).as_slice(), &["rebuild"]);
/// ```
#[derive(Debug, Clone)]
pub struct DeferredQueue<K> {
    pending: SmallVec<[(K, Duration); 2]>,
}

impl<K> Default for DeferredQueue<K> {
    fn default() -> Self {
        Self {
            pending: SmallVec::new(),
        }
    }
}

impl<K: Copy + PartialEq> DeferredQueue<K> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `kind` to come due after `delay`.
    ///
    /// Returns `false` and keeps the existing deadline if `kind` is already
    /// pending.
    pub fn schedule(&mut self, kind: K, delay: Duration) -> bool {
        if self.is_pending(kind) {
            return false;
        }
        self.pending.push((kind, delay));
        true
    }

    /// Lets `delta` pass and returns the tasks that came due, in scheduling order.
    pub fn advance(&mut self, delta: Duration) -> SmallVec<[K; 2]> {
        let mut due = SmallVec::new();
        self.pending.retain(|(kind, remaining)| {
            if *remaining <= delta {
                due.push(*kind);
                false
            } else {
                *remaining -= delta;
                true
            }
        });
        due
    }

    /// Returns `true` if `kind` is waiting to come due.
    #[must_use]
    pub fn is_pending(&self, kind: K) -> bool {
        self.pending.iter().any(|(pending, _)| *pending == kind)
    }

    /// Returns the number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops every pending task.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Tasks the scheduler defers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredTask {
    /// Rebuild the registry from the host's plugin list.
    Reconcile,
}

/// Passes that came due during one [`Scheduler::poll`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuePasses {
    /// A deferred reconcile came due. Runs before the check.
    pub reconcile: bool,

    /// The check interval elapsed.
    pub check: bool,
}

impl DuePasses {
    /// Returns `true` if nothing is due.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        !self.reconcile && !self.check
    }
}

/// Decides which passes run on each frame.
///
/// # Examples
///
/// ```
/// use lr_watcher::Scheduler;
/// use lr_core::ScheduleConfig;
/// use std::time::Duration;
///
/// let mut scheduler = Scheduler::new(&ScheduleConfig::default());
/// scheduler.set_focused(true);
///
/// assert!(scheduler.poll(Duration::from_millis(1000)).check);
/// assert!(scheduler.poll(Duration::from_millis(670)).reconcile);
/// ```
#[derive(Debug, Clone)]
pub struct Scheduler {
    clock: Clock,
    deferred: DeferredQueue<DeferredTask>,
    reconcile_delay: Duration,
    pause_when_unfocused: bool,
    focused: bool,
    disabled: bool,
}

impl Scheduler {
    /// Creates a scheduler. It starts unfocused.
    #[must_use]
    pub fn new(config: &ScheduleConfig) -> Self {
        Self {
            clock: Clock::new(config.check_interval()),
            deferred: DeferredQueue::new(),
            reconcile_delay: config.reconcile_delay(),
            pause_when_unfocused: config.pause_when_unfocused,
            focused: false,
            disabled: false,
        }
    }

    /// Lets `delta` pass and returns the passes that came due.
    ///
    /// Nothing happens while paused or disabled, and deferred delays do not
    /// elapse meanwhile.
    pub fn poll(&mut self, delta: Duration) -> DuePasses {
        if self.disabled || self.is_paused() {
            return DuePasses::default();
        }

        let reconcile = self.deferred.advance(delta).contains(&DeferredTask::Reconcile);
        let check = self.clock.advance(delta);
        if check && !self.deferred.schedule(DeferredTask::Reconcile, self.reconcile_delay) {
            tracing::trace!("Reconcile already pending");
        }

        DuePasses { reconcile, check }
    }

    /// Records whether the host application has focus.
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    /// Returns `true` if polls currently do nothing because the host is unfocused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.pause_when_unfocused && !self.focused
    }

    /// Stops the scheduler for good. Pending tasks are dropped.
    pub fn disable(&mut self) {
        self.disabled = true;
        self.deferred.clear();
    }

    /// Returns `true` once [`disable`](Self::disable) was called.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Changes the check interval.
    pub fn set_check_interval(&mut self, interval: Duration) {
        self.clock.set_interval(interval);
    }

    /// Returns `true` if a reconcile is waiting to come due.
    #[must_use]
    pub fn reconcile_pending(&self) -> bool {
        self.deferred.is_pending(DeferredTask::Reconcile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn focused() -> Scheduler {
        let mut scheduler = Scheduler::new(&ScheduleConfig::default());
        scheduler.set_focused(true);
        scheduler
    }

    #[test]
    fn test_clock_resets_to_zero() {
        let mut clock = Clock::new(MS * 1000);
        assert!(!clock.advance(MS * 999));
        assert!(clock.advance(MS * 1500));
        assert_eq!(clock.elapsed(), Duration::ZERO);
        assert!(!clock.advance(MS * 999));
        assert_eq!(clock.interval(), MS * 1000);
    }

    #[test]
    fn test_check_fires_at_interval() {
        let mut scheduler = focused();
        let fired = (0..25)
            .filter(|_| scheduler.poll(MS * 100).check)
            .count();
        assert_eq!(fired, 2);
    }

    #[test]
    fn test_reconcile_follows_check_after_delay() {
        let mut scheduler = focused();
        assert!(scheduler.poll(MS * 1000).check);
        assert!(scheduler.reconcile_pending());

        assert!(scheduler.poll(MS * 600).is_idle());
        let due = scheduler.poll(MS * 70);
        assert!(due.reconcile);
        assert!(!due.check);
        assert!(!scheduler.reconcile_pending());
    }

    #[test]
    fn test_at_most_one_pending_reconcile() {
        let mut config = ScheduleConfig::default();
        config.check_interval_ms = 500;
        config.reconcile_delay_ms = 670;
        let mut scheduler = Scheduler::new(&config);
        scheduler.set_focused(true);

        assert!(scheduler.poll(MS * 500).check);
        let second = scheduler.poll(MS * 500);
        assert!(second.check);
        assert!(!second.reconcile);

        // The first deadline (670 ms after the first check) wins.
        assert!(scheduler.poll(MS * 170).reconcile);
        assert!(!scheduler.reconcile_pending());
    }

    #[test]
    fn test_paused_while_unfocused() {
        let mut scheduler = Scheduler::new(&ScheduleConfig::default());
        assert!(scheduler.is_paused());
        assert!(scheduler.poll(MS * 5000).is_idle());

        scheduler.set_focused(true);
        assert!(scheduler.poll(MS * 1000).check);

        // Deferred delays do not run down while paused.
        scheduler.set_focused(false);
        assert!(scheduler.poll(MS * 5000).is_idle());
        scheduler.set_focused(true);
        assert!(scheduler.poll(MS * 600).is_idle());
        assert!(scheduler.poll(MS * 70).reconcile);
    }

    #[test]
    fn test_unfocused_runs_when_pause_disabled() {
        let mut config = ScheduleConfig::default();
        config.pause_when_unfocused = false;
        let mut scheduler = Scheduler::new(&config);
        assert!(!scheduler.is_paused());
        assert!(scheduler.poll(MS * 1000).check);
    }

    #[test]
    fn test_disabled_never_fires() {
        let mut scheduler = focused();
        scheduler.poll(MS * 1000);
        scheduler.disable();
        assert!(scheduler.is_disabled());
        assert!(!scheduler.reconcile_pending());
        assert!(scheduler.poll(MS * 10_000).is_idle());
    }

    #[test]
    fn test_set_check_interval() {
        let mut scheduler = focused();
        scheduler.set_check_interval(MS * 500);
        assert!(scheduler.poll(MS * 500).check);
    }

    #[test]
    fn test_deferred_queue_zero_delay() {
        let mut queue = DeferredQueue::new();
        queue.schedule(DeferredTask::Reconcile, Duration::ZERO);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.advance(Duration::ZERO).as_slice(), &[DeferredTask::Reconcile]);
        assert!(queue.is_empty());
    }
}
