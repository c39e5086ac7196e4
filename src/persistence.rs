//! Persistence controller: rate-limited history writes.
//!
//! Genuine navigations are written at once as new history entries
//! ([`PersistenceController::write_immediate`]). Passive changes (a query
//! edited in place, caller data updated, a re-parse after a permission change)
//! are coalesced into one replace write fired after a delay
//! ([`PersistenceController::schedule_write`]); some browsers throttle rapid
//! `replaceState` calls, so the delay can be raised for them.
//!
//! The pending replace lives in a [`DebounceTimer`], a single-slot
//! cancellable timer, so "at most one pending write" holds by construction:
//!
//! - scheduling replaces whatever was pending;
//! - an immediate write cancels it (a stale replace must never overwrite a
//!   newer push);
//! - [`PersistenceController::cancel`] drops it on teardown.
//!
//! Time is read from a [`Clock`]; hosts call [`PersistenceController::poll`]
//! from their event loop (or a timer callback) to fire a due write.

use crate::error::HistoryError;
use crate::history::{HistoryBackend, HistoryState};
use crate::{trace_log, warn_log};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

// ============================================================================
// Clock
// ============================================================================

/// Source of the current time.
pub trait Clock {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock; clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    /// A clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

// ============================================================================
// DebounceTimer
// ============================================================================

/// Single-slot cancellable timer carrying a payload.
#[derive(Debug)]
pub struct DebounceTimer<T> {
    pending: Option<(Instant, T)>,
}

impl<T> DebounceTimer<T> {
    /// An idle timer.
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Arm the timer to fire `delay` after `now`.
    ///
    /// Returns the payload that was pending before, which is now discarded.
    pub fn schedule(&mut self, now: Instant, delay: Duration, payload: T) -> Option<T> {
        self.pending
            .replace((now + delay, payload))
            .map(|(_, superseded)| superseded)
    }

    /// Disarm the timer, returning the pending payload.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, payload)| payload)
    }

    /// Take the payload if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if *deadline <= now => self.cancel(),
            _ => None,
        }
    }

    /// Deadline of the pending payload.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    /// `true` while a payload is pending.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<T> Default for DebounceTimer<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PersistenceController
// ============================================================================

/// A history write waiting for its timer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    /// Payload to store.
    pub state: HistoryState,
    /// Address bar URL.
    pub url: String,
}

/// Schedules history writes onto a [`HistoryBackend`].
#[derive(Debug)]
pub struct PersistenceController<H> {
    backend: H,
    timer: DebounceTimer<PendingWrite>,
    delay: Duration,
    failures: usize,
}

impl<H: HistoryBackend> PersistenceController<H> {
    /// Controller firing replace writes `delay` after they are scheduled.
    pub fn new(backend: H, delay: Duration) -> Self {
        Self {
            backend,
            timer: DebounceTimer::new(),
            delay,
            failures: 0,
        }
    }

    /// Push a new history entry now, cancelling any pending replace.
    pub fn write_immediate(&mut self, state: &HistoryState, url: &str) {
        if self.timer.cancel().is_some() {
            trace_log!("Pending replace superseded by push of '{}'", url);
        }
        let result = self.backend.push_state(state, url);
        self.record("pushState", url, result);
    }

    /// Replace the current entry after the delay, superseding any pending replace.
    pub fn schedule_write(&mut self, now: Instant, state: HistoryState, url: String) {
        trace_log!("Scheduling replace of '{}' in {:?}", url, self.delay);
        self.timer.schedule(now, self.delay, PendingWrite { state, url });
    }

    /// Fire the pending replace if it is due. Returns `true` if one fired.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.timer.take_due(now) {
            Some(write) => {
                self.replace(&write);
                true
            }
            None => false,
        }
    }

    /// Fire the pending replace now, regardless of its deadline.
    pub fn flush(&mut self) -> bool {
        match self.timer.cancel() {
            Some(write) => {
                self.replace(&write);
                true
            }
            None => false,
        }
    }

    /// Drop the pending replace.
    pub fn cancel(&mut self) -> Option<PendingWrite> {
        self.timer.cancel()
    }

    /// The pending replace, if any.
    pub fn pending(&self) -> Option<&PendingWrite> {
        self.timer.pending.as_ref().map(|(_, write)| write)
    }

    /// When the pending replace is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Delay applied to scheduled writes.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of backend writes that failed and were swallowed.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// The history backend.
    pub fn backend(&self) -> &H {
        &self.backend
    }

    /// The history backend, mutably (e.g. to drive back/forward in tests).
    pub fn backend_mut(&mut self) -> &mut H {
        &mut self.backend
    }

    fn replace(&mut self, write: &PendingWrite) {
        let result = self.backend.replace_state(&write.state, &write.url);
        self.record("replaceState", &write.url, result);
    }

    fn record(&mut self, op: &str, url: &str, result: Result<(), HistoryError>) {
        if let Err(err) = result {
            // In-memory state stays authoritative; the address bar catches up
            // on the next successful write.
            self.failures += 1;
            warn_log!("{} failed for '{}': {}", op, url, err);
        }
    }
}
