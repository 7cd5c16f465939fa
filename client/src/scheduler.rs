//! Simulation-time event queue.
//!
//! Deferred work (boss grace and warning periods, delayed portal navigation)
//! is stored here as `(deadline, event)` pairs and drained once per tick, so a
//! whole timer chain can be driven deterministically by advancing the clock.

use std::time::Duration;

/// Opaque handle to a scheduled event, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Entry<E> {
    handle: TimerHandle,
    due: Duration,
    event: E,
}

#[derive(Debug)]
pub struct Scheduler<E> {
    entries: Vec<Entry<E>>,
    next_handle: u64,
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_handle: 1,
        }
    }

    pub fn schedule(&mut self, due: Duration, event: E) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push(Entry { handle, due, event });
        handle
    }

    /// Returns true if the handle was still pending.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        self.entries.len() != before
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|entry| entry.handle == handle)
    }

    /// Removes and returns every event due at or before `now`, earliest first.
    /// Events with equal deadlines come out in scheduling order.
    pub fn poll_due(&mut self, now: Duration) -> Vec<E> {
        let mut due: Vec<Entry<E>> = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].due <= now {
                due.push(self.entries.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|entry| (entry.due, entry.handle.0));
        due.into_iter().map(|entry| entry.event).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}
