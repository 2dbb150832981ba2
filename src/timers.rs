//! Deferred timer registry.
//!
//! A growable slot array of one-shot and repeating deferred actions,
//! polled cooperatively once per control-loop iteration.  Its main job is
//! coalescing: the settings store re-arms a one-shot here on every config
//! change so that a burst of edits collapses into a single flash write.
//! The telemetry cadence and alert pacing ride on the same registry.
//!
//! Entries carry a small `Copy` action value instead of a callback
//! pointer; [`poll`](TimerQueue::poll) hands each due action to the
//! caller's dispatch function.  Dispatch order is **slot-index order**,
//! not insertion or due-time order — actions must not assume ordering
//! relative to each other.  A due slot is reset (repeating) or freed
//! (one-shot) before its action is dispatched, so an action re-arming
//! its own timer observes a free slot; timers added while a poll pass
//! runs are not guaranteed to fire within the same pass.

use log::debug;

/// Slots added whenever the registry runs out of free entries.
const GROW_SLOTS: usize = 4;

/// Opaque handle to a registered timer (its slot index).  Stays valid
/// until the timer is cleared or fires as a one-shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(usize);

#[derive(Debug, Clone, Copy)]
struct TimerEntry<A> {
    action: A,
    interval_ms: u64,
    repeat: bool,
    created_at_ms: u64,
}

/// Slot-based registry of deferred actions.
///
/// Grows by a fixed increment when full and never shrinks.  On a
/// constrained target a failed growth allocation aborts the process,
/// which is the intended escalation — continuing with a corrupt registry
/// is worse than a restart.
#[derive(Debug)]
pub struct TimerQueue<A> {
    slots: Vec<Option<TimerEntry<A>>>,
    free_slots: usize,
}

impl<A: Copy> TimerQueue<A> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_slots: 0,
        }
    }

    /// Arm a one-shot timer: `action` is dispatched once `interval_ms`
    /// has elapsed past `now_ms`, then the slot is freed.
    pub fn add_timeout(&mut self, action: A, interval_ms: u64, now_ms: u64) -> TimerHandle {
        self.add(action, interval_ms, false, now_ms)
    }

    /// Arm a repeating timer: `action` is dispatched every `interval_ms`.
    pub fn add_interval(&mut self, action: A, interval_ms: u64, now_ms: u64) -> TimerHandle {
        self.add(action, interval_ms, true, now_ms)
    }

    /// Cancel a one-shot timer.  Clearing an already-fired, cleared or
    /// out-of-range handle is a no-op.
    pub fn clear_timeout(&mut self, handle: TimerHandle) {
        self.clear(handle);
    }

    /// Cancel a repeating timer.  Same no-op semantics as
    /// [`clear_timeout`](Self::clear_timeout).
    pub fn clear_interval(&mut self, handle: TimerHandle) {
        self.clear(handle);
    }

    /// Scan all slots and dispatch every due action, in slot order.
    pub fn poll(&mut self, now_ms: u64, mut dispatch: impl FnMut(A)) {
        if self.free_slots == self.slots.len() {
            return;
        }

        for idx in 0..self.slots.len() {
            let Some(entry) = self.slots[idx].take() else {
                continue;
            };
            if now_ms.wrapping_sub(entry.created_at_ms) < entry.interval_ms {
                self.slots[idx] = Some(entry);
                continue;
            }

            if entry.repeat {
                self.slots[idx] = Some(TimerEntry {
                    created_at_ms: now_ms,
                    ..entry
                });
            } else {
                self.free_slots += 1;
            }
            dispatch(entry.action);
        }
    }

    /// Number of armed timers.
    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free_slots
    }

    /// Total slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn add(&mut self, action: A, interval_ms: u64, repeat: bool, now_ms: u64) -> TimerHandle {
        let idx = match self.slots.iter().position(Option::is_none) {
            Some(idx) => idx,
            None => {
                let idx = self.slots.len();
                self.grow();
                idx
            }
        };

        self.slots[idx] = Some(TimerEntry {
            action,
            interval_ms,
            repeat,
            created_at_ms: now_ms,
        });
        self.free_slots -= 1;

        debug!(
            "timers: armed slot {} ({} of {} in use)",
            idx,
            self.active_count(),
            self.slots.len()
        );
        TimerHandle(idx)
    }

    fn clear(&mut self, TimerHandle(idx): TimerHandle) {
        if let Some(slot) = self.slots.get_mut(idx) {
            if slot.take().is_some() {
                self.free_slots += 1;
            }
        }
    }

    fn grow(&mut self) {
        let new_len = self.slots.len() + GROW_SLOTS;
        self.slots.resize_with(new_len, || None);
        self.free_slots += GROW_SLOTS;
        debug!("timers: grew registry to {} slots", new_len);
    }
}

impl<A: Copy> Default for TimerQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}
