//! Tick event queue.
//!
//! Events are produced by the esp_timer callbacks (periodic sensor reads
//! and control ticks) and consumed by the main control loop.  Timer
//! callbacks run in the ESP timer task, not the main task, so the queue
//! is a lock-free SPSC ring over atomics.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Timer task   │────▶│  Event Queue │────▶│  Main Loop   │
//! │ (producer)   │     │  (lock-free) │     │  (consumer)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
const EVENT_QUEUE_CAP: usize = 16;

/// Tick sources that drive the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// Periodic sensor read timer fired — refresh the sensor hub.
    SensorReadTick = 1,
    /// Control loop tick — evaluate duty schedulers, poll timers.
    ControlTick = 2,
}

impl Event {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::SensorReadTick),
            2 => Some(Self::ControlTick),
            _ => None,
        }
    }
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// The timer task writes (produce), the main loop reads (consume).
// Head/tail are atomic indices; the byte buffer itself is only touched
// by the side that owns the corresponding index, so the SPSC discipline
// makes the unsynchronised slots safe.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// Slots are atomics so the producer/consumer halves need no unsafe; the
// SPSC discipline (producer publishes head after the slot write, consumer
// advances tail after the slot read) keeps each slot single-owner.
static EVENT_BUFFER: [AtomicU8; EVENT_QUEUE_CAP] =
    [const { AtomicU8::new(0) }; EVENT_QUEUE_CAP];

/// Push an event into the queue.  Safe to call from the timer task
/// (lock-free).  Returns `false` if the queue is full (event dropped —
/// tick events are periodic, so a dropped tick is made up by the next).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);

    if head.wrapping_sub(tail) as usize >= EVENT_QUEUE_CAP {
        return false;
    }

    let idx = head as usize % EVENT_QUEUE_CAP;
    EVENT_BUFFER[idx].store(event as u8, Ordering::Relaxed);
    EVENT_HEAD.store(head.wrapping_add(1), Ordering::Release);
    true
}

/// Pop the oldest pending event, if any.  Main-loop side only.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if head == tail {
        return None;
    }

    let idx = tail as usize % EVENT_QUEUE_CAP;
    let raw = EVENT_BUFFER[idx].load(Ordering::Relaxed);
    EVENT_TAIL.store(tail.wrapping_add(1), Ordering::Release);
    Event::from_raw(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The queue is process-global state, so everything runs in a single
    // test to keep the parallel test harness away from it.
    #[test]
    fn fifo_and_overflow_behaviour() {
        while pop_event().is_some() {}

        assert!(push_event(Event::SensorReadTick));
        assert!(push_event(Event::ControlTick));
        assert_eq!(pop_event(), Some(Event::SensorReadTick));
        assert_eq!(pop_event(), Some(Event::ControlTick));
        assert_eq!(pop_event(), None);

        for _ in 0..EVENT_QUEUE_CAP {
            assert!(push_event(Event::ControlTick));
        }
        assert!(!push_event(Event::ControlTick));
        while pop_event().is_some() {}
    }
}
