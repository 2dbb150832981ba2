//! Property tests for the core data structures.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32
//! targets.  On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use climabox::control::window::TimeWindow;
use climabox::timers::TimerQueue;
use proptest::prelude::*;

// ── TimeWindow invariants ─────────────────────────────────────

#[derive(Debug, Clone)]
enum WindowOp {
    /// Advance the clock by `advance_secs`, then record `active_secs`.
    Update { advance_secs: u64, active_secs: u32 },
    /// Change the window length.
    Resize { window_secs: u32 },
}

fn arb_window_op() -> impl Strategy<Value = WindowOp> {
    prop_oneof![
        4 => (0u64..400u64, 0u32..200u32)
            .prop_map(|(advance_secs, active_secs)| WindowOp::Update { advance_secs, active_secs }),
        1 => (0u32..900u32).prop_map(|window_secs| WindowOp::Resize { window_secs }),
    ]
}

fn check_invariants(w: &TimeWindow) {
    let sum: u32 = w.chunks().iter().sum();
    assert_eq!(
        w.accumulated_secs(),
        sum,
        "accumulated must equal the chunk sum"
    );
    assert!(
        w.accumulated_secs() <= w.window_secs(),
        "accumulated {} exceeds window {}",
        w.accumulated_secs(),
        w.window_secs()
    );
    for &chunk in w.chunks() {
        assert!(chunk <= w.chunk_secs(), "chunk overfull");
    }
}

proptest! {
    /// For all sequences of updates and resizes, the running total
    /// equals the chunk sum and never exceeds the window length.
    #[test]
    fn window_invariants_hold_under_arbitrary_ops(
        ops in proptest::collection::vec(arb_window_op(), 1..=60),
    ) {
        let mut w = TimeWindow::new(180, 60);
        let mut now = 0u64;

        for op in &ops {
            match op {
                WindowOp::Update { advance_secs, active_secs } => {
                    now += advance_secs;
                    w.update(now, *active_secs);
                }
                WindowOp::Resize { window_secs } => {
                    w.resize(*window_secs);
                }
            }
            check_invariants(&w);
        }
    }

    /// Resizing twice with the same length is a no-op the second time.
    #[test]
    fn resize_is_idempotent(
        ops in proptest::collection::vec(arb_window_op(), 0..=30),
        target in 0u32..900u32,
    ) {
        let mut w = TimeWindow::new(180, 60);
        let mut now = 0u64;
        for op in &ops {
            match op {
                WindowOp::Update { advance_secs, active_secs } => {
                    now += advance_secs;
                    w.update(now, *active_secs);
                }
                WindowOp::Resize { window_secs } => w.resize(*window_secs),
            }
        }

        w.resize(target);
        let chunks = w.chunks().to_vec();
        let accumulated = w.accumulated_secs();

        w.resize(target);
        prop_assert_eq!(w.chunks(), &chunks[..]);
        prop_assert_eq!(w.accumulated_secs(), accumulated);
    }

    /// A grow-shrink round trip fabricates no history, and loses none
    /// that the smaller window could hold.  Chunk-aligned lengths keep
    /// the "fits in the smaller window" bound exact.
    #[test]
    fn resize_round_trip_preserves_in_window_history(
        ops in proptest::collection::vec(arb_window_op(), 0..=30),
        smaller_chunks in 1u32..=6u32,
        extra_chunks in 1u32..=8u32,
    ) {
        let mut w = TimeWindow::new(180, 60);
        let mut now = 0u64;
        for op in &ops {
            match op {
                WindowOp::Update { advance_secs, active_secs } => {
                    now += advance_secs;
                    w.update(now, *active_secs);
                }
                WindowOp::Resize { window_secs } => w.resize(*window_secs),
            }
        }

        let smaller = 60 * smaller_chunks;
        let larger = 60 * (smaller_chunks + extra_chunks);
        w.resize(smaller);
        let kept = w.accumulated_secs();

        w.resize(larger);
        prop_assert_eq!(w.accumulated_secs(), kept, "growing loses nothing");

        w.resize(smaller);
        prop_assert_eq!(w.accumulated_secs(), kept, "round trip must preserve history");
        check_invariants(&w);
    }
}

// ── Timer registry invariants ─────────────────────────────────

proptest! {
    /// Every armed one-shot fires exactly once — unless cleared first,
    /// in which case it never fires.  Dispatch order is slot order.
    #[test]
    fn one_shots_fire_exactly_once_unless_cleared(
        intervals in proptest::collection::vec(1u64..10_000u64, 1..=12),
        clear_mask in proptest::collection::vec(any::<bool>(), 12),
    ) {
        let mut q = TimerQueue::new();
        let handles: Vec<_> = intervals
            .iter()
            .enumerate()
            .map(|(id, &interval)| q.add_timeout(id, interval, 0))
            .collect();

        let mut cleared = Vec::new();
        for (id, handle) in handles.iter().enumerate() {
            if clear_mask[id] {
                q.clear_timeout(*handle);
                cleared.push(id);
            }
        }

        let mut fired = Vec::new();
        q.poll(10_000, |id| fired.push(id));

        // Exactly the surviving ids, in slot (= insertion) order.
        let expected: Vec<_> = (0..intervals.len())
            .filter(|id| !cleared.contains(id))
            .collect();
        prop_assert_eq!(&fired, &expected);
        prop_assert_eq!(q.active_count(), 0);

        // Nothing fires twice.
        let mut refired = Vec::new();
        q.poll(100_000, |id| refired.push(id));
        prop_assert!(refired.is_empty());
    }

    /// The registry grows in fixed increments and recycles freed slots;
    /// the live count never exceeds the capacity.
    #[test]
    fn capacity_grows_in_fixed_increments(
        adds in 1usize..40usize,
    ) {
        let mut q = TimerQueue::new();
        for id in 0..adds {
            q.add_timeout(id, 1_000, 0);
        }
        prop_assert!(q.active_count() == adds);
        prop_assert!(q.capacity() >= adds);
        prop_assert_eq!(q.capacity() % 4, 0);
        prop_assert!(q.capacity() - adds < 4);
    }

    /// Repeating timers keep firing every interval until cleared.
    #[test]
    fn intervals_fire_per_period(
        interval in 1u64..1_000u64,
        periods in 1u64..20u64,
    ) {
        let mut q = TimerQueue::new();
        let handle = q.add_interval((), interval, 0);

        let mut count = 0u64;
        for p in 1..=periods {
            q.poll(p * interval, |()| count += 1);
        }
        prop_assert_eq!(count, periods);

        q.clear_interval(handle);
        q.poll((periods + 1) * interval, |()| count += 1);
        prop_assert_eq!(count, periods);
    }
}
