//! Sliding time-budget accumulator.
//!
//! A circular buffer of fixed-duration chunks that tracks how many seconds
//! an actuator has been active inside a rolling window.  Each chunk covers
//! `chunk_secs` of wall-clock time; the buffer as a whole covers
//! `window_secs`.  As time advances, chunks older than one full window are
//! shifted out and their seconds forgotten, so [`accumulated_secs`] is
//! always the active time within the most recent window.
//!
//! The window is resizable at runtime (the active-time window is a tunable
//! configuration value) and a resize preserves as much recent history as
//! fits in the new buffer.
//!
//! Two invariants hold after every operation:
//! - `accumulated_secs() == sum(chunks)`
//! - `accumulated_secs() <= window_secs()`
//!
//! [`accumulated_secs`]: TimeWindow::accumulated_secs

use log::debug;

/// Default chunk granularity (one minute).
pub const DEFAULT_CHUNK_SECS: u32 = 60;

/// Rolling accumulator of active seconds over a resizable window.
#[derive(Debug, Clone)]
pub struct TimeWindow {
    window_secs: u32,
    chunk_secs: u32,
    chunks: Vec<u32>,
    current: usize,
    accumulated: u32,
    /// Second at which the current chunk started accumulating.
    /// `None` until the first `update` call.
    chunk_started_at: Option<u64>,
}

impl TimeWindow {
    /// Create a window covering `window_secs`, sliced into `chunk_secs`
    /// chunks.  A zero chunk size is coerced to 1 s and the buffer always
    /// holds at least one chunk, so no configuration can divide by zero
    /// or leave the accumulator without a current slot.
    pub fn new(window_secs: u32, chunk_secs: u32) -> Self {
        let chunk_secs = chunk_secs.max(1);
        Self {
            window_secs,
            chunk_secs,
            chunks: vec![0; Self::chunk_count(window_secs, chunk_secs)],
            current: 0,
            accumulated: 0,
            chunk_started_at: None,
        }
    }

    fn chunk_count(window_secs: u32, chunk_secs: u32) -> usize {
        (window_secs.div_ceil(chunk_secs) as usize).max(1)
    }

    /// Total rolling-window duration in seconds.
    pub fn window_secs(&self) -> u32 {
        self.window_secs
    }

    /// Duration covered by one chunk.
    pub fn chunk_secs(&self) -> u32 {
        self.chunk_secs
    }

    /// Active seconds accumulated within the window.  O(1).
    pub fn accumulated_secs(&self) -> u32 {
        self.accumulated
    }

    /// Per-chunk accumulated seconds, in buffer order (diagnostics only —
    /// the slot at `current` represents "now").
    pub fn chunks(&self) -> &[u32] {
        &self.chunks
    }

    /// Advance the window to `now_secs` and record `active_secs` of
    /// activity in the current chunk.
    ///
    /// The first call anchors the current chunk at `now_secs`.  Once the
    /// anchor is older than one chunk, the buffer shifts forward, dropping
    /// the oldest chunks.  The recorded seconds are clamped so that no
    /// chunk exceeds `chunk_secs` and the total never exceeds
    /// `window_secs`; the running total is adjusted by exactly the clamped
    /// amount.
    pub fn update(&mut self, now_secs: u64, active_secs: u32) {
        let started = *self.chunk_started_at.get_or_insert(now_secs);

        let elapsed = now_secs.saturating_sub(started);
        if elapsed >= u64::from(self.chunk_secs) {
            self.shift(elapsed / u64::from(self.chunk_secs));
            self.chunk_started_at = Some(now_secs);
        }

        if active_secs == 0 {
            return;
        }

        let slot = self.chunks[self.current];
        let headroom = (self.chunk_secs - slot).min(self.window_secs.saturating_sub(self.accumulated));
        let add = active_secs.min(headroom);
        self.chunks[self.current] = slot + add;
        self.accumulated += add;
    }

    /// Change the window length, preserving recent history.
    ///
    /// If the required chunk count is unchanged this is a no-op.
    /// Otherwise a new buffer is allocated: the current chunk lands in
    /// slot 0 and as many of the most recent preceding chunks as fit are
    /// placed so that chronological order ends at "now" (the oldest kept
    /// chunk is the next to be shifted out).  History that no longer fits
    /// is dropped oldest-first, and the total is trimmed oldest-first so
    /// it never exceeds the new window length.
    pub fn resize(&mut self, new_window_secs: u32) {
        let new_count = Self::chunk_count(new_window_secs, self.chunk_secs);
        if new_count == self.chunks.len() {
            return;
        }

        debug!(
            "window: resize {}s ({} chunks) -> {}s ({} chunks)",
            self.window_secs,
            self.chunks.len(),
            new_window_secs,
            new_count
        );

        let old = core::mem::replace(&mut self.chunks, vec![0; new_count]);
        let old_len = old.len();

        // Slot 0 is "now"; predecessor k chunks back lands at new_count - k,
        // which a forward shift reaches last.  Anything older than
        // new_count - 1 predecessors is gone.
        self.chunks[0] = old[self.current];
        let kept = (new_count - 1).min(old_len - 1);
        for k in 1..=kept {
            let src = (self.current + old_len - k) % old_len;
            self.chunks[new_count - k] = old[src];
        }
        self.current = 0;
        self.window_secs = new_window_secs;

        let mut total: u32 = self.chunks.iter().sum();
        for k in (1..=kept).rev() {
            if total <= self.window_secs {
                break;
            }
            let slot = new_count - k;
            let cut = self.chunks[slot].min(total - self.window_secs);
            self.chunks[slot] -= cut;
            total -= cut;
        }
        if total > self.window_secs {
            let cut = total - self.window_secs;
            self.chunks[0] -= cut;
            total -= cut;
        }
        self.accumulated = total;
    }

    /// Advance the ring by `shift` chunks, zeroing everything shifted over.
    ///
    /// A shift of a full buffer length or more means all history predates
    /// the window: the buffer is cleared outright and the total resets.
    fn shift(&mut self, shift: u64) {
        let len = self.chunks.len();
        if shift >= len as u64 {
            self.chunks.fill(0);
            self.accumulated = 0;
            self.current = 0;
            return;
        }

        let shift = shift as usize;
        for step in 1..=shift {
            let idx = (self.current + step) % len;
            self.accumulated -= self.chunks[idx];
            self.chunks[idx] = 0;
        }
        self.current = (self.current + shift) % len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(w: &TimeWindow) -> u32 {
        w.chunks().iter().sum()
    }

    #[test]
    fn accumulates_and_clamps_per_chunk() {
        let mut w = TimeWindow::new(180, 60);
        w.update(0, 30);
        assert_eq!(w.accumulated_secs(), 30);

        // Same chunk: clamp at chunk_secs, never double count.
        w.update(10, 100);
        assert_eq!(w.accumulated_secs(), 60);
        assert_eq!(sum(&w), 60);
    }

    #[test]
    fn total_never_exceeds_window() {
        // 90 s window is 1.5 chunks — two full chunks would overshoot.
        let mut w = TimeWindow::new(90, 60);
        w.update(0, 60);
        w.update(60, 60);
        assert_eq!(w.accumulated_secs(), 90);
        assert_eq!(sum(&w), 90);
    }

    #[test]
    fn rolls_over_after_full_window() {
        let mut w = TimeWindow::new(180, 60);
        w.update(0, 60);
        assert_eq!(w.accumulated_secs(), 60);

        // Stay inside the window: nothing expires yet.
        w.update(120, 0);
        assert_eq!(w.accumulated_secs(), 60);

        // One full window later all history is gone.
        w.update(190, 0);
        assert_eq!(w.accumulated_secs(), 0);
    }

    #[test]
    fn shift_walks_one_chunk_at_a_time() {
        let mut w = TimeWindow::new(180, 60);
        w.update(0, 60);
        w.update(60, 60);
        w.update(120, 60);
        assert_eq!(w.accumulated_secs(), 180);

        // Advance two chunks: the two oldest expire, the newest remains.
        w.update(240, 0);
        assert_eq!(w.accumulated_secs(), 60);
    }

    #[test]
    fn resize_same_count_is_noop() {
        let mut w = TimeWindow::new(180, 60);
        w.update(0, 45);
        let before = w.chunks().to_vec();

        // 170 s still needs 3 chunks.
        w.resize(170);
        assert_eq!(w.chunks(), &before[..]);
        assert_eq!(w.window_secs(), 180);

        w.resize(180);
        assert_eq!(w.accumulated_secs(), 45);
    }

    #[test]
    fn resize_grow_preserves_history() {
        let mut w = TimeWindow::new(120, 60);
        w.update(0, 60);
        w.update(60, 30);
        assert_eq!(w.accumulated_secs(), 90);

        w.resize(300);
        assert_eq!(w.accumulated_secs(), 90);
        assert_eq!(sum(&w), 90);

        // Preserved chunks expire on their original cadence: seconds
        // recorded around t=0 leave the 300 s window at t=300.
        w.update(120, 0);
        assert_eq!(w.accumulated_secs(), 90);
        w.update(300, 0);
        assert_eq!(w.accumulated_secs(), 30);
        w.update(360, 0);
        assert_eq!(w.accumulated_secs(), 0);
    }

    #[test]
    fn resize_shrink_drops_oldest() {
        let mut w = TimeWindow::new(240, 60);
        w.update(0, 10);
        w.update(60, 20);
        w.update(120, 30);
        w.update(180, 40);
        assert_eq!(w.accumulated_secs(), 100);

        // Two chunks fit: "now" (40) and its predecessor (30).
        w.resize(120);
        assert_eq!(w.accumulated_secs(), 70);
        assert_eq!(sum(&w), 70);
    }

    #[test]
    fn resize_shrink_caps_total_at_window() {
        let mut w = TimeWindow::new(180, 60);
        w.update(0, 60);
        w.update(60, 60);

        // 90 s window keeps both chunks but only 90 s of budget; the
        // older chunk is trimmed first.
        w.resize(90);
        assert_eq!(w.accumulated_secs(), 90);
        assert_eq!(sum(&w), 90);

        w.update(120, 0);
        assert_eq!(w.accumulated_secs(), 60);
    }

    #[test]
    fn resize_below_one_chunk_trims_current() {
        let mut w = TimeWindow::new(120, 60);
        w.update(0, 60);
        w.resize(30);
        assert_eq!(w.accumulated_secs(), 30);
        assert_eq!(sum(&w), 30);
    }

    #[test]
    fn zero_chunk_size_is_coerced() {
        let mut w = TimeWindow::new(10, 0);
        assert_eq!(w.chunk_secs(), 1);
        w.update(0, 5);
        assert_eq!(w.accumulated_secs(), 1);
    }

    #[test]
    fn zero_window_accepts_updates_without_budget() {
        let mut w = TimeWindow::new(0, 60);
        w.update(0, 30);
        assert_eq!(w.accumulated_secs(), 0);
    }
}
