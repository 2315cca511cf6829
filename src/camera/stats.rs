//! Windowed stream statistics.
//!
//! The window is approximate: it rolls over on the first update at or after
//! `STATS_WINDOW` has elapsed, not on exact second boundaries.

use std::time::Instant;

use super::STATS_WINDOW;

/// Read-only copy of the counters handed to the UI
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSnapshot {
    pub fps: f64,
    pub bytes_per_sec: f64,
    pub frames_in_window: u32,
    pub frames_total: u64,
    pub bytes_total: u64,
    pub last_frame_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct StreamStats {
    frames_in_window: u32,
    bytes_in_window: u64,
    frames_total: u64,
    bytes_total: u64,
    last_frame_bytes: u64,
    window_start: Instant,
    fps: f64,
    bytes_per_sec: f64,
}

impl StreamStats {
    pub fn new(now: Instant) -> Self {
        Self {
            frames_in_window: 0,
            bytes_in_window: 0,
            frames_total: 0,
            bytes_total: 0,
            last_frame_bytes: 0,
            window_start: now,
            fps: 0.0,
            bytes_per_sec: 0.0,
        }
    }

    /// Account for one ingested frame of `len` bytes
    pub fn record_frame(&mut self, len: usize, now: Instant) {
        let len = len as u64;
        self.frames_in_window += 1;
        self.bytes_in_window += len;
        self.frames_total += 1;
        self.bytes_total += len;
        self.last_frame_bytes = len;
        self.roll(now);
    }

    /// Close the window if it has run for at least `STATS_WINDOW`.
    /// Returns true when a roll-over happened.
    pub fn roll(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < STATS_WINDOW {
            return false;
        }
        let secs = elapsed.as_secs_f64();
        self.fps = self.frames_in_window as f64 / secs;
        self.bytes_per_sec = self.bytes_in_window as f64 / secs;
        self.frames_in_window = 0;
        self.bytes_in_window = 0;
        self.window_start = now;
        true
    }

    /// Zero everything; the next window starts at `now`
    pub fn reset(&mut self, now: Instant) {
        *self = Self::new(now);
    }

    /// Roll if due, then copy the counters out
    pub fn snapshot(&mut self, now: Instant) -> StatsSnapshot {
        self.roll(now);
        self.peek()
    }

    /// Copy the counters out without touching the window
    pub fn peek(&self) -> StatsSnapshot {
        StatsSnapshot {
            fps: self.fps,
            bytes_per_sec: self.bytes_per_sec,
            frames_in_window: self.frames_in_window,
            frames_total: self.frames_total,
            bytes_total: self.bytes_total,
            last_frame_bytes: self.last_frame_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_frames_within_window_accumulate() {
        let t0 = Instant::now();
        let mut stats = StreamStats::new(t0);
        let sizes = [100usize, 200, 150, 300, 250];
        for (i, size) in sizes.iter().enumerate() {
            stats.record_frame(*size, t0 + ms(150 * (i as u64 + 1)));
        }

        let snap = stats.peek();
        assert_eq!(snap.bytes_total, 1000);
        assert_eq!(snap.last_frame_bytes, 250);
        assert_eq!(snap.frames_in_window, 5);
        assert_eq!(snap.fps, 0.0);
    }

    #[test]
    fn test_read_after_window_elapsed_computes_fps() {
        let t0 = Instant::now();
        let mut stats = StreamStats::new(t0);
        for (i, size) in [100usize, 200, 150, 300, 250].iter().enumerate() {
            stats.record_frame(*size, t0 + ms(180 * (i as u64 + 1)));
        }
        assert_eq!(stats.peek().frames_in_window, 5);

        // 900ms of frames, then 150ms of silence
        let read_at = t0 + ms(1050);
        let snap = stats.snapshot(read_at);
        assert!((snap.fps - 5.0 / 1.05).abs() < 1e-9);
        assert!((snap.fps - 4.76).abs() < 0.01);
        assert_eq!(snap.frames_in_window, 0);
        assert!((snap.bytes_per_sec - 1000.0 / 1.05).abs() < 1e-6);
    }

    #[test]
    fn test_window_rolls_at_most_once_per_update() {
        let t0 = Instant::now();
        let mut stats = StreamStats::new(t0);
        stats.record_frame(10, t0 + ms(500));
        // A single late frame closes exactly one window, even after several seconds
        stats.record_frame(10, t0 + ms(3500));
        let snap = stats.peek();
        assert_eq!(snap.frames_in_window, 0);
        assert!((snap.fps - 2.0 / 3.5).abs() < 1e-9);

        // Immediately after a roll the window is fresh
        assert!(!stats.roll(t0 + ms(3600)));
    }

    #[test]
    fn test_idle_stream_decays_to_zero_fps() {
        let t0 = Instant::now();
        let mut stats = StreamStats::new(t0);
        for i in 0..10 {
            stats.record_frame(50, t0 + ms(100 * i));
        }
        let first = stats.snapshot(t0 + ms(1000));
        assert!(first.fps > 0.0);

        let later = stats.snapshot(t0 + ms(2000));
        assert_eq!(later.fps, 0.0);
        assert!(later.fps >= 0.0);
    }

    #[test]
    fn test_reset_zeroes_counters() {
        let t0 = Instant::now();
        let mut stats = StreamStats::new(t0);
        for i in 0..12 {
            stats.record_frame(64, t0 + ms(100 * i));
        }
        assert!(stats.peek().fps > 0.0);

        stats.reset(t0 + ms(1200));
        assert_eq!(stats.peek(), StatsSnapshot::default());
    }
}
