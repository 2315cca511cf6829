use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::protocol::{DeviceNotice, Diagnostic};

use super::frame::{FrameBuffer, Surface};
use super::stats::StreamStats;

/// Turns socket payloads into the displayed frame and stream counters.
/// Sole owner of the display resource.
pub struct Ingest<S: Surface> {
    frames: FrameBuffer<S>,
    decode_failures: u64,
}

impl<S: Surface> Ingest<S> {
    pub fn new(surface: S) -> Self {
        Self {
            frames: FrameBuffer::new(surface),
            decode_failures: 0,
        }
    }

    /// Binary payload: count it, then swap it onto the display
    pub fn on_binary(&mut self, payload: &[u8], stats: &mut StreamStats, now: Instant) {
        stats.record_frame(payload.len(), now);
        match self.frames.replace(payload) {
            Ok(()) => trace!(bytes = payload.len(), "frame installed"),
            Err(e) => {
                self.decode_failures += 1;
                warn!(bytes = payload.len(), error = %e, "dropping undecodable frame");
            }
        }
    }

    /// Text payload: diagnostic only. Returns the typed notice when there is one.
    pub fn on_text(&mut self, text: &str) -> Option<DeviceNotice> {
        match Diagnostic::parse(text) {
            Diagnostic::Notice(notice) => {
                match &notice {
                    DeviceNotice::Welcome { message } => info!(%message, "camera says hello"),
                    DeviceNotice::Error { message } => warn!(%message, "camera reported an error"),
                    DeviceNotice::Pong { timestamp } => debug!(uptime_ms = timestamp, "pong"),
                }
                Some(notice)
            }
            Diagnostic::Json(value) => {
                debug!(message = %value, "camera message");
                None
            }
            Diagnostic::Raw(raw) => {
                debug!(text = %raw, "camera text");
                None
            }
        }
    }

    /// Drop the displayed frame (stream stopped or lost)
    pub fn release(&mut self) {
        self.frames.clear();
    }

    pub fn frames(&self) -> &FrameBuffer<S> {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut FrameBuffer<S> {
        &mut self.frames
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::frame::testing::CountingSurface;

    #[test]
    fn test_binary_updates_stats_and_display() {
        let now = Instant::now();
        let (surface, ledger) = CountingSurface::new();
        let mut ingest = Ingest::new(surface);
        let mut stats = StreamStats::new(now);

        ingest.on_binary(&[0u8; 120], &mut stats, now);
        ingest.on_binary(&[0u8; 80], &mut stats, now);

        let snap = stats.peek();
        assert_eq!(snap.bytes_total, 200);
        assert_eq!(snap.last_frame_bytes, 80);
        assert_eq!(ingest.frames().active(), Some(&1));
        assert_eq!(ledger.borrow().released, vec![0]);
    }

    #[test]
    fn test_undecodable_frame_is_counted_not_fatal() {
        let now = Instant::now();
        let (surface, _ledger) = CountingSurface::new();
        let mut ingest = Ingest::new(surface);
        let mut stats = StreamStats::new(now);

        ingest.on_binary(b"good", &mut stats, now);
        ingest.on_binary(b"", &mut stats, now);

        assert_eq!(ingest.decode_failures(), 1);
        assert_eq!(ingest.frames().active(), Some(&0));
        assert_eq!(stats.peek().frames_in_window, 2);
    }

    #[test]
    fn test_text_frames_are_diagnostic_only() {
        let now = Instant::now();
        let (surface, _ledger) = CountingSurface::new();
        let mut ingest = Ingest::new(surface);
        let stats = StreamStats::new(now);

        assert!(ingest.on_text("{{{ not json").is_none());
        let notice = ingest.on_text(r#"{"type":"error","message":"Failed to capture frame"}"#);
        assert_eq!(
            notice,
            Some(DeviceNotice::Error {
                message: "Failed to capture frame".to_string()
            })
        );
        assert!(!ingest.frames().has_frame());
        assert_eq!(stats.peek().frames_total, 0);
    }
}
