//! Shared project timeline
//!
//! The timeline is shared between the UI, the render engine, and hosted
//! effects, so the current frame is an atomic. Seeking repositions the
//! playhead only; it never starts playback by itself.

use std::sync::atomic::{AtomicI64, Ordering};

/// Why a seek happened; consumers may react differently to user seeks and
/// playback-driven seeks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekReason {
    /// The user moved the playhead
    UserSeek,
    /// A playback or render path repositioned the playhead
    PlaybackSeek,
}

/// Shared playhead position
#[derive(Debug)]
pub struct Timeline {
    current_frame: AtomicI64,
}

impl Timeline {
    pub fn new(start_frame: i64) -> Self {
        Self {
            current_frame: AtomicI64::new(start_frame),
        }
    }

    pub fn current_frame(&self) -> i64 {
        self.current_frame.load(Ordering::Acquire)
    }

    /// Move the playhead. Does not start playback.
    pub fn seek(&self, frame: i64, _reason: SeekReason) {
        self.current_frame.store(frame, Ordering::Release);
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_round_trip() {
        let timeline = Timeline::new(1);
        assert_eq!(timeline.current_frame(), 1);

        timeline.seek(42, SeekReason::PlaybackSeek);
        assert_eq!(timeline.current_frame(), 42);

        timeline.seek(7, SeekReason::UserSeek);
        assert_eq!(timeline.current_frame(), 7);
    }
}
