//! §5 status lines: the short-critical-section channel between the
//! event/audio context (writer) and the render context (reader).
//!
//! The spec allows the lock to be a spinlock with a bounded hold time; a
//! `std::sync::Mutex` plus a cached snapshot on the reader side gets the same
//! externally observable behavior (reader never blocks for long, writer
//! never blocks on a slow reader) without pulling in a spinlock crate the
//! rest of this dependency stack has no other use for.

use std::sync::{Mutex, TryLockError};

/// Writer-side handle. The event/audio context holds one of these and calls
/// `publish` once per rendered frame.
#[derive(Default)]
pub struct StatusLines {
    inner: Mutex<String>,
}

impl StatusLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the published line. Holding time is bounded by copying one
    /// `String` — never more (§5 "bounded by a single line's byte copy").
    pub fn publish(&self, line: String) {
        let mut guard = self.inner.lock().unwrap();
        *guard = line;
    }

    /// Reader-side snapshot. On contention, returns `None` rather than
    /// blocking — the render context falls back to its last cached
    /// snapshot instead of stalling a scanline (§5 "wait-free relative to
    /// the audio context").
    pub fn try_read(&self) -> Option<String> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard.clone()),
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(p)) => Some(p.into_inner().clone()),
        }
    }
}

/// Render-context cache: the last snapshot successfully read, reused
/// whenever `try_read` comes back empty.
#[derive(Default)]
pub struct StatusCache {
    last: String,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh from `lines` if possible, otherwise keep serving the
    /// previous snapshot.
    pub fn refresh<'a>(&'a mut self, lines: &StatusLines) -> &'a str {
        if let Some(fresh) = lines.try_read() {
            self.last = fresh;
        }
        &self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_then_read_round_trips() {
        let lines = StatusLines::new();
        lines.publish("frames=1".to_string());
        assert_eq!(lines.try_read().as_deref(), Some("frames=1"));
    }

    #[test]
    fn cache_falls_back_to_last_snapshot_on_contention() {
        let lines = StatusLines::new();
        lines.publish("frames=1".to_string());
        let mut cache = StatusCache::new();
        assert_eq!(cache.refresh(&lines), "frames=1");

        let guard = lines.inner.lock().unwrap();
        // Contended: refresh must keep serving the cached line, not block.
        assert_eq!(cache.refresh(&lines), "frames=1");
        drop(guard);
    }
}
