use super::handle::ResourceHandle;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

/// Outcome of a [`ResourceTracker::release_all`] sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub released: usize,
    pub already_released: usize,
    pub failed: usize,
}

/// Session-scoped registry of encoded-image handles awaiting cleanup.
///
/// Operations only touch the map while the lock is held; file deletion
/// happens after it is dropped so a slow disk never blocks other callers.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    handles: Mutex<HashMap<Uuid, ResourceHandle>>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<Uuid, ResourceHandle>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a handle for later cleanup. Tracking twice is a no-op.
    pub fn track(&self, handle: &ResourceHandle) {
        if !handle.is_active() {
            debug!("Not tracking already released resource {}", handle.id());
            return;
        }
        self.handles()
            .entry(handle.id())
            .or_insert_with(|| handle.clone());
    }

    pub fn is_tracked(&self, handle: &ResourceHandle) -> bool {
        self.handles().contains_key(&handle.id())
    }

    pub fn len(&self) -> usize {
        self.handles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles().is_empty()
    }

    /// Release a handle and stop tracking it.
    ///
    /// Handles this tracker does not hold, including ones owned by another
    /// tracker, are left untouched. Storage errors are logged, never returned.
    pub fn release(&self, handle: &ResourceHandle) {
        let removed = self.handles().remove(&handle.id());
        match removed {
            Some(tracked) => {
                release_logged(&tracked);
            }
            None => debug!("Resource {} is not tracked here, leaving it", handle.id()),
        }
    }

    /// Release every tracked handle and clear the set.
    ///
    /// Each handle is released independently, so one failure does not stop
    /// the sweep.
    pub fn release_all(&self) -> ReleaseSummary {
        let drained: Vec<ResourceHandle> = self.handles().drain().map(|(_, h)| h).collect();

        let mut summary = ReleaseSummary::default();
        for handle in &drained {
            match release_logged(handle) {
                Some(true) => summary.released += 1,
                Some(false) => summary.already_released += 1,
                None => summary.failed += 1,
            }
        }

        debug!(
            "Released {} resources ({} already released, {} failed)",
            summary.released, summary.already_released, summary.failed
        );
        summary
    }
}

fn release_logged(handle: &ResourceHandle) -> Option<bool> {
    match handle.release() {
        Ok(released) => {
            if released {
                debug!("Released resource {} ({:?})", handle.id(), handle.kind());
            }
            Some(released)
        }
        Err(e) => {
            warn!("Failed to release resource {}: {}", handle.id(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::HandleState;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn temp_handle() -> ResourceHandle {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"encoded").unwrap();
        ResourceHandle::temp_file(file.into_temp_path())
    }

    #[test]
    fn test_track_and_release() {
        let tracker = ResourceTracker::new();
        let handle = ResourceHandle::in_memory(vec![1, 2, 3]);

        tracker.track(&handle);
        assert!(tracker.is_tracked(&handle));
        assert_eq!(tracker.len(), 1);

        tracker.release(&handle);
        assert!(tracker.is_empty());
        assert_eq!(handle.state(), HandleState::Released);
    }

    #[test]
    fn test_track_twice_is_noop() {
        let tracker = ResourceTracker::new();
        let handle = ResourceHandle::in_memory(vec![]);
        tracker.track(&handle);
        tracker.track(&handle.clone());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_release_twice_does_not_panic() {
        let tracker = ResourceTracker::new();
        let handle = temp_handle();
        tracker.track(&handle);

        tracker.release(&handle);
        tracker.release(&handle);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_release_untracked_handle_leaves_it_active() {
        let tracker = ResourceTracker::new();
        let handle = ResourceHandle::in_memory(vec![5]);
        tracker.release(&handle);
        assert_eq!(handle.state(), HandleState::Active);
        assert_eq!(handle.read_bytes().unwrap(), vec![5]);
    }

    #[test]
    fn test_release_from_other_tracker_does_not_free() {
        let session_a = ResourceTracker::new();
        let session_b = ResourceTracker::new();
        let handle = temp_handle();
        let path = handle.path().unwrap();
        session_a.track(&handle);

        session_b.release(&handle);

        assert!(handle.is_active());
        assert!(path.exists());
        assert!(session_a.is_tracked(&handle));

        session_a.release(&handle);
        assert!(!handle.is_active());
        assert!(!path.exists());
    }

    #[test]
    fn test_released_handles_are_not_tracked() {
        let tracker = ResourceTracker::new();
        let handle = ResourceHandle::in_memory(vec![5]);
        handle.release().unwrap();
        tracker.track(&handle);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_release_all_continues_past_failures() {
        let tracker = ResourceTracker::new();
        let broken = temp_handle();
        let healthy_file = temp_handle();
        let healthy_memory = ResourceHandle::in_memory(vec![1]);
        let already = ResourceHandle::in_memory(vec![2]);

        for h in [&broken, &healthy_file, &healthy_memory, &already] {
            tracker.track(h);
        }
        already.release().unwrap();
        std::fs::remove_file(broken.path().unwrap()).unwrap();
        let healthy_path = healthy_file.path().unwrap();

        let summary = tracker.release_all();

        assert_eq!(
            summary,
            ReleaseSummary {
                released: 2,
                already_released: 1,
                failed: 1,
            }
        );
        assert!(tracker.is_empty());
        assert!(!healthy_path.exists());
        for h in [&broken, &healthy_file, &healthy_memory, &already] {
            assert_eq!(h.state(), HandleState::Released);
        }
    }

    #[test]
    fn test_release_all_on_empty_tracker() {
        let tracker = ResourceTracker::new();
        assert_eq!(tracker.release_all(), ReleaseSummary::default());
    }

    #[test]
    fn test_concurrent_track_and_release() {
        let tracker = Arc::new(ResourceTracker::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    let mut kept = Vec::new();
                    for i in 0..50 {
                        let handle = ResourceHandle::in_memory(vec![i as u8]);
                        tracker.track(&handle);
                        if i % 2 == 0 {
                            tracker.release(&handle);
                        } else {
                            kept.push(handle);
                        }
                    }
                    kept
                })
            })
            .collect();

        let kept: Vec<ResourceHandle> = threads
            .into_iter()
            .flat_map(|t| t.join().unwrap())
            .collect();

        assert_eq!(tracker.len(), kept.len());
        assert_eq!(tracker.release_all().released, kept.len());
        assert!(kept.iter().all(|h| !h.is_active()));
    }
}
