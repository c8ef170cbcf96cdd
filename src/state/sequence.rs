use std::sync::atomic::{AtomicI32, Ordering};

/// Latest server-issued state id.
///
/// Written only by inbound slot snapshots, read by every outbound click.
/// A click stamped with an old value gets rejected and can get us kicked.
#[derive(Debug, Default)]
pub struct SequenceTracker {
    latest: AtomicI32,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, state_id: i32) {
        let previous = self.latest.swap(state_id, Ordering::AcqRel);
        if previous != state_id {
            tracing::trace!(previous, state_id, "state id updated");
        }
    }

    pub fn current(&self) -> i32 {
        self.latest.load(Ordering::Acquire)
    }
}
