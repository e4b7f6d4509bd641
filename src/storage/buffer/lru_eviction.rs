use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hashlink::LinkedHashSet;

use crate::storage::buffer::eviction::EvictionPolicy;
use crate::storage::buffer::frame::FrameId;

struct LruState {
    /// Unpinned frames. The front was unpinned the longest time ago.
    eligible: LinkedHashSet<FrameId>,
    /// Frames that left `eligible` because they were pinned again.
    pinned_out: HashSet<FrameId>,
}

/// Strict LRU over unpin time: the frame that has stayed unpinned the longest
/// is evicted first. Every operation is O(1).
pub struct LruEvictionPolicy {
    capacity: usize,
    state: Mutex<LruState>,
}

impl LruEvictionPolicy {
    pub fn new(capacity: usize) -> Self {
        LruEvictionPolicy {
            capacity,
            state: Mutex::new(LruState {
                eligible: LinkedHashSet::with_capacity(capacity),
                pinned_out: HashSet::with_capacity(capacity),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[allow(unused)]
    fn debug_dump(&self) {
        let state = self.lock();
        log::debug!(
            "Eligible (oldest first): {:?}, pinned out: {:?}",
            state.eligible.iter().collect::<Vec<_>>(),
            state.pinned_out
        );
    }
}

impl EvictionPolicy for LruEvictionPolicy {
    /// Inserts the frame at the most recently unpinned end. Already eligible
    /// frames keep their position. Insertions beyond capacity are ignored.
    fn mark_eligible(&self, frame_id: FrameId) {
        let mut state = self.lock();
        if state.eligible.contains(&frame_id) {
            return;
        }
        if state.eligible.len() >= self.capacity {
            log::warn!("mark_eligible: ignoring frame_id={frame_id}, policy is at capacity");
            return;
        }
        state.pinned_out.remove(&frame_id);
        state.eligible.insert(frame_id);
    }

    fn mark_ineligible(&self, frame_id: FrameId) {
        let mut state = self.lock();
        if state.eligible.remove(&frame_id) {
            state.pinned_out.insert(frame_id);
        }
    }

    fn select_victim(&self) -> Option<FrameId> {
        self.lock().eligible.pop_front()
    }

    fn forget(&self, frame_id: FrameId) {
        let mut state = self.lock();
        state.eligible.remove(&frame_id);
        state.pinned_out.remove(&frame_id);
    }

    fn is_eligible(&self, frame_id: FrameId) -> bool {
        self.lock().eligible.contains(&frame_id)
    }

    fn size(&self) -> usize {
        self.lock().eligible.len()
    }
}
