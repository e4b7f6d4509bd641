use super::frame::FrameId;

/// Tracks which resident frames may be reused and picks the next victim.
///
/// The buffer pool owns the pin counts. The policy only hears about the moments a
/// frame crosses zero pins, in either direction, and never counts pins itself.
pub trait EvictionPolicy {
    /// The frame's pin count dropped to zero.
    fn mark_eligible(&self, frame_id: FrameId);

    /// The frame was pinned again.
    fn mark_ineligible(&self, frame_id: FrameId);

    /// Removes and returns the next frame to reuse, if any.
    fn select_victim(&self) -> Option<FrameId>;

    /// Drops every trace of the frame, eligible or not.
    fn forget(&self, frame_id: FrameId);

    fn is_eligible(&self, frame_id: FrameId) -> bool;

    /// The number of frames that can be evicted
    fn size(&self) -> usize;
}
