use crate::storage::page::FrameId;

pub mod bufferpool;
pub mod replacer;

/// Replacer tracks frame usage and picks eviction victims when the buffer
/// pool is full. Only frames marked evictable are candidates; a frame's
/// evictability mirrors its pin count in the pool (pinned frames are never
/// victims).
pub trait Replacer: Send + Sync {
    /// Record that the frame was accessed at the current logical timestamp,
    /// creating its access history on first sight. A freshly seen frame
    /// starts out non-evictable. Panics on a frame id outside the pool.
    fn record_access(&self, frame_id: FrameId);

    /// Pick the victim with the largest backward k-distance among evictable
    /// frames, remove it together with its access history, and return it.
    /// None if nothing is evictable.
    fn evict(&self) -> Option<FrameId>;

    /// Toggle whether a frame may be evicted. Unknown frames are ignored;
    /// effective transitions adjust the replacer size.
    fn set_evictable(&self, frame_id: FrameId, evictable: bool);

    /// Whether the frame may currently be evicted. Unknown frames report
    /// true.
    fn is_evictable(&self, frame_id: FrameId) -> bool;

    /// Drop the given frame and its access history regardless of the
    /// eviction policy. Unknown frames are ignored; removing a
    /// non-evictable frame is a caller bug and panics.
    fn remove(&self, frame_id: FrameId);

    /// Number of evictable frames.
    fn size(&self) -> usize;
}
