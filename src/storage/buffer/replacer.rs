use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::storage::page::FrameId;

use super::Replacer;

/// Sort key of a frame during victim selection. The smallest candidate is
/// evicted first.
#[derive(Debug, Eq, PartialEq)]
struct EvictionCandidate {
    frame_id: FrameId,
    /// True while the frame has fewer than k recorded accesses, i.e. its
    /// backward k-distance is +inf.
    infinite: bool,
    /// Front of the bounded history: the first access for +inf frames, the
    /// k-th most recent access otherwise.
    oldest_tracked_at: usize,
    last_access_at: usize,
}

impl PartialOrd for EvictionCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EvictionCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // +inf frames go first (classical LRU on first access among them),
        // then the oldest k-th most recent access, then the oldest overall
        // recent access
        other
            .infinite
            .cmp(&self.infinite)
            .then_with(|| self.oldest_tracked_at.cmp(&other.oldest_tracked_at))
            .then_with(|| self.last_access_at.cmp(&other.last_access_at))
    }
}

struct LRUKNode {
    k: usize,
    frame_id: FrameId,
    is_evictable: bool,
    /// Timestamps of the most recent k accesses, least recent in front.
    /// While the frame has been seen fewer than k times the front is its
    /// first access.
    history: VecDeque<usize>,
}

impl LRUKNode {
    fn new(frame_id: FrameId, k: usize) -> Self {
        assert!(k > 0, "replacer k should be larger than zero");
        LRUKNode { history: VecDeque::with_capacity(k), k, frame_id, is_evictable: false }
    }

    fn record_access(&mut self, timestamp: usize) {
        if self.history.len() == self.k {
            self.history.pop_front();
        }
        self.history.push_back(timestamp)
    }

    fn candidate(&self) -> EvictionCandidate {
        // a node is created on its first access, the history is never empty
        let front = *self.history.front().unwrap();
        let back = *self.history.back().unwrap();
        EvictionCandidate {
            frame_id: self.frame_id,
            infinite: self.history.len() < self.k,
            oldest_tracked_at: front,
            last_access_at: back,
        }
    }
}

/// LRUKReplacer implements the LRU-k replacement policy.
///
/// The LRU-k algorithm evicts the frame whose backward k-distance is the
/// maximum over all evictable frames. Backward k-distance is the time
/// between now and the k-th most recent access, so the victim is the frame
/// with the oldest k-th most recent access. A frame seen fewer than k
/// times has +inf backward k-distance; when several frames are at +inf,
/// the classical LRU rule picks the one first accessed the longest ago.
pub struct LRUKReplacer {
    nodes: HashMap<FrameId, LRUKNode>,
    current_timestamp: usize,
    current_size: usize,
    replacer_size: usize,
    k: usize,
}

impl LRUKReplacer {
    pub fn new(k: usize, size: usize) -> Self {
        let nodes = HashMap::new();
        LRUKReplacer { nodes, current_timestamp: 0, current_size: 0, replacer_size: size, k }
    }

    /// Record the event that the given frame id is accessed at the current
    /// timestamp. Create a new non-evictable entry for the access history
    /// if the frame id has not been seen before; the replacer size is
    /// unchanged until set_evictable marks the frame.
    ///
    /// This is pure bookkeeping: it never evicts, whatever the occupancy.
    fn record_access(&mut self, frame_id: FrameId) {
        assert!(
            frame_id < self.replacer_size,
            "frame id {} out of range for a pool of {} frames",
            frame_id,
            self.replacer_size,
        );
        self.current_timestamp += 1;
        let (timestamp, k) = (self.current_timestamp, self.k);
        let node = self.nodes.entry(frame_id).or_insert_with(|| LRUKNode::new(frame_id, k));
        node.record_access(timestamp);
    }

    /// Find the evictable frame with the largest backward k-distance,
    /// remove it along with its access history and return it. Frames at
    /// +inf k-distance are preferred, oldest first access first; among the
    /// rest the oldest k-th most recent access wins.
    ///
    /// Return None if no frame is evictable.
    fn evict(&mut self) -> Option<FrameId> {
        if self.current_size == 0 {
            return None;
        }
        let victim = self
            .nodes
            .values()
            .filter(|node| node.is_evictable)
            .map(|node| node.candidate())
            .min()?;
        self.nodes.remove(&victim.frame_id);
        self.current_size -= 1;
        Some(victim.frame_id)
    }

    /// Toggle whether a frame is evictable or non-evictable, adjusting the
    /// replacer size on an effective transition. Unknown frames and
    /// repeated settings are ignored.
    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let Some(node) = self.nodes.get_mut(&frame_id) else { return };
        if node.is_evictable == evictable {
            return;
        }
        node.is_evictable = evictable;
        if evictable {
            self.current_size += 1;
        } else {
            self.current_size -= 1;
        }
    }

    /// Check if a frame is evictable. If the frame is not found, return
    /// true.
    fn is_evictable(&self, frame_id: FrameId) -> bool {
        match self.nodes.get(&frame_id) {
            Some(node) => node.is_evictable,
            None => true,
        }
    }

    /// Remove the specified frame and its access history no matter what
    /// its backward k-distance is. Unknown frames are ignored. Removing a
    /// frame that is not evictable violates the caller contract and
    /// panics.
    fn remove(&mut self, frame_id: FrameId) {
        let Some(node) = self.nodes.get(&frame_id) else { return };
        assert!(node.is_evictable, "remove called on pinned frame {}", frame_id);
        self.nodes.remove(&frame_id);
        self.current_size -= 1;
    }

    fn size(&self) -> usize {
        self.current_size
    }
}

/// SyncLRUKReplacer is the thread-safe version of the LRU-k replacement
/// policy, all the heavy lifting happens in the LRUKReplacer.
pub struct SyncLRUKReplacer {
    inner: Mutex<LRUKReplacer>,
}

impl SyncLRUKReplacer {
    pub fn new(k: usize, size: usize) -> Self {
        let inner = Mutex::new(LRUKReplacer::new(k, size));
        SyncLRUKReplacer { inner }
    }
}

impl Replacer for SyncLRUKReplacer {
    fn record_access(&self, frame_id: FrameId) {
        let mut guard = self.inner.lock().unwrap();
        guard.record_access(frame_id)
    }

    fn evict(&self) -> Option<FrameId> {
        let mut guard = self.inner.lock().unwrap();
        guard.evict()
    }

    fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut guard = self.inner.lock().unwrap();
        guard.set_evictable(frame_id, evictable)
    }

    fn is_evictable(&self, frame_id: FrameId) -> bool {
        let guard = self.inner.lock().unwrap();
        guard.is_evictable(frame_id)
    }

    fn remove(&self, frame_id: FrameId) {
        let mut guard = self.inner.lock().unwrap();
        guard.remove(frame_id)
    }

    fn size(&self) -> usize {
        let guard = self.inner.lock().unwrap();
        guard.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_ordering() {
        let mut arr = [
            EvictionCandidate { frame_id: 1, infinite: false, oldest_tracked_at: 5, last_access_at: 10 },
            EvictionCandidate { frame_id: 2, infinite: false, oldest_tracked_at: 5, last_access_at: 7 },
            EvictionCandidate { frame_id: 3, infinite: false, oldest_tracked_at: 9, last_access_at: 9 },
            EvictionCandidate { frame_id: 4, infinite: false, oldest_tracked_at: 2, last_access_at: 11 },
            EvictionCandidate { frame_id: 5, infinite: true, oldest_tracked_at: 5, last_access_at: 5 },
            EvictionCandidate { frame_id: 6, infinite: true, oldest_tracked_at: 3, last_access_at: 3 },
        ];

        arr.sort();

        let ids = arr.iter().map(|c| c.frame_id).collect::<Vec<_>>();
        // +inf frames first by first access, then finite frames by k-th
        // most recent access, ties by last access
        assert_eq!(vec![6, 5, 4, 2, 1, 3], ids);
    }

    #[test]
    fn test_lruk_node_history() {
        let mut node = LRUKNode::new(1, 2);

        node.record_access(1);
        let c = node.candidate();
        assert!(c.infinite);
        assert_eq!(1, c.oldest_tracked_at);
        assert_eq!(1, c.last_access_at);

        node.record_access(2);
        let c = node.candidate();
        assert!(!c.infinite);
        assert_eq!(1, c.oldest_tracked_at);
        assert_eq!(2, c.last_access_at);

        // only the two most recent accesses are tracked
        node.record_access(5);
        let c = node.candidate();
        assert!(!c.infinite);
        assert_eq!(2, c.oldest_tracked_at);
        assert_eq!(5, c.last_access_at);
    }

    #[test]
    fn test_new_frames_start_non_evictable() {
        let mut replacer = LRUKReplacer::new(2, 4);
        replacer.record_access(0);
        replacer.record_access(1);
        assert_eq!(0, replacer.size());
        assert_eq!(None, replacer.evict());

        replacer.set_evictable(0, true);
        assert_eq!(1, replacer.size());
        assert_eq!(Some(0), replacer.evict());
    }

    #[test]
    fn test_history_frames_evict_fifo() {
        let mut replacer = LRUKReplacer::new(2, 4);

        // a and b both have a single access; the earlier first access wins
        replacer.record_access(0);
        replacer.record_access(1);
        replacer.set_evictable(0, true);
        replacer.set_evictable(1, true);
        assert_eq!(Some(0), replacer.evict());
        assert_eq!(Some(1), replacer.evict());
    }

    #[test]
    fn test_infinite_distance_beats_recent_frames() {
        let mut replacer = LRUKReplacer::new(2, 4);

        // frames 1 and 2 reach k accesses, frame 0 does not; however
        // recently 1 and 2 were touched, 0 is the victim
        replacer.record_access(0);
        replacer.record_access(1);
        replacer.record_access(1);
        replacer.record_access(2);
        replacer.record_access(2);
        replacer.set_evictable(0, true);
        replacer.set_evictable(1, true);
        replacer.set_evictable(2, true);
        assert_eq!(Some(0), replacer.evict());
        // among the frames with full history the oldest k-th most recent access wins
        assert_eq!(Some(1), replacer.evict());
        assert_eq!(Some(2), replacer.evict());
    }

    #[test]
    fn test_eviction_forgets_history() {
        let mut replacer = LRUKReplacer::new(2, 4);
        replacer.record_access(0);
        replacer.record_access(0);
        replacer.set_evictable(0, true);
        assert_eq!(Some(0), replacer.evict());

        // the frame comes back as a fresh +inf entry
        replacer.record_access(1);
        replacer.record_access(1);
        replacer.record_access(0);
        replacer.set_evictable(0, true);
        replacer.set_evictable(1, true);
        assert_eq!(Some(0), replacer.evict());
    }

    #[test]
    fn test_lruk_replacer() {
        let mut replacer = LRUKReplacer::new(2, 7);

        // Scenario: add six frames to the replacer, mark the first five
        // evictable. We have evictable frames [1,2,3,4,5].
        replacer.record_access(1);
        replacer.record_access(2);
        replacer.record_access(3);
        replacer.record_access(4);
        replacer.record_access(5);
        replacer.record_access(6);
        replacer.set_evictable(1, true);
        replacer.set_evictable(2, true);
        replacer.set_evictable(3, true);
        replacer.set_evictable(4, true);
        replacer.set_evictable(5, true);
        replacer.set_evictable(6, false);
        assert_eq!(5, replacer.size());

        // Scenario: a second access gives frame 1 a finite k-distance.
        // All other evictable frames are at +inf, so the eviction order is
        // [2,3,4,5,1].
        replacer.record_access(1);

        // Scenario: evict three frames; the +inf ones go first, FIFO.
        assert_eq!(Some(2), replacer.evict());
        assert_eq!(Some(3), replacer.evict());
        assert_eq!(Some(4), replacer.evict());
        assert_eq!(2, replacer.size());

        // Scenario: reinsert 3 and 4 (their history was forgotten), give 5
        // a second access. Now the expected order is [3,1,5,4].
        replacer.record_access(3);
        replacer.record_access(4);
        replacer.record_access(5);
        replacer.record_access(4);
        replacer.set_evictable(3, true);
        replacer.set_evictable(4, true);
        assert_eq!(4, replacer.size());

        // Scenario: 3 is the only +inf evictable frame, it goes first.
        assert_eq!(Some(3), replacer.evict());
        assert_eq!(3, replacer.size());

        // Scenario: making 6 evictable puts it at the head, it is at +inf
        // with the earliest first access.
        replacer.set_evictable(6, true);
        assert_eq!(4, replacer.size());
        assert_eq!(Some(6), replacer.evict());
        assert_eq!(3, replacer.size());

        // Scenario: pin 1; of [5,4] the older k-th access is 5's.
        replacer.set_evictable(1, false);
        assert_eq!(2, replacer.size());
        assert_eq!(Some(5), replacer.evict());
        assert_eq!(1, replacer.size());

        // Scenario: touch 1 twice; its k-th most recent access is now
        // fresher than 4's, so 4 goes first.
        replacer.record_access(1);
        replacer.record_access(1);
        replacer.set_evictable(1, true);
        assert_eq!(2, replacer.size());
        assert_eq!(Some(4), replacer.evict());

        assert_eq!(1, replacer.size());
        assert_eq!(Some(1), replacer.evict());
        assert_eq!(0, replacer.size());

        // Scenario: an empty replacer neither evicts nor changes size on
        // removal of unknown frames.
        assert_eq!(None, replacer.evict());
        assert_eq!(0, replacer.size());
        replacer.remove(1);
        assert_eq!(0, replacer.size());
    }

    #[test]
    fn test_remove_drops_history() {
        let mut replacer = LRUKReplacer::new(2, 4);
        replacer.record_access(0);
        replacer.record_access(1);
        replacer.set_evictable(0, true);
        replacer.set_evictable(1, true);

        // removing 0 out of policy order leaves 1 as the next victim
        replacer.remove(0);
        assert_eq!(1, replacer.size());
        assert_eq!(Some(1), replacer.evict());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_record_access_out_of_range() {
        let mut replacer = LRUKReplacer::new(2, 4);
        replacer.record_access(4);
    }

    #[test]
    #[should_panic(expected = "pinned frame")]
    fn test_remove_pinned_frame() {
        let mut replacer = LRUKReplacer::new(2, 4);
        replacer.record_access(0);
        replacer.remove(0);
    }

    #[test]
    fn test_sync_replacer() {
        let replacer = SyncLRUKReplacer::new(2, 4);
        replacer.record_access(0);
        assert!(!replacer.is_evictable(0));
        replacer.set_evictable(0, true);
        assert!(replacer.is_evictable(0));
        assert_eq!(1, replacer.size());
        assert_eq!(Some(0), replacer.evict());
        assert_eq!(0, replacer.size());
    }
}
