use std::ops::Deref;
use std::sync::RwLock;

/// Size of a data page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Sentinel naming "no page". Frames carrying it hold garbage bytes.
pub const INVALID_PAGE_ID: PageId = -1;

pub type PageId = i64;

/// Index of a slot in the buffer pool's frame array, in `[0, pool_size)`.
pub type FrameId = usize;

/// The actual page data plus the in-memory bookkeeping the buffer pool
/// keeps per frame: the id of the resident page, the pin count and the
/// dirty bit.
pub struct PageData {
    pub id: PageId,
    pub data: Box<[u8; PAGE_SIZE]>,
    pub is_dirty: bool,
    pub pin_count: u32,
}

impl PageData {
    fn new() -> Self {
        Self {
            id: INVALID_PAGE_ID,
            data: Box::new([0; PAGE_SIZE]),
            is_dirty: false,
            pin_count: 0,
        }
    }

    /// Restore the free-frame state: no page, clean, unpinned, zeroed bytes.
    pub fn reset(&mut self) {
        self.id = INVALID_PAGE_ID;
        self.is_dirty = false;
        self.pin_count = 0;
        self.data.fill(0);
    }
}

/// Page acts as the container of the actual page data for providing
/// concurrent access protection.
pub struct Page {
    inner: RwLock<PageData>,
}

impl Page {
    /// Allocate an empty page frame of PAGE_SIZE bytes with the metadata
    /// initialized to the free-frame state.
    pub fn new() -> Self {
        Page { inner: RwLock::new(PageData::new()) }
    }
}

impl Deref for Page {
    type Target = RwLock<PageData>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
