use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::config::Config;
use crate::error::Result;
use crate::storage::disk::{new_disk_manager, DiskManager};
use crate::storage::hash::extendible::SyncExtendibleHashTable;
use crate::storage::hash::HashTable;
use crate::storage::page::{FrameId, Page, PageData, PageId, INVALID_PAGE_ID};

use super::replacer::SyncLRUKReplacer;
use super::Replacer;

/// Capacity of a page table bucket when none is configured.
const DEFAULT_BUCKET_SIZE: usize = 4;

/// The buffer pool is responsible for moving physical pages back and forth
/// between main memory and disk, letting the system operate on databases
/// larger than the memory available to it.
///
/// Its operation is transparent to the rest of the system: callers ask for
/// a page by its unique identifier (page_id) without knowing whether the
/// page is already resident or has to be fetched from disk.
struct BufferPool {
    pool_size: usize,
    /// Persistence backend the pages move through.
    disk: Box<dyn DiskManager>,
    /// The frame array. The vector index is the FrameId, in
    /// [0, pool_size).
    pages: Vec<Arc<Page>>,
    /// Page table mapping resident page ids to their frames; grows by
    /// bucket splitting as the pool churns.
    page_table: Arc<dyn HashTable<PageId, FrameId>>,
    /// Frames known to hold no page. A frame is here or in the page
    /// table, never both.
    free_list: VecDeque<FrameId>,
    /// Replacer picking the victim among unpinned frames.
    replacer: Arc<dyn Replacer>,
    /// The next page id to be allocated, monotonically increasing.
    next_page_id: AtomicI64,
}

impl BufferPool {
    fn new(
        disk: Box<dyn DiskManager>,
        pool_size: usize,
        replacer_k: usize,
        bucket_size: usize,
    ) -> Self {
        let mut pages = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        for i in 0..pool_size {
            pages.push(Arc::new(Page::new()));
            // initially, every frame is free
            free_list.push_back(i);
        }
        let page_table: Arc<dyn HashTable<PageId, FrameId>> =
            Arc::new(SyncExtendibleHashTable::<PageId, FrameId>::new(bucket_size));
        let replacer: Arc<dyn Replacer> = Arc::new(SyncLRUKReplacer::new(replacer_k, pool_size));
        BufferPool {
            pool_size,
            disk,
            pages,
            page_table,
            free_list,
            replacer,
            next_page_id: AtomicI64::new(0),
        }
    }

    /// Create a new page in the buffer pool, returning None if every frame
    /// is in use and pinned.
    ///
    /// The replacement frame comes from the free list when one is
    /// available, otherwise from the replacer. A dirty occupant is written
    /// back before the frame is reused, and its page table entry is
    /// removed before the new page id is inserted. The page comes back
    /// zero-filled, pinned once and registered non-evictable with the
    /// replacer.
    fn new_page(&mut self) -> Result<Option<Arc<Page>>> {
        let frame_id = match self.available_frame() {
            Some(frame_id) => frame_id,
            None => return Ok(None),
        };
        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        self.evict_occupant(&mut guard)?;

        let page_id = self.allocate_page();
        self.page_table.insert(page_id, frame_id);
        guard.id = page_id;
        guard.pin_count = 1;
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);

        drop(guard);
        Ok(Some(page))
    }

    /// Fetch the page with the given page id, returning None if the page
    /// is not resident and every frame is in use and pinned.
    ///
    /// A resident page is pinned and returned directly. Otherwise a frame
    /// is acquired the same way new_page acquires one, the page content is
    /// read from disk into it and the page is registered in the page table
    /// and the replacer.
    fn fetch_page(&mut self, page_id: PageId) -> Result<Option<Arc<Page>>> {
        if let Some(frame_id) = self.page_table.find(&page_id) {
            let page = Arc::clone(&self.pages[frame_id]);
            let mut guard = page.write()?;
            guard.pin_count += 1;
            self.replacer.record_access(frame_id);
            self.replacer.set_evictable(frame_id, false);

            drop(guard);
            return Ok(Some(page));
        }

        let frame_id = match self.available_frame() {
            Some(frame_id) => frame_id,
            None => return Ok(None),
        };
        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        self.evict_occupant(&mut guard)?;

        self.disk.read_page(page_id, &mut guard.data[..])?;
        guard.id = page_id;
        guard.pin_count = 1;
        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);

        drop(guard);
        Ok(Some(page))
    }

    /// Unpin the page once. Return false if the page is not resident or
    /// its pin count is already zero.
    ///
    /// The dirty flag is sticky: unpinning clean never clears a dirty bit
    /// set earlier. When the pin count drops to zero the frame becomes a
    /// candidate for eviction.
    fn unpin_page(&mut self, page_id: PageId, is_dirty: bool) -> Result<bool> {
        let frame_id = match self.page_table.find(&page_id) {
            Some(frame_id) => frame_id,
            None => return Ok(false),
        };
        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        if guard.pin_count == 0 {
            return Ok(false);
        }
        guard.pin_count -= 1;
        guard.is_dirty |= is_dirty;
        if guard.pin_count == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        Ok(true)
    }

    /// Write the page to disk regardless of its dirty flag and mark it
    /// clean. Return false for the invalid page id and for pages that are
    /// not resident.
    fn flush_page(&mut self, page_id: PageId) -> Result<bool> {
        if page_id == INVALID_PAGE_ID {
            return Ok(false);
        }
        let frame_id = match self.page_table.find(&page_id) {
            Some(frame_id) => frame_id,
            None => return Ok(false),
        };
        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        self.disk.write_page(guard.id, &guard.data[..])?;
        guard.is_dirty = false;
        Ok(true)
    }

    /// Write every resident page to disk, skipping frames that hold no
    /// page.
    fn flush_all_pages(&mut self) -> Result<()> {
        for frame_id in 0..self.pages.len() {
            let page = Arc::clone(&self.pages[frame_id]);
            let mut guard = page.write()?;
            if guard.id == INVALID_PAGE_ID {
                continue;
            }
            self.disk.write_page(guard.id, &guard.data[..])?;
            guard.is_dirty = false;
        }
        Ok(())
    }

    /// Delete a resident page, freeing its frame. A page that is not
    /// resident needs nothing done and reports true; a pinned page cannot
    /// be deleted and reports false.
    fn delete_page(&mut self, page_id: PageId) -> Result<bool> {
        let frame_id = match self.page_table.find(&page_id) {
            Some(frame_id) => frame_id,
            None => return Ok(true),
        };
        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        if guard.pin_count > 0 {
            return Ok(false);
        }
        debug_assert!(self.replacer.is_evictable(frame_id));

        self.page_table.remove(&page_id);
        self.replacer.remove(frame_id);
        self.free_list.push_back(frame_id);
        guard.reset();
        self.disk.deallocate_page(page_id)?;
        Ok(true)
    }

    /// Pop a free frame, falling back to evicting one.
    fn available_frame(&mut self) -> Option<FrameId> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Some(frame_id);
        }
        self.replacer.evict()
    }

    /// Prepare an acquired frame for reuse: write the occupant back when
    /// dirty, unlink it from the page table and reset the frame to the
    /// zeroed free state. Write-back happens strictly before the bytes are
    /// touched, and the stale page table entry is gone before the caller
    /// inserts the new one.
    fn evict_occupant(&mut self, frame: &mut PageData) -> Result<()> {
        if frame.id != INVALID_PAGE_ID {
            if frame.is_dirty {
                debug!("writing back dirty page {} before frame reuse", frame.id);
                self.disk.write_page(frame.id, &frame.data[..])?;
            }
            self.page_table.remove(&frame.id);
        }
        frame.reset();
        Ok(())
    }

    fn allocate_page(&self) -> PageId {
        self.next_page_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Buffer pool manager wraps the buffer pool with a mutex for concurrent
/// access, basically all the heavy lifting happens in the buffer pool.
///
/// Callers are required to balance every successful new_page/fetch_page
/// with exactly one unpin_page; a page whose pins never drop to zero keeps
/// its frame out of reach of the replacer forever.
pub struct BufferPoolManager {
    pool_size: usize,
    /// The actual buffer pool protected by a mutex latch.
    inner: Arc<Mutex<BufferPool>>,
}

impl BufferPoolManager {
    pub fn new(disk: Box<dyn DiskManager>, pool_size: usize, replacer_k: usize) -> Self {
        Self::with_bucket_size(disk, pool_size, replacer_k, DEFAULT_BUCKET_SIZE)
    }

    pub fn with_bucket_size(
        disk: Box<dyn DiskManager>,
        pool_size: usize,
        replacer_k: usize,
        bucket_size: usize,
    ) -> Self {
        let inner = BufferPool::new(disk, pool_size, replacer_k, bucket_size);
        BufferPoolManager { pool_size, inner: Arc::new(Mutex::new(inner)) }
    }

    /// Wire a pool from a Config: backend, pool size, replacer depth and
    /// page table bucket size all come from it.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let disk = new_disk_manager(cfg.disk_type, &cfg.path)?;
        Ok(Self::with_bucket_size(disk, cfg.pool_size, cfg.replacer_k, cfg.bucket_size))
    }

    /// Create a new page in the buffer pool. None if every frame is in use
    /// and pinned.
    pub fn new_page(&self) -> Result<Option<Arc<Page>>> {
        let mut inner = self.inner.lock()?;
        inner.new_page()
    }

    /// Fetch the page with the given page id. None if the page is not
    /// resident and no frame can be freed for it.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Option<Arc<Page>>> {
        let mut inner = self.inner.lock()?;
        inner.fetch_page(page_id)
    }

    /// Unpin the page once, marking it dirty if it was modified. False if
    /// the page is not resident or not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        inner.unpin_page(page_id, is_dirty)
    }

    /// Write the page to disk regardless of the dirty flag and mark it
    /// clean.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        inner.flush_page(page_id)
    }

    /// Write every resident page to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut inner = self.inner.lock()?;
        inner.flush_all_pages()
    }

    /// Delete a resident, unpinned page and free its frame.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        inner.delete_page(page_id)
    }

    /// Number of frames the pool owns.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }
}
