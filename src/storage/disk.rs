use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::page::PageId;

pub mod file;
pub mod memory;

/// A page-granular persistence backend. The buffer pool moves whole pages
/// through this interface and assumes both operations are synchronous:
/// write_page has persisted the page by the time it returns.
///
/// The trait is designed as trait object compatible so the pool can be
/// wired to any backend at construction time.
pub trait DiskManager: Debug + Send + Sync {
    /// Read the page into buf, filling exactly PAGE_SIZE bytes. A page
    /// that was never written reads back as zeroes.
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()>;

    /// Persist PAGE_SIZE bytes from buf as the page's content.
    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> Result<()>;

    /// Reclaim the page's backing storage. Called when the buffer pool
    /// deletes the page; backends are free to treat this as a no-op.
    fn deallocate_page(&mut self, page_id: PageId) -> Result<()>;
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskType {
    Memory,
    File,
}

pub fn new_disk_manager(typ: DiskType, path: &str) -> Result<Box<dyn DiskManager>> {
    match typ {
        DiskType::Memory => Ok(Box::new(memory::MemoryDisk::new())),
        DiskType::File => Ok(Box::new(file::FileDisk::open(path)?)),
    }
}
