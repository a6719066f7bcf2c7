use std::collections::BTreeMap;

use crate::error::Result;
use crate::storage::page::{PageId, PAGE_SIZE};

use super::DiskManager;

/// An in-memory page store backed by a BTreeMap, mainly for testing.
#[derive(Debug)]
pub struct MemoryDisk {
    pages: BTreeMap<PageId, Box<[u8; PAGE_SIZE]>>,
}

impl MemoryDisk {
    pub fn new() -> MemoryDisk {
        MemoryDisk { pages: BTreeMap::new() }
    }
}

impl DiskManager for MemoryDisk {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        let buf: &mut [u8; PAGE_SIZE] = buf.try_into()?;
        match self.pages.get(&page_id) {
            Some(data) => buf.copy_from_slice(&data[..]),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> Result<()> {
        let data: [u8; PAGE_SIZE] = buf.try_into()?;
        self.pages.insert(page_id, Box::new(data));
        Ok(())
    }

    fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        self.pages.remove(&page_id);
        Ok(())
    }
}
