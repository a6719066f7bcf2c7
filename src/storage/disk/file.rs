use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::warn;

use crate::error::Result;
use crate::storage::page::{PageId, PAGE_SIZE};

use super::DiskManager;

/// A single-file page store. Page `i` lives at byte offset `i * PAGE_SIZE`.
#[derive(Debug)]
pub struct FileDisk {
    file: File,
}

impl FileDisk {
    pub fn open(path: impl AsRef<Path>) -> Result<FileDisk> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        Ok(FileDisk { file })
    }

    fn offset(page_id: PageId) -> u64 {
        page_id as u64 * PAGE_SIZE as u64
    }
}

impl DiskManager for FileDisk {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        let offset = Self::offset(page_id);
        if offset >= self.file.metadata()?.len() {
            buf.fill(0);
            return Ok(());
        }
        self.file.seek(SeekFrom::Start(offset))?;
        let n = self.file.read(buf)?;
        if n < buf.len() {
            // page at the tail of the file written by a shorter run
            warn!("read {} bytes of page {}, zero-filling the rest", n, page_id);
            buf[n..].fill(0);
        }
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        self.file.write_all(buf)?;
        self.file.sync_data()?;
        Ok(())
    }

    fn deallocate_page(&mut self, _page_id: PageId) -> Result<()> {
        // the file backend never reclaims page slots
        Ok(())
    }
}
