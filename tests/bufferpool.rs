use std::sync::Arc;
use std::thread;

use bufpool::config::Config;
use bufpool::error::Result;
use bufpool::storage::buffer::bufferpool::BufferPoolManager;
use bufpool::storage::disk::{new_disk_manager, DiskType};
use bufpool::storage::page::PageId;

macro_rules! setup {
    ($name:ident, $pool:expr, $k:expr) => {
        let _ = env_logger::builder().is_test(true).try_init();
        let disk = new_disk_manager(DiskType::Memory, "")?;
        let $name = BufferPoolManager::new(disk, $pool, $k);
    };
}

#[test]
fn test_write_survives_eviction() -> Result<()> {
    setup!(bpm, 3, 2);

    // pin pages 0,1,2 and stamp each with a marker byte
    let mut ids = vec![];
    for i in 0..3u8 {
        let page = bpm.new_page()?.expect("free frame");
        let mut guard = page.write()?;
        guard.data[0] = b'A' + i;
        ids.push(guard.id);
        drop(guard);
    }
    assert!(bpm.new_page()?.is_none());
    for &id in &ids {
        assert!(bpm.unpin_page(id, true)?);
    }

    // churn every frame: three more pages push 0,1,2 out through the disk
    for _ in 0..3 {
        let page = bpm.new_page()?.expect("evictable frame");
        let id = page.read()?.id;
        assert!(bpm.unpin_page(id, false)?);
    }

    // the markers come back from disk
    for (i, &id) in ids.iter().enumerate() {
        let page = bpm.fetch_page(id)?.expect("page on disk");
        assert_eq!(b'A' + i as u8, page.read()?.data[0]);
        assert!(bpm.unpin_page(id, false)?);
    }

    Ok(())
}

#[test]
fn test_file_backed_pool_persists_across_instances() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().map_err(bufpool::error::Error::internal)?;
    let path = dir.path().join("bufpool.db");
    let path = path.to_str().expect("utf-8 temp path");

    let mut ids: Vec<PageId> = vec![];
    {
        let disk = new_disk_manager(DiskType::File, path)?;
        let bpm = BufferPoolManager::new(disk, 4, 2);
        for i in 0..4u8 {
            let page = bpm.new_page()?.expect("free frame");
            let mut guard = page.write()?;
            guard.data[0] = i;
            guard.data[100] = 0xee;
            ids.push(guard.id);
            drop(guard);
            assert!(bpm.unpin_page(ids[i as usize], true)?);
        }
        bpm.flush_all_pages()?;
    }

    // a fresh pool over the same file sees the flushed pages
    let disk = new_disk_manager(DiskType::File, path)?;
    let bpm = BufferPoolManager::new(disk, 2, 2);
    for (i, &id) in ids.iter().enumerate() {
        let page = bpm.fetch_page(id)?.expect("persisted page");
        let guard = page.read()?;
        assert_eq!(i as u8, guard.data[0]);
        assert_eq!(0xee, guard.data[100]);
        drop(guard);
        assert!(bpm.unpin_page(id, false)?);
    }

    Ok(())
}

#[test]
fn test_pool_from_default_config() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let cfg = Config::new("")?;
    let bpm = BufferPoolManager::from_config(&cfg)?;

    let page = bpm.new_page()?.expect("fresh pool");
    let id = page.read()?.id;
    page.write()?.data[42] = 0x42;
    assert!(bpm.unpin_page(id, true)?);

    let page = bpm.fetch_page(id)?.expect("resident page");
    assert_eq!(0x42, page.read()?.data[42]);
    assert!(bpm.unpin_page(id, false)?);
    assert!(bpm.delete_page(id)?);

    Ok(())
}

#[test]
fn test_concurrent_pin_unpin() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let disk = new_disk_manager(DiskType::Memory, "")?;
    let bpm = Arc::new(BufferPoolManager::new(disk, 8, 2));

    // four writers each create two pages, stamp them with their page id
    // and release them
    let mut handles = vec![];
    for _ in 0..4 {
        let bpm = Arc::clone(&bpm);
        handles.push(thread::spawn(move || {
            for _ in 0..2 {
                let page = bpm.new_page().unwrap().expect("pool has room for all");
                let mut guard = page.write().unwrap();
                let id = guard.id;
                guard.data[0] = id as u8;
                drop(guard);
                assert!(bpm.unpin_page(id, true).unwrap());
            }
        }));
    }
    for handle in handles {
        handle.join().expect("writer thread");
    }

    // all eight pages are resident and carry their markers
    for id in 0..8 {
        let page = bpm.fetch_page(id)?.expect("resident page");
        let guard = page.read()?;
        assert_eq!(id as u8, guard.data[0]);
        assert_eq!(1, guard.pin_count);
        drop(guard);
        assert!(bpm.unpin_page(id, false)?);
    }

    Ok(())
}
