use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::Result;

use crate::error::EngineError;
use crate::page::PAGE_SIZE;

/// Pages 0..3 are reserved for the system catalog; user pages start here.
pub const FIRST_USABLE_PAGE_ID: u32 = 3;

pub struct DiskManager {
    file: File,
    page_count: u32,
    next_page_id: u32,
}

impl DiskManager {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| EngineError::Io(format!("failed to open {}: {e}", path.display())))?;

        let len = file.metadata()?.len();
        let page_count = (len / PAGE_SIZE as u64) as u32;
        // Never hand out the reserved system page ids.
        let next_page_id = page_count.max(FIRST_USABLE_PAGE_ID);

        Ok(DiskManager {
            file,
            page_count,
            next_page_id,
        })
    }

    pub fn read_page(&mut self, page_id: u32, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let offset = (page_id as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file
            .read_exact(buf)
            .map_err(|e| EngineError::Io(format!("short read of page {page_id}: {e}")))?;
        Ok(())
    }

    pub fn write_page(&mut self, page_id: u32, data: &[u8; PAGE_SIZE]) -> Result<()> {
        let offset = (page_id as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file
            .write_all(data)
            .map_err(|e| EngineError::Io(format!("failed to write page {page_id}: {e}")))?;
        // Force policy: every page write reaches the disk before we go on.
        self.file
            .sync_all()
            .map_err(|e| EngineError::Io(format!("failed to sync page {page_id}: {e}")))?;
        self.page_count = self.page_count.max(page_id + 1);
        Ok(())
    }

    pub fn allocate_page(&mut self) -> u32 {
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        page_id
    }

    /// Deallocation is a logical flag only; page ids are never reused.
    pub fn deallocate_page(&mut self, _page_id: u32) {}

    pub fn page_count(&self) -> u32 {
        self.page_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (tempfile::TempDir, DiskManager) {
        let dir = tempfile::tempdir().unwrap();
        let dm = DiskManager::open(&dir.path().join("test.db")).unwrap();
        (dir, dm)
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (_dir, mut dm) = temp_db();
        let mut page = [0u8; PAGE_SIZE];
        page[0] = 0xAB;
        page[PAGE_SIZE - 1] = 0xCD;
        dm.write_page(0, &page).unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        dm.read_page(0, &mut buf).unwrap();
        assert_eq!(buf[0], 0xAB);
        assert_eq!(buf[PAGE_SIZE - 1], 0xCD);
    }

    #[test]
    fn test_allocate_starts_past_system_pages() {
        let (_dir, mut dm) = temp_db();
        assert_eq!(dm.allocate_page(), FIRST_USABLE_PAGE_ID);
        assert_eq!(dm.allocate_page(), FIRST_USABLE_PAGE_ID + 1);
    }

    #[test]
    fn test_page_count_tracks_extent() {
        let (_dir, mut dm) = temp_db();
        assert_eq!(dm.page_count(), 0);
        let page = [0u8; PAGE_SIZE];
        dm.write_page(4, &page).unwrap();
        assert_eq!(dm.page_count(), 5);
    }

    #[test]
    fn test_short_read_is_an_error() {
        let (_dir, mut dm) = temp_db();
        let mut buf = [0u8; PAGE_SIZE];
        assert!(dm.read_page(7, &mut buf).is_err());
    }

    #[test]
    fn test_reopen_resumes_allocation_after_extent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let mut dm = DiskManager::open(&path).unwrap();
            let page = [0u8; PAGE_SIZE];
            for id in 0..5 {
                dm.write_page(id, &page).unwrap();
            }
        }
        let mut dm = DiskManager::open(&path).unwrap();
        assert_eq!(dm.page_count(), 5);
        assert_eq!(dm.allocate_page(), 5);
    }
}
