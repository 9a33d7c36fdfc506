use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{bail, Result};
use indexmap::IndexSet;

use crate::disk::DiskManager;
use crate::error::EngineError;
use crate::page::{Page, PageType, INVALID_PAGE_ID, PAGE_SIZE};

pub const BUFFER_POOL_SIZE: usize = 128;

pub type PageRef = Arc<RwLock<Page>>;

// Replacer trait for page replacement policies
pub trait Replacer {
    // Coldest page, the next eviction victim
    fn victim(&self) -> Option<u32>;
    // Mark a page as most recently used
    fn touch(&mut self, page_id: u32);
    // Forget a page that left the pool
    fn remove(&mut self, page_id: u32);
}

pub struct LruReplacer {
    order: IndexSet<u32>, // insertion order, O(1) move-to-back
}

impl LruReplacer {
    pub fn new() -> Self {
        LruReplacer {
            order: IndexSet::new(),
        }
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Replacer for LruReplacer {
    fn victim(&self) -> Option<u32> {
        self.order.first().copied()
    }

    fn touch(&mut self, page_id: u32) {
        self.order.shift_remove(&page_id);
        self.order.insert(page_id);
    }

    fn remove(&mut self, page_id: u32) {
        self.order.shift_remove(&page_id);
    }
}

pub struct BufferPoolManager {
    frames: HashMap<u32, PageRef>, // page_id -> resident frame
    disk: DiskManager,
    replacer: LruReplacer,
    capacity: usize,
}

impl BufferPoolManager {
    pub fn new(disk: DiskManager) -> Self {
        Self::with_capacity(disk, BUFFER_POOL_SIZE)
    }

    pub fn with_capacity(disk: DiskManager, capacity: usize) -> Self {
        BufferPoolManager {
            frames: HashMap::new(),
            disk,
            replacer: LruReplacer::new(),
            capacity,
        }
    }

    pub fn page_count(&self) -> u32 {
        self.disk.page_count()
    }

    /// Resident pages are refreshed in the recency list; misses fault the
    /// page in, evicting the coldest frame when the pool is full.
    /// `INVALID_PAGE_ID` and ids past the file extent yield `None`, never
    /// an error.
    pub fn fetch_page(&mut self, page_id: u32) -> Result<Option<PageRef>> {
        if page_id == INVALID_PAGE_ID {
            return Ok(None);
        }
        if let Some(page) = self.frames.get(&page_id) {
            let page = Arc::clone(page);
            self.replacer.touch(page_id);
            return Ok(Some(page));
        }
        if page_id >= self.disk.page_count() {
            return Ok(None);
        }

        self.make_room()?;

        let mut buf = [0u8; PAGE_SIZE];
        self.disk.read_page(page_id, &mut buf)?;
        let page = Arc::new(RwLock::new(Page::from_bytes(&buf)));
        self.frames.insert(page_id, Arc::clone(&page));
        self.replacer.touch(page_id);
        Ok(Some(page))
    }

    /// Allocate a fresh table page and write it through to disk.
    pub fn new_page(&mut self) -> Result<(u32, PageRef)> {
        let page_id = self.disk.allocate_page();
        self.install_fresh(page_id)
    }

    /// Same as `new_page` but at a caller-chosen id. Only the catalog
    /// bootstrap uses this, for the reserved system pages.
    pub fn new_page_at(&mut self, page_id: u32) -> Result<(u32, PageRef)> {
        self.install_fresh(page_id)
    }

    fn install_fresh(&mut self, page_id: u32) -> Result<(u32, PageRef)> {
        self.make_room()?;

        let page = Page::new(page_id, PageType::Table);
        self.disk.write_page(page_id, &page.data)?;
        let page = Arc::new(RwLock::new(page));
        self.frames.insert(page_id, Arc::clone(&page));
        self.replacer.touch(page_id);
        Ok((page_id, page))
    }

    fn make_room(&mut self) -> Result<()> {
        if self.frames.len() < self.capacity {
            return Ok(());
        }
        let victim = match self.replacer.victim() {
            Some(page_id) => page_id,
            None => bail!(EngineError::Internal(
                "buffer pool is full and has no evictable frame".to_string()
            )),
        };
        self.evict(victim)
    }

    fn evict(&mut self, page_id: u32) -> Result<()> {
        if let Some(page) = self.frames.remove(&page_id) {
            self.replacer.remove(page_id);
            let mut guard = page.write().unwrap();
            if guard.is_dirty() {
                println!("[BufferPool] evicting dirty page {page_id}");
                guard.set_dirty(false);
                self.disk.write_page(page_id, &guard.data)?;
            }
        }
        Ok(())
    }

    /// No pin count is tracked; the only effect is recording dirtiness.
    /// The name is kept for the release-on-every-path discipline it marks.
    pub fn unpin_page(&mut self, page_id: u32, is_dirty: bool) -> Result<()> {
        match self.frames.get(&page_id) {
            Some(page) => {
                if is_dirty {
                    page.write().unwrap().set_dirty(true);
                }
                Ok(())
            }
            None => bail!(EngineError::NotFound(format!(
                "page {page_id} is not in the buffer pool"
            ))),
        }
    }

    pub fn flush_page(&mut self, page_id: u32) -> Result<()> {
        if let Some(page) = self.frames.get(&page_id) {
            let mut guard = page.write().unwrap();
            if guard.is_dirty() {
                guard.set_dirty(false);
                self.disk.write_page(page_id, &guard.data)?;
            }
        }
        Ok(())
    }

    pub fn flush_all(&mut self) -> Result<()> {
        let page_ids: Vec<u32> = self.frames.keys().copied().collect();
        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    pub fn delete_page(&mut self, page_id: u32) -> Result<()> {
        self.frames.remove(&page_id);
        self.replacer.remove(page_id);
        self.disk.deallocate_page(page_id);
        Ok(())
    }
}

impl Drop for BufferPoolManager {
    fn drop(&mut self) {
        // Best-effort write-back on teardown.
        let _ = self.flush_all();
    }
}
