use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};

use crate::buffer_pool::{BufferPoolManager, PageRef};
use crate::error::EngineError;
use crate::page::{PageType, INVALID_PAGE_ID};
use crate::tuple::{serialize_tuple, Schema, Tuple, Value};

// Row ID: page + slot. Stable unless an update grows the tuple, which
// re-inserts under a new RID and tombstones the old slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    pub page_id: u32,
    pub slot_id: u16,
}

/// One table's rows, stored as a linked list of slotted pages starting at
/// `first_page_id`. The heap owns no pages; it mediates buffer pool access.
pub struct TableHeap {
    bpm: Arc<Mutex<BufferPoolManager>>,
    schema: Schema,
    first_page_id: u32,
}

impl TableHeap {
    pub fn new(bpm: Arc<Mutex<BufferPoolManager>>, schema: Schema, first_page_id: u32) -> Self {
        TableHeap {
            bpm,
            schema,
            first_page_id,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn first_page_id(&self) -> u32 {
        self.first_page_id
    }

    fn fetch(&self, page_id: u32) -> Result<PageRef> {
        self.bpm
            .lock()
            .unwrap()
            .fetch_page(page_id)?
            .ok_or_else(|| anyhow!(EngineError::NotFound(format!("page {page_id} not found"))))
    }

    pub fn insert(&self, values: &[Value]) -> Result<Rid> {
        let tuple_data = serialize_tuple(values, &self.schema)?;
        self.insert_bytes(&tuple_data)
    }

    /// First-fit walk along the page chain; when no page has room, a fresh
    /// page is appended past the tail and linked in.
    pub fn insert_bytes(&self, tuple_data: &[u8]) -> Result<Rid> {
        let mut current_page_id = self.first_page_id;
        let mut last_page_id = current_page_id;

        while current_page_id != INVALID_PAGE_ID {
            let page_arc = self.fetch(current_page_id)?;
            let mut page = page_arc.write().unwrap();

            if let Ok(slot_id) = page.insert(tuple_data) {
                drop(page);
                self.bpm.lock().unwrap().unpin_page(current_page_id, true)?;
                return Ok(Rid {
                    page_id: current_page_id,
                    slot_id,
                });
            }

            last_page_id = current_page_id;
            current_page_id = page.next_page_id();
            drop(page);
            self.bpm.lock().unwrap().unpin_page(last_page_id, false)?;
        }

        let (new_page_id, new_page_arc) = self.bpm.lock().unwrap().new_page()?;
        let slot_id = {
            let mut new_page = new_page_arc.write().unwrap();
            new_page.set_prev_page_id(last_page_id);
            new_page.insert(tuple_data)?
        };
        self.bpm.lock().unwrap().unpin_page(new_page_id, true)?;

        let prev_arc = self.fetch(last_page_id)?;
        prev_arc.write().unwrap().set_next_page_id(new_page_id);
        self.bpm.lock().unwrap().unpin_page(last_page_id, true)?;

        Ok(Rid {
            page_id: new_page_id,
            slot_id,
        })
    }

    /// `None` for anything that is not a live tuple on a table page.
    pub fn get(&self, rid: Rid) -> Result<Option<Tuple>> {
        let page_arc = match self.bpm.lock().unwrap().fetch_page(rid.page_id)? {
            Some(p) => p,
            None => return Ok(None),
        };
        let page = page_arc.read().unwrap();
        let result = if page.page_type() != PageType::Table {
            None
        } else {
            page.get_tuple(rid.slot_id).map(Tuple::from_bytes)
        };
        drop(page);
        self.bpm.lock().unwrap().unpin_page(rid.page_id, false)?;
        Ok(result)
    }

    /// Same-size rows are overwritten in place and keep their RID. A row
    /// that changed size is re-inserted and the old slot tombstoned; if
    /// the tombstone fails the insert is not rolled back (no transactions).
    pub fn update(&self, values: &[Value], rid: Rid) -> Result<Rid> {
        let tuple_data = serialize_tuple(values, &self.schema)?;

        let page_arc = self.fetch(rid.page_id)?;
        let mut page = page_arc.write().unwrap();
        let existing_len = match page.get_tuple(rid.slot_id) {
            Some(t) => t.len(),
            None => {
                drop(page);
                self.bpm.lock().unwrap().unpin_page(rid.page_id, false)?;
                bail!(EngineError::NotFound(format!(
                    "no live tuple at page {} slot {}",
                    rid.page_id, rid.slot_id
                )));
            }
        };

        if existing_len == tuple_data.len() {
            page.update_tuple(rid.slot_id, &tuple_data)?;
            drop(page);
            self.bpm.lock().unwrap().unpin_page(rid.page_id, true)?;
            return Ok(rid);
        }

        drop(page);
        self.bpm.lock().unwrap().unpin_page(rid.page_id, false)?;

        let new_rid = self.insert_bytes(&tuple_data)?;
        self.delete(rid)?;
        Ok(new_rid)
    }

    pub fn delete(&self, rid: Rid) -> Result<()> {
        let page_arc = self.fetch(rid.page_id)?;
        let result = page_arc.write().unwrap().delete(rid.slot_id);
        self.bpm
            .lock()
            .unwrap()
            .unpin_page(rid.page_id, result.is_ok())?;
        result
    }

    /// Forward scan over live tuples: slot order within a page, then chain
    /// order. The terminal position is `(INVALID_PAGE_ID, 0)`.
    pub fn iter(&self) -> TableIter {
        TableIter {
            bpm: Arc::clone(&self.bpm),
            page_id: self.first_page_id,
            slot_id: 0,
        }
    }
}

pub struct TableIter {
    bpm: Arc<Mutex<BufferPoolManager>>,
    page_id: u32,
    slot_id: u16,
}

impl TableIter {
    pub fn position(&self) -> (u32, u16) {
        (self.page_id, self.slot_id)
    }
}

impl Iterator for TableIter {
    type Item = Result<(Rid, Tuple)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.page_id == INVALID_PAGE_ID {
                return None;
            }

            let page_arc = match self.bpm.lock().unwrap().fetch_page(self.page_id) {
                Ok(Some(p)) => p,
                Ok(None) => {
                    self.page_id = INVALID_PAGE_ID;
                    self.slot_id = 0;
                    return None;
                }
                Err(e) => return Some(Err(e)),
            };

            let page = page_arc.read().unwrap();
            if self.slot_id >= page.num_slots() {
                let next_page_id = page.next_page_id();
                drop(page);
                if let Err(e) = self.bpm.lock().unwrap().unpin_page(self.page_id, false) {
                    return Some(Err(e));
                }
                self.page_id = next_page_id;
                self.slot_id = 0;
                continue;
            }

            let rid = Rid {
                page_id: self.page_id,
                slot_id: self.slot_id,
            };
            let tuple = page.get_tuple(self.slot_id).map(Tuple::from_bytes);
            drop(page);
            if let Err(e) = self.bpm.lock().unwrap().unpin_page(self.page_id, false) {
                return Some(Err(e));
            }
            self.slot_id += 1;

            if let Some(tuple) = tuple {
                return Some(Ok((rid, tuple)));
            }
            // Tombstoned slot, keep walking.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::DiskManager;
    use crate::tuple::DataType;

    fn test_schema() -> Schema {
        let mut schema = Schema::new();
        schema.add_column("id", DataType::Int, true).unwrap();
        schema.add_column("name", DataType::Char, false).unwrap();
        schema
    }

    fn test_heap() -> (tempfile::TempDir, Arc<Mutex<BufferPoolManager>>, TableHeap) {
        let dir = tempfile::tempdir().unwrap();
        let disk = DiskManager::open(&dir.path().join("test.db")).unwrap();
        let bpm = Arc::new(Mutex::new(BufferPoolManager::new(disk)));
        let (first_page_id, _page) = bpm.lock().unwrap().new_page().unwrap();
        let heap = TableHeap::new(Arc::clone(&bpm), test_schema(), first_page_id);
        (dir, bpm, heap)
    }

    fn row(id: i32, name: &str) -> Vec<Value> {
        vec![Value::Int(id), Value::Char(name.to_string())]
    }

    fn scan_ids(heap: &TableHeap) -> Vec<i32> {
        heap.iter()
            .map(|r| {
                let (_, tuple) = r.unwrap();
                tuple.values(heap.schema()).unwrap()[0].as_int().unwrap()
            })
            .collect()
    }

    #[test]
    fn test_insert_and_get() {
        let (_dir, _bpm, heap) = test_heap();
        let rid = heap.insert(&row(1, "Alice")).unwrap();
        assert_eq!(rid.page_id, heap.first_page_id());
        assert_eq!(rid.slot_id, 0);

        let tuple = heap.get(rid).unwrap().unwrap();
        assert_eq!(tuple.values(heap.schema()).unwrap(), row(1, "Alice"));
    }

    #[test]
    fn test_get_missing_is_none() {
        let (_dir, _bpm, heap) = test_heap();
        let rid = heap.insert(&row(1, "Alice")).unwrap();
        assert!(heap
            .get(Rid {
                page_id: rid.page_id,
                slot_id: 5
            })
            .unwrap()
            .is_none());
        assert!(heap
            .get(Rid {
                page_id: INVALID_PAGE_ID,
                slot_id: 0
            })
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_hides_tuple() {
        let (_dir, _bpm, heap) = test_heap();
        let keep = heap.insert(&row(1, "keep")).unwrap();
        let drop_rid = heap.insert(&row(2, "drop")).unwrap();
        heap.delete(drop_rid).unwrap();

        assert!(heap.get(drop_rid).unwrap().is_none());
        assert!(heap.get(keep).unwrap().is_some());
        assert_eq!(scan_ids(&heap), vec![1]);
    }

    #[test]
    fn test_update_same_size_keeps_rid() {
        let (_dir, _bpm, heap) = test_heap();
        let rid = heap.insert(&row(1, "old")).unwrap();
        let new_rid = heap.update(&row(1, "new"), rid).unwrap();
        assert_eq!(new_rid, rid);
        let tuple = heap.get(rid).unwrap().unwrap();
        assert_eq!(tuple.values(heap.schema()).unwrap(), row(1, "new"));
    }

    #[test]
    fn test_update_grown_row_moves_and_tombstones() {
        let (_dir, _bpm, heap) = test_heap();
        // Seed a short raw row so the typed update has to relocate it.
        let rid = heap.insert_bytes(&[0u8; 10]).unwrap();
        let new_rid = heap.update(&row(9, "grown"), rid).unwrap();
        assert_ne!(new_rid, rid);
        assert!(heap.get(rid).unwrap().is_none());
        let tuple = heap.get(new_rid).unwrap().unwrap();
        assert_eq!(tuple.values(heap.schema()).unwrap(), row(9, "grown"));
    }

    #[test]
    fn test_update_missing_row_fails() {
        let (_dir, _bpm, heap) = test_heap();
        let rid = heap.insert(&row(1, "x")).unwrap();
        heap.delete(rid).unwrap();
        assert!(heap.update(&row(1, "y"), rid).is_err());
    }

    #[test]
    fn test_multi_page_spill_preserves_order() {
        let (_dir, bpm, heap) = test_heap();
        // A 44-byte tuple plus slot entry is ~51 bytes; a few hundred rows
        // are guaranteed to spill past one 4 KiB page.
        let count = 300;
        for i in 0..count {
            heap.insert(&row(i, "spill")).unwrap();
        }
        assert_eq!(scan_ids(&heap), (0..count).collect::<Vec<_>>());

        // The chain grew and stayed linked.
        let first = bpm
            .lock()
            .unwrap()
            .fetch_page(heap.first_page_id())
            .unwrap()
            .unwrap();
        let next = first.read().unwrap().next_page_id();
        assert_ne!(next, INVALID_PAGE_ID);
    }

    #[test]
    fn test_iterator_skips_tombstones_across_pages() {
        let (_dir, _bpm, heap) = test_heap();
        let mut rids = Vec::new();
        for i in 0..300 {
            rids.push(heap.insert(&row(i, "x")).unwrap());
        }
        for rid in rids.iter().step_by(2) {
            heap.delete(*rid).unwrap();
        }
        let ids = scan_ids(&heap);
        assert_eq!(ids.len(), 150);
        assert!(ids.iter().all(|id| id % 2 == 1));
    }

    #[test]
    fn test_iterator_terminal_position() {
        let (_dir, _bpm, heap) = test_heap();
        heap.insert(&row(1, "only")).unwrap();
        let mut iter = heap.iter();
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        assert_eq!(iter.position(), (INVALID_PAGE_ID, 0));
    }

    #[test]
    fn test_oversized_tuple_fails_at_heap_level() {
        let dir = tempfile::tempdir().unwrap();
        let disk = DiskManager::open(&dir.path().join("test.db")).unwrap();
        let bpm = Arc::new(Mutex::new(BufferPoolManager::new(disk)));
        let (first_page_id, _page) = bpm.lock().unwrap().new_page().unwrap();
        let heap = TableHeap::new(Arc::clone(&bpm), test_schema(), first_page_id);

        let oversized = vec![0u8; crate::page::PAGE_SIZE];
        assert!(heap.insert_bytes(&oversized).is_err());
    }
}
