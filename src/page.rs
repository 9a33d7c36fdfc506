use anyhow::{bail, Result};

pub const PAGE_SIZE: usize = 4096;
pub const INVALID_PAGE_ID: u32 = u32::MAX;

// Page layout:
//   Header (24 bytes, packed, little-endian):
//     - page_id: u32
//     - next_page_id: u32
//     - prev_page_id: u32
//     - page_type: u8
//     - num_slots: u16
//     - free_space_ptr: u32  (first byte of the free region, grows up)
//     - tuple_start_ptr: u32 (lowest tuple byte, grows down from PAGE_SIZE)
//     - is_dirty: u8
//   Slot directory (7 bytes per entry, right after the header):
//     - tuple_offset: u32, tuple_length: u16, is_live: u8
//   Tuple data grows backward from the end of the page.

pub const HEADER_SIZE: usize = 24;
pub const SLOT_SIZE: usize = 7;

const OFF_PAGE_ID: usize = 0;
const OFF_NEXT_PAGE_ID: usize = 4;
const OFF_PREV_PAGE_ID: usize = 8;
const OFF_PAGE_TYPE: usize = 12;
const OFF_NUM_SLOTS: usize = 13;
const OFF_FREE_SPACE_PTR: usize = 15;
const OFF_TUPLE_START_PTR: usize = 19;
const OFF_IS_DIRTY: usize = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Invalid = 0,
    Table = 1,
    IndexLeaf = 2,
    IndexInternal = 3,
}

impl PageType {
    pub fn from_u8(v: u8) -> PageType {
        match v {
            1 => PageType::Table,
            2 => PageType::IndexLeaf,
            3 => PageType::IndexInternal,
            _ => PageType::Invalid,
        }
    }
}

pub struct Page {
    pub data: [u8; PAGE_SIZE],
}

impl Page {
    pub fn new(page_id: u32, page_type: PageType) -> Self {
        let mut page = Page {
            data: [0; PAGE_SIZE],
        };
        page.reset(page_id, page_type);
        page
    }

    pub fn from_bytes(bytes: &[u8; PAGE_SIZE]) -> Self {
        Page { data: *bytes }
    }

    pub fn reset(&mut self, page_id: u32, page_type: PageType) {
        self.data = [0; PAGE_SIZE];
        self.set_page_id(page_id);
        self.data[OFF_PAGE_TYPE] = page_type as u8;
        self.set_num_slots(0);
        self.set_free_space_ptr(HEADER_SIZE as u32);
        self.set_tuple_start_ptr(PAGE_SIZE as u32);
        self.set_next_page_id(INVALID_PAGE_ID);
        self.set_prev_page_id(INVALID_PAGE_ID);
        self.set_dirty(false);
    }

    fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.data[offset..offset + 4].try_into().unwrap())
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes(self.data[offset..offset + 2].try_into().unwrap())
    }

    fn write_u16(&mut self, offset: usize, value: u16) {
        self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn page_id(&self) -> u32 {
        self.read_u32(OFF_PAGE_ID)
    }

    fn set_page_id(&mut self, id: u32) {
        self.write_u32(OFF_PAGE_ID, id);
    }

    pub fn next_page_id(&self) -> u32 {
        self.read_u32(OFF_NEXT_PAGE_ID)
    }

    pub fn set_next_page_id(&mut self, id: u32) {
        self.write_u32(OFF_NEXT_PAGE_ID, id);
    }

    pub fn prev_page_id(&self) -> u32 {
        self.read_u32(OFF_PREV_PAGE_ID)
    }

    pub fn set_prev_page_id(&mut self, id: u32) {
        self.write_u32(OFF_PREV_PAGE_ID, id);
    }

    pub fn page_type(&self) -> PageType {
        PageType::from_u8(self.data[OFF_PAGE_TYPE])
    }

    pub fn num_slots(&self) -> u16 {
        self.read_u16(OFF_NUM_SLOTS)
    }

    fn set_num_slots(&mut self, count: u16) {
        self.write_u16(OFF_NUM_SLOTS, count);
    }

    pub fn free_space_ptr(&self) -> u32 {
        self.read_u32(OFF_FREE_SPACE_PTR)
    }

    fn set_free_space_ptr(&mut self, offset: u32) {
        self.write_u32(OFF_FREE_SPACE_PTR, offset);
    }

    pub fn tuple_start_ptr(&self) -> u32 {
        self.read_u32(OFF_TUPLE_START_PTR)
    }

    fn set_tuple_start_ptr(&mut self, offset: u32) {
        self.write_u32(OFF_TUPLE_START_PTR, offset);
    }

    pub fn is_dirty(&self) -> bool {
        self.data[OFF_IS_DIRTY] != 0
    }

    /// The single way to request write-back from the buffer pool.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.data[OFF_IS_DIRTY] = dirty as u8;
    }

    fn slot(&self, slot_id: u16) -> (u32, u16, bool) {
        let base = HEADER_SIZE + (slot_id as usize) * SLOT_SIZE;
        let offset = self.read_u32(base);
        let length = self.read_u16(base + 4);
        let live = self.data[base + 6] != 0;
        (offset, length, live)
    }

    fn set_slot(&mut self, slot_id: u16, offset: u32, length: u16, live: bool) {
        let base = HEADER_SIZE + (slot_id as usize) * SLOT_SIZE;
        self.write_u32(base, offset);
        self.write_u16(base + 4, length);
        self.data[base + 6] = live as u8;
    }

    pub fn free_space(&self) -> usize {
        self.tuple_start_ptr() as usize - self.free_space_ptr() as usize
    }

    pub fn insert(&mut self, tuple: &[u8]) -> Result<u16> {
        let required = tuple.len() + SLOT_SIZE;
        if self.free_space() < required {
            bail!("page {} is full", self.page_id());
        }

        let slot_id = self.num_slots();
        let new_start = self.tuple_start_ptr() as usize - tuple.len();
        self.data[new_start..new_start + tuple.len()].copy_from_slice(tuple);
        self.set_tuple_start_ptr(new_start as u32);
        self.set_slot(slot_id, new_start as u32, tuple.len() as u16, true);
        self.set_num_slots(slot_id + 1);
        self.set_free_space_ptr(self.free_space_ptr() + SLOT_SIZE as u32);
        self.set_dirty(true);

        Ok(slot_id)
    }

    pub fn get_tuple(&self, slot_id: u16) -> Option<&[u8]> {
        if slot_id >= self.num_slots() {
            return None;
        }
        let (offset, length, live) = self.slot(slot_id);
        if !live {
            return None;
        }
        Some(&self.data[offset as usize..(offset as usize + length as usize)])
    }

    /// Same-size overwrite. Growing updates go through the table heap,
    /// which re-inserts and tombstones the old slot.
    pub fn update_tuple(&mut self, slot_id: u16, tuple: &[u8]) -> Result<()> {
        if slot_id >= self.num_slots() {
            bail!("slot {slot_id} does not exist");
        }
        let (offset, length, live) = self.slot(slot_id);
        if !live {
            bail!("slot {slot_id} is deleted");
        }
        if length as usize != tuple.len() {
            bail!("slot {slot_id} holds {length} bytes, cannot overwrite with {}", tuple.len());
        }
        self.data[offset as usize..offset as usize + tuple.len()].copy_from_slice(tuple);
        self.set_dirty(true);
        Ok(())
    }

    /// Tombstone a slot. Tuple bytes stay in place; there is no compaction.
    pub fn delete(&mut self, slot_id: u16) -> Result<()> {
        if slot_id >= self.num_slots() {
            bail!("slot {slot_id} does not exist");
        }
        let (offset, length, live) = self.slot(slot_id);
        if !live {
            bail!("slot {slot_id} is already deleted");
        }
        self.set_slot(slot_id, offset, length, false);
        self.set_dirty(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_page_layout() {
        let page = Page::new(7, PageType::Table);
        assert_eq!(page.page_id(), 7);
        assert_eq!(page.page_type(), PageType::Table);
        assert_eq!(page.num_slots(), 0);
        assert_eq!(page.free_space_ptr(), HEADER_SIZE as u32);
        assert_eq!(page.tuple_start_ptr(), PAGE_SIZE as u32);
        assert_eq!(page.next_page_id(), INVALID_PAGE_ID);
        assert_eq!(page.prev_page_id(), INVALID_PAGE_ID);
        assert!(!page.is_dirty());
    }

    #[test]
    fn test_insert_and_get() {
        let mut page = Page::new(0, PageType::Table);
        let slot_a = page.insert(b"hello").unwrap();
        let slot_b = page.insert(b"world!").unwrap();
        assert_eq!(slot_a, 0);
        assert_eq!(slot_b, 1);
        assert_eq!(page.get_tuple(0).unwrap(), b"hello");
        assert_eq!(page.get_tuple(1).unwrap(), b"world!");
        assert!(page.is_dirty());
    }

    #[test]
    fn test_insert_grows_down_from_page_end() {
        let mut page = Page::new(0, PageType::Table);
        page.insert(b"abcd").unwrap();
        assert_eq!(page.tuple_start_ptr() as usize, PAGE_SIZE - 4);
        page.insert(b"ef").unwrap();
        assert_eq!(page.tuple_start_ptr() as usize, PAGE_SIZE - 6);
        assert_eq!(
            page.free_space_ptr() as usize,
            HEADER_SIZE + 2 * SLOT_SIZE
        );
    }

    #[test]
    fn test_slot_regions_stay_disjoint() {
        let mut page = Page::new(0, PageType::Table);
        for i in 0..20 {
            page.insert(format!("tuple-{i}").as_bytes()).unwrap();
        }
        assert!(page.free_space_ptr() <= page.tuple_start_ptr());
        let mut seen: Vec<(u32, u16)> = Vec::new();
        for slot_id in 0..page.num_slots() {
            let (offset, length, live) = page.slot(slot_id);
            assert!(live);
            assert!(offset >= page.tuple_start_ptr());
            assert!((offset as usize + length as usize) <= PAGE_SIZE);
            for &(o, l) in &seen {
                let disjoint =
                    offset as usize + length as usize <= o as usize || o as usize + l as usize <= offset as usize;
                assert!(disjoint, "live slots overlap");
            }
            seen.push((offset, length));
        }
    }

    #[test]
    fn test_full_page_rejects_insert() {
        let mut page = Page::new(0, PageType::Table);
        let big = vec![0xAA; PAGE_SIZE - HEADER_SIZE - SLOT_SIZE];
        page.insert(&big).unwrap();
        assert_eq!(page.free_space(), 0);
        assert!(page.insert(b"x").is_err());
    }

    #[test]
    fn test_oversized_tuple_rejected() {
        let mut page = Page::new(0, PageType::Table);
        let too_big = vec![0u8; PAGE_SIZE - HEADER_SIZE - SLOT_SIZE + 1];
        assert!(page.insert(&too_big).is_err());
    }

    #[test]
    fn test_delete_tombstones_slot() {
        let mut page = Page::new(0, PageType::Table);
        page.insert(b"keep").unwrap();
        page.insert(b"drop").unwrap();
        page.delete(1).unwrap();
        assert_eq!(page.get_tuple(0).unwrap(), b"keep");
        assert!(page.get_tuple(1).is_none());
        assert!(page.delete(1).is_err());
        // Slot directory keeps its size; no compaction.
        assert_eq!(page.num_slots(), 2);
    }

    #[test]
    fn test_update_in_place_same_size_only() {
        let mut page = Page::new(0, PageType::Table);
        page.insert(b"aaaa").unwrap();
        page.update_tuple(0, b"bbbb").unwrap();
        assert_eq!(page.get_tuple(0).unwrap(), b"bbbb");
        assert!(page.update_tuple(0, b"ccccc").is_err());
    }

    #[test]
    fn test_header_survives_byte_roundtrip() {
        let mut page = Page::new(42, PageType::Table);
        page.set_next_page_id(43);
        page.set_prev_page_id(41);
        page.insert(b"payload").unwrap();
        page.set_dirty(false);

        let restored = Page::from_bytes(&page.data);
        assert_eq!(restored.page_id(), 42);
        assert_eq!(restored.next_page_id(), 43);
        assert_eq!(restored.prev_page_id(), 41);
        assert_eq!(restored.num_slots(), 1);
        assert_eq!(restored.get_tuple(0).unwrap(), b"payload");
    }
}
