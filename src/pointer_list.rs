use crate::page::SlotHandle;
use crate::page_layout::{
  FieldCodec, CELL_LOCATION_OFFSET, CELL_SIZE_OFFSET, HEADER_SIZE, SLOT_SIZE, TOMBSTONE,
};
use std::iter::FusedIterator;
use std::slice::ChunksExact;

/// CellPointer is one decoded slot record of the directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellPointer {
  /// Handle of the slot this record was read from
  pub slot: SlotHandle,
  /// Offset of the cell within the page, zero when the cell was removed
  pub cell_location: u16,
  pub cell_size: u16,
}

impl CellPointer {
  pub(crate) fn decode(slot: SlotHandle, record: &[u8]) -> CellPointer {
    CellPointer {
      slot,
      cell_location: record.read_u16_at(CELL_LOCATION_OFFSET),
      cell_size: record.read_u16_at(CELL_SIZE_OFFSET),
    }
  }

  pub(crate) fn encode(cell_location: u16, cell_size: u16, record: &mut [u8]) {
    record.write_u16_at(CELL_LOCATION_OFFSET, cell_location);
    record.write_u16_at(CELL_SIZE_OFFSET, cell_size);
  }

  pub fn is_tombstone(&self) -> bool {
    self.cell_location == TOMBSTONE
  }
}

/// PointerList is a read-only view over the slot directory, live and removed slots alike.
/// It can be iterated any number of times.
#[derive(Clone, Copy, Debug)]
pub struct PointerList<'a> {
  directory: &'a [u8],
}

impl<'a> PointerList<'a> {
  /// `directory` spans from the end of the header up to `free_start`.
  pub(crate) fn new(directory: &'a [u8]) -> PointerList<'a> {
    PointerList { directory }
  }

  pub fn len(&self) -> usize {
    self.directory.len() / SLOT_SIZE
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn get(&self, index: usize) -> Option<CellPointer> {
    let start = index.checked_mul(SLOT_SIZE)?;
    let record = self.directory.get(start..start + SLOT_SIZE)?;
    Some(CellPointer::decode(SlotHandle::from_index(index), record))
  }

  pub fn iter(&self) -> CellPointers<'a> {
    CellPointers {
      records: self.directory.chunks_exact(SLOT_SIZE),
      next_offset: HEADER_SIZE,
    }
  }

  /// Number of slots still addressing a cell.
  pub fn live_count(&self) -> usize {
    self.iter().filter(|pointer| !pointer.is_tombstone()).count()
  }
}

impl<'a> IntoIterator for PointerList<'a> {
  type Item = CellPointer;
  type IntoIter = CellPointers<'a>;

  fn into_iter(self) -> CellPointers<'a> {
    self.iter()
  }
}

impl<'a, 'b> IntoIterator for &'b PointerList<'a> {
  type Item = CellPointer;
  type IntoIter = CellPointers<'a>;

  fn into_iter(self) -> CellPointers<'a> {
    self.iter()
  }
}

/// Iterator over the directory in insertion order.
#[derive(Clone, Debug)]
pub struct CellPointers<'a> {
  records: ChunksExact<'a, u8>,
  next_offset: usize,
}

impl<'a> Iterator for CellPointers<'a> {
  type Item = CellPointer;

  fn next(&mut self) -> Option<CellPointer> {
    let record = self.records.next()?;
    let slot = SlotHandle::new(self.next_offset as u16);
    self.next_offset += SLOT_SIZE;
    Some(CellPointer::decode(slot, record))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.records.size_hint()
  }
}

impl ExactSizeIterator for CellPointers<'_> {}

impl FusedIterator for CellPointers<'_> {}

#[cfg(test)]
mod tests {
  use super::*;

  fn directory() -> Vec<u8> {
    let mut bytes = vec![0u8; SLOT_SIZE * 3];
    CellPointer::encode(4000, 95, &mut bytes[0..4]);
    CellPointer::encode(TOMBSTONE, 10, &mut bytes[4..8]);
    CellPointer::encode(3900, 10, &mut bytes[8..12]);
    bytes
  }

  #[test]
  fn iterates_in_directory_order() {
    let bytes = directory();
    let list = PointerList::new(&bytes);
    assert_eq!(list.len(), 3);

    let pointers: Vec<CellPointer> = list.iter().collect();
    assert_eq!(pointers[0].slot.offset(), 16);
    assert_eq!(pointers[0].cell_location, 4000);
    assert_eq!(pointers[0].cell_size, 95);
    assert!(pointers[1].is_tombstone());
    assert_eq!(pointers[2].slot.offset(), 24);
    assert_eq!(list.live_count(), 2);
  }

  #[test]
  fn restartable() {
    let bytes = directory();
    let list = PointerList::new(&bytes);
    let first: Vec<CellPointer> = list.iter().collect();
    let second: Vec<CellPointer> = (&list).into_iter().collect();
    assert_eq!(first, second);
    assert_eq!(list.iter().len(), 3);
  }

  #[test]
  fn get_out_of_range() {
    let bytes = directory();
    let list = PointerList::new(&bytes);
    assert_eq!(list.get(2).map(|p| p.cell_location), Some(3900));
    assert!(list.get(3).is_none());
    assert!(PointerList::new(&[]).is_empty());
  }
}
