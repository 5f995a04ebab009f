use crate::error::{Error, Result};
use crate::page_layout::{
  FieldCodec, CAN_COMPACT, CELL_LOCATION_OFFSET, FLAGS_OFFSET, FREE_END_OFFSET, FREE_START_OFFSET,
  HEADER_SIZE, ID_OFFSET, INITIAL_FREE_END, INITIAL_FREE_START, PAGE_SIZE, PAGE_TYPE_OFFSET,
  SLOT_SIZE, TOMBSTONE, TOTAL_FREE_OFFSET,
};
use crate::page_type::{PageId, PageType};
use crate::pointer_list::{CellPointer, PointerList};
use std::convert::TryFrom;
use std::fmt;
use tracing::{debug, trace, warn};

/// SlotHandle is the byte offset of a slot record within the page.
/// It stays valid until the slot is removed or the page is compacted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotHandle(u16);

impl SlotHandle {
  pub fn new(offset: u16) -> SlotHandle {
    SlotHandle(offset)
  }

  pub(crate) fn from_index(index: usize) -> SlotHandle {
    SlotHandle((HEADER_SIZE + index * SLOT_SIZE) as u16)
  }

  pub fn offset(&self) -> u16 {
    self.0
  }

  /// Position of the slot in the directory, counted from zero.
  /// None when the offset is inside the header or not on a slot boundary.
  pub fn index(&self) -> Option<usize> {
    let offset = (self.0 as usize).checked_sub(HEADER_SIZE)?;
    if offset % SLOT_SIZE != 0 {
      return None;
    }
    Some(offset / SLOT_SIZE)
  }
}

/// PageHeader holds the decoded header fields of a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageHeader {
  pub id: PageId,
  pub page_type: PageType,
  /// First unused byte after the slot directory
  pub free_start: u16,
  /// Last free byte; cells live above it
  pub free_end: u16,
  /// Always free_end - free_start
  pub total_free: u16,
  pub flags: u8,
}

impl PageHeader {
  fn empty(page_type: PageType, id: PageId) -> PageHeader {
    PageHeader {
      id,
      page_type,
      free_start: INITIAL_FREE_START,
      free_end: INITIAL_FREE_END,
      total_free: INITIAL_FREE_END - INITIAL_FREE_START,
      flags: 0,
    }
  }

  /// Decodes and validates a header read from disk.
  pub fn decode(bytes: &[u8]) -> Result<PageHeader> {
    if bytes.len() < HEADER_SIZE {
      return Err(Error::Corrupted("page shorter than its header"));
    }
    let header = PageHeader {
      id: bytes.read_u32_at(ID_OFFSET),
      page_type: PageType::try_from(bytes.read_u32_at(PAGE_TYPE_OFFSET))?,
      free_start: bytes.read_u16_at(FREE_START_OFFSET),
      free_end: bytes.read_u16_at(FREE_END_OFFSET),
      total_free: bytes.read_u16_at(TOTAL_FREE_OFFSET),
      flags: bytes.read_u8_at(FLAGS_OFFSET),
    };

    if (header.free_start as usize) < HEADER_SIZE {
      return Err(Error::Corrupted("free_start points into the header"));
    }
    if (header.free_start as usize - HEADER_SIZE) % SLOT_SIZE != 0 {
      return Err(Error::Corrupted("slot directory is not a whole number of slots"));
    }
    if header.free_start > header.free_end {
      return Err(Error::Corrupted("free_start is past free_end"));
    }
    if header.free_end as usize >= PAGE_SIZE {
      return Err(Error::Corrupted("free_end is past the end of the page"));
    }
    if header.total_free != header.free_end - header.free_start {
      return Err(Error::Corrupted("total_free disagrees with free space bounds"));
    }
    Ok(header)
  }

  pub fn encode(&self, bytes: &mut [u8]) {
    bytes.write_u32_at(ID_OFFSET, self.id);
    bytes.write_u32_at(PAGE_TYPE_OFFSET, self.page_type.into());
    bytes.write_u16_at(FREE_START_OFFSET, self.free_start);
    bytes.write_u16_at(FREE_END_OFFSET, self.free_end);
    bytes.write_u16_at(TOTAL_FREE_OFFSET, self.total_free);
    bytes.write_u8_at(FLAGS_OFFSET, self.flags);
  }

  pub fn needs_compaction(&self) -> bool {
    self.flags & CAN_COMPACT != 0
  }
}

/// A page starts as just a blank slate of zeroed bytes of a fixed PAGE_SIZE.
pub fn allocate_page() -> Box<[u8]> {
  vec![0u8; PAGE_SIZE].into_boxed_slice()
}

/// Like `allocate_page`, but reports allocation failure instead of aborting.
pub fn try_allocate_page() -> Result<Box<[u8]>> {
  let mut bytes = Vec::new();
  bytes
    .try_reserve_exact(PAGE_SIZE)
    .map_err(|_| Error::AllocationFailure)?;
  bytes.resize(PAGE_SIZE, 0);
  Ok(bytes.into_boxed_slice())
}

/// Page is one owned PAGE_SIZE buffer laid out as a slotted page:
///
/// ```text
///                                 free_start                       free_end
///                                     |--->grows              grows<---|
///                                     V                                V
///  +--------+-------+-------+---------+--------------------------------+-------+-------+
///  | header | slot1 | slot2 |   ...   |        unused space...         | cell2 | cell1 |
///  +--------+-------+-------+---------+--------------------------------+-------+-------+
/// ```
///
/// The decoded header is cached next to the bytes and written back after every mutation.
#[derive(Clone)]
pub struct Page {
  header: PageHeader,
  bytes: Box<[u8]>,
}

impl Page {
  /// Create a new page and initialize the header.
  pub fn new(page_type: PageType, id: PageId) -> Page {
    Page::stamp(allocate_page(), page_type, id)
  }

  fn stamp(bytes: Box<[u8]>, page_type: PageType, id: PageId) -> Page {
    let mut page = Page {
      header: PageHeader::empty(page_type, id),
      bytes,
    };
    page.write_header();
    page
  }

  /// Wraps a buffer read from disk, validating its header.
  pub fn from_bytes(bytes: Box<[u8]>) -> Result<Page> {
    if bytes.len() != PAGE_SIZE {
      return Err(Error::Corrupted("page buffer is not PAGE_SIZE bytes"));
    }
    let header = PageHeader::decode(&bytes).map_err(|err| {
      warn!(error = %err, "page header failed validation");
      err
    })?;
    Ok(Page { header, bytes })
  }

  pub fn header(&self) -> &PageHeader {
    &self.header
  }

  pub fn id(&self) -> PageId {
    self.header.id
  }

  pub fn page_type(&self) -> PageType {
    self.header.page_type
  }

  pub fn needs_compaction(&self) -> bool {
    self.header.needs_compaction()
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn slot_count(&self) -> usize {
    self.pointer_list().len()
  }

  fn write_header(&mut self) {
    self.header.encode(&mut self.bytes);
  }

  /// View over every slot record, removed ones included, in insertion order.
  pub fn pointer_list(&self) -> PointerList<'_> {
    PointerList::new(&self.bytes[HEADER_SIZE..self.header.free_start as usize])
  }

  /// Decodes the slot record at `slot`, if `slot` addresses one in the directory.
  pub fn cell_pointer(&self, slot: SlotHandle) -> Option<CellPointer> {
    let offset = slot.offset() as usize;
    if offset < HEADER_SIZE
      || offset + SLOT_SIZE > self.header.free_start as usize
      || (offset - HEADER_SIZE) % SLOT_SIZE != 0
    {
      return None;
    }
    Some(CellPointer::decode(slot, &self.bytes[offset..offset + SLOT_SIZE]))
  }

  /// Adds a new cell at free_end and its slot record at free_start, returning the slot.
  /// The page is left untouched when the cell and its slot do not fit.
  /// Empty cells are refused so that every cell starts below the one added before it.
  pub fn add_cell(&mut self, cell: &[u8]) -> Result<SlotHandle> {
    let size = cell.len();
    if size == 0 {
      return Err(Error::EmptyCell);
    }
    let cell_size = u16::try_from(size).map_err(|_| Error::CellTooLarge { size })?;
    let requested = size + SLOT_SIZE;
    let available = self.header.total_free as usize;
    if requested > available {
      return Err(Error::CapacityExceeded {
        requested,
        available,
      });
    }

    // free_end - size >= free_start + SLOT_SIZE, so a live cell is never at TOMBSTONE.
    let cell_location = self.header.free_end - cell_size;
    let start = cell_location as usize;
    self.bytes[start..start + size].copy_from_slice(cell);

    let slot = self.header.free_start;
    let offset = slot as usize;
    CellPointer::encode(cell_location, cell_size, &mut self.bytes[offset..offset + SLOT_SIZE]);

    self.header.free_end = cell_location;
    self.header.free_start += SLOT_SIZE as u16;
    self.header.total_free = self.header.free_end - self.header.free_start;
    self.write_header();

    trace!(page = self.header.id, slot, cell_location, cell_size, "added cell");
    Ok(SlotHandle(slot))
  }

  /// Returns the bytes of the cell behind `slot`, or None if it was removed
  /// or `slot` is not part of the directory.
  pub fn get_cell(&self, slot: SlotHandle) -> Option<&[u8]> {
    let pointer = self.cell_pointer(slot)?;
    if pointer.is_tombstone() {
      return None;
    }
    let start = pointer.cell_location as usize;
    self.bytes.get(start..start + pointer.cell_size as usize)
  }

  /// Unlinks the cell and marks the page as eligible for compaction.
  /// The space is only reclaimed by `compact`. Returns true if a live cell was removed.
  pub fn remove_cell(&mut self, slot: SlotHandle) -> bool {
    let pointer = match self.cell_pointer(slot) {
      Some(pointer) => pointer,
      None => {
        trace!(page = self.header.id, slot = slot.offset(), "remove of unknown slot ignored");
        return false;
      }
    };

    let offset = slot.offset() as usize + CELL_LOCATION_OFFSET;
    self.bytes.write_u16_at(offset, TOMBSTONE);
    self.header.flags |= CAN_COMPACT;
    self.write_header();

    trace!(page = self.header.id, slot = slot.offset(), "removed cell");
    !pointer.is_tombstone()
  }

  /// Rebuilds the page with only its live cells, dropping removed slots from the directory.
  /// Does nothing unless a cell was removed since the last compaction.
  ///
  /// Surviving cells are renumbered: every `SlotHandle` handed out before this call is
  /// invalid afterwards. Use `pointer_list` to find the cells again.
  ///
  /// On error the page is left exactly as it was.
  pub fn compact(&mut self) -> Result<()> {
    if !self.needs_compaction() {
      return Ok(());
    }

    let mut scratch = Page::stamp(try_allocate_page()?, PageType::Root, 0);
    let mut dropped = 0usize;
    for pointer in self.pointer_list() {
      if pointer.is_tombstone() {
        dropped += 1;
        continue;
      }
      let start = pointer.cell_location as usize;
      let cell = self
        .bytes
        .get(start..start + pointer.cell_size as usize)
        .ok_or(Error::Corrupted("cell extends past the end of the page"))?;
      scratch.add_cell(cell)?;
    }

    let before = self.header.total_free;
    self.header.free_start = scratch.header.free_start;
    self.header.free_end = scratch.header.free_end;
    self.header.total_free = scratch.header.total_free;
    self.header.flags &= !CAN_COMPACT;
    self.bytes[HEADER_SIZE..].copy_from_slice(&scratch.bytes[HEADER_SIZE..]);
    self.write_header();

    debug!(
      page = self.header.id,
      live = scratch.slot_count(),
      dropped,
      reclaimed = self.header.total_free.saturating_sub(before),
      "compacted page"
    );
    Ok(())
  }
}

impl fmt::Debug for Page {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Page")
      .field("header", &self.header)
      .field("slots", &self.slot_count())
      .finish()
  }
}
