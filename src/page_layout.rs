use byteorder::{ByteOrder, LittleEndian};
use std::mem::size_of;

/// A Single Page Size.
/// Each page is one fixed-size block of the backing file.
pub const PAGE_SIZE: usize = 4096;

/// Page header layout (sixteen bytes in total, the last one is padding)
pub const ID_OFFSET: usize = 0;
pub const ID_SIZE: usize = size_of::<u32>();
pub const PAGE_TYPE_OFFSET: usize = ID_OFFSET + ID_SIZE;
pub const PAGE_TYPE_SIZE: usize = size_of::<u32>();
pub const FREE_START_OFFSET: usize = PAGE_TYPE_OFFSET + PAGE_TYPE_SIZE;
pub const FREE_START_SIZE: usize = size_of::<u16>();
pub const FREE_END_OFFSET: usize = FREE_START_OFFSET + FREE_START_SIZE;
pub const FREE_END_SIZE: usize = size_of::<u16>();
pub const TOTAL_FREE_OFFSET: usize = FREE_END_OFFSET + FREE_END_SIZE;
pub const TOTAL_FREE_SIZE: usize = size_of::<u16>();
pub const FLAGS_OFFSET: usize = TOTAL_FREE_OFFSET + TOTAL_FREE_SIZE;
pub const FLAGS_SIZE: usize = size_of::<u8>();
pub const HEADER_PADDING: usize = 1;
pub const HEADER_SIZE: usize = FLAGS_OFFSET + FLAGS_SIZE + HEADER_PADDING;

/// Slot record layout (four bytes): cell location followed by cell size.
pub const CELL_LOCATION_OFFSET: usize = 0;
pub const CELL_LOCATION_SIZE: usize = size_of::<u16>();
pub const CELL_SIZE_OFFSET: usize = CELL_LOCATION_OFFSET + CELL_LOCATION_SIZE;
pub const CELL_SIZE_SIZE: usize = size_of::<u16>();
pub const SLOT_SIZE: usize = CELL_LOCATION_SIZE + CELL_SIZE_SIZE;

/// A cell location of zero falls inside the header, so it marks a removed cell.
pub const TOMBSTONE: u16 = 0;

/// Flag bits
pub const CAN_COMPACT: u8 = 0x01;

/// Initial free space boundaries of an empty page.
/// The last byte of the page is never handed out.
pub const INITIAL_FREE_START: u16 = HEADER_SIZE as u16;
pub const INITIAL_FREE_END: u16 = (PAGE_SIZE - 1) as u16;

/// Fixed-width field access over a page buffer.
/// Every header field and slot record goes through these, never a struct overlay.
pub trait FieldCodec {
  fn read_u8_at(&self, offset: usize) -> u8;
  fn read_u16_at(&self, offset: usize) -> u16;
  fn read_u32_at(&self, offset: usize) -> u32;
  fn write_u8_at(&mut self, offset: usize, value: u8);
  fn write_u16_at(&mut self, offset: usize, value: u16);
  fn write_u32_at(&mut self, offset: usize, value: u32);
}

impl FieldCodec for [u8] {
  fn read_u8_at(&self, offset: usize) -> u8 {
    self[offset]
  }

  fn read_u16_at(&self, offset: usize) -> u16 {
    LittleEndian::read_u16(&self[offset..offset + size_of::<u16>()])
  }

  fn read_u32_at(&self, offset: usize) -> u32 {
    LittleEndian::read_u32(&self[offset..offset + size_of::<u32>()])
  }

  fn write_u8_at(&mut self, offset: usize, value: u8) {
    self[offset] = value;
  }

  fn write_u16_at(&mut self, offset: usize, value: u16) {
    LittleEndian::write_u16(&mut self[offset..offset + size_of::<u16>()], value)
  }

  fn write_u32_at(&mut self, offset: usize, value: u32) {
    LittleEndian::write_u32(&mut self[offset..offset + size_of::<u32>()], value)
  }
}
