//! Slotted pages: fixed-size disk blocks packing variable-length cells behind a slot directory,
//! plus whole-page persistence at `page_id * PAGE_SIZE` in a backing file.

pub mod error;
pub mod page;
pub mod page_layout;
pub mod page_type;
pub mod pager;
pub mod pointer_list;

pub use error::{Error, Result};
pub use page::{allocate_page, try_allocate_page, Page, PageHeader, SlotHandle};
pub use page_layout::{HEADER_SIZE, PAGE_SIZE, SLOT_SIZE};
pub use page_type::{PageId, PageType};
pub use pager::{load_page, page_offset, save_page, Pager, PagerBuilder};
pub use pointer_list::{CellPointer, CellPointers, PointerList};
