use crate::error::Error;
use std::convert::TryFrom;

/// Page identifier, also its file offset divided by the page size.
pub type PageId = u32;

/// PageType is a tag stamped into the header. Nothing dispatches on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageType {
  Root = 1,
  Interior = 2,
  Leaf = 3,
}

impl From<PageType> for u32 {
  fn from(page_type: PageType) -> u32 {
    page_type as u32
  }
}

impl TryFrom<u32> for PageType {
  type Error = Error;

  fn try_from(tag: u32) -> Result<Self, Self::Error> {
    match tag {
      1 => Ok(PageType::Root),
      2 => Ok(PageType::Interior),
      3 => Ok(PageType::Leaf),
      _ => Err(Error::Corrupted("unknown page type tag")),
    }
  }
}
