use crate::page_type::PageId;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("page full: cell needs {requested} bytes but only {available} are free")]
  CapacityExceeded { requested: usize, available: usize },
  #[error("empty cells cannot be stored")]
  EmptyCell,
  #[error("cell of {size} bytes cannot be addressed by a slot")]
  CellTooLarge { size: usize },
  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
  #[error("short read on page {page_id}: got {read} bytes")]
  ShortRead { page_id: PageId, read: usize },
  #[error("could not allocate a scratch page")]
  AllocationFailure,
  #[error("corrupted page: {0}")]
  Corrupted(&'static str),
  #[error("invalid pager configuration: {0}")]
  Builder(&'static str),
}
