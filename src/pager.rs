use crate::error::{Error, Result};
use crate::page::{allocate_page, Page};
use crate::page_layout::PAGE_SIZE;
use crate::page_type::PageId;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Byte offset of a page within the backing file.
pub fn page_offset(page_id: PageId) -> u64 {
  u64::from(page_id) * PAGE_SIZE as u64
}

/// Seek to the page's offset, write the whole page and sync it to disk.
pub fn save_page(file: &mut File, page: &Page) -> Result<()> {
  let offset = page_offset(page.id());
  file.seek(SeekFrom::Start(offset))?;
  file.write_all(page.as_bytes())?;
  file.sync_all()?;
  debug!(page = page.id(), offset, "saved page");
  Ok(())
}

/// Load a page from disk into a fresh buffer.
/// A file too short to hold the whole page is an error, never a blank page.
/// So is a page whose header names a different id than the position it was read from.
pub fn load_page(file: &mut File, page_id: PageId) -> Result<Page> {
  let mut bytes = allocate_page();
  let offset = page_offset(page_id);
  file.seek(SeekFrom::Start(offset))?;

  let mut read = 0;
  while read < PAGE_SIZE {
    match file.read(&mut bytes[read..]) {
      Ok(0) => break,
      Ok(n) => read += n,
      Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
      Err(e) => return Err(e.into()),
    }
  }
  if read < PAGE_SIZE {
    return Err(Error::ShortRead { page_id, read });
  }

  let page = Page::from_bytes(bytes)?;
  if page.id() != page_id {
    warn!(page = page_id, stored = page.id(), "page id does not match its file position");
    return Err(Error::Corrupted("page id does not match its file position"));
  }
  debug!(page = page_id, offset, "loaded page");
  Ok(page)
}

/// Pager owns the backing file of a sequence of pages.
pub struct Pager {
  file: File,
}

impl Pager {
  pub fn new(path: &Path) -> Result<Pager> {
    PagerBuilder::new().path(path).build()
  }

  pub fn write_page(&mut self, page: &Page) -> Result<()> {
    save_page(&mut self.file, page)
  }

  pub fn get_page(&mut self, page_id: PageId) -> Result<Page> {
    load_page(&mut self.file, page_id)
  }

  /// Number of whole pages in the file; valid page ids are below it.
  pub fn page_count(&self) -> Result<u64> {
    Ok(self.file.metadata()?.len() / PAGE_SIZE as u64)
  }

  pub fn file_mut(&mut self) -> &mut File {
    &mut self.file
  }
}

/// PagerBuilder is a Builder for the Pager struct
pub struct PagerBuilder {
  /// Path to the page file
  path: PathBuf,
  /// Create the file when missing
  create: bool,
  /// Drop any existing pages on open
  truncate: bool,
}

impl PagerBuilder {
  pub fn new() -> PagerBuilder {
    PagerBuilder {
      path: PathBuf::new(),
      create: true,
      truncate: false,
    }
  }

  pub fn path<P: AsRef<Path>>(mut self, path: P) -> PagerBuilder {
    self.path = path.as_ref().to_path_buf();
    self
  }

  pub fn create(mut self, create: bool) -> PagerBuilder {
    self.create = create;
    self
  }

  pub fn truncate(mut self, truncate: bool) -> PagerBuilder {
    self.truncate = truncate;
    self
  }

  pub fn build(&self) -> Result<Pager> {
    if self.path.as_os_str().is_empty() {
      return Err(Error::Builder("path is empty"));
    }
    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(self.create)
      .truncate(self.truncate)
      .open(&self.path)?;
    debug!(path = %self.path.display(), "opened page file");
    Ok(Pager { file })
  }
}

impl Default for PagerBuilder {
  /// A default PagerBuilder opens or creates '/tmp/slotted.db'
  fn default() -> Self {
    PagerBuilder::new().path("/tmp/slotted.db")
  }
}
