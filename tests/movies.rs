use byteorder::{ByteOrder, LittleEndian};
use slotted_page::{Page, PageType, Pager, PagerBuilder, SlotHandle, HEADER_SIZE, SLOT_SIZE};
use std::sync::Once;
use tempfile::tempdir;
use tracing_subscriber::EnvFilter;

const TITLE_LEN: usize = 100;
const MOVIE_SIZE: usize = 4 + TITLE_LEN + 4 + 4;

/// Fixed-length record standing in for a `movie` table row.
#[derive(Debug, PartialEq)]
struct Movie {
  id: u32,
  title: String,
  rating: f32,
  release: u32,
}

impl Movie {
  fn new(id: u32, title: &str, rating: f32, release: u32) -> Movie {
    Movie {
      id,
      title: title.to_string(),
      rating,
      release,
    }
  }

  fn to_bytes(&self) -> [u8; MOVIE_SIZE] {
    let mut buf = [0u8; MOVIE_SIZE];
    LittleEndian::write_u32(&mut buf[0..4], self.id);
    buf[4..4 + self.title.len()].copy_from_slice(self.title.as_bytes());
    LittleEndian::write_f32(&mut buf[104..108], self.rating);
    LittleEndian::write_u32(&mut buf[108..112], self.release);
    buf
  }

  fn from_bytes(buf: &[u8]) -> Movie {
    assert_eq!(buf.len(), MOVIE_SIZE);
    let title = &buf[4..4 + TITLE_LEN];
    let end = title.iter().position(|b| *b == 0).unwrap_or(TITLE_LEN);
    Movie {
      id: LittleEndian::read_u32(&buf[0..4]),
      title: String::from_utf8(title[..end].to_vec()).unwrap(),
      rating: LittleEndian::read_f32(&buf[104..108]),
      release: LittleEndian::read_u32(&buf[108..112]),
    }
  }
}

fn movies() -> Vec<Movie> {
  vec![
    Movie::new(1, "Toy Story", 0.92, 1995),
    Movie::new(2, "Black Panther", 0.96, 2018),
    Movie::new(3, "Alien", 0.98, 1979),
    Movie::new(4, "Star Wars", 0.96, 1977),
    Movie::new(5, "The Incredibles", 0.75, 2004),
  ]
}

fn init_tracing() {
  static INIT: Once = Once::new();
  INIT.call_once(|| {
    let filter =
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("slotted_page=debug"));
    let _ = tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_test_writer()
      .try_init();
  });
}

#[test]
fn movie_table_lifecycle() {
  init_tracing();
  let dir = tempdir().unwrap();
  let mut pager = PagerBuilder::new()
    .path(dir.path().join("movies.db"))
    .build()
    .unwrap();

  let mut page = Page::new(PageType::Leaf, 0);
  let cells: Vec<SlotHandle> = movies()
    .iter()
    .map(|movie| page.add_cell(&movie.to_bytes()).unwrap())
    .collect();

  let indexes: Vec<usize> = cells.iter().filter_map(|slot| slot.index()).collect();
  let offsets: Vec<u16> = cells.iter().map(|slot| slot.offset()).collect();
  assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
  assert_eq!(offsets, vec![16, 20, 24, 28, 32]);
  assert_eq!(HEADER_SIZE, 16);
  assert_eq!(SLOT_SIZE, 4);

  pager.write_page(&page).unwrap();
  let mut loaded = pager.get_page(0).unwrap();
  assert_eq!(loaded.as_bytes(), page.as_bytes());
  for (slot, movie) in cells.iter().zip(movies()) {
    assert_eq!(Movie::from_bytes(loaded.get_cell(*slot).unwrap()), movie);
  }

  assert!(loaded.remove_cell(cells[2]));
  assert!(loaded.remove_cell(cells[4]));
  assert_eq!(loaded.pointer_list().len(), 5);
  let free_before = loaded.header().total_free;

  loaded.compact().unwrap();
  let list = loaded.pointer_list();
  assert_eq!(list.len(), 3);
  assert_eq!(
    loaded.header().total_free,
    free_before + 2 * (MOVIE_SIZE + SLOT_SIZE) as u16
  );
  assert!(!loaded.needs_compaction());

  let remaining: Vec<u32> = list
    .iter()
    .map(|pointer| Movie::from_bytes(loaded.get_cell(pointer.slot).unwrap()).id)
    .collect();
  assert_eq!(remaining, vec![1, 2, 4]);
}

#[test]
fn compacted_page_survives_reopen() {
  init_tracing();
  let dir = tempdir().unwrap();
  let path = dir.path().join("movies.db");

  {
    let mut pager = Pager::new(&path).unwrap();
    let mut page = Page::new(PageType::Leaf, 1);
    let slots: Vec<SlotHandle> = movies()
      .iter()
      .map(|movie| page.add_cell(&movie.to_bytes()).unwrap())
      .collect();
    page.remove_cell(slots[0]);
    page.compact().unwrap();
    pager.write_page(&page).unwrap();
  }

  let mut pager = Pager::new(&path).unwrap();
  assert_eq!(pager.page_count().unwrap(), 2);
  let page = pager.get_page(1).unwrap();
  assert_eq!(page.id(), 1);
  assert_eq!(page.page_type(), PageType::Leaf);
  let titles: Vec<String> = page
    .pointer_list()
    .iter()
    .map(|pointer| Movie::from_bytes(page.get_cell(pointer.slot).unwrap()).title)
    .collect();
  assert_eq!(titles, vec!["Black Panther", "Alien", "Star Wars", "The Incredibles"]);
}
