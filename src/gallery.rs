//! In-memory media store and gallery pagination.
//!
//! The store is an explicit object handed to whoever renders the gallery;
//! there is no global state. It keeps records sorted newest first and
//! merges refreshes idempotently by URL, so a refresh that overlaps a
//! just-finished upload cannot duplicate an entry.

use crate::media::{sort_newest_first, MediaRecord};

/// Records shown per gallery page.
pub const PAGE_SIZE: usize = 24;

// =============================================================================
// Store
// =============================================================================

/// Lifecycle of the gallery's data.
///
/// `Empty -> Loading -> Populated`, then `Populated <-> Refreshing` for
/// every subsequent reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryState {
    /// Nothing loaded yet
    Empty,

    /// First load in flight
    Loading,

    /// Records available for display
    Populated,

    /// Records available, a reload in flight
    Refreshing,
}

/// Holds the media records backing the gallery.
#[derive(Debug)]
pub struct MediaStore {
    records: Vec<MediaRecord>,
    state: GalleryState,
}

impl MediaStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            state: GalleryState::Empty,
        }
    }

    pub fn state(&self) -> GalleryState {
        self.state
    }

    pub fn records(&self) -> &[MediaRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record URL currently in the store, newest first.
    pub fn urls(&self) -> Vec<String> {
        self.records.iter().map(|r| r.url.clone()).collect()
    }

    /// Mark a load as started. From `Empty` this is the initial load; from
    /// `Populated` it is a refresh. In-flight states are left alone.
    pub fn begin_load(&mut self) {
        self.state = match self.state {
            GalleryState::Empty => GalleryState::Loading,
            GalleryState::Populated => GalleryState::Refreshing,
            other => other,
        };
    }

    /// Merge loaded records and settle into `Populated`.
    pub fn finish_load(&mut self, records: Vec<MediaRecord>) -> usize {
        let added = self.add_records(records);
        self.state = GalleryState::Populated;
        added
    }

    /// Merge records into the store, idempotently by URL.
    ///
    /// Records whose URL is already present are discarded. Returns how
    /// many records were actually added; when nothing is new the store is
    /// untouched, so calling twice with the same input is a no-op.
    pub fn add_records(&mut self, new_records: Vec<MediaRecord>) -> usize {
        let existing: std::collections::HashSet<&str> =
            self.records.iter().map(|r| r.url.as_str()).collect();

        let unique: Vec<MediaRecord> = new_records
            .into_iter()
            .filter(|r| !existing.contains(r.url.as_str()))
            .collect();
        drop(existing);

        let added = unique.len();
        if added > 0 {
            self.records.extend(unique);
            sort_newest_first(&mut self.records);
        }
        added
    }

    /// Remove the record at `index`, if it exists.
    pub fn remove(&mut self, index: usize) -> Option<MediaRecord> {
        if index < self.records.len() {
            Some(self.records.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.state = GalleryState::Empty;
    }
}

impl Default for MediaStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of gallery records.
#[derive(Debug, PartialEq)]
pub struct Page<'a> {
    /// Records on this page, at most [`PAGE_SIZE`]
    pub records: &'a [MediaRecord],

    /// 1-based page number actually served
    pub page: usize,

    /// Total number of pages (at least 1)
    pub total_pages: usize,
}

/// Slice out page `page` (1-based) of `records`.
///
/// Requesting a page past the end resets to page 1 rather than erroring;
/// page 0 is treated as page 1.
pub fn paginate(records: &[MediaRecord], page: usize) -> Page<'_> {
    let total_pages = records.len().div_ceil(PAGE_SIZE).max(1);
    let page = if page == 0 || page > total_pages {
        1
    } else {
        page
    };

    let start = (page - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(records.len());
    Page {
        records: &records[start.min(records.len())..end],
        page,
        total_pages,
    }
}

// =============================================================================
// Tests
// =============================================================================
