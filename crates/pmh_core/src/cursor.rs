//! Reconciles the client-visible item cursor with the raw index offset.
//!
//! Without a discriminator field every raw record is one item and both
//! cursors move in lockstep. With one, each record expands into one item per
//! distinct discriminator value; tombstones stay a single item. A page may
//! end in the middle of a record. The record then stays at `raw_cursor` and
//! `variant_offset` counts how many of its items were already delivered, so
//! the next page resumes exactly.
//!
//! The reconciler does no IO. The caller loops:
//!
//! ```text
//! while let Some(fetch) = reconciler.next_fetch() {
//!     reconciler.absorb(index.query(.., fetch.offset, fetch.limit)?);
//! }
//! let page = reconciler.finish(virtual_hits);
//! ```

use serde::{Deserialize, Serialize};

use crate::record::{IndexRecord, VirtualItem};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    /// Raw records fully delivered.
    pub raw_cursor: u64,
    /// Virtual items delivered.
    pub virtual_cursor: u64,
    /// Items of the record at `raw_cursor` already delivered.
    #[serde(default)]
    pub variant_offset: u32,
}

/// Raw records to request next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fetch {
    pub offset: u64,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<VirtualItem>,
    /// Position the page started at.
    pub start: CursorPosition,
    /// Position after the page; becomes the successor token's position.
    pub next: CursorPosition,
    pub has_more: bool,
}

#[derive(Debug)]
pub struct CursorReconciler {
    discriminator: Option<String>,
    page_size: usize,
    start: CursorPosition,
    position: CursorPosition,
    items: Vec<VirtualItem>,
    exhausted: bool,
}

impl CursorReconciler {
    pub fn new(discriminator: Option<&str>, page_size: usize, start: CursorPosition) -> Self {
        let mut start = start;
        if discriminator.is_none() {
            start.variant_offset = 0;
        }
        Self {
            discriminator: discriminator.map(str::to_string),
            page_size: page_size.max(1),
            start,
            position: start,
            items: Vec::with_capacity(page_size.min(1024)),
            exhausted: false,
        }
    }

    fn remaining(&self) -> usize {
        self.page_size.saturating_sub(self.items.len())
    }

    /// The next raw window to fetch, or `None` once the page is full or the
    /// raw result set is exhausted.
    pub fn next_fetch(&self) -> Option<Fetch> {
        let limit = self.remaining();
        if self.exhausted || limit == 0 {
            return None;
        }
        Some(Fetch {
            offset: self.position.raw_cursor,
            limit,
        })
    }

    /// Consumes records fetched at the offset returned by [`next_fetch`].
    ///
    /// [`next_fetch`]: CursorReconciler::next_fetch
    pub fn absorb(&mut self, records: Vec<IndexRecord>) {
        let requested = self.remaining();
        let received = records.len();
        let completed = match self.discriminator.clone() {
            None => self.absorb_lockstep(records),
            Some(field) => self.absorb_expanding(&field, records),
        };
        if completed && received < requested {
            self.exhausted = true;
        }
    }

    fn absorb_lockstep(&mut self, records: Vec<IndexRecord>) -> bool {
        for record in records {
            if self.remaining() == 0 {
                return false;
            }
            self.items.push(VirtualItem {
                record,
                variant: None,
            });
            self.position.raw_cursor += 1;
            self.position.virtual_cursor += 1;
        }
        true
    }

    /// Returns `false` when the page filled up before all records were used.
    fn absorb_expanding(&mut self, field: &str, records: Vec<IndexRecord>) -> bool {
        for record in records {
            if self.remaining() == 0 {
                return false;
            }
            // A tombstone is reported once, whatever variants it still carries.
            let variants: Vec<Option<String>> = if record.is_deleted() {
                vec![None]
            } else {
                record
                    .distinct_values(field)
                    .into_iter()
                    .map(|value| Some(value.to_string()))
                    .collect()
            };
            let skip = self.position.variant_offset as usize;
            let mut delivered = skip;
            for variant in variants.into_iter().skip(skip) {
                if self.remaining() == 0 {
                    self.position.variant_offset = delivered as u32;
                    return false;
                }
                self.items.push(VirtualItem {
                    record: record.clone(),
                    variant,
                });
                delivered += 1;
                self.position.virtual_cursor += 1;
            }
            self.position.raw_cursor += 1;
            self.position.variant_offset = 0;
        }
        true
    }

    /// Closes the page. `has_more` is false once the raw set is exhausted,
    /// even if the index changed and `virtual_hits` promised more.
    pub fn finish(self, virtual_hits: u64) -> Page {
        let has_more = !self.exhausted && self.position.virtual_cursor < virtual_hits;
        Page {
            items: self.items,
            start: self.start,
            next: self.position,
            has_more,
        }
    }
}
