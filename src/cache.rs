//! In-memory row cache with a logical-to-physical index indirection.
//!
//! Rows live in append-only slots; the index maps display order to slot
//! positions. Erasing removes only the index entry, so the slot goes
//! stale until enough of them pile up to justify a compaction. No disk
//! I/O happens here.

use crate::error::{StoreError, StoreResult};

/// Number of stale slots tolerated before `erase` triggers a compaction.
const STALE_SLOT_THRESHOLD: usize = 50;

/// Materialized rows plus their display order.
#[derive(Debug, Default)]
pub struct RowCache {
    slots: Vec<String>,
    index: Vec<usize>,
}

impl RowCache {
    pub fn new() -> Self {
        RowCache::default()
    }

    /// Number of logical rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn read(&self, index: usize) -> StoreResult<&str> {
        Ok(self.slots[self.slot(index)?].as_str())
    }

    pub fn first(&self) -> StoreResult<&str> {
        self.read(0)
    }

    pub fn last(&self) -> StoreResult<&str> {
        let last = self
            .index
            .len()
            .checked_sub(1)
            .ok_or(StoreError::IndexOutOfRange { index: 0, len: 0 })?;
        self.read(last)
    }

    /// Copy of every row in display order.
    pub fn all(&self) -> Vec<String> {
        self.rows().map(str::to_string).collect()
    }

    /// Borrowing iterator over the rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = &str> {
        self.index.iter().map(|&slot| self.slots[slot].as_str())
    }

    /// Add a row after the current last one.
    pub fn push(&mut self, text: String) {
        self.slots.push(text);
        self.index.push(self.slots.len() - 1);
    }

    /// Replace the content of row `index` in place.
    pub fn overwrite(&mut self, index: usize, text: String) -> StoreResult<()> {
        let slot = self.slot(index)?;
        self.slots[slot] = text;
        Ok(())
    }

    /// Remove row `index`; later rows shift down one position. The slot
    /// that held the row stays allocated until a compaction reclaims it.
    pub fn erase(&mut self, index: usize) -> StoreResult<()> {
        if index >= self.index.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: self.index.len(),
            });
        }

        self.index.remove(index);

        if self.slots.len() >= self.index.len() + STALE_SLOT_THRESHOLD {
            self.compact();
        }

        Ok(())
    }

    /// Drop every row. All slots turn stale at once, so the storage is
    /// released immediately instead of waiting for a compaction.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    /// Rebuild the slots to hold exactly the live rows in display order
    /// and reset the index to the identity mapping.
    fn compact(&mut self) {
        let mut live = Vec::with_capacity(self.index.len());
        for &slot in &self.index {
            live.push(std::mem::take(&mut self.slots[slot]));
        }

        self.slots = live;
        self.index = (0..self.slots.len()).collect();
    }

    fn slot(&self, index: usize) -> StoreResult<usize> {
        self.index
            .get(index)
            .copied()
            .ok_or(StoreError::IndexOutOfRange {
                index,
                len: self.index.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(rows: &[&str]) -> RowCache {
        let mut cache = RowCache::new();
        for row in rows {
            cache.push(row.to_string());
        }
        cache
    }

    #[test]
    fn test_push_and_read() {
        let cache = cache_with(&["a", "b", "c"]);

        assert_eq!(cache.len(), 3);
        assert!(!cache.is_empty());
        assert_eq!(cache.read(0).unwrap(), "a");
        assert_eq!(cache.read(2).unwrap(), "c");
        assert_eq!(cache.first().unwrap(), "a");
        assert_eq!(cache.last().unwrap(), "c");
        assert_eq!(cache.all(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_overwrite_keeps_order() {
        let mut cache = cache_with(&["a", "b", "c"]);

        cache.overwrite(1, "B".to_string()).unwrap();
        assert_eq!(cache.all(), vec!["a", "B", "c"]);
    }

    #[test]
    fn test_erase_shifts_later_rows() {
        let mut cache = cache_with(&["a", "b", "c"]);

        cache.erase(0).unwrap();
        assert_eq!(cache.all(), vec!["b", "c"]);
        assert_eq!(cache.read(0).unwrap(), "b");
    }

    #[test]
    fn test_out_of_range() {
        let mut cache = cache_with(&["a"]);
        assert!(cache.read(1).is_err());
        assert!(cache.overwrite(1, "x".to_string()).is_err());
        assert!(cache.erase(1).is_err());

        let empty = RowCache::new();
        assert!(empty.read(0).is_err());
        assert!(empty.first().is_err());
        assert!(empty.last().is_err());
    }

    #[test]
    fn test_clear() {
        let mut cache = cache_with(&["a", "b"]);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert!(cache.all().is_empty());
    }

    #[test]
    fn test_compaction_is_externally_invisible() {
        let mut cache = RowCache::new();
        for i in 0..2 * STALE_SLOT_THRESHOLD {
            cache.push(format!("row {i}"));
        }

        // Erase the first row repeatedly, crossing the stale-slot
        // threshold along the way.
        let erased = STALE_SLOT_THRESHOLD + 5;
        for _ in 0..erased {
            cache.erase(0).unwrap();
        }

        let expected: Vec<String> = (erased..2 * STALE_SLOT_THRESHOLD)
            .map(|i| format!("row {i}"))
            .collect();
        assert_eq!(cache.all(), expected);
        assert_eq!(cache.len(), expected.len());
        assert_eq!(cache.first().unwrap(), expected[0]);
        assert_eq!(cache.last().unwrap(), expected[expected.len() - 1]);
    }

    #[test]
    fn test_mutations_after_compaction() {
        let mut cache = RowCache::new();
        for i in 0..STALE_SLOT_THRESHOLD + 10 {
            cache.push(format!("row {i}"));
        }
        for _ in 0..STALE_SLOT_THRESHOLD {
            cache.erase(0).unwrap();
        }

        cache.push("tail".to_string());
        cache.overwrite(0, "head".to_string()).unwrap();

        let mut expected: Vec<String> = (STALE_SLOT_THRESHOLD..STALE_SLOT_THRESHOLD + 10)
            .map(|i| format!("row {i}"))
            .collect();
        expected[0] = "head".to_string();
        expected.push("tail".to_string());
        assert_eq!(cache.all(), expected);
    }
}
