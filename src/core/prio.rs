//! Priority bitmap management for O(1) highest-ready lookup
//!
//! This module implements the priority table using a bitmap approach.
//! Leverages the CLZ (Count Leading Zeros) instruction for efficient
//! highest-priority determination.

use crate::config::CFG_PRIO_MAX;
use crate::types::OsPrio;

/// Number of words needed for the priority bitmap
const PRIO_TBL_SIZE: usize = (CFG_PRIO_MAX + 31) / 32;

/// Priority bitmap table
///
/// Each bit represents a priority level. A set bit means there's at least
/// one ready task at that priority. Priority `p` lives in word `p / 32` at
/// bit `p % 32`, so the most significant set bit of the last non-empty word
/// is the highest priority.
#[derive(Debug, Clone)]
pub struct PrioTable {
    bitmap: [u32; PRIO_TBL_SIZE],
}

impl PrioTable {
    pub const fn new() -> Self {
        PrioTable {
            bitmap: [0; PRIO_TBL_SIZE],
        }
    }

    /// Insert a priority into the bitmap
    #[inline]
    pub fn insert(&mut self, prio: OsPrio) {
        debug_assert!((prio as usize) < CFG_PRIO_MAX);

        let word_idx = (prio / 32) as usize;
        let bit_pos = prio % 32;

        self.bitmap[word_idx] |= 1 << bit_pos;
    }

    /// Remove a priority from the bitmap
    #[inline]
    pub fn remove(&mut self, prio: OsPrio) {
        debug_assert!((prio as usize) < CFG_PRIO_MAX);

        let word_idx = (prio / 32) as usize;
        let bit_pos = prio % 32;

        self.bitmap[word_idx] &= !(1 << bit_pos);
    }

    /// Get the highest priority, or `None` when nothing is ready
    #[inline]
    pub fn get_highest(&self) -> Option<OsPrio> {
        for (idx, &word) in self.bitmap.iter().enumerate().rev() {
            if word != 0 {
                let bit = 31 - word.leading_zeros();
                return Some((idx * 32) as OsPrio + bit as OsPrio);
            }
        }
        None
    }

    /// Check if a specific priority has any ready tasks
    #[inline]
    pub fn is_set(&self, prio: OsPrio) -> bool {
        let word_idx = (prio / 32) as usize;
        let bit_pos = prio % 32;

        (self.bitmap[word_idx] & (1 << bit_pos)) != 0
    }

    /// Check if the priority table is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bitmap.iter().all(|&w| w == 0)
    }
}

impl Default for PrioTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table() {
        let table = PrioTable::new();
        assert!(table.is_empty());
        assert_eq!(table.get_highest(), None);
    }

    #[test]
    fn test_insert_remove() {
        let mut table = PrioTable::new();

        table.insert(5);
        assert!(table.is_set(5));
        assert!(!table.is_set(4));
        assert_eq!(table.get_highest(), Some(5));

        table.insert(3);
        assert_eq!(table.get_highest(), Some(5));

        table.insert(7);
        assert_eq!(table.get_highest(), Some(7));

        table.remove(7);
        assert_eq!(table.get_highest(), Some(5));

        table.remove(5);
        table.remove(3);
        assert!(table.is_empty());
    }

    #[test]
    fn test_boundary_priorities() {
        let mut table = PrioTable::new();

        table.insert(0);
        assert_eq!(table.get_highest(), Some(0));

        table.insert((CFG_PRIO_MAX - 1) as OsPrio);
        assert_eq!(table.get_highest(), Some((CFG_PRIO_MAX - 1) as OsPrio));

        table.remove((CFG_PRIO_MAX - 1) as OsPrio);
        assert_eq!(table.get_highest(), Some(0));
    }
}
