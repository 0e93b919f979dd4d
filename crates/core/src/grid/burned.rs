//! The burned/unburnable bit-set and its reuse pool.

use std::sync::Mutex;

use bitvec::prelude::*;

use crate::grid::cell::CellHash;

/// One bit per cell; set means the cell can no longer receive fire
/// (already burned, extinguished, or not fuel).
#[derive(Debug, Clone)]
pub struct BurnedData {
    bits: BitVec,
}

impl BurnedData {
    #[must_use]
    pub fn new(cells: usize) -> Self {
        BurnedData {
            bits: bitvec![0; cells],
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, hash: CellHash) -> bool {
        self.bits[hash]
    }

    #[inline]
    pub fn set(&mut self, hash: CellHash) {
        self.bits.set(hash, true);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// OR another bit-set in (used to seed the non-fuel mask).
    pub fn union_with(&mut self, other: &BurnedData) {
        debug_assert_eq!(self.bits.len(), other.bits.len());
        for index in other.bits.iter_ones() {
            self.bits.set(index, true);
        }
    }

    fn clear(&mut self) {
        self.bits.fill(false);
    }
}

/// Pool of [`BurnedData`] buffers sized for one grid.
///
/// Buffers escape only to the owning scenario thread for the duration of a
/// run and come back zeroed for the next borrower.
#[derive(Debug)]
pub struct BurnedDataPool {
    cells: usize,
    free: Mutex<Vec<BurnedData>>,
}

impl BurnedDataPool {
    #[must_use]
    pub fn new(cells: usize) -> Self {
        BurnedDataPool {
            cells,
            free: Mutex::new(Vec::new()),
        }
    }

    /// Fetch a zeroed buffer, reusing a returned one when available.
    #[must_use]
    pub fn acquire(&self) -> BurnedData {
        let mut free = self.free.lock().expect("burned-data pool poisoned");
        free.pop().unwrap_or_else(|| BurnedData::new(self.cells))
    }

    /// Return a buffer for reuse; it is zeroed here so acquire stays cheap.
    pub fn release(&self, mut data: BurnedData) {
        data.clear();
        let mut free = self.free.lock().expect("burned-data pool poisoned");
        free.push(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_buffers_come_back_zeroed() {
        let pool = BurnedDataPool::new(16);
        let mut a = pool.acquire();
        a.set(3);
        a.set(7);
        pool.release(a);
        let b = pool.acquire();
        assert!(!b.get(3));
        assert!(!b.get(7));
    }

    #[test]
    fn pool_reuses_allocations() {
        let pool = BurnedDataPool::new(8);
        let a = pool.acquire();
        pool.release(a);
        // second acquire must not panic and must match the grid size
        let b = pool.acquire();
        assert_eq!(b.len(), 8);
    }
}
