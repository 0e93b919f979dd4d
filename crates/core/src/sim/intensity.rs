//! Per-scenario record of where and how hard the fire burned.

use std::collections::BTreeMap;

use crate::grid::{BurnedData, CellHash, GridExtent, NEIGHBOURS};

/// Burn state for one scenario: maximum fire-line intensity per burned
/// cell, plus the unburnable bit-set the spread logic consults.
#[derive(Debug)]
pub struct IntensityMap {
    extent: GridExtent,
    intensity_max: BTreeMap<CellHash, u32>,
    unburnable: BurnedData,
}

impl IntensityMap {
    /// Wrap a pooled unburnable buffer. Non-fuel cells must already be set
    /// by the caller (or will simply never be burned).
    #[must_use]
    pub fn new(extent: GridExtent, unburnable: BurnedData) -> Self {
        debug_assert_eq!(unburnable.len(), extent.cells());
        IntensityMap {
            extent,
            intensity_max: BTreeMap::new(),
            unburnable,
        }
    }

    /// Take the pooled buffer back for release.
    #[must_use]
    pub fn into_unburnable(self) -> BurnedData {
        self.unburnable
    }

    #[inline]
    #[must_use]
    pub fn can_burn(&self, hash: CellHash) -> bool {
        !self.unburnable.get(hash)
    }

    #[inline]
    #[must_use]
    pub fn has_burned(&self, hash: CellHash) -> bool {
        self.intensity_max.contains_key(&hash)
    }

    #[inline]
    #[must_use]
    pub fn unburnable(&self) -> &BurnedData {
        &self.unburnable
    }

    /// Mark a cell unburnable without recording a burn (extinction,
    /// surrounded, or non-fuel).
    pub fn mark_unburnable(&mut self, hash: CellHash) {
        self.unburnable.set(hash);
    }

    /// Record a burn. The first burn freezes membership; later calls only
    /// raise the recorded intensity.
    pub fn burn(&mut self, hash: CellHash, intensity: u32) {
        self.unburnable.set(hash);
        let entry = self.intensity_max.entry(hash).or_insert(0);
        *entry = (*entry).max(intensity.max(1));
    }

    /// Whether every neighbour of a cell is burned or off-grid.
    #[must_use]
    pub fn is_surrounded(&self, hash: CellHash) -> bool {
        let row = (hash / self.extent.columns) as i32;
        let column = (hash % self.extent.columns) as i32;
        NEIGHBOURS.iter().all(|(dr, dc)| {
            let (r, c) = (row + dr, column + dc);
            !self.extent.contains(r, c) || self.unburnable.get(self.extent.hash(r, c))
        })
    }

    /// Burned cells and their max intensity, in cell order.
    pub fn iter(&self) -> impl Iterator<Item = (CellHash, u32)> + '_ {
        self.intensity_max.iter().map(|(&h, &i)| (h, i))
    }

    #[must_use]
    pub fn burned_count(&self) -> usize {
        self.intensity_max.len()
    }

    /// Current fire size in hectares.
    #[must_use]
    pub fn fire_size_ha(&self) -> f64 {
        self.intensity_max.len() as f64 * self.extent.cell_area_ha()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent() -> GridExtent {
        GridExtent {
            rows: 5,
            columns: 5,
            cell_size: 100.0,
            xllcorner: 0.0,
            yllcorner: 0.0,
            nodata: -9999.0,
        }
    }

    fn map() -> IntensityMap {
        let e = extent();
        IntensityMap::new(e, BurnedData::new(e.cells()))
    }

    #[test]
    fn burned_implies_cannot_reburn() {
        let mut m = map();
        assert!(m.can_burn(12));
        m.burn(12, 500);
        assert!(!m.can_burn(12));
        assert!(m.has_burned(12));
    }

    #[test]
    fn intensity_takes_maximum() {
        let mut m = map();
        m.burn(12, 500);
        m.burn(12, 300);
        m.burn(12, 900);
        assert_eq!(m.iter().next(), Some((12, 900)));
    }

    #[test]
    fn zero_intensity_burn_still_registers() {
        let mut m = map();
        m.burn(12, 0);
        let (_, intensity) = m.iter().next().unwrap();
        assert!(intensity >= 1);
    }

    #[test]
    fn surrounded_needs_all_neighbours() {
        let mut m = map();
        let e = extent();
        for (dr, dc) in NEIGHBOURS {
            m.burn(e.hash(2 + dr, 2 + dc), 100);
        }
        assert!(m.is_surrounded(e.hash(2, 2)));
        assert!(!m.is_surrounded(e.hash(1, 1)));
        // corners are surrounded once their 3 in-grid neighbours burn
        let mut corner = map();
        corner.burn(e.hash(0, 1), 100);
        corner.burn(e.hash(1, 0), 100);
        corner.burn(e.hash(1, 1), 100);
        assert!(corner.is_surrounded(e.hash(0, 0)));
    }

    #[test]
    fn fire_size_scales_with_cell_area() {
        let mut m = map();
        m.burn(0, 100);
        m.burn(1, 100);
        // two 1-ha cells
        assert!((m.fire_size_ha() - 2.0).abs() < 1e-9);
    }
}
