//! Cells and cell identifiers.

use serde::{Deserialize, Serialize};

/// Fuel code stored per cell; 0 means non-burnable.
pub type FuelCode = u8;

/// Packed cell identifier: `row * columns + column`.
///
/// Used everywhere a cell needs to be named cheaply (event ordering, burned
/// bit-set indices, point bookkeeping).
pub type CellHash = usize;

/// One landscape cell. Immutable once the grid is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub row: i32,
    pub column: i32,
    pub fuel_code: FuelCode,
    /// Percent slope, capped at 250 on load.
    pub slope_pct: u8,
    /// Aspect in degrees from north; 0 when the cell is flat.
    pub aspect_deg: u16,
}

impl Cell {
    /// Whether anything can burn here at all.
    #[inline]
    #[must_use]
    pub fn is_fuel(&self) -> bool {
        self.fuel_code != 0
    }

    /// Attributes that determine spread behaviour, independent of position.
    ///
    /// Cells sharing a key share a [`crate::sim::SpreadInfo`] for a given
    /// weather hour, which is what makes the per-scenario memoization pay.
    #[inline]
    #[must_use]
    pub fn spread_key(&self) -> SpreadKey {
        SpreadKey {
            fuel_code: self.fuel_code,
            slope_pct: self.slope_pct,
            aspect_deg: if self.slope_pct == 0 {
                0
            } else {
                self.aspect_deg
            },
        }
    }
}

/// Memoization key for spread calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpreadKey {
    pub fuel_code: FuelCode,
    pub slope_pct: u8,
    pub aspect_deg: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_cells_share_keys_regardless_of_aspect() {
        let a = Cell {
            row: 0,
            column: 0,
            fuel_code: 2,
            slope_pct: 0,
            aspect_deg: 90,
        };
        let b = Cell {
            row: 5,
            column: 7,
            fuel_code: 2,
            slope_pct: 0,
            aspect_deg: 270,
        };
        assert_eq!(a.spread_key(), b.spread_key());
    }

    #[test]
    fn sloped_cells_keep_aspect() {
        let a = Cell {
            row: 0,
            column: 0,
            fuel_code: 2,
            slope_pct: 20,
            aspect_deg: 90,
        };
        let b = Cell {
            slope_pct: 20,
            aspect_deg: 270,
            ..a
        };
        assert_ne!(a.spread_key(), b.spread_key());
    }
}
