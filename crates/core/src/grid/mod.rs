//! The landscape raster: per-cell fuel, slope, aspect, and elevation.

mod burned;
mod cell;
mod raster;

pub use burned::{BurnedData, BurnedDataPool};
pub use cell::{Cell, CellHash, FuelCode, SpreadKey};
pub use raster::{read_ascii, write_ascii, GridExtent, GridMap};

use std::path::Path;

use tracing::{info, warn};

use crate::error::SimulationError;

/// Offsets to the 8 neighbours of a cell.
pub const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// The immutable landscape every scenario reads.
#[derive(Debug, Clone)]
pub struct Landscape {
    extent: GridExtent,
    fuel: GridMap<u8>,
    slope: GridMap<u8>,
    aspect: GridMap<u16>,
    elevation: GridMap<i32>,
}

impl Landscape {
    /// Build a landscape from already-loaded grids.
    pub fn new(
        fuel: GridMap<u8>,
        slope: GridMap<u8>,
        aspect: GridMap<u16>,
        elevation: GridMap<i32>,
    ) -> Result<Self, SimulationError> {
        let extent = *fuel.extent();
        extent.check_aligned(slope.extent(), "slope")?;
        extent.check_aligned(aspect.extent(), "aspect")?;
        extent.check_aligned(elevation.extent(), "elevation")?;
        let fuel_cells = fuel.values().iter().filter(|&&f| f != 0).count();
        if fuel_cells == 0 {
            return Err(SimulationError::NoFuel);
        }
        info!(
            rows = extent.rows,
            columns = extent.columns,
            fuel_pct = 100.0 * fuel_cells as f64 / extent.cells() as f64,
            "landscape loaded"
        );
        Ok(Landscape {
            extent,
            fuel,
            slope,
            aspect,
            elevation,
        })
    }

    /// Load the four rasters from ASCII grid files.
    pub fn from_rasters(
        fuel: &Path,
        slope: &Path,
        aspect: &Path,
        elevation: &Path,
    ) -> Result<Self, SimulationError> {
        Landscape::new(
            read_ascii(fuel)?,
            read_ascii(slope)?,
            read_ascii(aspect)?,
            read_ascii(elevation)?,
        )
    }

    /// Uniform synthetic landscape, used by tests and the demo driver.
    pub fn uniform(
        rows: usize,
        columns: usize,
        cell_size: f64,
        fuel_code: u8,
    ) -> Result<Self, SimulationError> {
        let extent = GridExtent {
            rows,
            columns,
            cell_size,
            xllcorner: 0.0,
            yllcorner: 0.0,
            nodata: -9999.0,
        };
        let mut fuel = GridMap::new(extent);
        fuel.fill(fuel_code);
        Landscape::new(
            fuel,
            GridMap::new(extent),
            GridMap::new(extent),
            GridMap::new(extent),
        )
    }

    #[inline]
    #[must_use]
    pub fn extent(&self) -> &GridExtent {
        &self.extent
    }

    #[inline]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.extent.rows
    }

    #[inline]
    #[must_use]
    pub fn columns(&self) -> usize {
        self.extent.columns
    }

    #[inline]
    #[must_use]
    pub fn cell_size(&self) -> f64 {
        self.extent.cell_size
    }

    /// Replace the fuel code of a single cell. Only exposed for building
    /// synthetic landscapes; a landscape in use is never mutated.
    pub fn set_fuel(&mut self, row: i32, column: i32, fuel_code: u8) {
        let hash = self.extent.hash(row, column);
        self.fuel.set(hash, fuel_code);
    }

    #[inline]
    #[must_use]
    pub fn cell(&self, row: i32, column: i32) -> Cell {
        let hash = self.extent.hash(row, column);
        Cell {
            row,
            column,
            fuel_code: self.fuel.get(hash),
            slope_pct: self.slope.get(hash).min(250),
            aspect_deg: self.aspect.get(hash) % 360,
        }
    }

    #[inline]
    #[must_use]
    pub fn cell_by_hash(&self, hash: CellHash) -> Cell {
        let row = (hash / self.extent.columns) as i32;
        let column = (hash % self.extent.columns) as i32;
        self.cell(row, column)
    }

    #[inline]
    #[must_use]
    pub fn fuel_at(&self, hash: CellHash) -> u8 {
        self.fuel.get(hash)
    }

    #[inline]
    #[must_use]
    pub fn elevation_at(&self, hash: CellHash) -> i32 {
        self.elevation.get(hash)
    }

    /// Median elevation of fuel cells, used for the Nd reference.
    #[must_use]
    pub fn representative_elevation(&self) -> i32 {
        let mut values: Vec<i32> = self
            .fuel
            .values()
            .iter()
            .zip(self.elevation.values())
            .filter(|(&f, _)| f != 0)
            .map(|(_, &e)| e)
            .collect();
        if values.is_empty() {
            return 0;
        }
        values.sort_unstable();
        values[values.len() / 2]
    }

    /// All combustible cell hashes, in row-major order.
    #[must_use]
    pub fn combustible_cells(&self) -> Vec<CellHash> {
        self.fuel
            .values()
            .iter()
            .enumerate()
            .filter(|(_, &f)| f != 0)
            .map(|(h, _)| h)
            .collect()
    }

    /// Cell containing projected coordinates `(x, y)` in the raster's CRS.
    pub fn cell_for_xy(&self, x: f64, y: f64) -> Result<Cell, SimulationError> {
        let column = ((x - self.extent.xllcorner) / self.extent.cell_size).floor() as i32;
        // raster rows run north to south
        let row_from_bottom = ((y - self.extent.yllcorner) / self.extent.cell_size).floor() as i32;
        let row = self.extent.rows as i32 - 1 - row_from_bottom;
        if !self.extent.contains(row, column) {
            return Err(SimulationError::IgnitionOutOfBounds(x, y));
        }
        Ok(self.cell(row, column))
    }

    /// The cell itself if combustible, otherwise the nearest combustible
    /// cell found by expanding square rings.
    pub fn nearest_combustible(&self, start: Cell) -> Result<Cell, SimulationError> {
        if start.is_fuel() {
            return Ok(start);
        }
        let max_ring = self.extent.rows.max(self.extent.columns) as i32;
        for ring in 1..max_ring {
            let mut best: Option<Cell> = None;
            for dr in -ring..=ring {
                for dc in -ring..=ring {
                    if dr.abs() != ring && dc.abs() != ring {
                        continue;
                    }
                    let (row, column) = (start.row + dr, start.column + dc);
                    if !self.extent.contains(row, column) {
                        continue;
                    }
                    let candidate = self.cell(row, column);
                    if candidate.is_fuel() {
                        // stable tie-break: first in row-major order
                        let better = best
                            .is_none_or(|b| (candidate.row, candidate.column) < (b.row, b.column));
                        if better {
                            best = Some(candidate);
                        }
                    }
                }
            }
            if let Some(found) = best {
                warn!(
                    from = ?(start.row, start.column),
                    to = ?(found.row, found.column),
                    "ignition moved to nearest combustible cell"
                );
                return Ok(found);
            }
        }
        Err(SimulationError::NoFuel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_landscape_has_fuel_everywhere() {
        let land = Landscape::uniform(10, 10, 100.0, 2).unwrap();
        assert_eq!(land.combustible_cells().len(), 100);
        assert!(land.cell(4, 4).is_fuel());
    }

    #[test]
    fn all_nonfuel_is_fatal() {
        assert!(matches!(
            Landscape::uniform(4, 4, 100.0, 0),
            Err(SimulationError::NoFuel)
        ));
    }

    #[test]
    fn nearest_combustible_walks_outward() {
        let mut land = Landscape::uniform(9, 9, 100.0, 2).unwrap();
        // carve out a non-fuel pocket around the centre
        for row in 3..=5 {
            for column in 3..=5 {
                land.set_fuel(row, column, 0);
            }
        }
        let start = land.cell(4, 4);
        assert!(!start.is_fuel());
        let found = land.nearest_combustible(start).unwrap();
        assert!(found.is_fuel());
        let dist = (found.row - 4).abs().max((found.column - 4).abs());
        assert_eq!(dist, 2);
    }

    #[test]
    fn xy_lookup_inverts_row_order() {
        let land = Landscape::uniform(10, 10, 100.0, 2).unwrap();
        // lower-left corner maps to the last row, first column
        let cell = land.cell_for_xy(50.0, 50.0).unwrap();
        assert_eq!((cell.row, cell.column), (9, 0));
        assert!(land.cell_for_xy(-10.0, 50.0).is_err());
    }
}
