//! Dense per-cell storage and the ASCII-grid raster collaborator.
//!
//! Raster file formats are a boundary concern: the engine only needs
//! "rectangular grid of numbers with an extent". ESRI ASCII grids cover the
//! test and demo needs; anything richer stays behind the same surface.

use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::grid::cell::CellHash;

/// Geometry shared by all rasters in one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridExtent {
    pub rows: usize,
    pub columns: usize,
    /// Cell width and height (m).
    pub cell_size: f64,
    /// Lower-left corner easting.
    pub xllcorner: f64,
    /// Lower-left corner northing.
    pub yllcorner: f64,
    /// Sentinel written for cells with no data.
    pub nodata: f64,
}

impl GridExtent {
    #[inline]
    #[must_use]
    pub fn cells(&self) -> usize {
        self.rows * self.columns
    }

    #[inline]
    #[must_use]
    pub fn hash(&self, row: i32, column: i32) -> CellHash {
        row as CellHash * self.columns + column as CellHash
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, row: i32, column: i32) -> bool {
        row >= 0 && column >= 0 && (row as usize) < self.rows && (column as usize) < self.columns
    }

    /// Area of one cell in hectares.
    #[inline]
    #[must_use]
    pub fn cell_area_ha(&self) -> f64 {
        self.cell_size * self.cell_size / 10_000.0
    }

    /// Check another raster lines up with this one.
    pub fn check_aligned(&self, other: &GridExtent, what: &str) -> Result<(), SimulationError> {
        if self.rows != other.rows
            || self.columns != other.columns
            || (self.cell_size - other.cell_size).abs() > 1e-6
        {
            return Err(SimulationError::ExtentMismatch(format!(
                "{what}: {}x{} @ {} vs {}x{} @ {}",
                self.rows, self.columns, self.cell_size, other.rows, other.columns, other.cell_size
            )));
        }
        Ok(())
    }
}

/// A dense grid of values covering the full extent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMap<T> {
    extent: GridExtent,
    data: Vec<T>,
}

impl<T: Copy + Default> GridMap<T> {
    #[must_use]
    pub fn new(extent: GridExtent) -> Self {
        GridMap {
            extent,
            data: vec![T::default(); extent.cells()],
        }
    }

    #[inline]
    #[must_use]
    pub fn extent(&self) -> &GridExtent {
        &self.extent
    }

    #[inline]
    #[must_use]
    pub fn get(&self, hash: CellHash) -> T {
        self.data[hash]
    }

    #[inline]
    pub fn set(&mut self, hash: CellHash, value: T) {
        self.data[hash] = value;
    }

    #[inline]
    #[must_use]
    pub fn at(&self, row: i32, column: i32) -> T {
        self.data[self.extent.hash(row, column)]
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

/// Read an ESRI ASCII grid of parseable values.
///
/// Row order in the file is north-to-south; it is stored here with row 0 at
/// the top so `(row, column)` indexing matches the file layout.
pub fn read_ascii<T>(path: &Path) -> Result<GridMap<T>, SimulationError>
where
    T: Copy + Default + FromStr,
{
    let file = File::open(path).map_err(|e| SimulationError::io(path.display().to_string(), e))?;
    let mut lines = BufReader::new(file).lines();
    let mut header = std::collections::HashMap::new();
    let mut first_data_line: Option<String> = None;
    let mut line_no = 0usize;
    for line in lines.by_ref() {
        line_no += 1;
        let line = line.map_err(|e| SimulationError::io(path.display().to_string(), e))?;
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(key), Some(value)) if key.chars().next().is_some_and(char::is_alphabetic) => {
                header.insert(key.to_ascii_lowercase(), value.to_string());
            }
            (Some(_), _) => {
                first_data_line = Some(line);
                break;
            }
            _ => {}
        }
    }
    let get = |key: &str| -> Result<f64, SimulationError> {
        header
            .get(key)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| SimulationError::HeaderMismatch {
                path: path.display().to_string(),
                expected: key.to_string(),
                found: header.get(key).cloned().unwrap_or_default(),
            })
    };
    let extent = GridExtent {
        rows: get("nrows")? as usize,
        columns: get("ncols")? as usize,
        cell_size: get("cellsize")?,
        xllcorner: get("xllcorner")?,
        yllcorner: get("yllcorner")?,
        nodata: get("nodata_value").unwrap_or(-9999.0),
    };
    let mut grid = GridMap::new(extent);
    let mut idx = 0usize;
    let mut consume = |line: &str, line_no: usize| -> Result<(), SimulationError> {
        for tok in line.split_whitespace() {
            if idx >= extent.cells() {
                break;
            }
            let v: T = tok.parse().map_err(|_| SimulationError::Malformed {
                path: path.display().to_string(),
                line: line_no,
                value: tok.to_string(),
            })?;
            grid.data[idx] = v;
            idx += 1;
        }
        Ok(())
    };
    if let Some(line) = first_data_line {
        consume(&line, line_no)?;
    }
    for line in lines {
        line_no += 1;
        let line = line.map_err(|e| SimulationError::io(path.display().to_string(), e))?;
        consume(&line, line_no)?;
    }
    if idx != extent.cells() {
        return Err(SimulationError::ExtentMismatch(format!(
            "{}: expected {} values, read {}",
            path.display(),
            extent.cells(),
            idx
        )));
    }
    Ok(grid)
}

/// Write a grid as an ESRI ASCII raster.
pub fn write_ascii<T: Display + Copy>(
    grid_values: &[T],
    extent: &GridExtent,
    path: &Path,
) -> Result<(), SimulationError> {
    let file =
        File::create(path).map_err(|e| SimulationError::io(path.display().to_string(), e))?;
    let mut out = BufWriter::new(file);
    let write = |out: &mut BufWriter<File>, s: String| -> Result<(), SimulationError> {
        out.write_all(s.as_bytes())
            .map_err(|e| SimulationError::io(path.display().to_string(), e))
    };
    write(
        &mut out,
        format!(
            "ncols {}\nnrows {}\nxllcorner {}\nyllcorner {}\ncellsize {}\nNODATA_value {}\n",
            extent.columns, extent.rows, extent.xllcorner, extent.yllcorner, extent.cell_size,
            extent.nodata
        ),
    )?;
    for row in 0..extent.rows {
        let mut line = String::new();
        for col in 0..extent.columns {
            if col > 0 {
                line.push(' ');
            }
            line.push_str(&grid_values[row * extent.columns + col].to_string());
        }
        line.push('\n');
        write(&mut out, line)?;
    }
    Ok(())
}
