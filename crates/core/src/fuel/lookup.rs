//! Mapping from raster grid values to FBP fuel types.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::error::SimulationError;
use crate::fuel::FuelType;

const EXPECTED_HEADER: &str = "grid_value,export_value,descriptive_name,fuel_type";

/// Resolves raster fuel codes and fuel names against the catalog.
///
/// Internal fuel codes are catalog indices plus one; code 0 is non-fuel.
#[derive(Debug, Clone)]
pub struct FuelLookup {
    catalog: Vec<FuelType>,
    by_grid_value: HashMap<i32, u8>,
}

impl FuelLookup {
    /// Identity lookup: grid values are the catalog's own fuel codes.
    #[must_use]
    pub fn identity(catalog: Vec<FuelType>) -> Self {
        let by_grid_value = (0..catalog.len())
            .map(|i| (i as i32 + 1, i as u8 + 1))
            .collect();
        FuelLookup {
            catalog,
            by_grid_value,
        }
    }

    /// Load grid-value mappings from the fuel table CSV.
    ///
    /// Unknown fuel names are warned about and mapped to non-fuel; the
    /// seasonal pairs (`M-1/M-2`, `M-3/M-4`, `D-1/D-2`) resolve to their
    /// green-season member.
    pub fn from_csv(path: &Path, catalog: Vec<FuelType>) -> Result<Self, SimulationError> {
        let file =
            File::open(path).map_err(|e| SimulationError::io(path.display().to_string(), e))?;
        let mut lines = BufReader::new(file).lines().enumerate();
        let header = match lines.next() {
            Some((_, Ok(line))) => line.trim().trim_start_matches('\u{feff}').to_string(),
            _ => String::new(),
        };
        if header != EXPECTED_HEADER {
            return Err(SimulationError::HeaderMismatch {
                path: path.display().to_string(),
                expected: EXPECTED_HEADER.to_string(),
                found: header,
            });
        }
        let mut lookup = FuelLookup {
            catalog,
            by_grid_value: HashMap::new(),
        };
        for (line_no, line) in lines {
            let line = line.map_err(|e| SimulationError::io(path.display().to_string(), e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != 4 {
                return Err(SimulationError::Malformed {
                    path: path.display().to_string(),
                    line: line_no + 1,
                    value: line.to_string(),
                });
            }
            let grid_value: i32 =
                fields[0]
                    .parse()
                    .map_err(|_| SimulationError::Malformed {
                        path: path.display().to_string(),
                        line: line_no + 1,
                        value: fields[0].to_string(),
                    })?;
            let code = match lookup.code_by_name(fields[3]) {
                Some(code) => code,
                None => {
                    warn!(name = fields[3], grid_value, "unknown fuel type in lookup table");
                    0
                }
            };
            lookup.by_grid_value.insert(grid_value, code);
        }
        Ok(lookup)
    }

    fn code_by_name(&self, name: &str) -> Option<u8> {
        let canonical = match name {
            "Non-fuel" | "Water" | "non-fuel" => return Some(0),
            "M-1/M-2" => "M-1",
            "M-3/M-4" => "M-3",
            "D-1/D-2" => "D-1",
            "O-1" => "O-1a",
            other => other,
        };
        self.catalog
            .iter()
            .position(|f| f.name == canonical)
            .map(|i| i as u8 + 1)
    }

    /// Internal fuel code for a raster grid value; 0 when unmapped.
    #[must_use]
    pub fn code_for_grid_value(&self, grid_value: i32) -> u8 {
        self.by_grid_value.get(&grid_value).copied().unwrap_or(0)
    }

    /// Catalog entry for an internal fuel code.
    #[must_use]
    pub fn by_code(&self, code: u8) -> Option<&FuelType> {
        if code == 0 {
            None
        } else {
            self.catalog.get(code as usize - 1)
        }
    }

    /// Catalog entry by FBP name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&FuelType> {
        match self.code_by_name(name) {
            Some(0) | None => None,
            Some(code) => self.by_code(code),
        }
    }

    /// Display name for a fuel code; total, unlike [`FuelLookup::by_code`].
    #[must_use]
    pub fn safe_name(&self, code: u8) -> &str {
        self.by_code(code).map_or("Non-fuel", |f| f.name)
    }

    /// Every (code, fuel) pair in the catalog.
    #[must_use]
    pub fn used_fuels(&self) -> Vec<(u8, &FuelType)> {
        self.catalog
            .iter()
            .enumerate()
            .map(|(i, f)| (i as u8 + 1, f))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuel::standard_catalog;
    use std::io::Write;

    #[test]
    fn name_round_trips_through_safe_name() {
        let lookup = FuelLookup::identity(standard_catalog(50, 50));
        for (code, fuel) in lookup.used_fuels() {
            let by_name = lookup.by_name(lookup.safe_name(code)).unwrap();
            assert_eq!(by_name, fuel);
        }
    }

    #[test]
    fn unknown_names_become_non_fuel() {
        let path = std::env::temp_dir().join("wildfire_fuel_lookup.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "{EXPECTED_HEADER}").unwrap();
        writeln!(f, "1,1,boreal spruce,C-2").unwrap();
        writeln!(f, "2,2,mystery,Z-9").unwrap();
        writeln!(f, "101,101,water,Non-fuel").unwrap();
        writeln!(f, "3,3,mixedwood,M-1/M-2").unwrap();
        drop(f);
        let lookup = FuelLookup::from_csv(&path, standard_catalog(50, 50)).unwrap();
        assert_eq!(lookup.safe_name(lookup.code_for_grid_value(1)), "C-2");
        assert_eq!(lookup.code_for_grid_value(2), 0);
        assert_eq!(lookup.code_for_grid_value(101), 0);
        assert_eq!(lookup.safe_name(lookup.code_for_grid_value(3)), "M-1");
        std::fs::remove_file(&path).ok();
    }
}
