//! Writing probability rasters and size lists to disk.
//!
//! Output naming follows `<kind>_<YYYYmmdd_HHMM>.asc`; interim variants
//! carry an `interim_` prefix and are deleted once the final save lands.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::SimulationError;
use crate::grid::write_ascii;
use crate::settings::Settings;
use crate::sim::ProbabilitySnapshot;

fn time_stamp(year: i32, time: f64) -> String {
    let day = time.trunc() as u32;
    let hour = ((time - time.trunc()) * 24.0).round() as u32;
    let date = NaiveDate::from_yo_opt(year, day.max(1))
        .unwrap_or_else(|| NaiveDate::from_yo_opt(year, 1).expect("day 1 exists"));
    format!("{}_{:02}00", date.format("%Y%m%d"), hour)
}

/// Writes one run's outputs into a directory.
#[derive(Debug)]
pub struct OutputWriter {
    directory: PathBuf,
    year: i32,
    settings: Settings,
}

impl OutputWriter {
    pub fn new(
        directory: impl Into<PathBuf>,
        year: i32,
        settings: Settings,
    ) -> Result<Self, SimulationError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)
            .map_err(|e| SimulationError::io(directory.display().to_string(), e))?;
        Ok(OutputWriter {
            directory,
            year,
            settings,
        })
    }

    fn raster_path(&self, kind: &str, time: f64, interim: bool) -> PathBuf {
        let marker = if interim { "interim_" } else { "" };
        self.directory
            .join(format!("{marker}{kind}_{}.asc", time_stamp(self.year, time)))
    }

    /// Write every configured raster for every snapshot.
    pub fn save_all(
        &self,
        snapshots: &[ProbabilitySnapshot],
        interim: bool,
    ) -> Result<(), SimulationError> {
        for snapshot in snapshots {
            if self.settings.save_probability {
                let probabilities = snapshot.probabilities();
                let path = self.raster_path("total", snapshot.time, interim);
                write_ascii(probabilities.values(), probabilities.extent(), &path)?;
            }
            if self.settings.save_intensity {
                for (kind, grid) in [
                    ("low", &snapshot.low),
                    ("moderate", &snapshot.moderate),
                    ("high", &snapshot.high),
                ] {
                    let path = self.raster_path(kind, snapshot.time, interim);
                    write_ascii(grid.values(), grid.extent(), &path)?;
                }
            }
            if self.settings.save_occurrence {
                let mut occurrence = snapshot.total.clone();
                for value in occurrence.values_mut() {
                    *value = u64::from(*value > 0);
                }
                let path = self.raster_path("occurrence", snapshot.time, interim);
                write_ascii(occurrence.values(), occurrence.extent(), &path)?;
            }
        }
        info!(
            directory = %self.directory.display(),
            snapshots = snapshots.len(),
            interim,
            "saved output rasters"
        );
        if !interim {
            self.delete_interim(snapshots);
        }
        Ok(())
    }

    /// Write final sizes (ha) as a single-column CSV.
    pub fn save_sizes(&self, sizes: &[f64]) -> Result<(), SimulationError> {
        let path = self.directory.join("sizes.csv");
        let mut out =
            File::create(&path).map_err(|e| SimulationError::io(path.display().to_string(), e))?;
        let mut body = String::from("size_ha\n");
        for size in sizes {
            body.push_str(&format!("{size:.1}\n"));
        }
        out.write_all(body.as_bytes())
            .map_err(|e| SimulationError::io(path.display().to_string(), e))
    }

    fn delete_interim(&self, snapshots: &[ProbabilitySnapshot]) {
        for snapshot in snapshots {
            for kind in ["total", "low", "moderate", "high", "occurrence"] {
                let path = self.raster_path(kind, snapshot.time, true);
                if path.exists() {
                    if let Err(error) = std::fs::remove_file(&path) {
                        warn!(path = %path.display(), %error, "could not delete interim file");
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{BurnedData, GridExtent};
    use crate::sim::{IntensityMap, ProbabilityMap};

    fn snapshot() -> ProbabilitySnapshot {
        let extent = GridExtent {
            rows: 3,
            columns: 3,
            cell_size: 100.0,
            xllcorner: 0.0,
            yllcorner: 0.0,
            nodata: -9999.0,
        };
        let map = ProbabilityMap::new(extent, 201.0, 2000, 4000);
        let mut intensity = IntensityMap::new(extent, BurnedData::new(extent.cells()));
        intensity.burn(4, 1000);
        map.add_probability(&intensity);
        map.snapshot()
    }

    #[test]
    fn final_save_removes_interim_files() {
        let dir = std::env::temp_dir().join("wildfire_output_test");
        let writer = OutputWriter::new(&dir, 2023, Settings::default()).unwrap();
        let snapshots = vec![snapshot()];
        writer.save_all(&snapshots, true).unwrap();
        let interim = writer.raster_path("total", 201.0, true);
        assert!(interim.exists());
        writer.save_all(&snapshots, false).unwrap();
        assert!(!interim.exists());
        assert!(writer.raster_path("total", 201.0, false).exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn timestamp_format() {
        assert_eq!(time_stamp(2023, 201.0), "20230720_0000");
        assert_eq!(time_stamp(2023, 201.5), "20230720_1200");
    }
}
