//! Runtime settings for a simulation run.
//!
//! The original design exposed these as process-wide state; here a single
//! immutable [`Settings`] value is built at startup and threaded through the
//! model and every scenario, so two runs with different settings can coexist
//! in one process (and in tests).

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// All knobs the simulation core reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Disable random spread/extinction gates and run a single iteration.
    pub deterministic: bool,
    /// Head ROS below this never spreads (m/min).
    pub minimum_ros: f64,
    /// Cap on how many cell widths a point may travel in one step.
    pub maximum_spread_distance: f64,
    /// Minimum FFMC for daytime spread.
    pub minimum_ffmc: f64,
    /// Minimum FFMC for spread between sunset and sunrise.
    pub minimum_ffmc_at_night: f64,
    /// Hours added to computed sunrise.
    pub offset_sunrise: f64,
    /// Hours subtracted from computed sunset.
    pub offset_sunset: f64,
    /// Percent conifer used for M-1/M-2 lookup entries (multiple of 5).
    pub default_percent_conifer: u8,
    /// Percent dead fir used for M-3/M-4 lookup entries (multiple of 5).
    pub default_percent_dead_fir: u8,
    /// Upper bound of the low intensity class (kW/m).
    pub intensity_max_low: u32,
    /// Upper bound of the moderate intensity class (kW/m).
    pub intensity_max_moderate: u32,
    /// Relative error all three stopping statistics must reach.
    pub confidence_level: f64,
    /// Wall-clock budget for the whole run.
    pub maximum_time_seconds: u64,
    /// Hard cap on total scenarios across all iterations.
    pub maximum_count_simulations: usize,
    /// Weight of the per-scenario draw in threshold generation.
    pub threshold_scenario_weight: f64,
    /// Weight of the per-day draw in threshold generation.
    pub threshold_daily_weight: f64,
    /// Weight of the per-hour draw in threshold generation.
    pub threshold_hourly_weight: f64,
    /// Day offsets (from ignition day) at which outputs are saved.
    pub output_date_offsets: Vec<u32>,
    /// Save per-scenario rasters in addition to aggregates.
    pub save_individual: bool,
    /// Write ASCII grids rather than binary rasters.
    pub save_as_ascii: bool,
    /// Log front points as they advance.
    pub save_points: bool,
    /// Save intensity class counts alongside totals.
    pub save_intensity: bool,
    /// Save burn probability rasters.
    pub save_probability: bool,
    /// Save occurrence (ever-burned) rasters.
    pub save_occurrence: bool,
    /// Save the simulation extent raster.
    pub save_simulation_area: bool,
    /// Run every combustible cell as its own single-scenario ignition.
    pub surface: bool,
    /// Run scenarios on worker threads rather than inline.
    pub run_async: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            deterministic: false,
            minimum_ros: 0.05,
            maximum_spread_distance: 3.0,
            minimum_ffmc: 37.0,
            minimum_ffmc_at_night: 85.0,
            offset_sunrise: 2.5,
            offset_sunset: 0.5,
            default_percent_conifer: 50,
            default_percent_dead_fir: 50,
            intensity_max_low: 2000,
            intensity_max_moderate: 4000,
            confidence_level: 0.75,
            maximum_time_seconds: 3600,
            maximum_count_simulations: 100_000,
            threshold_scenario_weight: 4.0,
            threshold_daily_weight: 2.0,
            threshold_hourly_weight: 1.0,
            output_date_offsets: vec![1, 2, 3],
            save_individual: false,
            save_as_ascii: true,
            save_points: false,
            save_intensity: true,
            save_probability: true,
            save_occurrence: false,
            save_simulation_area: false,
            surface: false,
            run_async: true,
        }
    }
}

impl Settings {
    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.output_date_offsets.is_empty() {
            return Err(SimulationError::InvalidSettings(
                "output_date_offsets must not be empty".into(),
            ));
        }
        // offset 1 is the first midnight after ignition; 0 would schedule a
        // save before the simulation starts
        if self.output_date_offsets.iter().any(|&offset| offset == 0) {
            return Err(SimulationError::InvalidSettings(
                "output_date_offsets must be at least 1".into(),
            ));
        }
        if self.intensity_max_low >= self.intensity_max_moderate {
            return Err(SimulationError::InvalidSettings(format!(
                "intensity class bounds out of order: low {} >= moderate {}",
                self.intensity_max_low, self.intensity_max_moderate
            )));
        }
        for (name, pct) in [
            ("default_percent_conifer", self.default_percent_conifer),
            ("default_percent_dead_fir", self.default_percent_dead_fir),
        ] {
            if pct > 100 || pct % 5 != 0 {
                return Err(SimulationError::InvalidSettings(format!(
                    "{name} must be a multiple of 5 in [0, 100], got {pct}"
                )));
            }
        }
        if !(0.0..1.0).contains(&self.confidence_level) {
            return Err(SimulationError::InvalidSettings(format!(
                "confidence_level must be in [0, 1), got {}",
                self.confidence_level
            )));
        }
        Ok(())
    }

    /// Minimum FFMC for spread depending on day/night.
    #[must_use]
    pub fn minimum_ffmc_for(&self, at_night: bool) -> f64 {
        if at_night {
            self.minimum_ffmc_at_night
        } else {
            self.minimum_ffmc
        }
    }

    /// Largest configured save offset.
    #[must_use]
    pub fn max_date_offset(&self) -> u32 {
        self.output_date_offsets.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_percent() {
        let mut s = Settings::default();
        s.default_percent_conifer = 37;
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_inverted_intensity_bounds() {
        let mut s = Settings::default();
        s.intensity_max_moderate = s.intensity_max_low;
        assert!(s.validate().is_err());
    }
}
