//! Hourly weather streams with precomputed survival probabilities.

use std::collections::HashMap;

use crate::fuel::FuelType;
use crate::util::{time_index_since, DAY_HOURS};
use crate::weather::{daily_severity_rating, FwiWeather};

/// One scenario's ordered hourly weather, plus the per-fuel survival
/// probabilities so the extinction check during a run is a pair of array
/// lookups.
#[derive(Debug, Clone)]
pub struct WeatherStream {
    min_day: u32,
    max_day: u32,
    by_hour: Vec<Option<FwiWeather>>,
    survival: HashMap<u8, Vec<f64>>,
    weighted_dsr: u64,
}

impl WeatherStream {
    /// Wrap an hourly sequence covering `[min_day, max_day + 1]`.
    ///
    /// `fuels` pairs each fuel code in use with its catalog entry; survival
    /// probabilities are precomputed for exactly those fuels. In
    /// deterministic mode survival is pinned to 1.
    #[must_use]
    pub fn new(
        min_day: u32,
        max_day: u32,
        by_hour: Vec<Option<FwiWeather>>,
        fuels: &[(u8, &FuelType)],
        deterministic: bool,
    ) -> Self {
        debug_assert_eq!(by_hour.len(), (max_day - min_day + 2) as usize * DAY_HOURS);
        let mut survival = HashMap::new();
        for (code, fuel) in fuels {
            let by_fuel: Vec<f64> = by_hour
                .iter()
                .map(|slot| match slot {
                    Some(wx) if !deterministic => fuel.survival_probability(wx),
                    Some(_) => 1.0,
                    None => 0.0,
                })
                .collect();
            survival.insert(*code, by_fuel);
        }
        // weight danger severity so conditions near the stream start matter
        // most, decaying geometrically per hour
        let mut weighted_dsr = 0.0;
        let mut weight = 1e9;
        for wx in by_hour.iter().flatten() {
            weighted_dsr += weight * daily_severity_rating(wx.fwi);
            weight *= 0.8;
        }
        WeatherStream {
            min_day,
            max_day,
            by_hour,
            survival,
            weighted_dsr: weighted_dsr as u64,
        }
    }

    #[inline]
    #[must_use]
    pub fn min_day(&self) -> u32 {
        self.min_day
    }

    #[inline]
    #[must_use]
    pub fn max_day(&self) -> u32 {
        self.max_day
    }

    /// Severity of this stream's weather, front-loaded in time.
    #[inline]
    #[must_use]
    pub fn weighted_dsr(&self) -> u64 {
        self.weighted_dsr
    }

    fn slot(&self, time: f64) -> Option<usize> {
        if time < f64::from(self.min_day) {
            return None;
        }
        let idx = time_index_since(time, self.min_day);
        (idx < self.by_hour.len()).then_some(idx)
    }

    /// Weather for the hour containing `time` (decimal days).
    #[must_use]
    pub fn at(&self, time: f64) -> Option<&FwiWeather> {
        self.slot(time).and_then(|i| self.by_hour[i].as_ref())
    }

    /// Precomputed survival probability for a fuel at `time`; 0 when the
    /// weather or fuel is unknown, so a missing lookup reads as
    /// non-survival.
    #[must_use]
    pub fn survival_probability(&self, time: f64, fuel_code: u8) -> f64 {
        match (self.slot(time), self.survival.get(&fuel_code)) {
            (Some(i), Some(by_fuel)) => by_fuel[i],
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuel::standard_catalog;
    use crate::weather::Wind;

    fn stream() -> (WeatherStream, Vec<crate::fuel::FuelType>) {
        let catalog = standard_catalog(50, 50);
        let wx = FwiWeather::from_indices(20.0, 30.0, Wind::new(180.0, 20.0), 0.0, 90.0, 35.5, 275.0);
        let hours = (202 - 200 + 2) * DAY_HOURS;
        let by_hour = vec![Some(wx); hours];
        let fuels: Vec<(u8, &crate::fuel::FuelType)> = vec![(2, &catalog[1])];
        let stream = WeatherStream::new(200, 202, by_hour, &fuels, false);
        (stream, catalog.clone())
    }

    #[test]
    fn lookup_is_by_hour() {
        let (stream, _) = stream();
        assert!(stream.at(200.5).is_some());
        assert!(stream.at(199.0).is_none());
        assert!(stream.at(250.0).is_none());
    }

    #[test]
    fn unknown_fuel_reads_as_non_survival() {
        let (stream, _) = stream();
        assert_eq!(stream.survival_probability(200.5, 99), 0.0);
        assert!(stream.survival_probability(200.5, 2) > 0.0);
    }

    #[test]
    fn deterministic_survival_is_one() {
        let catalog = standard_catalog(50, 50);
        let wx = FwiWeather::from_indices(20.0, 30.0, Wind::new(180.0, 20.0), 0.0, 90.0, 35.5, 275.0);
        let by_hour = vec![Some(wx); 2 * DAY_HOURS];
        let fuels: Vec<(u8, &crate::fuel::FuelType)> = vec![(2, &catalog[1])];
        let stream = WeatherStream::new(200, 200, by_hour, &fuels, true);
        assert_eq!(stream.survival_probability(200.5, 2), 1.0);
    }
}
