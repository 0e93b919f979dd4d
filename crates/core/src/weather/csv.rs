//! The weather CSV collaborator.
//!
//! Produces ordered hourly weather keyed by scenario id. Validation is
//! strict: the header must match exactly, rows within a scenario must be
//! sequential hours with strictly increasing timestamps, and a stream must
//! not cross a year boundary (simulation time is day-of-year based).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::info;

use crate::error::SimulationError;
use crate::fuel::FuelType;
use crate::util::DAY_HOURS;
use crate::weather::{expand_daily, FwiWeather, WeatherStream, Wind};

const EXPECTED_HEADER: &str = "Scenario,Date,PREC,TEMP,RH,WS,WD,FFMC,DMC,DC,ISI,BUI,FWI";

/// All hourly rows for one scenario id, in time order.
#[derive(Debug, Clone)]
pub struct WeatherSource {
    pub scenario: u32,
    pub year: i32,
    entries: Vec<(NaiveDateTime, FwiWeather)>,
}

impl WeatherSource {
    /// First day-of-year with data.
    #[must_use]
    pub fn min_day(&self) -> u32 {
        self.entries.first().map_or(0, |(t, _)| t.ordinal())
    }

    /// Last day-of-year with data.
    #[must_use]
    pub fn max_day(&self) -> u32 {
        self.entries.last().map_or(0, |(t, _)| t.ordinal())
    }

    #[must_use]
    pub fn entries(&self) -> &[(NaiveDateTime, FwiWeather)] {
        &self.entries
    }

    /// Hourly stream straight from the rows.
    #[must_use]
    pub fn hourly_stream(&self, fuels: &[(u8, &FuelType)], deterministic: bool) -> WeatherStream {
        let (min_day, max_day) = (self.min_day(), self.max_day());
        let mut by_hour = vec![None; (max_day - min_day + 2) as usize * DAY_HOURS];
        for (when, wx) in &self.entries {
            let idx = (when.ordinal() - min_day) as usize * DAY_HOURS + when.hour() as usize;
            by_hour[idx] = Some(*wx);
        }
        WeatherStream::new(min_day, max_day, by_hour, fuels, deterministic)
    }

    /// Stream of daily (noon) values expanded by the diurnal model; used
    /// for the survival checks and the minimum-FFMC spread gate.
    #[must_use]
    pub fn daily_stream(&self, fuels: &[(u8, &FuelType)], deterministic: bool) -> WeatherStream {
        let noon: BTreeMap<u32, FwiWeather> = self
            .entries
            .iter()
            .filter(|(t, _)| t.hour() == 12)
            .map(|(t, wx)| (t.ordinal(), *wx))
            .collect();
        if noon.is_empty() {
            // a stream without noon rows degrades to its own hourly data
            return self.hourly_stream(fuels, deterministic);
        }
        let min_day = *noon.keys().next().expect("checked non-empty");
        let max_day = *noon.keys().next_back().expect("checked non-empty");
        WeatherStream::new(min_day, max_day, expand_daily(&noon), fuels, deterministic)
    }
}

fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(t);
        }
    }
    None
}

/// Read every scenario's weather from one CSV file.
pub fn read_weather_csv(path: &Path) -> Result<Vec<WeatherSource>, SimulationError> {
    let file = File::open(path).map_err(|e| SimulationError::io(path.display().to_string(), e))?;
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
    let mut by_scenario: BTreeMap<u32, WeatherSource> = BTreeMap::new();
    for (line_no, line) in lines {
        let line = line.map_err(|e| SimulationError::io(path.display().to_string(), e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let malformed = |value: &str| SimulationError::Malformed {
            path: path.display().to_string(),
            line: line_no + 1,
            value: value.to_string(),
        };
        if fields.len() != 13 {
            return Err(malformed(line));
        }
        let scenario: u32 = fields[0].parse().map_err(|_| malformed(fields[0]))?;
        let when = parse_date(fields[1]).ok_or_else(|| malformed(fields[1]))?;
        let number = |i: usize| -> Result<f64, SimulationError> {
            fields[i].parse().map_err(|_| malformed(fields[i]))
        };
        let wx = FwiWeather {
            prec: number(2)?,
            temp: number(3)?,
            rh: number(4)?,
            wind: Wind::new(number(6)?, number(5)?),
            ffmc: number(7)?,
            dmc: number(8)?,
            dc: number(9)?,
            isi: number(10)?,
            bui: number(11)?,
            fwi: number(12)?,
        };
        let source = by_scenario.entry(scenario).or_insert_with(|| WeatherSource {
            scenario,
            year: when.year(),
            entries: Vec::new(),
        });
        if let Some((prev, _)) = source.entries.last() {
            let gap = (when - *prev).num_seconds();
            if gap != 3600 {
                return Err(SimulationError::WeatherGap {
                    scenario,
                    detail: format!("{prev} -> {when} ({gap} s)"),
                });
            }
        }
        if when.year() != source.year {
            return Err(SimulationError::YearBoundary);
        }
        source.entries.push((when, wx));
    }
    if by_scenario.is_empty() {
        return Err(SimulationError::Malformed {
            path: path.display().to_string(),
            line: 1,
            value: "no weather rows".to_string(),
        });
    }
    let sources: Vec<WeatherSource> = by_scenario.into_values().collect();
    info!(
        streams = sources.len(),
        hours = sources.iter().map(|s| s.entries.len()).sum::<usize>(),
        "weather loaded"
    );
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut f = File::create(&path).unwrap();
        writeln!(f, "{EXPECTED_HEADER}").unwrap();
        write!(f, "{body}").unwrap();
        path
    }

    fn row(scenario: u32, date: &str, ffmc: f64) -> String {
        format!("{scenario},{date},0,20,30,20,180,{ffmc},35.5,275,8.5,58,20\n")
    }

    #[test]
    fn accepts_sequential_hours() {
        let body = row(1, "2023-07-19 11:00", 89.0)
            + &row(1, "2023-07-19 12:00", 90.0)
            + &row(1, "2023-07-19 13:00", 90.5);
        let path = write_csv("wildfire_wx_ok.csv", &body);
        let sources = read_weather_csv(&path).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].entries().len(), 3);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_gaps() {
        let body = row(1, "2023-07-19 11:00", 89.0) + &row(1, "2023-07-19 14:00", 90.0);
        let path = write_csv("wildfire_wx_gap.csv", &body);
        assert!(matches!(
            read_weather_csv(&path),
            Err(SimulationError::WeatherGap { .. })
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_wrong_header() {
        let path = std::env::temp_dir().join("wildfire_wx_header.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "Scenario,Day,PREC").unwrap();
        drop(f);
        assert!(matches!(
            read_weather_csv(&path),
            Err(SimulationError::HeaderMismatch { .. })
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn splits_scenarios() {
        let body = row(1, "2023-07-19 12:00", 90.0) + &row(2, "2023-07-19 12:00", 85.0);
        let path = write_csv("wildfire_wx_split.csv", &body);
        let sources = read_weather_csv(&path).unwrap();
        assert_eq!(sources.len(), 2);
        std::fs::remove_file(&path).ok();
    }
}
