//! Fire-weather records and the FWI moisture arithmetic.

mod csv;
mod diurnal;
mod stream;

pub use csv::{read_weather_csv, WeatherSource};
pub use diurnal::expand_daily;
pub use stream::WeatherStream;

use serde::{Deserialize, Serialize};

use crate::util;

/// Wind as observed: the direction it blows *from* (degrees) and speed
/// (km/h). The heading (direction of push) and its components are derived
/// once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub direction_deg: f64,
    pub speed: f64,
    heading_rad: f64,
    wsv_x: f64,
    wsv_y: f64,
}

impl Wind {
    #[must_use]
    pub fn new(direction_deg: f64, speed: f64) -> Self {
        let heading_rad = util::to_heading(util::to_radians(direction_deg));
        Wind {
            direction_deg: util::fix_degrees(direction_deg),
            speed,
            heading_rad,
            wsv_x: speed * heading_rad.sin(),
            wsv_y: speed * heading_rad.cos(),
        }
    }

    /// Direction the wind pushes the fire towards (radians).
    #[inline]
    #[must_use]
    pub fn heading(&self) -> f64 {
        self.heading_rad
    }

    #[inline]
    #[must_use]
    pub fn wsv_x(&self) -> f64 {
        self.wsv_x
    }

    #[inline]
    #[must_use]
    pub fn wsv_y(&self) -> f64 {
        self.wsv_y
    }
}

const FFMC_MOISTURE_CONSTANT: f64 = 147.27723;

/// Fine fuel moisture content (%) from FFMC. [FF scale]
#[inline]
#[must_use]
pub fn moisture_from_ffmc(ffmc: f64) -> f64 {
    FFMC_MOISTURE_CONSTANT * (101.0 - ffmc) / (59.5 + ffmc)
}

/// FFMC from fine fuel moisture content (%). [FF scale]
#[inline]
#[must_use]
pub fn ffmc_from_moisture(mc: f64) -> f64 {
    (59.5 * (250.0 - mc) / (FFMC_MOISTURE_CONSTANT + mc)).clamp(0.0, 101.0)
}

/// FFMC fuel-moisture function f(F). [FWI eq 45]
#[inline]
#[must_use]
pub fn ffmc_effect(ffmc: f64) -> f64 {
    let mc = moisture_from_ffmc(ffmc);
    91.9 * (-0.1386 * mc).exp() * (1.0 + mc.powf(5.31) / 49_300_000.0)
}

/// Initial spread index from FFMC and wind speed. [FWI eq 52/53]
#[inline]
#[must_use]
pub fn initial_spread_index(ws: f64, ffmc: f64) -> f64 {
    0.208 * (0.05039 * ws).exp() * ffmc_effect(ffmc)
}

/// Build-up index from DMC and DC. [FWI eq 27]
#[must_use]
pub fn build_up_index(dmc: f64, dc: f64) -> f64 {
    if dmc == 0.0 && dc == 0.0 {
        return 0.0;
    }
    if dmc <= 0.4 * dc {
        0.8 * dmc * dc / (dmc + 0.4 * dc)
    } else {
        dmc - (1.0 - 0.8 * dc / (dmc + 0.4 * dc)) * (0.92 + (0.0114 * dmc).powf(1.7))
    }
}

/// Fire weather index from BUI and ISI. [FWI eq 28-30]
#[must_use]
pub fn fire_weather_index(isi: f64, bui: f64) -> f64 {
    let f_d = if bui > 80.0 {
        1000.0 / (25.0 + 108.64 * (-0.023 * bui).exp())
    } else {
        0.626 * bui.powf(0.809) + 2.0
    };
    let b = 0.1 * isi * f_d;
    if b > 1.0 {
        (2.72 * (0.434 * b.ln()).powf(0.647)).exp()
    } else {
        b
    }
}

/// Daily severity rating. [FWI eq 31]
#[inline]
#[must_use]
pub fn daily_severity_rating(fwi: f64) -> f64 {
    0.0272 * fwi.powf(1.77)
}

/// One hour's fire weather: observations plus the FWI indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FwiWeather {
    pub temp: f64,
    pub rh: f64,
    pub wind: Wind,
    pub prec: f64,
    pub ffmc: f64,
    pub dmc: f64,
    pub dc: f64,
    pub isi: f64,
    pub bui: f64,
    pub fwi: f64,
}

impl FwiWeather {
    /// Build a record, deriving ISI/BUI/FWI from the moisture codes.
    #[must_use]
    pub fn from_indices(
        temp: f64,
        rh: f64,
        wind: Wind,
        prec: f64,
        ffmc: f64,
        dmc: f64,
        dc: f64,
    ) -> Self {
        let isi = initial_spread_index(wind.speed, ffmc);
        let bui = build_up_index(dmc, dc);
        let fwi = fire_weather_index(isi, bui);
        FwiWeather {
            temp,
            rh,
            wind,
            prec,
            ffmc,
            dmc,
            dc,
            isi,
            bui,
            fwi,
        }
    }

    /// Moisture content (%) from FFMC.
    #[inline]
    #[must_use]
    pub fn mc_ffmc_pct(&self) -> f64 {
        moisture_from_ffmc(self.ffmc)
    }

    /// Moisture content (ratio) from FFMC.
    #[inline]
    #[must_use]
    pub fn mc_ffmc(&self) -> f64 {
        self.mc_ffmc_pct() / 100.0
    }

    /// Moisture content (%) from DMC.
    #[inline]
    #[must_use]
    pub fn mc_dmc_pct(&self) -> f64 {
        20.0 + 280.0 / (0.023 * self.dmc).exp()
    }

    /// Moisture content (ratio) from DMC.
    #[inline]
    #[must_use]
    pub fn mc_dmc(&self) -> f64 {
        self.mc_dmc_pct() / 100.0
    }

    /// f(F) for this record's FFMC.
    #[inline]
    #[must_use]
    pub fn ffmc_effect(&self) -> f64 {
        ffmc_effect(self.ffmc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moisture_round_trips_through_ffmc() {
        for ffmc in [30.0, 60.0, 85.0, 90.0, 96.0] {
            let back = ffmc_from_moisture(moisture_from_ffmc(ffmc));
            assert!((back - ffmc).abs() < 1e-4, "{ffmc} -> {back}");
        }
    }

    #[test]
    fn isi_grows_with_wind_and_ffmc() {
        assert!(initial_spread_index(30.0, 90.0) > initial_spread_index(10.0, 90.0));
        assert!(initial_spread_index(20.0, 94.0) > initial_spread_index(20.0, 85.0));
    }

    #[test]
    fn bui_zero_when_codes_zero() {
        assert_eq!(build_up_index(0.0, 0.0), 0.0);
        assert!(build_up_index(35.5, 275.0) > 0.0);
    }

    #[test]
    fn wind_heading_opposes_direction() {
        let wind = Wind::new(180.0, 20.0);
        // from the south -> pushes north
        assert!((crate::util::to_degrees(wind.heading()) - 0.0).abs() < 1e-6);
        assert!(wind.wsv_y() > 19.9);
        assert!(wind.wsv_x().abs() < 1e-6);
    }

    #[test]
    fn dmc_moisture_decreases_with_dmc() {
        let wet = FwiWeather::from_indices(20.0, 30.0, Wind::new(0.0, 10.0), 0.0, 85.0, 5.0, 100.0);
        let dry =
            FwiWeather::from_indices(20.0, 30.0, Wind::new(0.0, 10.0), 0.0, 85.0, 60.0, 100.0);
        assert!(wet.mc_dmc_pct() > dry.mc_dmc_pct());
    }
}
