//! Hourly weather from daily observations.
//!
//! Only FFMC and wind change meaningfully through the day (and with them
//! ISI and FWI). Daytime FFMC (12:00-20:00) comes from per-hour regression
//! curves fit against noon fine-fuel moisture (FRR245); the morning
//! (06:00-11:00) uses one of three curve families picked by how well each
//! family's 11:00 value anticipates the known next-noon FFMC; the night
//! (21:00-05:00) is linearly interpolated between 20:00 and the next
//! morning's 06:00. Wind follows a fixed 24-hour proportion table, and
//! precipitation is attributed to the noon hour only.

use std::collections::BTreeMap;

use crate::util::DAY_HOURS;
use crate::weather::{ffmc_from_moisture, FwiWeather, Wind};

/// Hourly wind speed as a proportion of the daily (noon) observation.
const WIND_BY_HOUR: [f64; DAY_HOURS] = [
    0.570, 0.565, 0.563, 0.563, 0.564, 0.581, 0.642, 0.725, 0.808, 0.880, 0.936, 0.977, 1.0,
    1.008, 0.999, 0.973, 0.915, 0.831, 0.724, 0.631, 0.593, 0.586, 0.584, 0.579,
];

fn ffmc_1200(x: f64) -> f64 {
    if x < 21.0 {
        let (a, b, c, d, e) = (
            1.460075956,
            -0.00039079,
            0.28156683,
            -0.00153983,
            -0.01282069,
        );
        ffmc_from_moisture(((a + c * x + e * x * x) / (1.0 + b * x + d * x * x)).powi(2))
    } else {
        let (a, b, c, d, e) = (
            -60.0581786,
            -0.79226507,
            1.04936e-05,
            24.04228773,
            -4.7906e+09,
        );
        ffmc_from_moisture(a + b * x + c * x.powi(3) + d * x.sqrt() + e * (-x).exp())
    }
}

fn ffmc_1300(x: f64) -> f64 {
    if x < 22.0 {
        let (a, b, c, d, e, f) = (
            1.255216373,
            0.022921707,
            0.35809518,
            -0.00333111,
            -0.01642423,
            3.05664e-05,
        );
        ffmc_from_moisture(
            ((a + c * x + e * x * x) / (1.0 + b * x + d * x * x + f * x.powi(3))).powi(2),
        )
    } else {
        let (a, b, c, d, e) = (
            806.4657627,
            -1.49162346,
            0.000887319,
            -11465.7458,
            12093.7804,
        );
        ffmc_from_moisture(a + b * x + c * x * x * x.ln() + d / x.sqrt() + e * x.ln() / x)
    }
}

fn ffmc_1400(x: f64) -> f64 {
    if x < 23.0 {
        let (a, b, c, d, e) = (
            0.908217387,
            0.989724752,
            0.001041606,
            4.634e-11,
            -0.00558197,
        );
        ffmc_from_moisture(a + b * x + c * x * x * x.sqrt() + d * x.exp() + e * x.ln())
    } else {
        let (a, b, c, d, e) = (
            6403.107753,
            352.7042531,
            873.3642944,
            -3766.49257,
            3580.933366,
        );
        ffmc_from_moisture(a + b * x + c * x.sqrt() * x.ln() + d * x / x.ln() + e / (x * x))
    }
}

fn ffmc_1500(x: f64) -> f64 {
    if x < 23.0 {
        let (a, b, c, d, e, f) = (
            0.248711327,
            0.9000214139,
            0.965899432,
            0.007692506,
            -0.00030317,
            1.12165e-05,
        );
        let x2 = x * x;
        ffmc_from_moisture(
            (a + b * x + c * x2 + d * x2 * x + e * x2 * x2 + f * x2 * x2 * x).sqrt(),
        )
    } else {
        let (a, b, c, d, e) = (
            3201.553847,
            176.852125,
            436.6821439,
            -1883.24627,
            1790.467302,
        );
        ffmc_from_moisture(a + b * x + c * x.sqrt() * x.ln() + d * x / x.ln() + e / (x * x))
    }
}

fn ffmc_1700(x: f64) -> f64 {
    if x < 40.0 {
        let (a, b, c, d, e) = (
            0.357837756,
            1.043214753,
            -0.0013703,
            -8.5092e-05,
            0.158059188,
        );
        ffmc_from_moisture(a + b * x + c * x * x + d * x * x * x.sqrt() + e * (-x).exp())
    } else {
        let (a, b, c, d, e) = (
            2776.473019,
            153.8288088,
            -0.0001011,
            371.9483315,
            -1620.09304,
        );
        ffmc_from_moisture(
            a + b * x + c * x * x * x.sqrt() + d * x.sqrt() * x.ln() + e * x / x.ln(),
        )
    }
}

fn ffmc_1800(x: f64) -> f64 {
    if x < 40.0 {
        let (a, b, c, d) = (1.071980333, 1.36047785, 1.201854444, -0.00827306);
        ffmc_from_moisture((a + b * x + c * x * x + d * x.powi(3)).sqrt())
    } else {
        let (a, b, c, d, e) = (
            5552.947643,
            306.6577058,
            -0.00020219,
            743.89688,
            -3240.18702,
        );
        ffmc_from_moisture(
            a + b * x + c * x * x * x.sqrt() + d * x.sqrt() * x.ln() + e * x / x.ln(),
        )
    }
}

fn ffmc_1900(x: f64) -> f64 {
    if x < 42.0 {
        let (a, b, c, d, e) = (
            1.948509314,
            1.124895722,
            -0.00510068,
            8.90555e-20,
            0.262028658,
        );
        ffmc_from_moisture(a + b * x + c * x * x + d * x.exp() + e * (-x).exp())
    } else {
        let (a, b, c, d, e) = (
            28.7672909,
            -1.51195157,
            0.421751405,
            -0.02633183,
            0.000585907,
        );
        ffmc_from_moisture(a + b * x + c * x * x.sqrt() + d * x * x + e * x * x * x.sqrt())
    }
}

fn ffmc_2000(x: f64) -> f64 {
    if x < 49.0 {
        let (a, b, c, d, e) = (
            3.367449306,
            1.0839743,
            0.007668483,
            -0.00361458,
            0.000267591,
        );
        ffmc_from_moisture(a + b * x + c * x * x + d * x * x * x.sqrt() + e * x.powi(3))
    } else {
        let (a, b, c, d, e) = (-111.658439, 1.238144219, -1.74e-06, 379.1717488, -5.512e+20);
        ffmc_from_moisture(a + b * x + c * x.powi(3) + d / x.ln() + e * (-x).exp())
    }
}

/// Relative-humidity category for the morning curve family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RhCategory {
    High,
    Medium,
    Low,
}

/// Lognormal fit `a + b·exp(-((ln(x/c))/d)²/2)` per morning hour 06-10 (and
/// 11:00 for the medium family); columns are (a, b, c, d).
const MORNING_HIGH: [(f64, f64, f64, f64); 5] = [
    (14.89281073, 194.5261398, 2159.088828, 2.390534289),
    (12.52268635, 160.3933412, 1308.435221, 2.26945513),
    (10.21004191, 136.7485497, 848.3773713, 2.154869886),
    (9.099751897, 127.608943, 1192.457539, 2.288739471),
    (7.891852885, 126.9570677, 2357.682971, 2.538559055),
];
const MORNING_MED: [(f64, f64, f64, f64); 6] = [
    (11.80584752, 145.1618675, 1610.269345, 2.412647414),
    (10.62087345, 120.3071748, 843.7712567, 2.143231971),
    (9.179219105, 105.6311973, 547.1226761, 1.946001003),
    (6.381382418, 88.54320781, 544.0978144, 2.000706808),
    (3.497497088, 71.24103374, 525.2068553, 2.010941812),
    (0.514536459, 53.63085254, 461.9583952, 2.149631748),
];
const MORNING_LOW: [(f64, f64, f64, f64); 5] = [
    (6.966628145, 65.41928741, 192.8242799, 1.748892433),
    (6.221403215, 61.83553856, 216.2009556, 1.812026562),
    (5.454482668, 58.64610176, 253.0830911, 1.896023728),
    (3.966946509, 47.66100216, 206.2626505, 1.814962092),
    (2.509991705, 37.42399135, 161.7254088, 1.710574764),
];

fn lognormal(x: f64, (a, b, c, d): (f64, f64, f64, f64)) -> f64 {
    ffmc_from_moisture(a + b * (-0.5 * ((x / c).ln() / d).powi(2)).exp())
}

fn ffmc_1100(x: f64, category: RhCategory) -> f64 {
    let ln_x = x.ln();
    let ln_x_sq = ln_x * ln_x;
    match category {
        RhCategory::High => {
            let (a, b, c, d, e) = (
                7.934004974,
                -0.2113458,
                -0.29835869,
                0.015806934,
                0.590134367,
            );
            ffmc_from_moisture((a + c * ln_x + e * ln_x_sq) / (1.0 + b * ln_x + d * ln_x_sq))
        }
        RhCategory::Medium => lognormal(x, MORNING_MED[5]),
        RhCategory::Low => {
            let (a, b, c, d, e) = (
                1.291826916,
                -0.38168658,
                0.15814773,
                0.051353647,
                0.356051255,
            );
            ffmc_from_moisture((a + c * ln_x + e * ln_x_sq) / (1.0 + b * ln_x + d * ln_x_sq))
        }
    }
}

fn morning_ffmc(x: f64, hour: usize, category: RhCategory) -> f64 {
    if hour == 11 {
        return ffmc_1100(x, category);
    }
    let idx = hour - 6;
    match category {
        RhCategory::High => lognormal(x, MORNING_HIGH[idx]),
        RhCategory::Medium => lognormal(x, MORNING_MED[idx]),
        RhCategory::Low => lognormal(x, MORNING_LOW[idx]),
    }
}

fn day_ffmc(x: f64, hour: usize, reported: f64) -> f64 {
    match hour {
        12 => ffmc_1200(x),
        13 => ffmc_1300(x),
        14 => ffmc_1400(x),
        15 => ffmc_1500(x),
        16 => reported,
        17 => ffmc_1700(x),
        18 => ffmc_1800(x),
        19 => ffmc_1900(x),
        20 => ffmc_2000(x),
        _ => unreachable!("not a daytime hour: {hour}"),
    }
}

fn make_wx(base: &FwiWeather, speed: f64, ffmc: f64, hour: usize) -> FwiWeather {
    let prec = if hour == 12 { base.prec } else { 0.0 };
    FwiWeather::from_indices(
        base.temp,
        base.rh,
        Wind::new(base.wind.direction_deg, speed.max(0.0)),
        prec,
        ffmc.clamp(0.0, 101.0),
        base.dmc,
        base.dc,
    )
}

fn scaled_wx(base: &FwiWeather, wind_of: &FwiWeather, ffmc: f64, hour: usize) -> FwiWeather {
    make_wx(base, wind_of.wind.speed * WIND_BY_HOUR[hour], ffmc, hour)
}

/// Expand daily (noon) observations into an hourly sequence.
///
/// Returns one slot per hour covering `[min_day, max_day + 1]`, indexed by
/// `(day - min_day) * 24 + hour`; slots outside the modelled window stay
/// `None`.
#[must_use]
pub fn expand_daily(daily: &BTreeMap<u32, FwiWeather>) -> Vec<Option<FwiWeather>> {
    let min_day = *daily.keys().next().expect("daily weather is not empty");
    let max_day = *daily.keys().next_back().expect("daily weather is not empty");
    let slots = (max_day - min_day + 2) as usize * DAY_HOURS;
    let mut hourly: Vec<Option<FwiWeather>> = vec![None; slots];
    let index = |day: u32, hour: usize| (day - min_day) as usize * DAY_HOURS + hour;
    // the first day borrows the next day's observation rather than zeros;
    // days are contiguous by CSV validation
    let wx_for = |day: u32| {
        if day == min_day {
            daily.get(&(min_day + 1)).unwrap_or(&daily[&min_day])
        } else {
            &daily[&day]
        }
    };
    // afternoon and evening from the day's own observation
    for &day in daily.keys() {
        let wx = wx_for(day);
        let x = wx.mc_ffmc_pct();
        for hour in 12..=20 {
            hourly[index(day, hour)] = Some(scaled_wx(wx, wx, day_ffmc(x, hour, wx.ffmc), hour));
        }
    }
    // trailing morning: no next noon to match against, assume high RH
    let wx_last = wx_for(max_day);
    let x_last = wx_last.mc_ffmc_pct();
    for hour in 6..=11 {
        hourly[index(max_day + 1, hour)] = Some(scaled_wx(
            wx_last,
            wx_last,
            morning_ffmc(x_last, hour, RhCategory::High),
            hour,
        ));
    }
    // mornings: pick the curve family whose 11:00 value sits closest under
    // the next day's known noon FFMC
    for day in (min_day..max_day).rev() {
        let wx = wx_for(day);
        let wind_wx = *wx_for(day + 1);
        let x = wx.mc_ffmc_pct();
        let at_1200 = hourly[index(day + 1, 12)]
            .as_ref()
            .expect("noon filled above")
            .ffmc;
        let candidates = [
            (RhCategory::Low, ffmc_1100(x, RhCategory::Low)),
            (RhCategory::Medium, ffmc_1100(x, RhCategory::Medium)),
            (RhCategory::High, ffmc_1100(x, RhCategory::High)),
        ];
        let category = candidates
            .iter()
            .filter(|(_, v)| at_1200 >= *v)
            .min_by(|a, b| {
                (at_1200 - a.1)
                    .abs()
                    .total_cmp(&(at_1200 - b.1).abs())
            })
            .map_or(RhCategory::High, |(c, _)| *c);
        for hour in 6..=11 {
            hourly[index(day + 1, hour)] = Some(scaled_wx(
                wx,
                &wind_wx,
                morning_ffmc(x, hour, category),
                hour,
            ));
        }
    }
    // nights: linear interpolation from 20:00 to next-day 06:00
    for day in (min_day..=max_day).rev() {
        let wx = *wx_for(day);
        let evening = hourly[index(day, 20)].expect("evening filled above");
        let morning = hourly[index(day + 1, 6)].expect("morning filled above");
        let ffmc_slope = (morning.ffmc - evening.ffmc) / 10.0;
        let wind_slope = (morning.wind.speed - evening.wind.speed) / 10.0;
        for offset in 1..=9usize {
            let hour = (20 + offset) % DAY_HOURS;
            let day_offset = if offset <= 3 { 0 } else { 1 };
            hourly[index(day + day_offset, hour)] = Some(make_wx(
                &wx,
                evening.wind.speed + wind_slope * offset as f64,
                evening.ffmc + ffmc_slope * offset as f64,
                hour,
            ));
        }
    }
    hourly
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily_fixture(days: std::ops::RangeInclusive<u32>, ffmc: f64) -> BTreeMap<u32, FwiWeather> {
        days.map(|d| {
            (
                d,
                FwiWeather::from_indices(20.0, 30.0, Wind::new(180.0, 20.0), 0.0, ffmc, 35.5, 275.0),
            )
        })
        .collect()
    }

    #[test]
    fn reported_ffmc_lands_at_1600() {
        let daily = daily_fixture(200..=203, 90.0);
        let hourly = expand_daily(&daily);
        let at_1600 = hourly[24 + 16].unwrap();
        assert!((at_1600.ffmc - 90.0).abs() < 1e-9);
    }

    #[test]
    fn every_hour_in_window_is_filled() {
        let daily = daily_fixture(200..=203, 88.0);
        let hourly = expand_daily(&daily);
        // hours from day 200 12:00 through day 204 11:00 must all exist
        let start = 12;
        let end = 4 * 24 + 11;
        for (i, slot) in hourly.iter().enumerate().take(end + 1).skip(start) {
            assert!(slot.is_some(), "hour slot {i} empty");
        }
    }

    #[test]
    fn night_interpolation_is_monotone_between_endpoints() {
        let daily = daily_fixture(200..=202, 91.0);
        let hourly = expand_daily(&daily);
        let evening = hourly[24 + 20].unwrap().ffmc;
        let morning = hourly[2 * 24 + 6].unwrap().ffmc;
        let (lo, hi) = if evening < morning {
            (evening, morning)
        } else {
            (morning, evening)
        };
        for hour in [21, 22, 23] {
            let v = hourly[24 + hour].unwrap().ffmc;
            assert!(v >= lo - 1e-9 && v <= hi + 1e-9);
        }
        for hour in [0, 1, 2, 3, 4, 5] {
            let v = hourly[2 * 24 + hour].unwrap().ffmc;
            assert!(v >= lo - 1e-9 && v <= hi + 1e-9);
        }
    }

    #[test]
    fn wind_follows_diurnal_proportions() {
        let daily = daily_fixture(200..=202, 90.0);
        let hourly = expand_daily(&daily);
        let noon = hourly[24 + 12].unwrap().wind.speed;
        let at_1300 = hourly[24 + 13].unwrap().wind.speed;
        assert!((noon - 20.0).abs() < 1e-9);
        assert!((at_1300 - 20.0 * 1.008).abs() < 1e-9);
    }

    #[test]
    fn precipitation_only_at_noon() {
        let mut daily = daily_fixture(200..=202, 90.0);
        for wx in daily.values_mut() {
            wx.prec = 4.0;
        }
        let hourly = expand_daily(&daily);
        assert!((hourly[24 + 12].unwrap().prec - 4.0).abs() < 1e-9);
        for hour in [13, 14, 20] {
            assert_eq!(hourly[24 + hour].unwrap().prec, 0.0);
        }
    }
}
