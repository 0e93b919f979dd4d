//! Sunrise and sunset times for the ignition coordinate.

use crate::util::{fix_degrees, to_degrees, to_radians};

/// Sentinel returned when the sun never rises on a day.
pub const SUN_NEVER_RISES: f64 = -1.0;
/// Sentinel returned when the sun never sets on a day.
pub const SUN_NEVER_SETS: f64 = 25.0;

const MAX_DAYS: usize = 366;

fn fix_hours(mut value: f64) -> f64 {
    while value < 0.0 {
        value += 24.0;
    }
    while value >= 24.0 {
        value -= 24.0;
    }
    value
}

/// Civil sunrise or sunset hour for a julian day at a coordinate.
///
/// Follows the Almanac for Computers algorithm. The sentinels (`-1` when
/// the sun never rises, `25` when it never sets) must never feed into
/// min/max arithmetic downstream; day-bound computation clamps instead.
fn sunrise_sunset(jd: i32, latitude: f64, longitude: f64, for_sunrise: bool) -> f64 {
    let zenith = to_radians(96.0);
    let local_offset = -5.0;
    let t_hour = if for_sunrise { 6.0 } else { 18.0 };
    let lng_hour = longitude / 15.0;
    let t = f64::from(jd) + (t_hour - lng_hour) / 24.0;
    let m = 0.9856 * t - 3.289;
    let l = fix_degrees(
        m + 1.916 * to_radians(m).sin() + 0.020 * to_radians(2.0 * m).sin() + 282.634,
    );
    // right ascension, brought into the same quadrant as l below
    let mut ra = fix_degrees(to_degrees((0.91764 * to_radians(l).tan()).atan()));
    let l_quadrant = (l / 90.0).floor() * 90.0;
    let ra_quadrant = (ra / 90.0).floor() * 90.0;
    ra += l_quadrant - ra_quadrant;
    ra /= 15.0;
    let sin_dec = 0.39782 * to_radians(l).sin();
    let cos_dec = sin_dec.asin().cos();
    let cos_h = (zenith.cos() - sin_dec * to_radians(latitude).sin())
        / (cos_dec * to_radians(latitude).cos());
    if cos_h > 1.0 {
        return if for_sunrise {
            SUN_NEVER_RISES
        } else {
            SUN_NEVER_SETS
        };
    }
    if cos_h < -1.0 {
        return if for_sunrise {
            SUN_NEVER_SETS
        } else {
            SUN_NEVER_RISES
        };
    }
    let mut h = to_degrees(cos_h.acos());
    if for_sunrise {
        h = 360.0 - h;
    }
    h /= 15.0;
    let mean_t = h + ra - 0.06571 * t - 6.622;
    let ut = mean_t - lng_hour;
    fix_hours(ut + local_offset)
}

/// The ignition coordinate with per-day daylight bounds.
#[derive(Debug, Clone)]
pub struct StartPoint {
    latitude: f64,
    longitude: f64,
    days: Vec<(f64, f64)>,
}

impl StartPoint {
    /// Precompute sunrise/sunset for every day of the year, shifted by the
    /// configured offsets.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, offset_sunrise: f64, offset_sunset: f64) -> Self {
        let days = (0..MAX_DAYS)
            .map(|jd| {
                let rise = sunrise_sunset(jd as i32, latitude, longitude, true);
                let set = sunrise_sunset(jd as i32, latitude, longitude, false);
                // sentinels are pinned, not offset
                let rise = if rise < 0.0 || rise > 24.0 {
                    rise
                } else {
                    fix_hours(rise + offset_sunrise)
                };
                let set = if set < 0.0 || set > 24.0 {
                    set
                } else {
                    fix_hours(set - offset_sunset)
                };
                (rise, set)
            })
            .collect();
        StartPoint {
            latitude,
            longitude,
            days,
        }
    }

    #[inline]
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[inline]
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Hour daylight starts on `day` (after the sunrise offset).
    #[must_use]
    pub fn day_start(&self, day: usize) -> f64 {
        self.days[day.min(MAX_DAYS - 1)].0
    }

    /// Hour daylight ends on `day` (after the sunset offset).
    #[must_use]
    pub fn day_end(&self, day: usize) -> f64 {
        self.days[day.min(MAX_DAYS - 1)].1
    }

    /// Whether the given simulation time (decimal days) is at night.
    #[must_use]
    pub fn is_at_night(&self, time: f64) -> bool {
        let day = time.trunc();
        let hour_part = 24.0 * (time - day);
        let (rise, set) = self.days[(day as usize).min(MAX_DAYS - 1)];
        if rise == SUN_NEVER_RISES {
            return true;
        }
        if set == SUN_NEVER_SETS {
            return false;
        }
        hour_part < rise || hour_part > set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_latitude_summer_day_is_long() {
        let point = StartPoint::new(52.0, -89.0, 0.0, 0.0);
        // day 172 is around the solstice
        let rise = point.day_start(172);
        let set = point.day_end(172);
        assert!(rise > 0.0 && rise < 9.0, "sunrise {rise}");
        assert!(set > 15.0 && set < 24.0, "sunset {set}");
        assert!(set - rise > 12.0);
    }

    #[test]
    fn night_check_brackets_daylight() {
        let point = StartPoint::new(52.0, -89.0, 0.0, 0.0);
        assert!(point.is_at_night(172.0));
        assert!(!point.is_at_night(172.5));
        assert!(point.is_at_night(172.99));
    }

    #[test]
    fn offsets_shift_the_window() {
        let plain = StartPoint::new(52.0, -89.0, 0.0, 0.0);
        let shifted = StartPoint::new(52.0, -89.0, 2.0, 1.0);
        assert!(shifted.day_start(172) > plain.day_start(172));
        assert!(shifted.day_end(172) < plain.day_end(172));
    }
}
