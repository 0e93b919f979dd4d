//! Time and angle arithmetic shared across the simulation.
//!
//! Simulation time is measured in decimal days since the start of the year,
//! so `182.5` is noon on day 182. Weather streams are indexed hourly, which
//! makes `time_index` the bridge between continuous event times and the
//! hourly weather/threshold vectors.

/// Hours in a day.
pub const DAY_HOURS: usize = 24;
/// Minutes in a day.
pub const DAY_MINUTES: f64 = 1440.0;

/// Convert a day and hour into decimal days.
#[inline]
#[must_use]
pub fn to_time(day: u32, hour: u32) -> f64 {
    f64::from(day) + f64::from(hour) / DAY_HOURS as f64
}

/// Index of the hour containing `time` (decimal days).
#[inline]
#[must_use]
pub fn time_index(time: f64) -> usize {
    (time * DAY_HOURS as f64) as usize
}

/// Index of the hour containing `time`, relative to the stream start day.
#[inline]
#[must_use]
pub fn time_index_since(time: f64, min_day: u32) -> usize {
    time_index(time) - DAY_HOURS * min_day as usize
}

/// Normalize an angle in radians to `[0, 2π)`.
#[inline]
#[must_use]
pub fn fix_radians(theta: f64) -> f64 {
    let tau = 2.0 * std::f64::consts::PI;
    let r = theta % tau;
    if r < 0.0 {
        r + tau
    } else {
        r
    }
}

/// Normalize an angle in degrees to `[0, 360)`.
#[inline]
#[must_use]
pub fn fix_degrees(theta: f64) -> f64 {
    let r = theta % 360.0;
    if r < 0.0 {
        r + 360.0
    } else {
        r
    }
}

/// Degrees to radians, normalized.
#[inline]
#[must_use]
pub fn to_radians(degrees: f64) -> f64 {
    fix_radians(degrees.to_radians())
}

/// Radians to degrees, normalized.
#[inline]
#[must_use]
pub fn to_degrees(radians: f64) -> f64 {
    fix_degrees(radians.to_degrees())
}

/// Turn an azimuth (direction wind comes from / slope faces) into the
/// heading it pushes towards.
#[inline]
#[must_use]
pub fn to_heading(azimuth: f64) -> f64 {
    fix_radians(azimuth + std::f64::consts::PI)
}

/// Smallest `i` in `[lo, hi]` with `f(i) <= target`, or `hi` if none is.
///
/// `f` must be non-increasing over the range; used to estimate how many
/// Monte-Carlo runs are needed before a confidence bound is met.
pub fn binary_find_checked<F>(lo: usize, hi: usize, target: f64, f: F) -> usize
where
    F: Fn(usize) -> f64,
{
    let (mut lo, mut hi) = (lo.max(1), hi.max(1));
    if f(hi) > target {
        return hi;
    }
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if f(mid) <= target {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_index_round_trip() {
        for day in [150u32, 200, 364] {
            for hour in 0..24u32 {
                let t = to_time(day, hour);
                assert_eq!(time_index(t), day as usize * 24 + hour as usize);
                assert_eq!(
                    time_index_since(t, 150),
                    (day as usize - 150) * 24 + hour as usize
                );
            }
        }
    }

    #[test]
    fn angle_round_trip() {
        for deg in [0.0, 45.0, 90.0, 180.0, 270.0, 359.0] {
            let back = to_degrees(to_radians(deg));
            assert!((back - deg).abs() < 1e-9, "{deg} -> {back}");
        }
        // wrap-around stays in range
        assert!((to_degrees(to_radians(725.0)) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn heading_is_opposite() {
        let h = to_heading(to_radians(0.0));
        assert!((to_degrees(h) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn binary_find_locates_threshold() {
        // f(i) = 10 / i, target 0.5 -> first i with f(i) <= 0.5 is 20
        let found = binary_find_checked(1, 100, 0.5, |i| 10.0 / i as f64);
        assert_eq!(found, 20);
        // unreachable target returns the upper bound
        assert_eq!(binary_find_checked(1, 50, 0.0, |i| 10.0 / i as f64), 50);
    }
}
