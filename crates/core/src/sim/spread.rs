//! Spread evaluation: FBP outputs plus the elliptical offset template.

use crate::fuel::{self, FuelType};
use crate::grid::SpreadKey;
use crate::util::{fix_radians, to_heading, to_radians};
use crate::weather::FwiWeather;

/// Degrees between sampled directions on the ellipse front.
const MAX_SPREAD_ANGLE: f64 = 5.0;
const INVALID_ROS: f64 = -1.0;

/// One direction a burning cell pushes fire, scaled to cell widths per
/// minute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadOffset {
    /// Fire-line intensity in this direction (kW/m).
    pub intensity: f64,
    /// Rate of spread in this direction (m/min).
    pub ros: f64,
    /// Direction of travel (radians).
    pub direction: f64,
    /// Offset per minute, in cell units.
    pub dx: f64,
    pub dy: f64,
}

/// Wind function for ISI. [ST-X-3 eq 53, GLC-X-10 53a]
fn standard_wsv(v: f64) -> f64 {
    if v < 40.0 {
        (0.05039 * v).exp()
    } else {
        12.0 * (1.0 - (-0.0818 * (v - 28.0)).exp())
    }
}

/// Spread factor from percent slope. [ST-X-3 eq 39, GLC-X-10 39a/b]
fn slope_factor(slope_pct: u8) -> f64 {
    if slope_pct >= 70 {
        10.0
    } else {
        (3.533 * (f64::from(slope_pct) / 100.0).powf(1.2)).exp()
    }
}

/// ROS at which the spread-probability gate opens for a given threshold.
///
/// Inverse of Wotton's spread-event probability; a threshold of 1 can never
/// be passed and 0 always is.
#[must_use]
pub fn ros_from_threshold(threshold: f64) -> f64 {
    if threshold == 1.0 {
        return f64::INFINITY;
    }
    if threshold == 0.0 {
        return 0.0;
    }
    25.0 / 4.0 * (-((41.0_f64 / 25.0).exp() * threshold) / (threshold - 1.0)).ln()
}

/// How far a ground-distance step travels horizontally on this slope.
fn horizontal_adjustment(slope_azimuth: u16, slope_pct: u8) -> impl Fn(f64) -> f64 {
    let b_semi = if slope_pct == 0 {
        1.0
    } else {
        (f64::from(slope_pct) / 100.0).atan().cos()
    };
    let slope_radians = to_radians(f64::from(slope_azimuth));
    move |theta: f64| -> f64 {
        if slope_pct == 0 {
            return 1.0;
        }
        let angle_unrotated = theta - slope_radians;
        let degrees = crate::util::to_degrees(angle_unrotated);
        if degrees == 270.0 || degrees == 90.0 {
            // straight across the slope there is no foreshortening
            return 1.0;
        }
        let tan_u = angle_unrotated.tan();
        let y = b_semi / (b_semi * tan_u * (b_semi * tan_u) + 1.0).sqrt();
        let x = y * tan_u;
        (x * x + y * y).sqrt().min(1.0)
    }
}

/// Angle on the ellipse corresponding to a circle angle theta.
fn ellipse_angle(length_to_breadth: f64, theta: f64) -> f64 {
    fix_radians((theta.sin() / length_to_breadth).atan2(theta.cos()))
}

/// Everything the engine needs to spread from cells with one [`SpreadKey`]
/// during one weather hour.
#[derive(Debug, Clone)]
pub struct SpreadInfo {
    head_ros: f64,
    raz: f64,
    length_to_breadth: f64,
    sfc: f64,
    tfc: f64,
    cfb: f64,
    is_crown: bool,
    max_intensity: f64,
    offsets: Vec<SpreadOffset>,
}

struct Initial {
    head_ros: f64,
    raz: f64,
    wsv: f64,
    ffmc_effect: f64,
    sfc: f64,
    rso: f64,
    is_crown: bool,
    bui_eff: f64,
}

fn initial(
    fuel: &FuelType,
    wx: &FwiWeather,
    key: &SpreadKey,
    nd: i32,
    min_ros: f64,
) -> Option<Initial> {
    let ffmc_effect = wx.ffmc_effect();
    let isz = 0.208 * ffmc_effect;
    let mut raz = wx.wind.heading();
    let mut wsv = wx.wind.speed;
    if key.slope_pct > 0 {
        let sf = slope_factor(key.slope_pct);
        let isf = fuel.calculate_isf(sf, nd, wx, isz);
        let mut wse = if isf == 0.0 {
            0.0
        } else {
            (isf / isz).ln() / 0.05039
        };
        if wse > 40.0 {
            wse = 28.0
                - (1.0 - (0.999 * 2.496 * ffmc_effect).min(isf) / (2.496 * ffmc_effect)).ln()
                    / 0.0818;
        }
        // slope acts as an extra wind blowing upslope
        let heading = to_heading(to_radians(f64::from(key.aspect_deg)));
        let wsv_x = wx.wind.wsv_x() + wse * heading.sin();
        let wsv_y = wx.wind.wsv_y() + wse * heading.cos();
        wsv = (wsv_x * wsv_x + wsv_y * wsv_y).sqrt();
        raz = if wsv == 0.0 { 0.0 } else { (wsv_y / wsv).acos() };
        if wsv_x < 0.0 {
            raz = std::f64::consts::TAU - raz;
        }
    }
    let isi = isz * standard_wsv(wsv);
    let bui_eff = fuel.bui_effect(wx.bui);
    let mut head_ros = fuel.calculate_ros(nd, wx, isi) * bui_eff;
    if min_ros > head_ros {
        return None;
    }
    let fmc = fuel::foliar_moisture(nd);
    let csi = fuel.critical_surface_intensity(fmc);
    let sfc = fuel.surface_fuel_consumption(wx);
    if sfc <= 0.0 {
        return None;
    }
    let rso = fuel::critical_ros(sfc, csi);
    let sfi = fuel::fire_intensity(sfc, head_ros);
    let is_crown = fuel.can_crown() && fuel::is_crown(csi, sfi);
    if is_crown {
        let cfb = fuel.crown_fraction_burned(head_ros, rso);
        head_ros = fuel.final_ros(isi, fmc, cfb, head_ros);
    }
    Some(Initial {
        head_ros,
        raz,
        wsv,
        ffmc_effect,
        sfc,
        rso,
        is_crown,
        bui_eff,
    })
}

impl SpreadInfo {
    /// The "nothing spreads" value, also used for unknown fuel codes.
    #[must_use]
    pub fn not_spreading() -> Self {
        SpreadInfo {
            head_ros: INVALID_ROS,
            raz: 0.0,
            length_to_breadth: 1.0,
            sfc: 0.0,
            tfc: 0.0,
            cfb: 0.0,
            is_crown: false,
            max_intensity: -1.0,
            offsets: Vec::new(),
        }
    }

    /// Evaluate spread for a key at a time.
    ///
    /// The daily stream gates whether spread is possible at all (keeping
    /// the probability-of-spread behaviour tied to the daily observation);
    /// the hourly stream drives the actual rates.
    #[must_use]
    pub fn calculate(
        fuel: &FuelType,
        key: &SpreadKey,
        nd: i32,
        wx: &FwiWeather,
        wx_daily: &FwiWeather,
        cell_size: f64,
        min_ros: f64,
    ) -> Self {
        let invalid = SpreadInfo::not_spreading();
        if wx_daily != wx && initial(fuel, wx_daily, key, nd, min_ros).is_none() {
            return invalid;
        }
        let Some(init) = initial(fuel, wx, key, nd, min_ros) else {
            return invalid;
        };
        let fmc = fuel::foliar_moisture(nd);
        let back_isi = init.ffmc_effect * 0.208 * (-0.05039 * init.wsv).exp();
        let mut back_ros = fuel.calculate_ros(nd, wx, back_isi) * init.bui_eff;
        if init.is_crown {
            let cfb_back = fuel.crown_fraction_burned(back_ros, init.rso);
            back_ros = fuel.final_ros(back_isi, fmc, cfb_back, back_ros);
        }
        let mut tfc = init.sfc;
        let mut cfb = 0.0;
        if init.is_crown {
            cfb = fuel.crown_fraction_burned(init.head_ros, init.rso);
            tfc += fuel.crown_consumption(cfb);
        }
        let max_intensity = fuel::fire_intensity(tfc, init.head_ros);
        let length_to_breadth = fuel.length_to_breadth(init.wsv);
        let correction = horizontal_adjustment(key.aspect_deg, key.slope_pct);
        let offsets = calculate_offsets(
            &correction,
            tfc,
            init.raz,
            init.head_ros,
            back_ros,
            length_to_breadth,
            cell_size,
            min_ros,
        );
        if offsets.is_empty() {
            return invalid;
        }
        SpreadInfo {
            head_ros: init.head_ros,
            raz: init.raz,
            length_to_breadth,
            sfc: init.sfc,
            tfc,
            cfb,
            is_crown: init.is_crown,
            max_intensity,
            offsets,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_not_spreading(&self) -> bool {
        self.head_ros == INVALID_ROS
    }

    #[inline]
    #[must_use]
    pub fn head_ros(&self) -> f64 {
        self.head_ros
    }

    #[inline]
    #[must_use]
    pub fn head_direction(&self) -> f64 {
        self.raz
    }

    #[inline]
    #[must_use]
    pub fn length_to_breadth(&self) -> f64 {
        self.length_to_breadth
    }

    #[inline]
    #[must_use]
    pub fn max_intensity(&self) -> f64 {
        self.max_intensity
    }

    #[inline]
    #[must_use]
    pub fn surface_fuel_consumption(&self) -> f64 {
        self.sfc
    }

    #[inline]
    #[must_use]
    pub fn total_fuel_consumption(&self) -> f64 {
        self.tfc
    }

    #[inline]
    #[must_use]
    pub fn crown_fraction_burned(&self) -> f64 {
        self.cfb
    }

    #[inline]
    #[must_use]
    pub fn is_crown(&self) -> bool {
        self.is_crown
    }

    #[inline]
    #[must_use]
    pub fn offsets(&self) -> &[SpreadOffset] {
        &self.offsets
    }
}

/// Sample the spread ellipse into directional offsets.
///
/// Angle stepping is densest near the head where the perimeter moves
/// fastest, stretched by L:B so narrow ellipses still resolve their flanks,
/// and the back direction is added only when everything else spread.
#[allow(clippy::too_many_arguments)]
fn calculate_offsets(
    correction: &impl Fn(f64) -> f64,
    tfc: f64,
    head_raz: f64,
    head_ros: f64,
    back_ros: f64,
    length_to_breadth: f64,
    cell_size: f64,
    min_ros: f64,
) -> Vec<SpreadOffset> {
    let mut offsets = Vec::new();
    let mut add_offset = |direction: f64, ros: f64| -> bool {
        if ros < min_ros {
            return false;
        }
        let ros_cell = ros / cell_size;
        // rows grow southward, so north is -y
        offsets.push(SpreadOffset {
            intensity: fuel::fire_intensity(tfc, ros),
            ros,
            direction,
            dx: ros_cell * direction.sin(),
            dy: -(ros_cell * direction.cos()),
        });
        true
    };
    if !add_offset(head_raz, head_ros * correction(head_raz)) {
        return offsets;
    }
    let a = (head_ros + back_ros) / 2.0;
    let c = a - back_ros;
    let flank_ros = a / length_to_breadth;
    let a_sq = a * a;
    let flank_ros_sq = flank_ros * flank_ros;
    let a_sq_sub_c_sq = a_sq - c * c;
    let ac = a * c;
    // ROS along the perimeter at angle theta from the head
    let calculate_ros = |theta: f64| -> f64 {
        let cos_t = theta.cos();
        let cos_t_sq = cos_t * cos_t;
        let sin_t = theta.sin();
        let sin_t_sq = sin_t * sin_t;
        let f_sq_cos_t_sq = flank_ros_sq * cos_t_sq;
        ((a * ((flank_ros * cos_t * (f_sq_cos_t_sq + a_sq_sub_c_sq * sin_t_sq).sqrt()
            - ac * sin_t_sq)
            / (f_sq_cos_t_sq + a_sq * sin_t_sq))
            + c)
            / cos_t)
            .abs()
    };
    let mut add_offsets = |angle_radians: f64, ros_flat: f64| -> bool {
        if ros_flat < min_ros {
            return false;
        }
        // symmetric across the head axis
        let direction = fix_radians(angle_radians + head_raz);
        let mut added = add_offset(direction, ros_flat * correction(direction));
        let direction = fix_radians(head_raz - angle_radians);
        added |= add_offset(direction, ros_flat * correction(direction));
        added
    };
    let step_base = 0.2 / length_to_breadth.sqrt();
    let step_max_base = to_radians(MAX_SPREAD_ANGLE);
    let mut step_max = step_max_base / length_to_breadth.sqrt();
    let mut step_x = step_base;
    let mut added = true;
    let mut theta: f64 = 0.0;
    let mut last_theta: f64 = 0.0;
    let mut cur_x: f64 = 1.0;
    let widest = flank_ros.atan2(c);
    let widest_x = widest.cos();
    // front half: walk x = cos(theta) from the head to the widest point
    while added && cur_x > step_max_base / 4.0 {
        theta = cur_x.acos().min(last_theta + step_max);
        let angle = ellipse_angle(length_to_breadth, theta);
        added = add_offsets(angle, calculate_ros(angle));
        cur_x = theta.cos();
        last_theta = theta;
        if theta > step_max_base / 2.0 {
            step_max = step_max_base;
        }
        cur_x -= step_x;
        if cur_x > widest_x && (cur_x - widest_x).abs() < step_x {
            cur_x = widest_x;
        }
    }
    if added {
        let half = ellipse_angle(
            length_to_breadth,
            (std::f64::consts::FRAC_PI_2 + theta) / 2.0,
        );
        let _ = add_offsets(half, calculate_ros(half));
        theta = std::f64::consts::FRAC_PI_2;
        added = add_offsets(theta, flank_ros * a_sq_sub_c_sq.sqrt() / a);
        cur_x = theta.cos();
        last_theta = theta;
    }
    // rear half: longer strides, stop before the back direction
    cur_x -= step_x / 2.0;
    step_x *= length_to_breadth;
    let max_angle = std::f64::consts::PI - length_to_breadth * step_max;
    let min_x = max_angle.cos();
    while added && cur_x >= min_x {
        theta = cur_x.acos().max(last_theta + step_max);
        let angle = ellipse_angle(length_to_breadth, theta);
        if angle > max_angle {
            break;
        }
        added = add_offsets(angle, calculate_ros(angle));
        cur_x = theta.cos();
        last_theta = theta;
        cur_x -= step_x;
    }
    if added && back_ros >= min_ros {
        let direction = fix_radians(std::f64::consts::PI + head_raz);
        add_offset(direction, back_ros * correction(direction));
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuel::standard_catalog;
    use crate::weather::Wind;

    fn c2() -> FuelType {
        standard_catalog(50, 50)
            .into_iter()
            .find(|f| f.name == "C-2")
            .unwrap()
    }

    fn weather() -> FwiWeather {
        FwiWeather::from_indices(20.0, 30.0, Wind::new(180.0, 20.0), 0.0, 90.0, 35.5, 275.0)
    }

    fn flat_key() -> SpreadKey {
        SpreadKey {
            fuel_code: 2,
            slope_pct: 0,
            aspect_deg: 0,
        }
    }

    fn spread(min_ros: f64) -> SpreadInfo {
        let wx = weather();
        SpreadInfo::calculate(&c2(), &flat_key(), 80, &wx, &wx, 100.0, min_ros)
    }

    #[test]
    fn strong_conditions_spread() {
        let info = spread(0.05);
        assert!(!info.is_not_spreading());
        assert!(info.head_ros() > 1.0, "head ros {}", info.head_ros());
        assert!(info.max_intensity() > 0.0);
        assert!(!info.offsets().is_empty());
    }

    #[test]
    fn head_offset_points_downwind() {
        // wind from the south pushes north: dy negative (up in raster rows)
        let info = spread(0.05);
        let head = info.offsets()[0];
        assert!(head.dy < 0.0, "head dy {}", head.dy);
        assert!(head.dx.abs() < 1e-6 + head.dy.abs() / 10.0);
    }

    #[test]
    fn impossible_threshold_kills_spread() {
        let info = spread(f64::INFINITY);
        assert!(info.is_not_spreading());
        assert!(info.offsets().is_empty());
    }

    #[test]
    fn offsets_fit_inside_head_ros() {
        let info = spread(0.05);
        let head_cell = info.head_ros() / 100.0;
        for offset in info.offsets() {
            let magnitude = (offset.dx * offset.dx + offset.dy * offset.dy).sqrt();
            assert!(magnitude <= head_cell + 1e-9);
        }
    }

    #[test]
    fn threshold_conversion_boundaries() {
        assert_eq!(ros_from_threshold(0.0), 0.0);
        assert!(ros_from_threshold(1.0).is_infinite());
        let mid = ros_from_threshold(0.5);
        assert!(mid.is_finite() && mid > 0.0);
        // higher thresholds demand faster spread
        assert!(ros_from_threshold(0.9) > ros_from_threshold(0.1));
    }

    #[test]
    fn ellipse_covers_flanks_and_back() {
        let info = spread(0.05);
        let mut has_flank = false;
        let mut has_back = false;
        for offset in info.offsets() {
            let degrees = crate::util::to_degrees(offset.direction);
            if (degrees - 90.0).abs() < 30.0 || (degrees - 270.0).abs() < 30.0 {
                has_flank = true;
            }
            if (degrees - 180.0).abs() < 30.0 {
                has_back = true;
            }
        }
        assert!(has_flank, "no flank offsets");
        assert!(has_back, "no back offset");
    }
}
