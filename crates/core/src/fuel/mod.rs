//! FBP fuel types: spread, consumption, crowning, and survival behaviour.
//!
//! The Canadian Fire Behavior Prediction system treats each fuel as a set of
//! algebraic curves (ST-X-3 / GLC-X-10). Instead of a virtual class
//! hierarchy, the catalog here is a flat table of [`FuelType`] values
//! dispatched on [`FuelKind`]; the "invalid fuel" placeholder becomes the
//! absence of an entry.

pub mod duff;
mod lookup;

pub use lookup::FuelLookup;

use serde::{Deserialize, Serialize};

use crate::fuel::duff::Duff;
use crate::weather::FwiWeather;

/// Fire intensity (kW/m) from fuel consumption and ROS. [ST-X-3 eq 69]
#[inline]
#[must_use]
pub fn fire_intensity(fuel_consumption: f64, ros: f64) -> f64 {
    300.0 * fuel_consumption * ros
}

/// Critical surface fire ROS (RSO) for crowning. [ST-X-3 eq 57]
#[inline]
#[must_use]
pub fn critical_ros(sfc: f64, csi: f64) -> f64 {
    if sfc > 0.0 {
        csi / (300.0 * sfc)
    } else {
        0.0
    }
}

/// Whether surface intensity exceeds the critical intensity. [ST-X-3 eq 59]
#[inline]
#[must_use]
pub fn is_crown(csi: f64, sfi: f64) -> bool {
    sfi > csi
}

/// Foliar moisture content from days since minimum. [ST-X-3 eq 59-62]
#[must_use]
pub fn foliar_moisture(nd: i32) -> f64 {
    if nd >= 50 {
        120.0
    } else if nd >= 30 {
        32.9 + 3.17 * f64::from(nd) - 0.0288 * f64::from(nd * nd)
    } else {
        85.0 + 0.0189 * f64::from(nd * nd)
    }
}

/// Day of minimum foliar moisture content for a point. [ST-X-3 eq 42/43]
#[must_use]
pub fn nd_reference(elevation: i32, latitude: f64, longitude: f64) -> i32 {
    let latn = if elevation <= 0 {
        46.0 + 23.4 * (-0.0360 * (150.0 + longitude)).exp()
    } else {
        43.0 + 33.7 * (-0.0351 * (150.0 + longitude)).exp()
    };
    let nd = if elevation <= 0 {
        151.0 * latitude / latn
    } else {
        142.1 * latitude / latn + 0.0172 * f64::from(elevation)
    };
    (0.5 + nd).trunc() as i32
}

/// Days from the date of minimum foliar moisture content.
#[must_use]
pub fn nd_for_day(day: u32, elevation: i32, latitude: f64, longitude: f64) -> i32 {
    (day as i32 - nd_reference(elevation, latitude, longitude)).abs()
}

/// Grass curing percent from Nd.
#[must_use]
pub fn grass_curing(nd: i32) -> f64 {
    if nd >= 50 {
        0.0
    } else {
        (52.5042 - 1.07324 * f64::from(nd)).clamp(0.0, 100.0)
    }
}

/// Grass ROS multiplier from curing percent. [GLC-X-10 eq 35a/35b]
#[must_use]
pub fn curing_multiplier(curing: f64) -> f64 {
    if curing >= 58.8 {
        0.176 + 0.02 * (curing - 58.8)
    } else {
        0.005 * (0.061 * curing).exp_m1()
    }
}

/// Depth of the duff layer whose moisture tracks FFMC (cm).
const DUFF_FFMC_DEPTH: f64 = 1.2;
/// Grass surface fuel load (kg/m^2). [ST-X-3]
const GRASS_FUEL_LOAD: f64 = 0.35;
/// Floor applied inside the ISF logarithm so slope never inverts spread.
const SLOPE_LIMIT_ISI: f64 = 0.01;

// Survival-probability blend weights; calibrated in the original model to
// the same values for every fuel. Revisit with domain review.
const WEIGHT_FFMC: f64 = 0.25;
const WEIGHT_DMC: f64 = 1.0;
const RATIO_HARTFORD: f64 = 0.5;
const RATIO_FRANDSEN: f64 = 1.0 - RATIO_HARTFORD;
const RATIO_ASPEN: f64 = 0.5;
const RATIO_FUEL: f64 = 1.0 - RATIO_ASPEN;

/// Which FBP fuel a catalog entry models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelKind {
    C1,
    C2,
    C3,
    C4,
    C5,
    C6,
    C7,
    D1,
    D2,
    /// Boreal mixedwood, green (percent conifer).
    M1,
    /// Boreal mixedwood, leafless (percent conifer).
    M2,
    /// Dead balsam fir mixedwood, leafless (percent dead fir).
    M3,
    /// Dead balsam fir mixedwood, green (percent dead fir).
    M4,
    O1a,
    O1b,
    S1,
    S2,
    S3,
}

/// One fuel's constant parameters plus its behaviour dispatch tag.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelType {
    pub kind: FuelKind,
    pub name: &'static str,
    /// ROS parameter a (m/min). [ST-X-3 table 6]
    a: f64,
    /// ROS parameter b. [ST-X-3 table 6]
    b: f64,
    /// ROS parameter c. [ST-X-3 table 6]
    c: f64,
    /// Average BUI for the fuel. [ST-X-3 table 7]
    bui0: f64,
    /// ln(q) for the BUI effect. [ST-X-3 table 7]
    log_q: f64,
    /// Crown base height (m). [ST-X-3 table 8]
    cbh: f64,
    /// Crown fuel load (kg/m^2). [ST-X-3 table 8]
    cfl: f64,
    /// Duff bulk density (kg/m^3). [Anderson table 1]
    bulk_density: f64,
    /// Inorganic fraction of the duff layer. [Anderson table 1]
    inorganic: f64,
    /// Duff layer depth (cm). [Anderson table 1]
    duff_depth: f64,
    duff_ffmc: Duff,
    duff_dmc: Duff,
    can_crown: bool,
    /// Conifer / dead-fir percent for mixedwood entries, 0 otherwise.
    percent_mixed: f64,
}

impl FuelType {
    /// Basic rate of spread from ISI alone. [ST-X-3 eq 26]
    #[must_use]
    pub fn ros_basic(&self, isi: f64) -> f64 {
        self.a * (1.0 - (-self.b * isi).exp()).powf(self.c)
    }

    /// Rate of spread before the BUI effect (m/min).
    #[must_use]
    pub fn calculate_ros(&self, nd: i32, wx: &FwiWeather, isi: f64) -> f64 {
        match self.kind {
            FuelKind::O1a | FuelKind::O1b => {
                curing_multiplier(grass_curing(nd)) * self.ros_basic(isi)
            }
            FuelKind::D2 => {
                if wx.bui >= 80.0 {
                    self.ros_basic(isi)
                } else {
                    0.0
                }
            }
            FuelKind::M1 | FuelKind::M2 => {
                let pc = self.percent_mixed / 100.0;
                let d1_mult = if self.kind == FuelKind::M1 { 1.0 } else { 0.2 };
                pc * c2_curve(isi) + (1.0 - pc) * d1_mult * d1_curve(isi)
            }
            FuelKind::M3 | FuelKind::M4 => {
                let pdf = self.percent_mixed / 100.0;
                let d1_mult = if self.kind == FuelKind::M3 { 1.0 } else { 0.2 };
                pdf * self.ros_basic(isi) + (1.0 - pdf) * d1_mult * d1_curve(isi)
            }
            _ => self.ros_basic(isi),
        }
    }

    /// BUI effect on surface ROS. [ST-X-3 eq 54]
    #[must_use]
    pub fn bui_effect(&self, bui: f64) -> f64 {
        if bui > 0.0 {
            (50.0 * self.log_q * (1.0 / bui - 1.0 / self.bui0)).exp()
        } else {
            1.0
        }
    }

    /// Surface fuel consumption (kg/m^2). [ST-X-3 eq 9-25, GLC-X-10 eq 9]
    #[must_use]
    pub fn surface_fuel_consumption(&self, wx: &FwiWeather) -> f64 {
        let bui = wx.bui;
        match self.kind {
            FuelKind::C1 => {
                let sign = if wx.ffmc > 84.0 { 0.75 } else { -0.75 };
                (0.75 + sign * (1.0 - (-0.23 * (wx.ffmc - 84.0)).exp()).abs().sqrt()).max(0.0)
            }
            FuelKind::C2 | FuelKind::M1 | FuelKind::M2 | FuelKind::M3 | FuelKind::M4 => {
                5.0 * (1.0 - (-0.0115 * bui).exp())
            }
            FuelKind::C3 | FuelKind::C4 => 5.0 * (1.0 - (-0.0164 * bui).exp()).powf(2.24),
            FuelKind::C5 | FuelKind::C6 => 5.0 * (1.0 - (-0.0149 * bui).exp()).powf(2.48),
            FuelKind::C7 => {
                let ffc = if wx.ffmc > 70.0 {
                    2.0 * (1.0 - (-0.104 * (wx.ffmc - 70.0)).exp())
                } else {
                    0.0
                };
                ffc + 1.5 * (1.0 - (-0.0201 * bui).exp())
            }
            FuelKind::D1 => 1.5 * (1.0 - (-0.0183 * bui).exp()),
            FuelKind::D2 => {
                if bui >= 80.0 {
                    1.5 * (1.0 - (-0.0183 * bui).exp())
                } else {
                    0.0
                }
            }
            FuelKind::O1a | FuelKind::O1b => GRASS_FUEL_LOAD,
            FuelKind::S1 => {
                4.0 * (1.0 - (-0.025 * bui).exp()) + 4.0 * (1.0 - (-0.034 * bui).exp())
            }
            FuelKind::S2 => {
                10.0 * (1.0 - (-0.013 * bui).exp()) + 6.0 * (1.0 - (-0.060 * bui).exp())
            }
            FuelKind::S3 => {
                12.0 * (1.0 - (-0.0166 * bui).exp()) + 20.0 * (1.0 - (-0.0210 * bui).exp())
            }
        }
    }

    /// Length-to-breadth ratio of the spread ellipse. [ST-X-3 eq 79-81]
    #[must_use]
    pub fn length_to_breadth(&self, ws: f64) -> f64 {
        match self.kind {
            FuelKind::O1a | FuelKind::O1b => {
                if ws < 1.0 {
                    1.0
                } else {
                    1.1 * ws.powf(0.464)
                }
            }
            _ => 1.0 + 8.729 * (1.0 - (-0.030 * ws).exp()).powf(2.155),
        }
    }

    /// Critical surface intensity for crowning (kW/m). [ST-X-3 eq 56]
    #[must_use]
    pub fn critical_surface_intensity(&self, fmc: f64) -> f64 {
        0.001 * self.cbh.powf(1.5) * (460.0 + 25.9 * fmc).powf(1.5)
    }

    /// Crown fraction burned. [ST-X-3 eq 58]
    #[must_use]
    pub fn crown_fraction_burned(&self, rss: f64, rso: f64) -> f64 {
        if self.cfl > 0.0 {
            (1.0 - (-0.230 * (rss - rso)).exp()).max(0.0)
        } else {
            0.0
        }
    }

    /// Crown fuel consumption (kg/m^2). [ST-X-3 eq 66]
    #[must_use]
    pub fn crown_consumption(&self, cfb: f64) -> f64 {
        let ratio = match self.kind {
            FuelKind::M1 | FuelKind::M2 => self.percent_mixed / 100.0,
            _ => 1.0,
        };
        ratio * self.cfl * cfb
    }

    /// Final ROS after crowning. C-6 blends in the crown rate; everything
    /// else spreads at the surface rate. [ST-X-3 eq 65, GLC-X-10]
    #[must_use]
    pub fn final_ros(&self, isi: f64, fmc: f64, cfb: f64, rss: f64) -> f64 {
        if self.kind == FuelKind::C6 {
            let fme = (1.5 - 0.00275 * fmc).powi(4) / (460.0 + 25.9 * fmc) / 0.778 * 1000.0;
            let rsc = 60.0 * (1.0 - (-0.0497 * isi).exp()) * fme;
            rss + cfb * (rsc - rss).max(0.0)
        } else {
            rss
        }
    }

    /// ISI equivalent of zero-wind spread on this slope (ISF).
    /// [ST-X-3 eq 41/42]
    #[must_use]
    pub fn calculate_isf(&self, slope_factor: f64, nd: i32, wx: &FwiWeather, isi: f64) -> f64 {
        match self.kind {
            FuelKind::M1 | FuelKind::M2 => {
                let pc = self.percent_mixed / 100.0;
                let d1_mult = if self.kind == FuelKind::M1 { 1.0 } else { 0.2 };
                let isf_c2 = limit_isf(1.0, c2_curve(isi) * slope_factor, C2_A, C2_B, C2_C);
                let isf_d1 = limit_isf(d1_mult, d1_mult * d1_curve(isi) * slope_factor, D1_A, D1_B, D1_C);
                pc * isf_c2 + (1.0 - pc) * isf_d1
            }
            FuelKind::O1a | FuelKind::O1b => {
                let mu = curing_multiplier(grass_curing(nd)).max(0.001);
                limit_isf(
                    mu,
                    self.calculate_ros(nd, wx, isi) * slope_factor,
                    self.a,
                    self.b,
                    self.c,
                )
            }
            _ => limit_isf(
                1.0,
                self.calculate_ros(nd, wx, isi) * slope_factor,
                self.a,
                self.b,
                self.c,
            ),
        }
    }

    #[inline]
    #[must_use]
    pub fn can_crown(&self) -> bool {
        self.can_crown
    }

    /// Probability of burning in peat at the given moisture fraction.
    /// Monotone decreasing in moisture. [Anderson eq 1]
    #[must_use]
    pub fn probability_peat(&self, mc_fraction: f64) -> f64 {
        let pb = self.bulk_density;
        let fi = self.inorganic;
        let pi = fi * pb;
        let ri = fi / (1.0 - fi);
        let const_part = -19.329 + 1.7170 * ri + 23.059 * pi;
        1.0 / (1.0 + (17.047 * mc_fraction / (1.0 - fi) + const_part).exp())
    }

    fn dmc_ratio(&self) -> f64 {
        if self.duff_depth <= DUFF_FFMC_DEPTH {
            0.0
        } else {
            (self.duff_depth - DUFF_FFMC_DEPTH) / self.duff_depth
        }
    }

    /// Chance the fire keeps burning in this fuel under the given weather,
    /// blending Frandsen/Hartford duff curves, the Anderson peat model, and
    /// the Otway aspen regression.
    #[must_use]
    pub fn survival_probability(&self, wx: &FwiWeather) -> f64 {
        let mc_ffmc = wx.mc_ffmc() * WEIGHT_FFMC + WEIGHT_DMC;
        let mc_ffmc_saturated = 2.5 * WEIGHT_FFMC + WEIGHT_DMC;
        let prob_ffmc_peat = self.probability_peat(mc_ffmc);
        let prob_ffmc_peat_saturated = self.probability_peat(mc_ffmc_saturated);
        let prob_ffmc_peat_zero = self.probability_peat(WEIGHT_DMC);
        let prob_ffmc_peat_weighted =
            (prob_ffmc_peat - prob_ffmc_peat_saturated) / prob_ffmc_peat_zero;
        let prob_ffmc = self.duff_ffmc.probability_of_survival(mc_ffmc * 100.0);
        let prob_ffmc_saturated = self
            .duff_ffmc
            .probability_of_survival(mc_ffmc_saturated * 100.0);
        let prob_ffmc_zero = self.duff_ffmc.probability_of_survival(WEIGHT_DMC);
        let prob_ffmc_weighted = (prob_ffmc - prob_ffmc_saturated) / prob_ffmc_zero;
        let term_otway = (-3.11 + 0.12 * wx.dmc).exp();
        let prob_otway = term_otway / (1.0 + term_otway);
        let mc_pct = wx.mc_dmc_pct() * self.dmc_ratio() + wx.mc_ffmc_pct() * (1.0 - self.dmc_ratio());
        let prob_weight_ffmc = self.duff_ffmc.probability_of_survival(mc_pct);
        let prob_weight_ffmc_peat = self.probability_peat(mc_pct / 100.0);
        let prob_weight_dmc = self.duff_dmc.probability_of_survival(wx.mc_dmc_pct());
        let prob_weight_dmc_peat = self.probability_peat(wx.mc_dmc());
        1.0 - (1.0 - prob_ffmc_peat_weighted)
            * (1.0 - prob_ffmc_weighted)
            * ((1.0 - prob_otway) * RATIO_ASPEN
                + ((1.0 - prob_weight_ffmc_peat) * RATIO_HARTFORD
                    + (1.0 - prob_weight_ffmc) * RATIO_FRANDSEN)
                    * ((1.0 - prob_weight_dmc_peat) * RATIO_HARTFORD
                        + (1.0 - prob_weight_dmc) * RATIO_FRANDSEN)
                    * RATIO_FUEL)
    }
}

// C-2 / D-1 base curves, reused by the mixedwood fuels.
const C2_A: f64 = 110.0;
const C2_B: f64 = 0.0282;
const C2_C: f64 = 1.5;
const D1_A: f64 = 30.0;
const D1_B: f64 = 0.0232;
const D1_C: f64 = 1.6;

fn c2_curve(isi: f64) -> f64 {
    C2_A * (1.0 - (-C2_B * isi).exp()).powf(C2_C)
}

fn d1_curve(isi: f64) -> f64 {
    D1_A * (1.0 - (-D1_B * isi).exp()).powf(D1_C)
}

/// Invert the ROS curve to the ISI that produces `rsf`. [ST-X-3 eq 41]
fn limit_isf(mu: f64, rsf: f64, a: f64, b: f64, c: f64) -> f64 {
    let inner = if rsf > 0.0 {
        1.0 - (rsf / (mu * a)).powf(1.0 / c)
    } else {
        1.0
    };
    (1.0 / -b) * inner.max(SLOPE_LIMIT_ISI).ln()
}

const LOG_0_70: f64 = -0.356_674_943_938_732_45;
const LOG_0_75: f64 = -0.287_682_072_451_780_9;
const LOG_0_80: f64 = -0.223_143_551_314_209_7;
const LOG_0_85: f64 = -0.162_518_929_497_774_94;
const LOG_0_90: f64 = -0.105_360_515_657_826_28;
const LOG_1_00: f64 = 0.0;

/// Build the fuel catalog for the configured mixedwood percentages.
///
/// `percent_conifer` selects M-1/M-2 behaviour, `percent_dead_fir` M-3/M-4.
#[must_use]
pub fn standard_catalog(percent_conifer: u8, percent_dead_fir: u8) -> Vec<FuelType> {
    let pc = f64::from(percent_conifer);
    let pdf = f64::from(percent_dead_fir);
    let fuel = |kind,
                name,
                a: f64,
                b: f64,
                c: f64,
                bui0: f64,
                log_q: f64,
                cbh: f64,
                cfl: f64,
                bulk_density: f64,
                inorganic: f64,
                duff_depth: f64,
                duff_ffmc: Duff,
                duff_dmc: Duff,
                can_crown: bool,
                percent_mixed: f64| FuelType {
        kind,
        name,
        a,
        b,
        c,
        bui0,
        log_q,
        cbh,
        cfl,
        bulk_density,
        inorganic,
        duff_depth,
        duff_ffmc,
        duff_dmc,
        can_crown,
        percent_mixed,
    };
    use duff::*;
    use FuelKind::*;
    vec![
        fuel(C1, "C-1", 90.0, 0.0649, 4.5, 72.0, LOG_0_90, 2.0, 0.75, 0.045, 0.05, 3.4, REINDEER, PEAT, true, 0.0),
        fuel(C2, "C-2", 110.0, 0.0282, 1.5, 64.0, LOG_0_70, 3.0, 0.80, 0.034, 0.0, 10.0, SPHAGNUM_UPPER, SPHAGNUM_UPPER, true, 0.0),
        fuel(C3, "C-3", 110.0, 0.0444, 3.0, 62.0, LOG_0_75, 8.0, 1.15, 0.020, 0.15, 6.5, FEATHER_MOSS, PINE_SENEY, true, 0.0),
        fuel(C4, "C-4", 110.0, 0.0293, 1.5, 66.0, LOG_0_80, 4.0, 1.20, 0.031, 0.15, 6.2, PINE_SENEY, PINE_SENEY, true, 0.0),
        fuel(C5, "C-5", 30.0, 0.0697, 4.0, 56.0, LOG_0_80, 18.0, 1.20, 0.093, 0.15, 4.6, PINE_SENEY, PINE_SENEY, true, 0.0),
        fuel(C6, "C-6", 30.0, 0.0800, 3.0, 62.0, LOG_0_80, 7.0, 1.80, 0.050, 0.15, 5.0, PINE_SENEY, PINE_SENEY, true, 0.0),
        fuel(C7, "C-7", 45.0, 0.0305, 2.0, 106.0, LOG_0_85, 10.0, 0.50, 0.020, 0.15, 5.0, SPRUCE_PINE, SPRUCE_PINE, true, 0.0),
        fuel(D1, "D-1", D1_A, D1_B, D1_C, 32.0, LOG_0_90, 0.0, 0.0, 0.061, 0.59, 2.4, PEAT, PEAT, false, 0.0),
        fuel(D2, "D-2", 6.0, 0.0232, 1.6, 32.0, LOG_0_90, 0.0, 0.0, 0.061, 0.59, 2.4, PEAT, PEAT, false, 0.0),
        fuel(M1, "M-1", C2_A, C2_B, C2_C, 50.0, LOG_0_80, 6.0, 0.80, 0.034, 0.0, 10.0, SPHAGNUM_UPPER, PEAT, true, pc),
        fuel(M2, "M-2", C2_A, C2_B, C2_C, 50.0, LOG_0_80, 6.0, 0.80, 0.034, 0.0, 10.0, SPHAGNUM_UPPER, PEAT, true, pc),
        fuel(M3, "M-3", 120.0, 0.0572, 1.4, 50.0, LOG_0_80, 6.0, 0.80, 0.061, 0.59, 2.4, PEAT, PEAT, true, pdf),
        fuel(M4, "M-4", 100.0, 0.0404, 1.48, 50.0, LOG_0_80, 6.0, 0.80, 0.061, 0.59, 2.4, PEAT, PEAT, true, pdf),
        fuel(O1a, "O-1a", 190.0, 0.0310, 1.4, 1.0, LOG_1_00, 0.0, 0.0, 0.0, 0.0, DUFF_FFMC_DEPTH, PEAT_MUCK, PEAT_MUCK, false, 0.0),
        fuel(O1b, "O-1b", 250.0, 0.0350, 1.7, 1.0, LOG_1_00, 0.0, 0.0, 0.0, 0.0, DUFF_FFMC_DEPTH, PEAT_MUCK, PEAT_MUCK, false, 0.0),
        fuel(S1, "S-1", 75.0, 0.0297, 1.3, 38.0, LOG_0_75, 0.0, 0.0, 0.078, 0.15, 7.8, WHITE_SPRUCE, WHITE_SPRUCE, false, 0.0),
        fuel(S2, "S-2", 40.0, 0.0438, 1.7, 63.0, LOG_0_75, 0.0, 0.0, 0.132, 0.15, 13.2, WHITE_SPRUCE, WHITE_SPRUCE, false, 0.0),
        fuel(S3, "S-3", 55.0, 0.0829, 3.2, 31.0, LOG_0_75, 0.0, 0.0, 0.100, 0.15, 10.0, WHITE_SPRUCE, WHITE_SPRUCE, false, 0.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::Wind;

    fn test_weather() -> FwiWeather {
        FwiWeather::from_indices(20.0, 30.0, Wind::new(180.0, 20.0), 0.0, 90.0, 35.5, 275.0)
    }

    fn by_name<'a>(catalog: &'a [FuelType], name: &str) -> &'a FuelType {
        catalog.iter().find(|f| f.name == name).unwrap()
    }

    #[test]
    fn ros_increases_with_isi() {
        let catalog = standard_catalog(50, 50);
        let wx = test_weather();
        for fuel in &catalog {
            if fuel.kind == FuelKind::D2 {
                continue;
            }
            let low = fuel.calculate_ros(80, &wx, 2.0);
            let high = fuel.calculate_ros(80, &wx, 12.0);
            assert!(high > low, "{}: {high} !> {low}", fuel.name);
        }
    }

    #[test]
    fn critical_ros_with_no_surface_fuel_is_zero() {
        assert_eq!(critical_ros(0.0, 1000.0), 0.0);
        assert!(critical_ros(1.0, 300.0) > 0.0);
    }

    #[test]
    fn peat_probability_is_monotone_decreasing() {
        let catalog = standard_catalog(50, 50);
        let c2 = by_name(&catalog, "C-2");
        let mut last = f64::INFINITY;
        for mc in [0.5, 1.0, 1.5, 2.0, 3.0] {
            let p = c2.probability_peat(mc);
            assert!(p < last);
            last = p;
        }
    }

    #[test]
    fn d2_needs_high_bui() {
        let catalog = standard_catalog(50, 50);
        let d2 = by_name(&catalog, "D-2");
        let mut wx = test_weather();
        wx.bui = 40.0;
        assert_eq!(d2.calculate_ros(80, &wx, 10.0), 0.0);
        wx.bui = 90.0;
        assert!(d2.calculate_ros(80, &wx, 10.0) > 0.0);
    }

    #[test]
    fn mixedwood_interpolates_between_c2_and_d1() {
        let all_conifer = standard_catalog(100, 50);
        let no_conifer = standard_catalog(0, 50);
        let wx = test_weather();
        let isi = 10.0;
        let full = by_name(&all_conifer, "M-1").calculate_ros(80, &wx, isi);
        let none = by_name(&no_conifer, "M-1").calculate_ros(80, &wx, isi);
        assert!((full - c2_curve(isi)).abs() < 1e-9);
        assert!((none - d1_curve(isi)).abs() < 1e-9);
    }

    #[test]
    fn grass_lb_differs_from_forest() {
        let catalog = standard_catalog(50, 50);
        let grass = by_name(&catalog, "O-1a");
        let forest = by_name(&catalog, "C-2");
        assert!((grass.length_to_breadth(0.5) - 1.0).abs() < 1e-9);
        assert!(forest.length_to_breadth(20.0) > 1.5);
    }

    #[test]
    fn foliar_moisture_piecewise() {
        assert!((foliar_moisture(50) - 120.0).abs() < 1e-9);
        assert!((foliar_moisture(0) - 85.0).abs() < 1e-9);
        // dip bottoms out between the branches
        assert!(foliar_moisture(30) < foliar_moisture(0));
    }

    #[test]
    fn survival_probability_in_unit_interval() {
        let catalog = standard_catalog(50, 50);
        let wx = test_weather();
        for fuel in &catalog {
            let p = fuel.survival_probability(&wx);
            assert!((0.0..=1.0).contains(&p), "{}: {p}", fuel.name);
        }
    }

    #[test]
    fn bui_effect_is_one_at_bui0() {
        let catalog = standard_catalog(50, 50);
        let c2 = by_name(&catalog, "C-2");
        assert!((c2.bui_effect(64.0) - 1.0).abs() < 1e-9);
        assert!(c2.bui_effect(100.0) > 1.0);
        assert!(c2.bui_effect(30.0) < 1.0);
    }
}
