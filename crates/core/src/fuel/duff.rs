//! Duff layers and smouldering survival probability.
//!
//! Fire survival in a cell depends on whether the duff under it keeps
//! smouldering. Each FBP fuel is assigned an upper (FFMC-driven) and lower
//! (DMC-driven) duff type; the ignition-probability regression follows
//! Frandsen (1997) with the coefficients from Lawson et al. (1997).

/// A duff layer with its smouldering-ignition regression coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Duff {
    /// Inorganic content, percent oven-dry weight.
    pub ash: f64,
    /// Organic bulk density (kg/m^3).
    pub rho: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    b3: f64,
}

impl Duff {
    const fn new(ash: f64, rho: f64, b0: f64, b1: f64, b2: f64, b3: f64) -> Self {
        Duff {
            ash,
            rho,
            b0,
            b1,
            b2,
            b3,
        }
    }

    /// Probability the fire keeps smouldering at the given moisture
    /// content (% dry weight). [Frandsen eq Ig-1]
    #[must_use]
    pub fn probability_of_survival(&self, mc_pct: f64) -> f64 {
        let constant_part = self.b0 + self.b2 * self.ash + self.b3 * self.rho;
        let d = 1.0 + (-(self.b1 * mc_pct + constant_part)).exp();
        if d == 0.0 {
            1.0
        } else {
            1.0 / d
        }
    }
}

// Frandsen table 2/3 entries, coefficients already descaled.
pub const SPHAGNUM_UPPER: Duff = Duff::new(12.4, 21.8, -8.8306, -0.0608, 0.8095, 0.2735);
pub const FEATHER_MOSS: Duff = Duff::new(18.1, 42.7, 9.0970, -0.1040, 0.1165, -0.0646);
pub const REINDEER: Duff = Duff::new(26.1, 56.3, 8.0359, -0.0393, -0.0591, -0.0340);
pub const WHITE_SPRUCE: Duff = Duff::new(35.9, 122.0, 332.5604, -1.2220, -2.1024, -1.2619);
pub const PEAT: Duff = Duff::new(9.4, 222.0, -19.8198, -0.1169, 1.0414, 0.0782);
pub const PEAT_MUCK: Duff = Duff::new(34.9, 203.0, 37.2276, -0.1876, -0.2833, -0.0951);
pub const PINE_SENEY: Duff = Duff::new(36.5, 190.0, 45.1778, -0.3227, -0.3644, -0.0362);
pub const SPRUCE_PINE: Duff = Duff::new(30.7, 116.0, 58.6921, -0.2737, -0.5413, -0.1246);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survival_decreases_with_moisture() {
        for duff in [SPHAGNUM_UPPER, FEATHER_MOSS, PEAT, SPRUCE_PINE] {
            let dry = duff.probability_of_survival(20.0);
            let wet = duff.probability_of_survival(300.0);
            assert!(dry > wet, "{duff:?}: {dry} !> {wet}");
        }
    }

    #[test]
    fn probabilities_stay_in_unit_interval() {
        for duff in [
            SPHAGNUM_UPPER,
            FEATHER_MOSS,
            REINDEER,
            WHITE_SPRUCE,
            PEAT,
            PEAT_MUCK,
            PINE_SENEY,
            SPRUCE_PINE,
        ] {
            for mc in [0.0, 50.0, 150.0, 400.0] {
                let p = duff.probability_of_survival(mc);
                assert!((0.0..=1.0).contains(&p), "{duff:?} at {mc}: {p}");
            }
        }
    }
}
