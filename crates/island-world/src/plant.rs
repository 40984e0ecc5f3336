//! Plant biomass held by every cell.

use island_core::PlantConfig;
use serde::{Deserialize, Serialize};

/// Biomass above which a cell counts as having a plant
pub const PLANT_PRESENCE_THRESHOLD: f64 = 0.1;

/// Biomass counter for one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    biomass: f64,
    growth_rate: f64,
    max_biomass: f64,
    depletion_latch: bool,
    depleted: bool,
}

impl Plant {
    pub fn new(config: &PlantConfig) -> Self {
        let max_biomass = config.max_biomass.max(0.0);
        Self {
            biomass: config.initial_biomass.clamp(0.0, max_biomass),
            growth_rate: config.growth_rate.max(0.0),
            max_biomass,
            depletion_latch: config.depletion_latch,
            depleted: false,
        }
    }

    pub fn biomass(&self) -> f64 {
        self.biomass
    }

    pub fn max_biomass(&self) -> f64 {
        self.max_biomass
    }

    pub fn is_present(&self) -> bool {
        self.biomass > PLANT_PRESENCE_THRESHOLD
    }

    /// Add one tick of growth, capped at the maximum. Returns the amount added.
    pub fn grow(&mut self) -> f64 {
        if self.depleted && self.depletion_latch {
            return 0.0;
        }
        if self.biomass >= self.max_biomass {
            return 0.0;
        }

        let before = self.biomass;
        self.biomass = (self.biomass + self.growth_rate).min(self.max_biomass);
        if self.biomass > 0.0 {
            self.depleted = false;
        }
        self.biomass - before
    }

    /// Remove up to `amount` biomass. Returns what was actually eaten.
    pub fn consume(&mut self, amount: f64) -> f64 {
        if amount.is_nan() || amount <= 0.0 {
            return 0.0;
        }

        let eaten = amount.min(self.biomass);
        self.biomass -= eaten;
        if self.biomass <= 0.0 {
            self.biomass = 0.0;
            self.depleted = true;
        }
        eaten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(initial: f64, rate: f64, max: f64, latch: bool) -> PlantConfig {
        PlantConfig {
            initial_biomass: initial,
            growth_rate: rate,
            max_biomass: max,
            depletion_latch: latch,
        }
    }

    #[test]
    fn test_growth_from_zero() {
        let mut plant = Plant::new(&config(0.0, 0.5, 200.0, false));
        assert_eq!(plant.grow(), 0.5);
        assert_eq!(plant.biomass(), 0.5);
    }

    #[test]
    fn test_growth_is_capped() {
        let mut plant = Plant::new(&config(199.8, 0.5, 200.0, false));
        plant.grow();
        assert_eq!(plant.biomass(), 200.0);
        assert_eq!(plant.grow(), 0.0);
    }

    #[test]
    fn test_consume_never_goes_negative() {
        let mut plant = Plant::new(&config(3.0, 0.5, 200.0, false));
        assert_eq!(plant.consume(10.0), 3.0);
        assert_eq!(plant.biomass(), 0.0);
        assert!(plant.depleted);
        assert!(!plant.is_present());
    }

    #[test]
    fn test_grazed_plant_regrows_without_latch() {
        let mut plant = Plant::new(&config(1.0, 0.5, 200.0, false));
        plant.consume(1.0);
        plant.grow();
        assert_eq!(plant.biomass(), 0.5);
        assert!(!plant.depleted);
    }

    #[test]
    fn test_latch_stops_regrowth_after_full_grazing() {
        let mut plant = Plant::new(&config(1.0, 0.5, 200.0, true));
        plant.consume(1.0);
        assert_eq!(plant.grow(), 0.0);
        assert_eq!(plant.biomass(), 0.0);

        // a patch that simply started empty was never grazed, so it still grows
        let mut fresh = Plant::new(&config(0.0, 0.5, 200.0, true));
        assert_eq!(fresh.grow(), 0.5);
    }

    #[test]
    fn test_presence_threshold() {
        let plant = Plant::new(&config(0.1, 0.5, 200.0, false));
        assert!(!plant.is_present());
        let plant = Plant::new(&config(0.2, 0.5, 200.0, false));
        assert!(plant.is_present());
    }

    #[derive(Debug, Clone)]
    enum PlantOp {
        Grow,
        Consume(f64),
    }

    fn plant_op() -> impl Strategy<Value = PlantOp> {
        prop_oneof![
            Just(PlantOp::Grow),
            (-5.0f64..50.0).prop_map(PlantOp::Consume),
        ]
    }

    proptest! {
        #[test]
        fn biomass_stays_within_bounds(
            initial in 0.0f64..300.0,
            rate in 0.0f64..40.0,
            max in 0.0f64..250.0,
            latch in any::<bool>(),
            ops in prop::collection::vec(plant_op(), 0..64),
        ) {
            let mut plant = Plant::new(&config(initial, rate, max, latch));
            for op in ops {
                match op {
                    PlantOp::Grow => { plant.grow(); }
                    PlantOp::Consume(amount) => { plant.consume(amount); }
                }
                prop_assert!(plant.biomass() >= 0.0);
                prop_assert!(plant.biomass() <= plant.max_biomass());
            }
        }
    }
}
