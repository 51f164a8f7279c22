//! Annual Flux Accounting
//!
//! [`FluxTotals`] accumulates the year's carbon transfers in a small
//! two-by-three table: one row for transfers driven by growth and turnover,
//! one for transfers driven by disturbance; columns for carbon entering the
//! DOM pools, released to the atmosphere, and removed to the Forest Product
//! Sector. The table is zeroed at the end of every annual pass.

use serde::Serialize;

/// Running transfer totals for the current year.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FluxTotals {
    /// `[row][column]`; row 0 undisturbed, row 1 disturbance-driven;
    /// columns to-DOM, to-air, to-FPS.
    table: [[f64; 3]; 2],
}

impl FluxTotals {
    /// Record turnover or mortality carbon entering the DOM pools outside
    /// of any disturbance.
    pub fn add_turnover_to_dom(&mut self, carbon: f64) {
        self.table[0][0] += carbon;
    }

    /// Record decay losses released to the atmosphere.
    pub fn add_decay_to_air(&mut self, carbon: f64) {
        self.table[0][1] += carbon;
    }

    /// Record a disturbance transfer, split across the three destinations.
    pub fn add_disturbance(&mut self, to_dom: f64, to_air: f64, to_fps: f64) {
        self.table[1][0] += to_dom;
        self.table[1][1] += to_air;
        self.table[1][2] += to_fps;
    }

    pub fn turnover_to_dom(&self) -> f64 {
        self.table[0][0]
    }

    pub fn decay_to_air(&self) -> f64 {
        self.table[0][1]
    }

    pub fn disturbance_to_dom(&self) -> f64 {
        self.table[1][0]
    }

    pub fn disturbance_to_air(&self) -> f64 {
        self.table[1][1]
    }

    pub fn disturbance_to_fps(&self) -> f64 {
        self.table[1][2]
    }

    pub fn reset(&mut self) {
        self.table = [[0.0; 3]; 2];
    }
}

/// Site-level carbon budget for one simulation year.
///
/// All values are carbon masses (or carbon mass fluxes per year).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FluxSummary {
    /// Above-ground live biomass carbon.
    pub aboveground_biomass: f64,
    /// Below-ground live biomass carbon.
    pub belowground_biomass: f64,
    /// Total dead organic matter carbon (litter plus dead wood).
    pub total_dom: f64,
    /// Change in live biomass carbon since last year.
    pub delta_biomass: f64,
    /// Turnover and mortality input to the DOM pools.
    pub turnover: f64,
    /// Change in live biomass from growth alone.
    pub net_growth: f64,
    /// Net primary productivity, floored at zero.
    pub npp: f64,
    /// Heterotrophic respiration (decay losses to the atmosphere).
    pub rh: f64,
    /// Net ecosystem productivity: NPP minus Rh.
    pub nep: f64,
    /// Net biome productivity: NEP minus disturbance losses to the
    /// atmosphere and to the FPS.
    pub nbp: f64,
    /// Carbon removed to the Forest Product Sector this year.
    pub to_fps: f64,
}
