//! Model parameters
//!
//! Parameter structures for the carbon pool engine. Everything here is
//! populated once at setup (usually through [`crate::config`]) and shared
//! read-only across sites: no component mutates configuration after setup,
//! so a [`SiteConfig`] can be handed to many site workers behind an `Arc`.

use crate::errors::{ForcarbError, ForcarbResult};
use crate::pools::{DomPool, NUM_DOM_POOLS};
use crate::transfer::DisturbanceMatrices;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// Definition of one DOM pool from the pool table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomPoolDefinition {
    /// One-based pool ID, matching [`DomPool::id`].
    pub id: u32,
    pub name: String,
    /// Fraction of annual decay loss released to the atmosphere; the
    /// remainder feeds the pool's downstream pool.
    pub frac_air: f64,
}

/// Per-species merchantability and turnover-partition parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesParameters {
    pub name: String,
    /// Minimum cohort age at which dead stems produce merchantable snags.
    pub merch_stems_min_age: u32,
    /// `a` in the merchantability curve `a * (1 - b^age)`.
    pub merch_curve_a: f64,
    /// `b` in the merchantability curve `a * (1 - b^age)`.
    pub merch_curve_b: f64,
    /// Share of above-ground woody turnover that is non-merchantable.
    pub prop_non_merch: f64,
}

/// Mean annual temperature per ecoregion and simulation year.
///
/// Years beyond the configured series reuse the last value, so a short
/// series behaves as a constant climate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateTable {
    /// `temperatures[ecoregion][year]`, °C.
    pub temperatures: Vec<Vec<f64>>,
}

impl ClimateTable {
    /// Constant climate: one temperature per ecoregion for every year.
    pub fn constant(temperatures: &[f64]) -> ClimateTable {
        ClimateTable {
            temperatures: temperatures.iter().map(|t| vec![*t]).collect(),
        }
    }

    pub fn mean_annual_temperature(&self, ecoregion: usize, year: u32) -> f64 {
        let series = &self.temperatures[ecoregion];
        let idx = (year as usize).min(series.len() - 1);
        series[idx]
    }

    pub fn n_ecoregions(&self) -> usize {
        self.temperatures.len()
    }
}

/// Controls for the offline spin-up equilibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinupParameters {
    /// When false, initial pool stocks are used as-is (the final
    /// initialization pass still runs).
    pub enabled: bool,
    /// Convergence tolerance on the slow-pool total, in percent change
    /// between successive passes.
    pub tolerance_percent: f64,
    /// Hard cap on the number of full age-sequence replays.
    pub max_iterations: u32,
}

impl Default for SpinupParameters {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance_percent: 1.0,
            max_iterations: 100,
        }
    }
}

/// Complete, validated configuration for the carbon pool engine.
///
/// Per-(ecoregion, species) tables are dense `Array3` blocks indexed
/// `[ecoregion, species, pool]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// The ten DOM pool definitions, ordered by ID.
    pub pools: Vec<DomPoolDefinition>,
    pub species: Vec<SpeciesParameters>,
    pub climate: ClimateTable,
    pub spinup: SpinupParameters,
    /// Annual bio-mixing fraction moved from the above-ground slow pool to
    /// the below-ground slow pool.
    pub frac_slow_ag_to_slow_bg: f64,
    /// Annual fraction of stem-snag carbon falling into the medium pool.
    pub frac_stem_snag_to_medium: f64,
    /// Annual fraction of other-snag carbon falling into the fast
    /// above-ground pool.
    pub frac_branch_snag_to_fast_ag: f64,
    /// Base annual decay rates, `[ecoregion, species, pool]`.
    pub base_decay_rates: Array3<f64>,
    /// Q10 temperature sensitivities, `[ecoregion, species, pool]`.
    pub q10: Array3<f64>,
    /// Initial pool stocks at time zero, `[ecoregion, species, pool]`.
    pub initial_stocks: Array3<f64>,
    pub matrices: DisturbanceMatrices,
}

impl SiteConfig {
    pub fn n_species(&self) -> usize {
        self.species.len()
    }

    pub fn n_ecoregions(&self) -> usize {
        self.climate.n_ecoregions()
    }

    /// Atmosphere fraction of decay losses for a pool.
    pub fn frac_air(&self, pool: DomPool) -> f64 {
        self.pools[pool.index()].frac_air
    }

    /// Check the structural invariants that the rest of the engine relies
    /// on. Called by the configuration loader; programmatically built
    /// configurations should call it too.
    pub fn validate(&self) -> ForcarbResult<()> {
        if self.pools.len() != NUM_DOM_POOLS {
            return Err(ForcarbError::Config(format!(
                "expected {} DOM pool definitions, got {}",
                NUM_DOM_POOLS,
                self.pools.len()
            )));
        }
        for (idx, pool) in self.pools.iter().enumerate() {
            if pool.id != idx as u32 + 1 {
                return Err(ForcarbError::Config(format!(
                    "DOM pool definitions must be ordered by ID; position {} has ID {}",
                    idx, pool.id
                )));
            }
            check_unit_fraction("FracAir", pool.frac_air)?;
        }
        if self.species.is_empty() {
            return Err(ForcarbError::Config(
                "at least one species must be defined".to_string(),
            ));
        }
        for species in &self.species {
            check_unit_fraction("PropNonMerch", species.prop_non_merch)?;
            check_unit_fraction("MerchCurveParmB", species.merch_curve_b)?;
        }
        for (ecoregion, series) in self.climate.temperatures.iter().enumerate() {
            if series.is_empty() {
                return Err(ForcarbError::Config(format!(
                    "climate series for ecoregion {ecoregion} is empty; at least one mean annual temperature is required"
                )));
            }
        }
        check_unit_fraction("PropDOMSlowAGToSlowBG", self.frac_slow_ag_to_slow_bg)?;
        check_unit_fraction("PropDOMStemSnagToMedium", self.frac_stem_snag_to_medium)?;
        check_unit_fraction(
            "PropDOMBranchSnagToFastAG",
            self.frac_branch_snag_to_fast_ag,
        )?;
        let expected = (self.n_ecoregions(), self.n_species(), NUM_DOM_POOLS);
        for (name, table) in [
            ("DOMDecayRates", &self.base_decay_rates),
            ("DOMPoolQ10", &self.q10),
            ("DOMPoolAmountT0", &self.initial_stocks),
        ] {
            if table.dim() != expected {
                return Err(ForcarbError::Config(format!(
                    "{} table has shape {:?}, expected {:?}",
                    name,
                    table.dim(),
                    expected
                )));
            }
        }
        if self
            .initial_stocks
            .iter()
            .any(|stock| !stock.is_finite() || *stock < 0.0)
        {
            return Err(ForcarbError::Config(
                "initial pool stocks must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_unit_fraction(name: &str, value: f64) -> ForcarbResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ForcarbError::Config(format!(
            "{name} must be in the range [0.0, 1.0], got {value}"
        )));
    }
    Ok(())
}
