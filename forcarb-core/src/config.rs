//! Configuration Loading
//!
//! Deserializes the TOML configuration surface into a validated
//! [`SiteConfig`]. The raw on-disk schema is kept separate from the runtime
//! types so the file format can stay flat and table-oriented while the engine
//! works with dense arrays and pre-built rule sets.

use crate::errors::{ForcarbError, ForcarbResult};
use crate::params::{
    ClimateTable, DomPoolDefinition, SiteConfig, SpeciesParameters, SpinupParameters,
};
use crate::pools::NUM_DOM_POOLS;
use crate::transfer::{DisturbanceMatrices, TransferRuleSet};
use ndarray::Array3;
use serde::Deserialize;
use std::collections::hash_map::Entry;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawConfig {
    pool: Vec<DomPoolDefinition>,
    species: Vec<SpeciesParameters>,
    climate: ClimateTable,
    #[serde(default)]
    spinup: SpinupParameters,
    dom_transfers: RawDomTransfers,
    decay: Vec<RawDecayEntry>,
    #[serde(default)]
    disturbance: RawDisturbances,
}

#[derive(Debug, Deserialize)]
struct RawDomTransfers {
    frac_slow_ag_to_slow_bg: f64,
    frac_stem_snag_to_medium: f64,
    frac_branch_snag_to_fast_ag: f64,
}

/// One row of the decay table: all ten per-pool values for one
/// (ecoregion, species) pair.
#[derive(Debug, Deserialize)]
struct RawDecayEntry {
    ecoregion: usize,
    species: String,
    base_rates: Vec<f64>,
    q10: Vec<f64>,
    #[serde(default)]
    initial_stocks: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDisturbances {
    #[serde(default)]
    fire: Vec<RawFireRule>,
    #[serde(default)]
    other: Vec<RawNamedRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RuleTarget {
    Dom,
    Biomass,
}

#[derive(Debug, Deserialize)]
struct RawFireRule {
    severity: u8,
    target: RuleTarget,
    pool: u32,
    #[serde(default)]
    to_air: f64,
    #[serde(default)]
    to_floor: f64,
    #[serde(default)]
    to_fps: f64,
    #[serde(default)]
    to_dom: f64,
}

#[derive(Debug, Deserialize)]
struct RawNamedRule {
    name: String,
    target: RuleTarget,
    pool: u32,
    #[serde(default)]
    to_air: f64,
    #[serde(default)]
    to_floor: f64,
    #[serde(default)]
    to_fps: f64,
    #[serde(default)]
    to_dom: f64,
}

impl RawConfig {
    fn build(self) -> ForcarbResult<SiteConfig> {
        let n_ecoregions = self.climate.n_ecoregions();
        let n_species = self.species.len();
        if n_ecoregions == 0 {
            return Err(ForcarbError::Config(
                "climate table must define at least one ecoregion".to_string(),
            ));
        }

        let mut base_decay_rates = Array3::zeros((n_ecoregions, n_species, NUM_DOM_POOLS));
        let mut q10 = Array3::from_elem((n_ecoregions, n_species, NUM_DOM_POOLS), 1.0);
        let mut initial_stocks = Array3::zeros((n_ecoregions, n_species, NUM_DOM_POOLS));
        for entry in &self.decay {
            let species = self
                .species
                .iter()
                .position(|s| s.name == entry.species)
                .ok_or_else(|| {
                    ForcarbError::Config(format!(
                        "decay table references unknown species {:?}",
                        entry.species
                    ))
                })?;
            if entry.ecoregion >= n_ecoregions {
                return Err(ForcarbError::Config(format!(
                    "decay table references ecoregion {} but only {} are defined",
                    entry.ecoregion, n_ecoregions
                )));
            }
            for (name, values) in [
                ("base_rates", &entry.base_rates),
                ("q10", &entry.q10),
            ] {
                if values.len() != NUM_DOM_POOLS {
                    return Err(ForcarbError::Config(format!(
                        "decay table {} for species {:?} must list {} values, got {}",
                        name,
                        entry.species,
                        NUM_DOM_POOLS,
                        values.len()
                    )));
                }
            }
            if !entry.initial_stocks.is_empty() && entry.initial_stocks.len() != NUM_DOM_POOLS {
                return Err(ForcarbError::Config(format!(
                    "initial_stocks for species {:?} must list {} values, got {}",
                    entry.species,
                    NUM_DOM_POOLS,
                    entry.initial_stocks.len()
                )));
            }
            for pool in 0..NUM_DOM_POOLS {
                base_decay_rates[[entry.ecoregion, species, pool]] = entry.base_rates[pool];
                q10[[entry.ecoregion, species, pool]] = entry.q10[pool];
                if !entry.initial_stocks.is_empty() {
                    initial_stocks[[entry.ecoregion, species, pool]] = entry.initial_stocks[pool];
                }
            }
        }

        let mut matrices = DisturbanceMatrices::zeroed(&self.pool)?;
        for rule in &self.disturbance.fire {
            let table = match rule.target {
                RuleTarget::Dom => &mut matrices.fire_dom,
                RuleTarget::Biomass => &mut matrices.fire_biomass,
            };
            if rule.severity == 0 || rule.severity as usize > table.len() {
                return Err(ForcarbError::FireSeverityOutOfRange(
                    rule.severity,
                    table.len() as u8,
                ));
            }
            table[rule.severity as usize - 1].set_fractions(
                rule.pool,
                rule.to_air,
                rule.to_floor,
                rule.to_fps,
                rule.to_dom,
            )?;
        }
        for rule in &self.disturbance.other {
            let (table, init_biomass) = match rule.target {
                RuleTarget::Dom => (&mut matrices.other_dom, false),
                RuleTarget::Biomass => (&mut matrices.other_biomass, true),
            };
            let set = match table.entry(rule.name.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let mut set = TransferRuleSet::new(&rule.name);
                    if init_biomass {
                        set.initialize_biomass_pools()?;
                    } else {
                        set.initialize_from_pool_table(&self.pool)?;
                    }
                    entry.insert(set)
                }
            };
            set.set_fractions(rule.pool, rule.to_air, rule.to_floor, rule.to_fps, rule.to_dom)?;
        }

        let config = SiteConfig {
            pools: self.pool,
            species: self.species,
            climate: self.climate,
            spinup: self.spinup,
            frac_slow_ag_to_slow_bg: self.dom_transfers.frac_slow_ag_to_slow_bg,
            frac_stem_snag_to_medium: self.dom_transfers.frac_stem_snag_to_medium,
            frac_branch_snag_to_fast_ag: self.dom_transfers.frac_branch_snag_to_fast_ag,
            base_decay_rates,
            q10,
            initial_stocks,
            matrices,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Parse and validate a configuration from TOML text.
pub fn from_toml_str(contents: &str) -> ForcarbResult<SiteConfig> {
    let raw: RawConfig = toml::from_str(contents)
        .map_err(|e| ForcarbError::Config(format!("invalid configuration: {e}")))?;
    raw.build()
}

/// Load a configuration file from disk.
pub fn load(path: impl AsRef<Path>) -> ForcarbResult<SiteConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ForcarbError::Config(format!("cannot read {}: {e}", path.display()))
    })?;
    from_toml_str(&contents)
}
