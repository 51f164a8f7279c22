//! Shared fixtures for the unit tests in this crate.

use crate::site::SiteCarbon;
use forcarb_core::params::{
    ClimateTable, DomPoolDefinition, SiteConfig, SpeciesParameters, SpinupParameters,
};
use forcarb_core::pools::{DomPool, NUM_DOM_POOLS};
use forcarb_core::transfer::DisturbanceMatrices;
use ndarray::Array3;
use std::sync::Arc;

pub(crate) fn pool_table() -> Vec<DomPoolDefinition> {
    DomPool::ALL
        .iter()
        .map(|p| DomPoolDefinition {
            id: p.id(),
            name: p.name().to_string(),
            frac_air: 0.5,
        })
        .collect()
}

/// A one-species, one-ecoregion configuration with uniform decay rates of
/// 0.1, Q10 of 2, a constant 10 degree climate (so applied rates equal base
/// rates), and zeroed disturbance matrices.
pub(crate) fn config() -> SiteConfig {
    let pools = pool_table();
    let config = SiteConfig {
        matrices: DisturbanceMatrices::zeroed(&pools).unwrap(),
        pools,
        species: vec![SpeciesParameters {
            name: "pinubank".to_string(),
            merch_stems_min_age: 10,
            merch_curve_a: 0.8,
            merch_curve_b: 0.95,
            prop_non_merch: 0.25,
        }],
        climate: ClimateTable::constant(&[10.0]),
        spinup: SpinupParameters::default(),
        frac_slow_ag_to_slow_bg: 0.006,
        frac_stem_snag_to_medium: 0.032,
        frac_branch_snag_to_fast_ag: 0.1,
        base_decay_rates: Array3::from_elem((1, 1, NUM_DOM_POOLS), 0.1),
        q10: Array3::from_elem((1, 1, NUM_DOM_POOLS), 2.0),
        initial_stocks: Array3::zeros((1, 1, NUM_DOM_POOLS)),
    };
    config.validate().unwrap();
    config
}

pub(crate) fn arc_config() -> Arc<SiteConfig> {
    Arc::new(config())
}

pub(crate) fn site() -> SiteCarbon {
    SiteCarbon::new(arc_config(), 0, 200).unwrap()
}
