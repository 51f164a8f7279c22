//! Temperature-Modified Decay
//!
//! Applied decay rates follow a Q10 response around a 10 °C reference
//! temperature:
//!
//! ```text
//! rate = base_rate * exp((T - 10) * ln(Q10) * 0.1) * f_precip
//! ```
//!
//! The precipitation modifier is a placeholder fixed at 1.0. The black
//! carbon pool is exempt from the temperature response and keeps its
//! configured base rate for the whole simulation.

use crate::params::SiteConfig;
use crate::pools::{DomPool, DECAY_REFERENCE_TEMP, NUM_DOM_POOLS};
use ndarray::Array2;

/// Temperature modifier applied to a base decay rate.
pub fn decay_f_temp(mean_annual_temp: f64, q10: f64) -> f64 {
    ((mean_annual_temp - DECAY_REFERENCE_TEMP) * q10.ln() * 0.1).exp()
}

/// Precipitation modifier. Currently unity for all inputs.
pub fn decay_f_precip(_annual_precipitation: f64) -> f64 {
    1.0
}

/// Applied annual decay rates, `[pool, species]`, for one site.
///
/// Rebuilt each year from the climate series before the soil dynamics run.
#[derive(Debug, Clone)]
pub struct DecayRates {
    rates: Array2<f64>,
}

impl DecayRates {
    /// Build the initial rate table for a site. Black carbon rates are
    /// fixed here and never touched by [`DecayRates::recompute`].
    pub fn new(config: &SiteConfig, ecoregion: usize) -> DecayRates {
        let n_species = config.n_species();
        let mut rates = Array2::zeros((NUM_DOM_POOLS, n_species));
        for species in 0..n_species {
            let base = config.base_decay_rates[[ecoregion, species, DomPool::BlackCarbon.index()]];
            rates[[DomPool::BlackCarbon.index(), species]] = base;
        }
        let mut table = DecayRates { rates };
        for species in 0..n_species {
            table.recompute(config, ecoregion, species, 0);
        }
        table
    }

    /// Recompute the applied rates for one species from the year's mean
    /// annual temperature. The black carbon row is left untouched.
    pub fn recompute(&mut self, config: &SiteConfig, ecoregion: usize, species: usize, year: u32) {
        let temp = config.climate.mean_annual_temperature(ecoregion, year);
        let precip_modifier = decay_f_precip(0.0);
        for pool in DomPool::ALL {
            if pool == DomPool::BlackCarbon {
                continue;
            }
            let base = config.base_decay_rates[[ecoregion, species, pool.index()]];
            let q10 = config.q10[[ecoregion, species, pool.index()]];
            self.rates[[pool.index(), species]] = base * decay_f_temp(temp, q10) * precip_modifier;
        }
    }

    pub fn rate(&self, pool: DomPool, species: usize) -> f64 {
        self.rates[[pool.index(), species]]
    }
}
