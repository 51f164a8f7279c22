//! Initialization Passes
//!
//! Two routines run once per site before the first simulation year:
//!
//! * [`SiteCarbon::spin_up`] replays the recorded age-sequence turnover,
//!   ending each replay with a stand-replacing severity-4 fire, until the
//!   slow pools stabilize;
//! * [`SiteCarbon::last_initial_pass`] replays the sequence one final time
//!   with the pool dynamics active, consuming the turnover history and
//!   injecting any pre-existing snags at the right point in the past.
//!
//! The final pass always runs, even when spin-up is disabled, so reported
//! year-one pools differ from the raw configured stocks.

use crate::disturbance::RootInput;
use crate::site::{SiteCarbon, SoilPass};
use forcarb_core::disturbance::DisturbanceKind;
use forcarb_core::errors::ForcarbResult;
use forcarb_core::pools::{BiomassComponent, DomPool, BIOMASS_TO_CARBON, NUM_BIOMASS_COMPONENTS};
use log::info;
use std::sync::Arc;

/// Severity class assumed for the stand-replacing spin-up fire.
const SPINUP_FIRE_SEVERITY: u8 = 4;

/// A snag that already stood on the site at the start of the simulation.
///
/// Registered before initialization; its biomass is accumulated through
/// [`SiteCarbon::collect_biomass_mortality`] with
/// [`crate::site::TurnoverSource::InitialSnag`], and the killing disturbance
/// is replayed `time_since_death` years before the end of initialization.
#[derive(Debug, Clone)]
pub struct SnagRecord {
    pub species: usize,
    /// Cohort age when the tree died; drives the merchantability split.
    pub age_at_death: u32,
    /// Years the snag has been standing at simulation start.
    pub time_since_death: u32,
    /// Raw name of the disturbance that killed the tree.
    pub disturbance: String,
    pub(crate) wood_biomass: f64,
    pub(crate) nonwood_biomass: f64,
}

impl SiteCarbon {
    /// Register a pre-existing snag. The returned index is used with
    /// [`crate::site::TurnoverSource::InitialSnag`] when reporting its
    /// biomass.
    pub fn register_initial_snag(
        &mut self,
        species: usize,
        age_at_death: u32,
        time_since_death: u32,
        disturbance: &str,
    ) -> usize {
        self.initial_snags.push(SnagRecord {
            species,
            age_at_death,
            time_since_death,
            disturbance: disturbance.to_string(),
            wood_biomass: 0.0,
            nonwood_biomass: 0.0,
        });
        self.initial_snags.len() - 1
    }

    fn slow_pool_total(&self) -> f64 {
        (0..self.config.n_species())
            .map(|sp| {
                self.stock(DomPool::SlowAboveGround, sp) + self.stock(DomPool::SlowBelowGround, sp)
            })
            .sum()
    }

    /// Equilibrate the pools by replaying the recorded age sequence, with a
    /// stand-replacing fire at the end of each replay, until the slow-pool
    /// total changes by less than the configured tolerance between cycles
    /// (or the iteration cap is hit). Returns the number of cycles run.
    pub fn spin_up(&mut self, standing_biomass: f64) -> ForcarbResult<u32> {
        if !self.config.spinup.enabled {
            return Ok(0);
        }
        let config = Arc::clone(&self.config);
        let tolerance = config.spinup.tolerance_percent;
        let max_iterations = config.spinup.max_iterations;
        let max_age = self.last_age;
        let max_slot = self.turnover_history.dim().2 - 1;
        let fire = DisturbanceKind::Fire {
            severity: SPINUP_FIRE_SEVERITY,
        };
        let mut previous_slow = self.slow_pool_total();
        let mut cycles = 0u32;
        loop {
            for age in 0..=max_age {
                let slot = (age as usize).min(max_slot);
                for species in 0..config.n_species() {
                    if !self.species_present[species] {
                        continue;
                    }
                    for component in 0..NUM_BIOMASS_COMPONENTS {
                        self.net_c_loss[[component, species]] =
                            self.turnover_history[[component, species, slot]];
                    }
                    if age == max_age {
                        // Burn the standing live biomass recorded at the
                        // end of initialization.
                        let wood_c = self.live_biomass
                            [[BiomassComponent::Merchantable.index(), species]];
                        let nonwood_c: f64 = BiomassComponent::ALL
                            .iter()
                            .filter(|c| **c != BiomassComponent::Merchantable)
                            .map(|c| self.live_biomass[[c.index(), species]])
                            .sum();
                        let roots = RootInput {
                            coarse_root: self.live_biomass
                                [[BiomassComponent::CoarseRoot.index(), species]]
                                / BIOMASS_TO_CARBON,
                            fine_root: self.live_biomass
                                [[BiomassComponent::FineRoot.index(), species]]
                                / BIOMASS_TO_CARBON,
                        };
                        self.disturbance_impacts_biomass(
                            species,
                            age,
                            wood_c / BIOMASS_TO_CARBON,
                            nonwood_c / BIOMASS_TO_CARBON,
                            roots,
                            &fire,
                        )?;
                    }
                }
                if age == max_age {
                    self.disturbance_impacts_dom(&fire)?;
                }
                self.process_soils(standing_biomass, 0.0, SoilPass::Spinup);
            }
            let new_slow = self.slow_pool_total();
            let change_percent = 100.0 * (new_slow - previous_slow) / previous_slow;
            previous_slow = new_slow;
            cycles += 1;
            info!(
                "spin-up cycle {}: slow pools {:.3}, change {:.3}%",
                cycles, new_slow, change_percent
            );
            if cycles >= max_iterations
                || !(change_percent > tolerance || change_percent < -tolerance)
            {
                break;
            }
        }
        Ok(cycles)
    }

    /// The final initialization pass. Replays the age sequence once with the
    /// pool dynamics active, consuming the turnover history, and injects
    /// each registered snag's killing disturbance `time_since_death` years
    /// before the end so the snag decays for the right length of time.
    pub fn last_initial_pass(&mut self, standing_biomass: f64) -> ForcarbResult<()> {
        let config = Arc::clone(&self.config);
        let max_age = self.last_age;
        let max_slot = self.turnover_history.dim().2 - 1;
        for age in 0..=max_age {
            let mut triggered: Option<DisturbanceKind> = None;
            for species in 0..config.n_species() {
                if !self.species_present[species] {
                    continue;
                }
                let slot = (age as usize).min(max_slot);
                for component in 0..NUM_BIOMASS_COMPONENTS {
                    self.net_c_loss[[component, species]] =
                        self.turnover_history[[component, species, slot]];
                    self.turnover_history[[component, species, slot]] = 0.0;
                }
                for index in 0..self.initial_snags.len() {
                    let record = self.initial_snags[index].clone();
                    if age + record.time_since_death == max_age && species == record.species {
                        let kind =
                            DisturbanceKind::from_event_name(&record.disturbance, 0, None);
                        self.disturbance_impacts_biomass(
                            species,
                            record.age_at_death,
                            record.wood_biomass,
                            record.nonwood_biomass,
                            RootInput::default(),
                            &kind,
                        )?;
                        triggered = Some(kind);
                    }
                    if record.age_at_death == 0 || record.age_at_death > max_age {
                        break;
                    }
                }
            }
            // One DOM impact per year at most, matching the occurrence
            // guard; if snags of several species share a year they share
            // the event.
            if let Some(kind) = triggered {
                self.disturbance_impacts_dom(&kind)?;
            }
            self.process_soils(standing_biomass, 0.0, SoilPass::LastInitial);
        }
        self.initial_snags.clear();
        Ok(())
    }
}
