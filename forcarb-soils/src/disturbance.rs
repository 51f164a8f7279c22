//! Disturbance Impacts
//!
//! Applies a resolved [`DisturbanceKind`] to a site, in two halves mirroring
//! how events arrive from the landscape: per-cohort biomass impacts first,
//! then a single site-wide DOM impact.
//!
//! The two halves track occurrence differently. Biomass impacts record the
//! event unconditionally (every affected cohort is processed), while the DOM
//! impact is guarded by the same flag so that each disturbance family
//! touches the DOM pools at most once per site per year.

use crate::site::SiteCarbon;
use forcarb_core::disturbance::DisturbanceKind;
use forcarb_core::errors::ForcarbResult;
use forcarb_core::params::SiteConfig;
use forcarb_core::pools::{BiomassComponent, DomPool, BIOMASS_TO_CARBON};
use forcarb_core::transfer::TransferRuleSet;
use log::{debug, warn};
use std::sync::Arc;

/// Root biomass (dry mass, not carbon) of the killed cohort, supplied by the
/// caller's root allocation model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RootInput {
    pub coarse_root: f64,
    pub fine_root: f64,
}

/// The biomass rule set for an event, or `None` when the event moves no
/// biomass (severity-zero fire, or no matching table).
fn biomass_rules<'a>(
    config: &'a SiteConfig,
    kind: &DisturbanceKind,
) -> ForcarbResult<Option<&'a TransferRuleSet>> {
    match kind {
        DisturbanceKind::Fire { severity } => {
            if *severity == 0 {
                Ok(None)
            } else {
                config.matrices.fire_biomass(*severity).map(Some)
            }
        }
        DisturbanceKind::Harvest { prescription } => {
            let tables = &config.matrices.other_biomass;
            if let Some(name) = prescription {
                if let Some(table) = tables.get(name) {
                    return Ok(Some(table));
                }
                warn!("no biomass transfer table for prescription {name:?}, using the generic harvest table");
            }
            let table = tables.get("Harvest");
            if table.is_none() {
                debug!("no biomass transfer table for harvest, skipping");
            }
            Ok(table)
        }
        DisturbanceKind::Named(name) => {
            let table = config.matrices.other_biomass.get(name);
            if table.is_none() {
                debug!("no biomass transfer table for disturbance {name:?}, skipping");
            }
            Ok(table)
        }
    }
}

fn dom_rules<'a>(
    config: &'a SiteConfig,
    kind: &DisturbanceKind,
) -> ForcarbResult<Option<&'a TransferRuleSet>> {
    match kind {
        DisturbanceKind::Fire { severity } => {
            if *severity == 0 {
                Ok(None)
            } else {
                config.matrices.fire_dom(*severity).map(Some)
            }
        }
        DisturbanceKind::Harvest { prescription } => {
            let tables = &config.matrices.other_dom;
            if let Some(name) = prescription {
                if let Some(table) = tables.get(name) {
                    return Ok(Some(table));
                }
                warn!("no DOM transfer table for prescription {name:?}, using the generic harvest table");
            }
            let table = tables.get("Harvest");
            if table.is_none() {
                debug!("no DOM transfer table for harvest, skipping");
            }
            Ok(table)
        }
        DisturbanceKind::Named(name) => {
            let table = config.matrices.other_dom.get(name);
            if table.is_none() {
                debug!("no DOM transfer table for disturbance {name:?}, skipping");
            }
            Ok(table)
        }
    }
}

impl SiteCarbon {
    /// Apply a disturbance to one killed (or partially killed) cohort.
    ///
    /// `wood` and `nonwood` are dry biomass. The merchantable share of the
    /// wood is derived from the cohort's age, so for snags created before
    /// the simulation the caller passes the age at death.
    pub fn disturbance_impacts_biomass(
        &mut self,
        species: usize,
        age: u32,
        wood: f64,
        nonwood: f64,
        roots: RootInput,
        kind: &DisturbanceKind,
    ) -> ForcarbResult<()> {
        let config = Arc::clone(&self.config);
        self.dist_occurred[kind.slot()] = true;
        self.species_present[species] = true;
        let rules = match biomass_rules(&config, kind)? {
            Some(rules) => rules,
            None => return Ok(()),
        };
        let wood_c = wood * BIOMASS_TO_CARBON;
        let nonwood_c = nonwood * BIOMASS_TO_CARBON;
        let coarse_root_c = roots.coarse_root * BIOMASS_TO_CARBON;
        let fine_root_c = roots.fine_root * BIOMASS_TO_CARBON;
        let prop_stem = if wood_c > 0.0 {
            self.merchantable_stem_fraction(species, age)?
        } else {
            0.0
        };
        for component in BiomassComponent::ALL {
            let amount = match component {
                BiomassComponent::Merchantable => wood_c * prop_stem,
                BiomassComponent::Foliage => nonwood_c,
                BiomassComponent::Other => wood_c * (1.0 - prop_stem),
                // Sub-merchantable biomass is not modelled as a separate
                // cohort component.
                BiomassComponent::SubMerchantable => continue,
                BiomassComponent::CoarseRoot => coarse_root_c,
                BiomassComponent::FineRoot => fine_root_c,
            };
            let rule = rules.rule(component.id())?;
            self.net_c_loss[[component.index(), species]] += amount * rule.to_dom();
            self.totals.add_disturbance(
                amount * rule.to_dom(),
                amount * rule.to_air(),
                amount * rule.to_fps(),
            );
        }
        Ok(())
    }

    /// Apply a disturbance to the DOM pools of every species that has been
    /// present on the site. Runs at most once per disturbance family per
    /// year.
    ///
    /// Snag pools route their to-DOM fraction to the forest floor (stem
    /// snags to the medium pool, other snags to the fast above-ground
    /// pool); the ground pools are already on the floor, so their to-DOM
    /// fractions are ignored.
    pub fn disturbance_impacts_dom(&mut self, kind: &DisturbanceKind) -> ForcarbResult<()> {
        let config = Arc::clone(&self.config);
        let slot = kind.slot();
        if self.dist_occurred[slot] {
            return Ok(());
        }
        self.dist_occurred[slot] = true;
        let rules = match dom_rules(&config, kind)? {
            Some(rules) => rules,
            None => return Ok(()),
        };
        for species in 0..config.n_species() {
            if !self.species_present[species] {
                continue;
            }
            for pool in DomPool::ALL {
                let rule = rules.rule(pool.id())?;
                let stock = self.stock(pool, species);
                let loss = stock * rule.to_air();
                let to_fps = stock * rule.to_fps();
                self.totals.add_disturbance(0.0, loss, to_fps);
                let to_floor = match pool {
                    DomPool::StemSnag => {
                        let fallen = stock * rule.to_dom();
                        self.soil_c[[DomPool::Medium.index(), species]] += fallen;
                        fallen
                    }
                    DomPool::OtherSnag => {
                        let fallen = stock * rule.to_dom();
                        self.soil_c[[DomPool::FastAboveGround.index(), species]] += fallen;
                        fallen
                    }
                    _ => 0.0,
                };
                let remaining = &mut self.soil_c[[pool.index(), species]];
                *remaining -= loss + to_fps + to_floor;
                if *remaining < 0.0 {
                    *remaining = 0.0;
                }
            }
        }
        Ok(())
    }
}
