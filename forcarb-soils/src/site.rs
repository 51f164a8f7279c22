//! Site Carbon State
//!
//! [`SiteCarbon`] tracks the ten DOM pools per species for one stand and
//! advances them through the annual cycle: turnover collection, the
//! six-stage pool dynamics, and flux accounting. Disturbance impacts and the
//! initialization passes live in the sibling [`crate::disturbance`] and
//! [`crate::spinup`] modules but operate on this state.

use crate::flux::{FluxSummary, FluxTotals};
use forcarb_core::decay::DecayRates;
use forcarb_core::errors::{ForcarbError, ForcarbResult};
use forcarb_core::params::SiteConfig;
use forcarb_core::pools::{
    BiomassComponent, DomPool, BIOMASS_TO_CARBON, COARSE_ROOT_ABOVE_RATIO, FINE_ROOT_ABOVE_RATIO,
    NUM_BIOMASS_COMPONENTS, NUM_DISTURBANCE_SLOTS, NUM_DOM_POOLS,
};
use ndarray::{Array2, Array3};
use std::sync::Arc;

/// Which phase a [`SiteCarbon::process_soils`] call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoilPass {
    /// Year-zero bookkeeping while the age sequence is being replayed; the
    /// pool dynamics are deferred until the final initialization pass.
    Initialization,
    /// Equilibration replay inside [`SiteCarbon::spin_up`].
    Spinup,
    /// The final initialization pass, where initial snags are injected.
    LastInitial,
    /// A normal simulation year; produces a [`FluxSummary`].
    Annual,
}

/// Where a mortality or turnover report comes from.
///
/// The spin-up and snag variants are only meaningful during initialization;
/// outside of it they are treated as below-ground litter, matching the
/// catch-all handling of the reporting codes they replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnoverSource {
    /// Above-ground litterfall and mortality (foliage plus stem wood).
    AbovegroundLitter,
    /// Below-ground turnover (fine and coarse roots).
    BelowgroundLitter,
    /// Standing live stem biomass recorded for the spin-up fire.
    SpinupLiveStem,
    /// Standing live root biomass recorded for the spin-up fire.
    SpinupLiveRoots,
    /// Biomass of a pre-existing snag, accumulated into the registered
    /// snag record at `index`.
    InitialSnag { index: usize },
}

/// Per-site, per-species carbon pool state.
pub struct SiteCarbon {
    pub(crate) config: Arc<SiteConfig>,
    pub(crate) ecoregion: usize,
    pub(crate) year: u32,
    /// `[pool, species]` carbon stocks.
    pub(crate) soil_c: Array2<f64>,
    /// `[component, species]` carbon inputs awaiting the next dynamics run.
    pub(crate) net_c_loss: Array2<f64>,
    pub(crate) decay_rates: DecayRates,
    pub(crate) species_present: Vec<bool>,
    pub(crate) dist_occurred: [bool; NUM_DISTURBANCE_SLOTS],
    pub(crate) carbon_to_air: [f64; NUM_DOM_POOLS],
    pub(crate) carbon_to_slow: [f64; NUM_DOM_POOLS],
    pub(crate) total_dom_c: [f64; NUM_DOM_POOLS],
    pub(crate) totals: FluxTotals,
    pub(crate) snag_to_medium: f64,
    pub(crate) branch_snag_to_fast: f64,
    pub(crate) litter_mass: f64,
    pub(crate) dead_wood_mass: f64,
    pub(crate) old_biomass: f64,
    pub(crate) pre_growth_root_biomass: f64,
    pub(crate) root_biomass: f64,
    /// Highest cohort age seen while initializing; bounds the replay loops.
    pub(crate) last_age: u32,
    /// `[component, species, age]` turnover recorded during initialization.
    pub(crate) turnover_history: Array3<f64>,
    /// `[component, species]` standing live biomass carbon at the end of
    /// initialization, consumed by the spin-up fire.
    pub(crate) live_biomass: Array2<f64>,
    pub(crate) initial_snags: Vec<crate::spinup::SnagRecord>,
    pub(crate) last_summary: Option<FluxSummary>,
}

impl SiteCarbon {
    /// Create the state for one site, seeding the pools from the configured
    /// time-zero stocks. `max_cohort_age` bounds the turnover history kept
    /// during initialization.
    pub fn new(
        config: Arc<SiteConfig>,
        ecoregion: usize,
        max_cohort_age: usize,
    ) -> ForcarbResult<SiteCarbon> {
        if ecoregion >= config.n_ecoregions() {
            return Err(ForcarbError::Config(format!(
                "ecoregion index {} is out of range ({} configured)",
                ecoregion,
                config.n_ecoregions()
            )));
        }
        let n_species = config.n_species();
        let mut soil_c = Array2::zeros((NUM_DOM_POOLS, n_species));
        for species in 0..n_species {
            for pool in 0..NUM_DOM_POOLS {
                soil_c[[pool, species]] = config.initial_stocks[[ecoregion, species, pool]];
            }
        }
        let decay_rates = DecayRates::new(&config, ecoregion);
        Ok(SiteCarbon {
            ecoregion,
            year: 0,
            soil_c,
            net_c_loss: Array2::zeros((NUM_BIOMASS_COMPONENTS, n_species)),
            decay_rates,
            species_present: vec![false; n_species],
            dist_occurred: [false; NUM_DISTURBANCE_SLOTS],
            carbon_to_air: [0.0; NUM_DOM_POOLS],
            carbon_to_slow: [0.0; NUM_DOM_POOLS],
            total_dom_c: [0.0; NUM_DOM_POOLS],
            totals: FluxTotals::default(),
            snag_to_medium: 0.0,
            branch_snag_to_fast: 0.0,
            litter_mass: 0.0,
            dead_wood_mass: 0.0,
            old_biomass: 0.0,
            pre_growth_root_biomass: 0.0,
            root_biomass: 0.0,
            last_age: 0,
            turnover_history: Array3::zeros((
                NUM_BIOMASS_COMPONENTS,
                n_species,
                max_cohort_age + 1,
            )),
            live_biomass: Array2::zeros((NUM_BIOMASS_COMPONENTS, n_species)),
            initial_snags: Vec::new(),
            last_summary: None,
            config,
        })
    }

    /// The current simulation year. Year 0 is initialization.
    pub fn year(&self) -> u32 {
        self.year
    }

    /// Advance the state to a new simulation year.
    pub fn set_year(&mut self, year: u32) {
        self.year = year;
    }

    pub(crate) fn initializing(&self) -> bool {
        self.year == 0
    }

    /// Carbon stock of one pool for one species.
    pub fn stock(&self, pool: DomPool, species: usize) -> f64 {
        self.soil_c[[pool.index(), species]]
    }

    /// Overwrite the stock of one pool, for programmatic initialization.
    pub fn set_stock(&mut self, pool: DomPool, species: usize, carbon: f64) {
        self.soil_c[[pool.index(), species]] = carbon;
    }

    /// Total DOM carbon over all pools and species.
    pub fn total_dom_carbon(&self) -> f64 {
        self.soil_c.sum()
    }

    /// Litter carbon (the two very fast pools) from the last dynamics run.
    pub fn litter_mass(&self) -> f64 {
        self.litter_mass
    }

    /// Dead wood carbon (everything except the very fast pools) from the
    /// last dynamics run.
    pub fn dead_wood_mass(&self) -> f64 {
        self.dead_wood_mass
    }

    pub fn species_present(&self) -> &[bool] {
        &self.species_present
    }

    /// The budget of the most recent annual pass, if one has run.
    pub fn last_summary(&self) -> Option<&FluxSummary> {
        self.last_summary.as_ref()
    }

    /// Proportion of dead stem carbon that is merchantable and becomes stem
    /// snag, from the per-species merchantability curve. Zero below the
    /// species' minimum merchantable age.
    pub fn merchantable_stem_fraction(&self, species: usize, age: u32) -> ForcarbResult<f64> {
        let params = &self.config.species[species];
        if age < params.merch_stems_min_age {
            return Ok(0.0);
        }
        let fraction = params.merch_curve_a * (1.0 - params.merch_curve_b.powi(age as i32));
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ForcarbError::MerchantableFractionOutOfRange {
                species,
                age,
                value: fraction,
            });
        }
        Ok(fraction)
    }

    /// Record cohort mortality or turnover, splitting it across the biomass
    /// components that feed the DOM pools.
    ///
    /// Masses are dry biomass; the carbon conversion happens here. During
    /// initialization the inputs are also remembered per cohort age so the
    /// spin-up can replay them.
    pub fn collect_biomass_mortality(
        &mut self,
        species: usize,
        age: u32,
        mortality_wood: f64,
        mortality_nonwood: f64,
        source: TurnoverSource,
    ) -> ForcarbResult<()> {
        self.species_present[species] = true;
        if self.initializing() {
            self.last_age = self.last_age.max(age);
        }
        if mortality_wood == 0.0 && mortality_nonwood == 0.0 {
            return Ok(());
        }
        let nonwood_c = mortality_nonwood * BIOMASS_TO_CARBON;
        let wood_c = mortality_wood * BIOMASS_TO_CARBON;
        // Ages past the allocated history share its last slot.
        let max_slot = self.turnover_history.dim().2 - 1;
        let idx_age = if self.initializing() {
            (age as usize).min(max_slot)
        } else {
            0
        };
        let prop_stem = if mortality_wood > 0.0 {
            self.merchantable_stem_fraction(species, age)?
        } else {
            0.0
        };
        let initializing = self.initializing();
        match source {
            TurnoverSource::AbovegroundLitter => {
                self.add_component_input(BiomassComponent::Foliage, species, idx_age, nonwood_c);
                if mortality_wood > 0.0 {
                    self.add_component_input(
                        BiomassComponent::Merchantable,
                        species,
                        idx_age,
                        wood_c * prop_stem,
                    );
                    self.add_component_input(
                        BiomassComponent::Other,
                        species,
                        idx_age,
                        wood_c * (1.0 - prop_stem),
                    );
                }
            }
            TurnoverSource::SpinupLiveStem if initializing => {
                self.live_biomass[[BiomassComponent::Merchantable.index(), species]] +=
                    wood_c * prop_stem;
                self.live_biomass[[BiomassComponent::Other.index(), species]] +=
                    wood_c * (1.0 - prop_stem);
            }
            TurnoverSource::SpinupLiveRoots if initializing => {
                self.live_biomass[[BiomassComponent::FineRoot.index(), species]] += nonwood_c;
                self.live_biomass[[BiomassComponent::CoarseRoot.index(), species]] += wood_c;
            }
            TurnoverSource::InitialSnag { index } if initializing => {
                // Snag biomass stays as dry mass until the disturbance that
                // created it is replayed.
                if let Some(record) = self.initial_snags.get_mut(index) {
                    record.wood_biomass += mortality_wood;
                    record.nonwood_biomass += mortality_nonwood;
                }
            }
            _ => {
                self.add_component_input(BiomassComponent::FineRoot, species, idx_age, nonwood_c);
                self.add_component_input(BiomassComponent::CoarseRoot, species, idx_age, wood_c);
            }
        }
        if matches!(
            source,
            TurnoverSource::AbovegroundLitter | TurnoverSource::BelowgroundLitter
        ) {
            self.totals.add_turnover_to_dom(nonwood_c + wood_c);
        }
        Ok(())
    }

    fn add_component_input(
        &mut self,
        component: BiomassComponent,
        species: usize,
        idx_age: usize,
        carbon: f64,
    ) {
        self.net_c_loss[[component.index(), species]] += carbon;
        self.turnover_history[[component.index(), species, idx_age]] += carbon;
    }

    /// Record root biomass for the annual budget. Pre-growth roots feed the
    /// net growth calculation; post-growth roots the standing biomass.
    pub fn collect_root_biomass(&mut self, all_roots: f64, pre_growth: bool) {
        if pre_growth {
            self.pre_growth_root_biomass += all_roots;
        } else {
            self.root_biomass += all_roots;
        }
    }

    /// Add turnover input to one pool, decay it, and split the loss between
    /// the atmosphere and the slow pools. Returns the carbon routed onward.
    fn decay_pool(&mut self, pool: DomPool, species: usize, inflow: f64) -> f64 {
        self.soil_c[[pool.index(), species]] += inflow;
        let lost = self.soil_c[[pool.index(), species]] * self.decay_rates.rate(pool, species);
        self.soil_c[[pool.index(), species]] -= lost;
        let to_air = lost * self.config.frac_air(pool);
        self.carbon_to_air[pool.index()] += to_air;
        self.carbon_to_slow[pool.index()] += lost - to_air;
        lost - to_air
    }

    /// Annual transfer of slow above-ground carbon into the slow
    /// below-ground pool.
    fn pool_bio_mixing(&mut self, species: usize, rate: f64) {
        let slow_ag = self.soil_c[[DomPool::SlowAboveGround.index(), species]];
        self.carbon_to_slow[DomPool::SlowAboveGround.index()] += slow_ag * rate;
        self.soil_c[[DomPool::SlowBelowGround.index(), species]] += slow_ag * rate;
        self.soil_c[[DomPool::SlowAboveGround.index(), species]] = slow_ag * (1.0 - rate);
    }

    /// The six-stage annual pool dynamics for one species.
    ///
    /// Stage order matters: branch snag fall is consumed by the fast stage
    /// before the snag stage adds this year's mortality, and stem snag fall
    /// is taken before the merchantable input lands in the stem snag pool.
    /// Each stage is skipped only when it has neither stock nor inflow, so
    /// the guards never change the numeric result.
    pub(crate) fn soil_dynamics(&mut self, species: usize) {
        let config = Arc::clone(&self.config);
        self.branch_snag_to_fast = 0.0;
        self.snag_to_medium = 0.0;
        let mut slow_above_in = 0.0;
        let mut slow_below_in = 0.0;

        // Very fast pools: foliage and fine root turnover, the fine root
        // share split above/below ground.
        let foliage = self.net_c_loss[[BiomassComponent::Foliage.index(), species]];
        let fine_root = self.net_c_loss[[BiomassComponent::FineRoot.index(), species]];
        if foliage > 0.0
            || fine_root > 0.0
            || self.stock(DomPool::VeryFastAboveGround, species) > 0.0
            || self.stock(DomPool::VeryFastBelowGround, species) > 0.0
        {
            slow_above_in += self.decay_pool(
                DomPool::VeryFastAboveGround,
                species,
                foliage + FINE_ROOT_ABOVE_RATIO * fine_root,
            );
            slow_below_in += self.decay_pool(
                DomPool::VeryFastBelowGround,
                species,
                (1.0 - FINE_ROOT_ABOVE_RATIO) * fine_root,
            );
        }

        // Fast pools: branch and coarse root turnover. Fallen branch snag
        // carbon is withdrawn here and added to the above-ground inflow;
        // the merchantable share of the woody turnover is set aside as the
        // other-snag input for the snag stage.
        let sub_merch = self.net_c_loss[[BiomassComponent::SubMerchantable.index(), species]];
        let other = self.net_c_loss[[BiomassComponent::Other.index(), species]];
        let coarse_root = self.net_c_loss[[BiomassComponent::CoarseRoot.index(), species]];
        let mut other_snag_input = 0.0;
        if sub_merch > 0.0
            || other > 0.0
            || coarse_root > 0.0
            || self.stock(DomPool::FastAboveGround, species) > 0.0
            || self.stock(DomPool::FastBelowGround, species) > 0.0
            || self.stock(DomPool::OtherSnag, species) > 0.0
        {
            self.branch_snag_to_fast = self.stock(DomPool::OtherSnag, species)
                * config.frac_branch_snag_to_fast_ag;
            self.soil_c[[DomPool::OtherSnag.index(), species]] -= self.branch_snag_to_fast;
            let above_c = sub_merch + other;
            let frac_non_merch = config.species[species].prop_non_merch;
            other_snag_input = above_c * (1.0 - frac_non_merch);
            slow_above_in += self.decay_pool(
                DomPool::FastAboveGround,
                species,
                above_c * frac_non_merch
                    + COARSE_ROOT_ABOVE_RATIO * coarse_root
                    + self.branch_snag_to_fast,
            );
            slow_below_in += self.decay_pool(
                DomPool::FastBelowGround,
                species,
                (1.0 - COARSE_ROOT_ABOVE_RATIO) * coarse_root,
            );
        }

        // Snag pools: stem snag fall to the medium pool is taken before the
        // year's merchantable mortality arrives. Both snag decay remainders
        // feed the above-ground slow pool.
        let merchantable = self.net_c_loss[[BiomassComponent::Merchantable.index(), species]];
        if merchantable > 0.0
            || self.stock(DomPool::StemSnag, species) > 0.0
            || self.stock(DomPool::OtherSnag, species) > 0.0
            || other_snag_input > 0.0
        {
            self.snag_to_medium =
                self.stock(DomPool::StemSnag, species) * config.frac_stem_snag_to_medium;
            self.soil_c[[DomPool::StemSnag.index(), species]] -= self.snag_to_medium;
            slow_above_in += self.decay_pool(DomPool::StemSnag, species, merchantable);
            slow_above_in += self.decay_pool(DomPool::OtherSnag, species, other_snag_input);
        }

        // Medium pool: its only inflow is fallen stem snag carbon.
        if self.snag_to_medium > 0.0 || self.stock(DomPool::Medium, species) > 0.0 {
            let inflow = self.snag_to_medium;
            slow_above_in += self.decay_pool(DomPool::Medium, species, inflow);
        }

        // Black carbon: nothing flows in; it decays at its fixed rate.
        if self.stock(DomPool::BlackCarbon, species) > 0.0 {
            slow_above_in += self.decay_pool(DomPool::BlackCarbon, species, 0.0);
        }

        // Slow pools: decay losses go entirely to the atmosphere.
        if self.stock(DomPool::SlowAboveGround, species) > 0.0
            || self.stock(DomPool::SlowBelowGround, species) > 0.0
            || slow_above_in > 0.0
            || slow_below_in > 0.0
        {
            self.soil_c[[DomPool::SlowAboveGround.index(), species]] += slow_above_in;
            let lost_ag = self.stock(DomPool::SlowAboveGround, species)
                * self.decay_rates.rate(DomPool::SlowAboveGround, species);
            self.soil_c[[DomPool::SlowAboveGround.index(), species]] -= lost_ag;
            self.soil_c[[DomPool::SlowBelowGround.index(), species]] += slow_below_in;
            let lost_bg = self.stock(DomPool::SlowBelowGround, species)
                * self.decay_rates.rate(DomPool::SlowBelowGround, species);
            self.soil_c[[DomPool::SlowBelowGround.index(), species]] -= lost_bg;
            self.carbon_to_air[DomPool::SlowAboveGround.index()] = lost_ag;
            self.carbon_to_air[DomPool::SlowBelowGround.index()] = lost_bg;
        }

        self.pool_bio_mixing(species, config.frac_slow_ag_to_slow_bg);

        for pool in 0..NUM_DOM_POOLS {
            self.total_dom_c[pool] += self.soil_c[[pool, species]];
        }
    }

    /// Run one soil pass over every species that has been present on the
    /// site: refresh decay rates, run the pool dynamics, and total the
    /// year's fluxes. An [`SoilPass::Annual`] pass also produces the flux
    /// summary. Transfer totals and occurrence flags are reset at the end of
    /// every pass.
    pub fn process_soils(&mut self, total_biomass: f64, pre_growth_biomass: f64, pass: SoilPass) {
        let config = Arc::clone(&self.config);
        let n_species = config.n_species();
        self.litter_mass = 0.0;
        self.dead_wood_mass = 0.0;
        for species in 0..n_species {
            if !self.species_present[species] {
                // Clear configured stocks for species that never appeared,
                // once the projection proper starts.
                if self.year == 1 || pass == SoilPass::LastInitial {
                    for pool in 0..NUM_DOM_POOLS {
                        self.soil_c[[pool, species]] = 0.0;
                    }
                }
                continue;
            }
            if self.initializing() && self.last_age == 0 {
                for component in 0..NUM_BIOMASS_COMPONENTS {
                    self.live_biomass[[component, species]] = 0.0;
                }
            }
            self.decay_rates
                .recompute(&config, self.ecoregion, species, self.year);
            self.carbon_to_air = [0.0; NUM_DOM_POOLS];
            self.carbon_to_slow = [0.0; NUM_DOM_POOLS];
            self.total_dom_c = [0.0; NUM_DOM_POOLS];
            if pass != SoilPass::Initialization {
                self.soil_dynamics(species);
            }
            self.litter_mass += self.total_dom_c[DomPool::VeryFastAboveGround.index()]
                + self.total_dom_c[DomPool::VeryFastBelowGround.index()];
            for pool in 0..NUM_DOM_POOLS {
                self.totals.add_decay_to_air(self.carbon_to_air[pool]);
                if pool >= DomPool::FastAboveGround.index() {
                    self.dead_wood_mass += self.total_dom_c[pool];
                }
            }
            // The year's inputs are consumed; age slot 0 of the history is
            // the non-spin-up scratch slot and is cleared with them.
            for component in 0..NUM_BIOMASS_COMPONENTS {
                self.net_c_loss[[component, species]] = 0.0;
                self.turnover_history[[component, species, 0]] = 0.0;
            }
        }
        if pass == SoilPass::Annual {
            let summary = self.compute_summary(total_biomass, pre_growth_biomass);
            self.last_summary = Some(summary);
        }
        self.dist_occurred = [false; NUM_DISTURBANCE_SLOTS];
        self.totals.reset();
    }

    fn compute_summary(&mut self, total_biomass: f64, pre_growth_biomass: f64) -> FluxSummary {
        let belowground = self.root_biomass * BIOMASS_TO_CARBON;
        let aboveground = total_biomass * BIOMASS_TO_CARBON;
        let total = aboveground + belowground;
        let pre_growth =
            (pre_growth_biomass + self.pre_growth_root_biomass) * BIOMASS_TO_CARBON;
        let net_growth = total - pre_growth;
        let npp = (net_growth + self.totals.turnover_to_dom()).max(0.0);
        let rh = self.totals.decay_to_air();
        let nep = npp - rh;
        let nbp = nep - self.totals.disturbance_to_fps() - self.totals.disturbance_to_air();
        let summary = FluxSummary {
            aboveground_biomass: aboveground,
            belowground_biomass: belowground,
            total_dom: self.litter_mass + self.dead_wood_mass,
            delta_biomass: total - self.old_biomass,
            turnover: self.totals.turnover_to_dom(),
            net_growth,
            npp,
            rh,
            nep,
            nbp,
            to_fps: self.totals.disturbance_to_fps(),
        };
        self.old_biomass = total;
        self.pre_growth_root_biomass = 0.0;
        self.root_biomass = 0.0;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use approx::assert_relative_eq;

    fn test_site() -> SiteCarbon {
        testutil::site()
    }

    // ===== Merchantability Curve Tests =====

    #[test]
    fn test_stem_fraction_is_zero_below_min_age() {
        let site = test_site();
        assert_eq!(site.merchantable_stem_fraction(0, 0).unwrap(), 0.0);
        assert_eq!(site.merchantable_stem_fraction(0, 9).unwrap(), 0.0);
    }

    #[test]
    fn test_stem_fraction_follows_curve_above_min_age() {
        let site = test_site();
        let f = site.merchantable_stem_fraction(0, 50).unwrap();
        assert_relative_eq!(f, 0.8 * (1.0 - 0.95_f64.powi(50)), max_relative = 1e-12);
        assert!(f > 0.0 && f < 0.8);
    }

    #[test]
    fn test_stem_fraction_rejects_curve_outside_unit_range() {
        let mut config = testutil::config();
        config.species[0].merch_curve_a = 1.5;
        let site = SiteCarbon::new(Arc::new(config), 0, 200).unwrap();
        assert!(matches!(
            site.merchantable_stem_fraction(0, 200),
            Err(ForcarbError::MerchantableFractionOutOfRange { species: 0, .. })
        ));
    }

    // ===== Mortality Collection Tests =====

    #[test]
    fn test_aboveground_mortality_splits_by_merchantability() {
        let mut site = test_site();
        site.set_year(1);
        site.collect_biomass_mortality(0, 50, 10.0, 4.0, TurnoverSource::AbovegroundLitter)
            .unwrap();
        let wood_c = 10.0 * BIOMASS_TO_CARBON;
        let prop = site.merchantable_stem_fraction(0, 50).unwrap();
        assert_relative_eq!(
            site.net_c_loss[[BiomassComponent::Foliage.index(), 0]],
            2.0
        );
        assert_relative_eq!(
            site.net_c_loss[[BiomassComponent::Merchantable.index(), 0]],
            wood_c * prop
        );
        assert_relative_eq!(
            site.net_c_loss[[BiomassComponent::Other.index(), 0]],
            wood_c * (1.0 - prop)
        );
        assert_relative_eq!(site.totals.turnover_to_dom(), 7.0);
        assert!(site.species_present()[0]);
    }

    #[test]
    fn test_belowground_mortality_feeds_roots() {
        let mut site = test_site();
        site.set_year(1);
        site.collect_biomass_mortality(0, 30, 6.0, 2.0, TurnoverSource::BelowgroundLitter)
            .unwrap();
        assert_relative_eq!(
            site.net_c_loss[[BiomassComponent::CoarseRoot.index(), 0]],
            3.0
        );
        assert_relative_eq!(
            site.net_c_loss[[BiomassComponent::FineRoot.index(), 0]],
            1.0
        );
        assert_relative_eq!(site.totals.turnover_to_dom(), 4.0);
    }

    #[test]
    fn test_zero_mortality_only_marks_presence() {
        let mut site = test_site();
        site.collect_biomass_mortality(0, 40, 0.0, 0.0, TurnoverSource::AbovegroundLitter)
            .unwrap();
        assert!(site.species_present()[0]);
        assert_eq!(site.net_c_loss.sum(), 0.0);
        assert_eq!(site.last_age, 40, "Initialization tracks the oldest cohort");
    }

    #[test]
    fn test_initialization_records_history_by_age() {
        let mut site = test_site();
        site.collect_biomass_mortality(0, 25, 0.0, 2.0, TurnoverSource::AbovegroundLitter)
            .unwrap();
        assert_relative_eq!(
            site.turnover_history[[BiomassComponent::Foliage.index(), 0, 25]],
            1.0
        );
        // Annual years accumulate in the scratch slot instead.
        site.set_year(3);
        site.collect_biomass_mortality(0, 25, 0.0, 2.0, TurnoverSource::AbovegroundLitter)
            .unwrap();
        assert_relative_eq!(
            site.turnover_history[[BiomassComponent::Foliage.index(), 0, 0]],
            1.0
        );
    }

    #[test]
    fn test_spinup_live_biomass_is_only_recorded_while_initializing() {
        let mut site = test_site();
        site.collect_biomass_mortality(0, 60, 8.0, 0.0, TurnoverSource::SpinupLiveStem)
            .unwrap();
        let prop = site.merchantable_stem_fraction(0, 60).unwrap();
        assert_relative_eq!(
            site.live_biomass[[BiomassComponent::Merchantable.index(), 0]],
            4.0 * prop
        );
        assert_eq!(site.totals.turnover_to_dom(), 0.0);
        site.set_year(2);
        site.collect_biomass_mortality(0, 60, 8.0, 0.0, TurnoverSource::SpinupLiveStem)
            .unwrap();
        // Outside initialization the live-stem code degrades to a
        // below-ground report, with no turnover flux.
        assert_relative_eq!(
            site.net_c_loss[[BiomassComponent::CoarseRoot.index(), 0]],
            4.0
        );
        assert_eq!(site.totals.turnover_to_dom(), 0.0);
    }

    // ===== Pool Dynamics Tests =====

    #[test]
    fn test_very_fast_dynamics_routes_decay_loss() {
        let mut site = test_site();
        site.set_year(1);
        // 10 units of foliage carbon in, decay rate 0.1, FracAir 0.5.
        site.net_c_loss[[BiomassComponent::Foliage.index(), 0]] = 10.0;
        site.species_present[0] = true;
        site.soil_dynamics(0);
        assert_relative_eq!(
            site.stock(DomPool::VeryFastAboveGround, 0),
            9.0,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            site.carbon_to_air[DomPool::VeryFastAboveGround.index()],
            0.5,
            max_relative = 1e-12
        );
        // The other half of the loss lands in the slow AG pool (and then
        // decays and mixes once itself).
        let slow_total = site.stock(DomPool::SlowAboveGround, 0)
            + site.stock(DomPool::SlowBelowGround, 0);
        assert_relative_eq!(slow_total, 0.5 * 0.9, max_relative = 1e-12);
    }

    #[test]
    fn test_snag_fall_precedes_new_mortality_input() {
        let mut site = test_site();
        site.set_year(1);
        site.species_present[0] = true;
        site.set_stock(DomPool::StemSnag, 0, 100.0);
        site.net_c_loss[[BiomassComponent::Merchantable.index(), 0]] = 50.0;
        site.soil_dynamics(0);
        // Fall is 3.2% of the pre-input stock, then the input lands, then
        // 10% decays.
        let expected_stem = (100.0 - 3.2 + 50.0) * 0.9;
        assert_relative_eq!(site.stock(DomPool::StemSnag, 0), expected_stem, max_relative = 1e-12);
        // Medium receives exactly the fallen amount, then decays.
        assert_relative_eq!(site.stock(DomPool::Medium, 0), 3.2 * 0.9, max_relative = 1e-12);
    }

    #[test]
    fn test_branch_snag_fall_feeds_fast_pool_same_year() {
        let mut site = test_site();
        site.set_year(1);
        site.species_present[0] = true;
        site.set_stock(DomPool::OtherSnag, 0, 40.0);
        site.soil_dynamics(0);
        // 10% of the branch snag falls into fast AG before either pool
        // decays.
        assert_relative_eq!(
            site.stock(DomPool::FastAboveGround, 0),
            4.0 * 0.9,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            site.stock(DomPool::OtherSnag, 0),
            36.0 * 0.9,
            max_relative = 1e-12
        );
        assert_relative_eq!(site.branch_snag_to_fast, 4.0);
    }

    #[test]
    fn test_black_carbon_only_loses_to_air_and_slow() {
        let mut site = test_site();
        site.set_year(1);
        site.species_present[0] = true;
        site.set_stock(DomPool::BlackCarbon, 0, 10.0);
        site.soil_dynamics(0);
        assert_relative_eq!(site.stock(DomPool::BlackCarbon, 0), 9.0, max_relative = 1e-12);
        assert_relative_eq!(
            site.carbon_to_air[DomPool::BlackCarbon.index()],
            0.5,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_bio_mixing_moves_slow_carbon_downward() {
        let mut site = test_site();
        site.set_year(1);
        site.species_present[0] = true;
        site.set_stock(DomPool::SlowAboveGround, 0, 100.0);
        site.soil_dynamics(0);
        // Slow AG decays 10% (all to air), then 0.6% of the remainder
        // migrates below ground.
        assert_relative_eq!(
            site.stock(DomPool::SlowAboveGround, 0),
            90.0 * (1.0 - 0.006),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            site.stock(DomPool::SlowBelowGround, 0),
            90.0 * 0.006,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            site.carbon_to_air[DomPool::SlowAboveGround.index()],
            10.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_dynamics_skip_is_numerically_neutral() {
        // A site with stock only in the medium pool: the very fast, fast,
        // and snag stages are skipped, and the result matches running the
        // medium stage alone.
        let mut site = test_site();
        site.set_year(1);
        site.species_present[0] = true;
        site.set_stock(DomPool::Medium, 0, 50.0);
        site.soil_dynamics(0);
        assert_relative_eq!(site.stock(DomPool::Medium, 0), 45.0, max_relative = 1e-12);
        assert_relative_eq!(
            site.stock(DomPool::VeryFastAboveGround, 0),
            0.0
        );
        assert_relative_eq!(site.stock(DomPool::StemSnag, 0), 0.0);
    }

    #[test]
    fn test_empty_site_produces_no_fluxes() {
        let mut site = test_site();
        site.set_year(1);
        site.species_present[0] = true;
        site.soil_dynamics(0);
        for pool in DomPool::ALL {
            assert_eq!(site.stock(pool, 0), 0.0);
            assert_eq!(site.carbon_to_air[pool.index()], 0.0);
        }
    }

    // ===== Annual Pass Tests =====

    #[test]
    fn test_process_soils_totals_litter_and_dead_wood() {
        let mut site = test_site();
        site.set_year(1);
        site.species_present[0] = true;
        site.set_stock(DomPool::VeryFastAboveGround, 0, 10.0);
        site.set_stock(DomPool::Medium, 0, 20.0);
        site.process_soils(0.0, 0.0, SoilPass::Annual);
        assert_relative_eq!(site.litter_mass(), 9.0, max_relative = 1e-12);
        assert!(site.dead_wood_mass() > 0.0);
    }

    #[test]
    fn test_process_soils_zeroes_absent_species_in_year_one() {
        let mut site = test_site();
        site.set_year(1);
        site.set_stock(DomPool::Medium, 0, 25.0);
        // The species never appeared, so its configured stock is dropped.
        site.process_soils(0.0, 0.0, SoilPass::Annual);
        assert_eq!(site.stock(DomPool::Medium, 0), 0.0);
    }

    #[test]
    fn test_annual_summary_budget_identities() {
        let mut site = test_site();
        site.set_year(1);
        site.collect_biomass_mortality(0, 50, 4.0, 2.0, TurnoverSource::AbovegroundLitter)
            .unwrap();
        site.collect_root_biomass(10.0, true);
        site.collect_root_biomass(12.0, false);
        site.process_soils(100.0, 98.0, SoilPass::Annual);
        let summary = *site.last_summary().unwrap();
        assert_relative_eq!(summary.aboveground_biomass, 50.0);
        assert_relative_eq!(summary.belowground_biomass, 6.0);
        assert_relative_eq!(summary.net_growth, 56.0 - (98.0 + 10.0) * 0.5);
        assert_relative_eq!(summary.turnover, 3.0);
        assert_relative_eq!(summary.npp, summary.net_growth + 3.0);
        assert_relative_eq!(summary.nep, summary.npp - summary.rh);
        // No disturbance this year, so NBP equals NEP.
        assert_relative_eq!(summary.nbp, summary.nep);
        assert_relative_eq!(summary.to_fps, 0.0);
    }

    #[test]
    fn test_npp_is_floored_at_zero() {
        let mut site = test_site();
        site.set_year(1);
        site.species_present[0] = true;
        // Biomass collapse with no turnover input gives negative net
        // growth.
        site.process_soils(10.0, 80.0, SoilPass::Annual);
        let summary = site.last_summary().unwrap();
        assert!(summary.net_growth < 0.0);
        assert_eq!(summary.npp, 0.0);
    }

    #[test]
    fn test_totals_reset_after_each_pass() {
        let mut site = test_site();
        site.set_year(1);
        site.collect_biomass_mortality(0, 50, 4.0, 2.0, TurnoverSource::AbovegroundLitter)
            .unwrap();
        site.process_soils(50.0, 50.0, SoilPass::Annual);
        assert_eq!(site.totals, FluxTotals::default());
        assert!(site.dist_occurred.iter().all(|d| !d));
    }
}
