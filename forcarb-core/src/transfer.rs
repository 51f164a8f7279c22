//! Transfer Rules
//!
//! A [`TransferRule`] describes how a disturbance routes the carbon leaving a
//! single pool: a fraction released to the atmosphere, a fraction falling to
//! the forest floor, a fraction removed to the Forest Product Sector (FPS),
//! and a fraction transferred into a DOM pool. Whatever remains stays in the
//! pool (or in live biomass, depending on context).
//!
//! A [`TransferRuleSet`] is the complete per-pool table for one disturbance
//! at one severity. Two flavours are initialized: one keyed over the ten DOM
//! pools (IDs taken from the pool table) and one keyed over the six biomass
//! components (fixed IDs 1–6). Looking up an ID that was never initialized is
//! a configuration error, not a recoverable condition.

use crate::errors::{ForcarbError, ForcarbResult};
use crate::params::DomPoolDefinition;
use crate::pools::{BiomassComponent, FIRE_SEVERITY_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Fractional carbon routing out of one pool under one disturbance.
///
/// Read-only after construction; all invariants are enforced by the
/// constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRule {
    id: u32,
    name: String,
    to_air: f64,
    to_floor: f64,
    to_fps: f64,
    to_dom: f64,
}

fn check_fraction(destination: &'static str, value: f64) -> ForcarbResult<f64> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ForcarbError::FractionOutOfRange { destination, value });
    }
    Ok(value)
}

impl TransferRule {
    /// Build a rule with all-zero fractions, as used when a rule set is first
    /// initialized (the caller fills the fractions from parsed disturbance
    /// matrix input).
    pub fn empty(id: u32, name: &str) -> ForcarbResult<TransferRule> {
        TransferRule::new(id, name, 0.0, 0.0, 0.0, 0.0)
    }

    pub fn new(
        id: u32,
        name: &str,
        to_air: f64,
        to_floor: f64,
        to_fps: f64,
        to_dom: f64,
    ) -> ForcarbResult<TransferRule> {
        if id == 0 {
            return Err(ForcarbError::InvalidPoolId(id));
        }
        if name.is_empty() {
            return Err(ForcarbError::EmptyRuleName);
        }
        let sum = to_air + to_floor + to_fps + to_dom;
        if sum > 1.0 {
            return Err(ForcarbError::FractionSumExceedsOne(sum));
        }
        Ok(TransferRule {
            id,
            name: name.to_string(),
            to_air: check_fraction("Air", to_air)?,
            to_floor: check_fraction("Floor", to_floor)?,
            to_fps: check_fraction("FPS", to_fps)?,
            to_dom: check_fraction("DOM", to_dom)?,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn to_air(&self) -> f64 {
        self.to_air
    }

    pub fn to_floor(&self) -> f64 {
        self.to_floor
    }

    pub fn to_fps(&self) -> f64 {
        self.to_fps
    }

    pub fn to_dom(&self) -> f64 {
        self.to_dom
    }
}

/// The complete per-pool transfer-rule table for one disturbance/severity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferRuleSet {
    name: String,
    rules: BTreeMap<u32, TransferRule>,
}

impl TransferRuleSet {
    pub fn new(name: &str) -> TransferRuleSet {
        TransferRuleSet {
            name: name.to_string(),
            rules: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clear and rebuild the lookup from the DOM pool table. All rules start
    /// with zero fractions.
    pub fn initialize_from_pool_table(
        &mut self,
        pools: &[DomPoolDefinition],
    ) -> ForcarbResult<()> {
        self.rules.clear();
        for pool in pools {
            self.rules
                .insert(pool.id, TransferRule::empty(pool.id, &pool.name)?);
        }
        Ok(())
    }

    /// Clear and build exactly six named entries for the fixed biomass
    /// components, IDs 1–6.
    pub fn initialize_biomass_pools(&mut self) -> ForcarbResult<()> {
        self.rules.clear();
        for component in BiomassComponent::ALL {
            self.rules.insert(
                component.id(),
                TransferRule::empty(component.id(), component.name())?,
            );
        }
        Ok(())
    }

    /// Look up the rule for a pool ID.
    ///
    /// An absent ID means the appropriate `initialize_*` was never called (or
    /// the configuration referenced a pool that does not exist) and is
    /// reported as a configuration error.
    pub fn rule(&self, pool_id: u32) -> ForcarbResult<&TransferRule> {
        self.rules
            .get(&pool_id)
            .ok_or(ForcarbError::PoolRuleNotFound(pool_id))
    }

    /// Replace the fractions of an initialized rule, keeping its identity.
    /// Used by configuration loading to fill the zeroed rules.
    pub fn set_fractions(
        &mut self,
        pool_id: u32,
        to_air: f64,
        to_floor: f64,
        to_fps: f64,
        to_dom: f64,
    ) -> ForcarbResult<()> {
        let existing = self
            .rules
            .get(&pool_id)
            .ok_or(ForcarbError::PoolRuleNotFound(pool_id))?;
        let replacement =
            TransferRule::new(pool_id, existing.name(), to_air, to_floor, to_fps, to_dom)?;
        self.rules.insert(pool_id, replacement);
        Ok(())
    }
}

/// All transfer-rule tables for every configured disturbance, shared
/// read-only across sites.
///
/// Fire tables are indexed by severity (1–5); every other disturbance is
/// keyed by name (for harvest, the key is the prescription name, with a
/// generic `"Harvest"` entry as the fallback).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisturbanceMatrices {
    pub fire_dom: Vec<TransferRuleSet>,
    pub fire_biomass: Vec<TransferRuleSet>,
    pub other_dom: HashMap<String, TransferRuleSet>,
    pub other_biomass: HashMap<String, TransferRuleSet>,
}

impl DisturbanceMatrices {
    /// Build matrices with zeroed fire tables for every severity and no
    /// named disturbances.
    pub fn zeroed(pools: &[DomPoolDefinition]) -> ForcarbResult<DisturbanceMatrices> {
        let mut fire_dom = Vec::new();
        let mut fire_biomass = Vec::new();
        for severity in 1..=FIRE_SEVERITY_COUNT {
            let mut dom = TransferRuleSet::new(&format!("Fire severity {severity} (DOM)"));
            dom.initialize_from_pool_table(pools)?;
            fire_dom.push(dom);
            let mut biomass = TransferRuleSet::new(&format!("Fire severity {severity} (biomass)"));
            biomass.initialize_biomass_pools()?;
            fire_biomass.push(biomass);
        }
        Ok(DisturbanceMatrices {
            fire_dom,
            fire_biomass,
            other_dom: HashMap::new(),
            other_biomass: HashMap::new(),
        })
    }

    /// The DOM rule set for a fire of the given severity (1–5).
    pub fn fire_dom(&self, severity: u8) -> ForcarbResult<&TransferRuleSet> {
        self.fire_table(&self.fire_dom, severity)
    }

    /// The biomass rule set for a fire of the given severity (1–5).
    pub fn fire_biomass(&self, severity: u8) -> ForcarbResult<&TransferRuleSet> {
        self.fire_table(&self.fire_biomass, severity)
    }

    fn fire_table<'a>(
        &self,
        tables: &'a [TransferRuleSet],
        severity: u8,
    ) -> ForcarbResult<&'a TransferRuleSet> {
        if severity == 0 || severity > FIRE_SEVERITY_COUNT {
            return Err(ForcarbError::FireSeverityOutOfRange(
                severity,
                FIRE_SEVERITY_COUNT,
            ));
        }
        Ok(&tables[severity as usize - 1])
    }
}
