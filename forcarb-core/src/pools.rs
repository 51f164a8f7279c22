//! Pool Topology
//!
//! Static definitions of the ten dead-organic-matter (DOM) pools, the six
//! biomass components, and the two snag classes, together with the fixed
//! constants that control carbon routing between them.
//!
//! Pool identity is strictly symbolic throughout the engine: pools are always
//! addressed through these enums, never through bare integers. The 1-based
//! `id()` values exist only at the configuration boundary, where transfer
//! rules are keyed by pool ID.

use serde::{Deserialize, Serialize};

/// The number of DOM pools tracked per species.
pub const NUM_DOM_POOLS: usize = 10;

/// The number of biomass components that feed the DOM pools.
pub const NUM_BIOMASS_COMPONENTS: usize = 6;

/// The number of per-year disturbance occurrence slots.
pub const NUM_DISTURBANCE_SLOTS: usize = 9;

/// The number of fire severity classes.
pub const FIRE_SEVERITY_COUNT: u8 = 5;

/// Conversion from dry biomass to carbon mass.
pub const BIOMASS_TO_CARBON: f64 = 0.5;

/// Share of fine-root turnover routed to the above-ground very fast pool.
pub const FINE_ROOT_ABOVE_RATIO: f64 = 0.5;

/// Share of coarse-root turnover routed to the above-ground fast pool.
pub const COARSE_ROOT_ABOVE_RATIO: f64 = 0.5;

/// Reference temperature (°C) for the Q10 decay modifier.
pub const DECAY_REFERENCE_TEMP: f64 = 10.0;

/// A dead-organic-matter carbon pool.
///
/// The ten pools are fixed and ordered; every per-pool array in the engine is
/// indexed in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomPool {
    VeryFastAboveGround,
    VeryFastBelowGround,
    FastAboveGround,
    FastBelowGround,
    Medium,
    SlowAboveGround,
    SlowBelowGround,
    StemSnag,
    OtherSnag,
    BlackCarbon,
}

impl DomPool {
    pub const ALL: [DomPool; NUM_DOM_POOLS] = [
        DomPool::VeryFastAboveGround,
        DomPool::VeryFastBelowGround,
        DomPool::FastAboveGround,
        DomPool::FastBelowGround,
        DomPool::Medium,
        DomPool::SlowAboveGround,
        DomPool::SlowBelowGround,
        DomPool::StemSnag,
        DomPool::OtherSnag,
        DomPool::BlackCarbon,
    ];

    /// Zero-based array index of this pool.
    pub fn index(self) -> usize {
        self as usize
    }

    /// One-based pool ID, as used by transfer-rule configuration.
    pub fn id(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_id(id: u32) -> Option<DomPool> {
        match id {
            0 => None,
            _ => Self::ALL.get(id as usize - 1).copied(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DomPool::VeryFastAboveGround => "Very Fast Above-Ground",
            DomPool::VeryFastBelowGround => "Very Fast Below-Ground",
            DomPool::FastAboveGround => "Fast Above-Ground",
            DomPool::FastBelowGround => "Fast Below-Ground",
            DomPool::Medium => "Medium",
            DomPool::SlowAboveGround => "Slow Above-Ground",
            DomPool::SlowBelowGround => "Slow Below-Ground",
            DomPool::StemSnag => "Stem Snag",
            DomPool::OtherSnag => "Other Snag",
            DomPool::BlackCarbon => "Black Carbon",
        }
    }

    /// Standing dead material, decaying separately from the forest floor.
    pub fn is_snag(self) -> bool {
        matches!(self, DomPool::StemSnag | DomPool::OtherSnag)
    }
}

/// A live-biomass component, used to express turnover, mortality, and
/// disturbance inputs before they enter the DOM pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiomassComponent {
    Merchantable,
    Foliage,
    Other,
    SubMerchantable,
    CoarseRoot,
    FineRoot,
}

impl BiomassComponent {
    pub const ALL: [BiomassComponent; NUM_BIOMASS_COMPONENTS] = [
        BiomassComponent::Merchantable,
        BiomassComponent::Foliage,
        BiomassComponent::Other,
        BiomassComponent::SubMerchantable,
        BiomassComponent::CoarseRoot,
        BiomassComponent::FineRoot,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// One-based component ID, as used by transfer-rule configuration.
    pub fn id(self) -> u32 {
        self as u32 + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            BiomassComponent::Merchantable => "Merchantable",
            BiomassComponent::Foliage => "Foliage",
            BiomassComponent::Other => "Other",
            BiomassComponent::SubMerchantable => "Sub-Merchantable",
            BiomassComponent::CoarseRoot => "Coarse Root",
            BiomassComponent::FineRoot => "Fine Root",
        }
    }
}

/// Standing dead tree material class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnagClass {
    /// Merchantable stems that died standing.
    Stem,
    /// Branch and other non-stem material on standing dead trees.
    Other,
}
