//! Per-site dead organic matter dynamics
//!
//! This crate holds the stateful half of the engine: one [`site::SiteCarbon`]
//! per simulated stand, driven year by year with cohort turnover, mortality
//! and disturbance events, and producing annual carbon fluxes.
//!
//! The typical driver sequence for one site is:
//!
//! 1. initialization at year 0: feed the replayed age sequence through
//!    [`site::SiteCarbon::collect_biomass_mortality`], then run
//!    [`site::SiteCarbon::spin_up`] and
//!    [`site::SiteCarbon::last_initial_pass`];
//! 2. each simulation year: [`site::SiteCarbon::set_year`], collect turnover
//!    and disturbance impacts, then [`site::SiteCarbon::process_soils`] and
//!    read the [`flux::FluxSummary`].

pub mod disturbance;
pub mod flux;
pub mod site;
pub mod spinup;

#[cfg(test)]
pub(crate) mod testutil;
