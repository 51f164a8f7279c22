//! Forest carbon pool dynamics.
//!
//! This facade crate re-exports the two workspace members:
//!
//! - [`forcarb_core`]: pool topology, transfer rules, decay-rate calculation,
//!   and configuration.
//! - [`forcarb_soils`]: per-site carbon state, annual soil dynamics,
//!   disturbance application, and the spin-up solver.

pub use forcarb_core as core;
pub use forcarb_soils as soils;

pub use forcarb_core::errors::{ForcarbError, ForcarbResult};
pub use forcarb_soils::site::SiteCarbon;
