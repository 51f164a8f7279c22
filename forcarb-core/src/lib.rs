pub mod config;
pub mod decay;
pub mod disturbance;
pub mod params;
pub mod pools;
pub mod transfer;

pub mod errors;
