//! Verdant - deterministic music from biodiversity observation records
//!
//! Turns yearly species observation summaries into musical events.
//! Richness becomes voices, turnover becomes drones and shimmer, sampling
//! effort becomes dynamics. All pseudo-randomness is hash-derived, so
//! identical inputs always yield byte-identical output.

pub mod config;
pub mod data;
pub mod hashing;
pub mod mapping;
pub mod metrics;
pub mod timegrid;

pub use config::VerdantConfig;
pub use mapping::MappingEngine;
pub use timegrid::TimeGrid;
