//! Mapping system: biodiversity metrics to musical events
//!
//! Species identity maps to pitch, pan, and program; richness drives the
//! number of voices; turnover drives the drone pitch shift and shimmer
//! density; confidence modulates velocity and brightness.

mod events;
mod generator;
mod metadata;
mod scale;
mod voice;

pub use events::{CcEvent, Layer, NoteEvent, YearMusic, CC_BRIGHTNESS, CC_PAN, CC_REVERB};
pub use generator::{MappingEngine, SelectedSpecies};
pub use metadata::mapping_metadata;
pub use scale::{Scale, UnknownScale};
pub use voice::SpeciesVoice;
