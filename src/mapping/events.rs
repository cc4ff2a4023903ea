//! Musical event types produced by the mapping engine.
//!
//! These are handed to the MIDI writer as-is; channel and CC number
//! assignments are fixed by convention.

use serde::Serialize;

/// CC number for pan position
pub const CC_PAN: u8 = 10;
/// CC number for brightness (filter cutoff)
pub const CC_BRIGHTNESS: u8 = 74;
/// CC number for reverb send
pub const CC_REVERB: u8 = 91;

/// The three musical textures composited per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Structural anchor tied to turnover
    Drone,
    /// Species voices representing the ecosystem body
    Pads,
    /// Change texture highlighting turnover
    Shimmer,
}

impl Layer {
    /// Reserved MIDI channel for this layer.
    pub fn channel(self) -> u8 {
        match self {
            Layer::Drone => 0,
            Layer::Pads => 1,
            Layer::Shimmer => 2,
        }
    }
}

/// A single note event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEvent {
    pub pitch: u8,
    pub velocity: u8,
    pub start_beat: f64,
    pub duration_beats: f64,
    pub channel: u8,
    pub species_id: Option<String>,
    pub layer: Layer,
}

/// A control change event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CcEvent {
    pub cc_number: u8,
    pub value: u8,
    pub time_beat: f64,
    pub channel: u8,
}

/// All musical events for a single year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearMusic {
    pub year: i32,
    pub notes: Vec<NoteEvent>,
    pub cc_events: Vec<CcEvent>,
    pub selected_species: Vec<String>,
}

impl YearMusic {
    /// A silent year: no notes, no CC events, nothing selected.
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            notes: Vec::new(),
            cc_events: Vec::new(),
            selected_species: Vec::new(),
        }
    }
}
