//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::mapping::Scale;

/// Main configuration for Verdant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdantConfig {
    /// Timeline settings (year range, tempo)
    pub time: TimeConfig,

    /// Mapping settings (scale, voices, layers)
    #[serde(default)]
    pub mapping: MappingConfig,
}

impl VerdantConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.time.end_year < self.time.start_year {
            bail!(
                "end_year {} is before start_year {}",
                self.time.end_year,
                self.time.start_year
            );
        }
        if self.time.bars_per_year == 0 {
            bail!("bars_per_year must be positive");
        }
        if !(self.time.bpm > 0.0) {
            bail!("bpm must be positive, got {}", self.time.bpm);
        }

        if self.mapping.min_voices == 0 {
            bail!("min_voices must be positive");
        }
        if self.mapping.max_voices < self.mapping.min_voices {
            bail!(
                "max_voices {} is less than min_voices {}",
                self.mapping.max_voices,
                self.mapping.min_voices
            );
        }
        if self.mapping.top_k_species_pool == 0 {
            bail!("top_k_species_pool must be positive");
        }
        if self.mapping.pad_programs.is_empty() {
            bail!("pad_programs must not be empty");
        }

        // Unknown scale names fail here rather than mid-generation
        Scale::from_name(&self.mapping.mode)?;

        Ok(())
    }
}

/// Timeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// First year of the timeline (inclusive)
    pub start_year: i32,

    /// Last year of the timeline (inclusive)
    pub end_year: i32,

    /// Bars allotted to each year (default: 8)
    #[serde(default = "default_bars_per_year")]
    pub bars_per_year: u32,

    /// Beats per minute (default: 60)
    #[serde(default = "default_bpm")]
    pub bpm: f64,
}

fn default_bars_per_year() -> u32 {
    8
}
fn default_bpm() -> f64 {
    60.0
}

/// Mapping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Scale name (default: d_dorian)
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Root note as an absolute MIDI number (default: 62 = D4)
    #[serde(default = "default_root_midi")]
    pub base_root_midi: u8,

    /// Maximum species voices per year (default: 16)
    #[serde(default = "default_max_voices")]
    pub max_voices: usize,

    /// Minimum species voices per year (default: 6)
    #[serde(default = "default_min_voices")]
    pub min_voices: usize,

    /// Size of the top-observations pool fed into selection (default: 40)
    #[serde(default = "default_top_k")]
    pub top_k_species_pool: usize,

    /// MIDI program numbers available for pad voices
    #[serde(default = "default_pad_programs")]
    pub pad_programs: Vec<u8>,

    /// Layer toggles
    #[serde(default)]
    pub layers: LayerToggles,
}

fn default_mode() -> String {
    "d_dorian".to_string()
}
fn default_root_midi() -> u8 {
    62
}
fn default_max_voices() -> usize {
    16
}
fn default_min_voices() -> usize {
    6
}
fn default_top_k() -> usize {
    40
}
fn default_pad_programs() -> Vec<u8> {
    vec![89, 90, 91, 92, 94]
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            base_root_midi: default_root_midi(),
            max_voices: default_max_voices(),
            min_voices: default_min_voices(),
            top_k_species_pool: default_top_k(),
            pad_programs: default_pad_programs(),
            layers: LayerToggles::default(),
        }
    }
}

/// Per-layer enable flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerToggles {
    /// Structural drone layer (default: enabled)
    #[serde(default = "default_layer_on")]
    pub drone: bool,

    /// Per-species pad layer (default: enabled)
    #[serde(default = "default_layer_on")]
    pub pads: bool,

    /// Change-texture shimmer layer (default: enabled)
    #[serde(default = "default_layer_on")]
    pub shimmer: bool,
}

fn default_layer_on() -> bool {
    true
}

impl Default for LayerToggles {
    fn default() -> Self {
        Self {
            drone: true,
            pads: true,
            shimmer: true,
        }
    }
}
