//! Stable per-species voice assignment.

use anyhow::Result;
use serde::Serialize;

use super::scale::Scale;
use crate::hashing::stable_int;

/// Stable musical identity for a species.
///
/// Every field is a pure function of the species id, the scale, the root
/// note, and the program list, so the same species always sounds the same
/// across sessions and processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesVoice {
    pub species_id: String,
    pub species_name: String,
    /// Absolute MIDI note number
    pub pitch: u8,
    /// Octave (3-5)
    pub octave: u8,
    /// Scale degree index
    pub degree: usize,
    /// CC10 pan value (0-127)
    pub pan: u8,
    /// MIDI program number
    pub program: u8,
}

impl SpeciesVoice {
    /// Derive the voice for a species.
    ///
    /// Fails only on configuration errors (empty scale or program list,
    /// which make the hash modulus zero).
    pub fn derive(
        species_id: &str,
        species_name: &str,
        scale: &Scale,
        root_midi: u8,
        programs: &[u8],
    ) -> Result<Self> {
        let degree = stable_int(species_id, scale.len() as u64)? as usize;
        let octave = 3 + stable_int(&format!("{}:oct", species_id), 3)? as u8;

        // Pitch from the root's pitch class, the hashed scale degree, and
        // the hashed octave
        let root_pc = root_midi % 12;
        let pitch = (root_pc as u32 + scale.intervals()[degree] as u32 + 12 * octave as u32)
            .min(127) as u8;

        let pan = stable_int(&format!("{}:pan", species_id), 128)? as u8;
        let program_idx = stable_int(&format!("{}:prog", species_id), programs.len() as u64)?;
        let program = programs[program_idx as usize];

        Ok(Self {
            species_id: species_id.to_string(),
            species_name: species_name.to_string(),
            pitch,
            octave,
            degree,
            pan,
            program,
        })
    }
}
