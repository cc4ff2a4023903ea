//! Musical scale definitions (semitone offsets from a root within one octave)

use thiserror::Error;

/// Error for a scale name not in the shipped set.
#[derive(Debug, Error)]
#[error("unknown mode '{0}' (available: d_dorian, c_minor_pentatonic, a_minor, c_major_pentatonic)")]
pub struct UnknownScale(pub String);

/// An ordered list of semitone offsets from a root note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    name: String,
    intervals: Vec<u8>,
}

impl Scale {
    fn new(name: &str, intervals: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            intervals,
        }
    }

    /// D Dorian (D E F G A B C)
    pub fn d_dorian() -> Self {
        Self::new("d_dorian", vec![0, 2, 3, 5, 7, 9, 10])
    }

    /// C minor pentatonic (C Eb F G Bb)
    pub fn c_minor_pentatonic() -> Self {
        Self::new("c_minor_pentatonic", vec![0, 3, 5, 7, 10])
    }

    /// A natural minor (A B C D E F G)
    pub fn a_minor() -> Self {
        Self::new("a_minor", vec![0, 2, 3, 5, 7, 8, 10])
    }

    /// C major pentatonic (C D E G A)
    pub fn c_major_pentatonic() -> Self {
        Self::new("c_major_pentatonic", vec![0, 2, 4, 7, 9])
    }

    /// Look up a shipped scale by name.
    pub fn from_name(name: &str) -> Result<Self, UnknownScale> {
        match name {
            "d_dorian" => Ok(Self::d_dorian()),
            "c_minor_pentatonic" => Ok(Self::c_minor_pentatonic()),
            "a_minor" => Ok(Self::a_minor()),
            "c_major_pentatonic" => Ok(Self::c_major_pentatonic()),
            _ => Err(UnknownScale(name.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn intervals(&self) -> &[u8] {
        &self.intervals
    }

    /// Number of degrees in the scale.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}
