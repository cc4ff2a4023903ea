//! Musical time grid: maps calendar years onto beat and wall-clock ranges.
//!
//! Each year occupies a fixed number of bars; tempo converts beats to
//! seconds. All conversions are pure arithmetic on an immutable grid.

use anyhow::{bail, Result};

use crate::config::TimeConfig;

/// Immutable time grid derived from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    start_year: i32,
    end_year: i32,
    bars_per_year: u32,
    bpm: f64,
    beats_per_bar: u32,
}

impl TimeGrid {
    /// Create a time grid with 4 beats per bar.
    ///
    /// Fails fast on invalid parameters: `end_year < start_year`,
    /// `bars_per_year == 0`, or a non-positive (or NaN) `bpm`.
    pub fn new(start_year: i32, end_year: i32, bars_per_year: u32, bpm: f64) -> Result<Self> {
        if end_year < start_year {
            bail!("end_year {} is before start_year {}", end_year, start_year);
        }
        if bars_per_year == 0 {
            bail!("bars_per_year must be positive");
        }
        if !(bpm > 0.0) {
            bail!("bpm must be positive, got {}", bpm);
        }
        Ok(Self {
            start_year,
            end_year,
            bars_per_year,
            bpm,
            beats_per_bar: 4,
        })
    }

    /// Build a grid from the `time` section of a configuration.
    pub fn from_config(time: &TimeConfig) -> Result<Self> {
        Self::new(time.start_year, time.end_year, time.bars_per_year, time.bpm)
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.end_year
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Number of years in the timeline.
    pub fn num_years(&self) -> u32 {
        (self.end_year - self.start_year + 1) as u32
    }

    /// Total beats per year segment.
    pub fn beats_per_year(&self) -> u32 {
        self.bars_per_year * self.beats_per_bar
    }

    /// Total beats in the entire timeline.
    pub fn total_beats(&self) -> u32 {
        self.num_years() * self.beats_per_year()
    }

    /// Duration of one beat in seconds.
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one year segment in seconds.
    pub fn seconds_per_year(&self) -> f64 {
        self.beats_per_year() as f64 * self.seconds_per_beat()
    }

    /// Total duration of the timeline in seconds.
    pub fn total_duration(&self) -> f64 {
        self.total_beats() as f64 * self.seconds_per_beat()
    }

    /// Get the `[start_beat, end_beat)` range for a year.
    pub fn year_to_beat_range(&self, year: i32) -> (f64, f64) {
        let year_index = (year - self.start_year) as f64;
        let start_beat = year_index * self.beats_per_year() as f64;
        (start_beat, start_beat + self.beats_per_year() as f64)
    }

    /// Get the `[start, end)` time range in seconds for a year.
    pub fn year_to_time_range(&self, year: i32) -> (f64, f64) {
        let (start_beat, end_beat) = self.year_to_beat_range(year);
        (self.beat_to_time(start_beat), self.beat_to_time(end_beat))
    }

    /// Convert a beat position to time in seconds.
    pub fn beat_to_time(&self, beat: f64) -> f64 {
        beat * self.seconds_per_beat()
    }

    /// Convert time in seconds to a beat position.
    pub fn time_to_beat(&self, time: f64) -> f64 {
        time / self.seconds_per_beat()
    }

    /// All years in the timeline, in order. Restartable: call as often as needed.
    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year
    }
}
