//! Year music generator: three-layer ambient mapping of biodiversity metrics.
//!
//! - Drone: structural anchor tied to turnover
//! - Pads: species voices representing the ecosystem body
//! - Shimmer: change texture highlighting turnover
//!
//! All pseudo-random choices go through the hashing utilities, so a given
//! (config, aggregate table, metrics table) always produces bit-identical
//! output regardless of processing order.

use std::collections::BTreeMap;

use anyhow::Result;

use super::events::{CcEvent, Layer, NoteEvent, YearMusic, CC_BRIGHTNESS, CC_PAN, CC_REVERB};
use super::scale::Scale;
use super::voice::SpeciesVoice;
use crate::config::VerdantConfig;
use crate::data::YearSpeciesRow;
use crate::hashing::{stable_float01, stable_int, stable_shuffle_key};
use crate::metrics::YearMetrics;
use crate::timegrid::TimeGrid;

/// A species chosen to be voiced in a particular year.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedSpecies {
    pub species_id: String,
    pub species_name: String,
    pub species_obs: f64,
}

/// The deterministic mapping engine.
///
/// Owns the per-session species voice cache; construct one engine per run
/// so independent runs never interfere.
pub struct MappingEngine {
    scale: Scale,
    root_midi: u8,
    max_voices: usize,
    min_voices: usize,
    top_k: usize,
    pad_programs: Vec<u8>,
    drone_enabled: bool,
    pads_enabled: bool,
    shimmer_enabled: bool,
    grid: TimeGrid,
    voice_cache: BTreeMap<String, SpeciesVoice>,
}

fn midi_pitch(pitch: i32) -> u8 {
    pitch.clamp(0, 127) as u8
}

impl MappingEngine {
    /// Build an engine from a validated configuration.
    pub fn new(config: &VerdantConfig) -> Result<Self> {
        let mapping = &config.mapping;
        Ok(Self {
            scale: Scale::from_name(&mapping.mode)?,
            root_midi: mapping.base_root_midi,
            max_voices: mapping.max_voices,
            min_voices: mapping.min_voices,
            top_k: mapping.top_k_species_pool,
            pad_programs: mapping.pad_programs.clone(),
            drone_enabled: mapping.layers.drone,
            pads_enabled: mapping.layers.pads,
            shimmer_enabled: mapping.layers.shimmer,
            grid: TimeGrid::from_config(&config.time)?,
            voice_cache: BTreeMap::new(),
        })
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn root_midi(&self) -> u8 {
        self.root_midi
    }

    /// The species voices assigned so far in this session.
    pub fn voices(&self) -> &BTreeMap<String, SpeciesVoice> {
        &self.voice_cache
    }

    /// Get or create the stable voice for a species.
    pub fn species_voice(&mut self, species_id: &str, species_name: &str) -> Result<&SpeciesVoice> {
        if !self.voice_cache.contains_key(species_id) {
            let voice = SpeciesVoice::derive(
                species_id,
                species_name,
                &self.scale,
                self.root_midi,
                &self.pad_programs,
            )?;
            self.voice_cache.insert(species_id.to_string(), voice);
        }
        Ok(&self.voice_cache[species_id])
    }

    /// Drone root pitch from turnover: higher turnover shifts the root
    /// down (darker), lower shifts it up (brighter), within +-3 semitones.
    /// Ties round to even, so turnover 0.75 shifts by +1, not +2.
    fn drone_root(&self, turnover: f64) -> i32 {
        let semitone_shift = (turnover * 6.0).round_ties_even() as i32 - 3;
        self.root_midi as i32 + semitone_shift
    }

    /// Voice count from richness: clamp(round(sqrt(richness) * 2), min, max).
    fn voice_count(&self, richness: usize) -> usize {
        let n = ((richness as f64).sqrt() * 2.0).round_ties_even() as usize;
        n.clamp(self.min_voices, self.max_voices)
    }

    /// Select species to voice for a year (deterministic).
    ///
    /// Filters to the year's top-K species by observation count, sorts by a
    /// stable per-year shuffle key, and takes the first `voice_count`.
    pub fn select_year_species(
        &self,
        year: i32,
        rows: &[YearSpeciesRow],
        metrics_row: Option<&YearMetrics>,
    ) -> Vec<SelectedSpecies> {
        let mut year_rows: Vec<&YearSpeciesRow> = rows.iter().filter(|r| r.year == year).collect();
        if year_rows.is_empty() {
            return Vec::new();
        }

        let richness = metrics_row.map(|m| m.richness).unwrap_or(year_rows.len());

        // Top K by observations, ties broken by id for determinism
        year_rows.sort_by(|a, b| {
            b.species_obs
                .total_cmp(&a.species_obs)
                .then_with(|| a.species_id.cmp(&b.species_id))
        });
        year_rows.truncate(self.top_k);

        // Stable shuffle, then cut to the richness-driven voice count
        year_rows.sort_by_key(|r| stable_shuffle_key(year, &r.species_id));
        year_rows.truncate(self.voice_count(richness));

        year_rows
            .iter()
            .map(|r| SelectedSpecies {
                species_id: r.species_id.clone(),
                species_name: r.species_name.clone(),
                species_obs: r.species_obs,
            })
            .collect()
    }

    /// Drone layer: root + fifth spanning the whole year, plus a ninth
    /// when the year's richness exceeds the cross-year median.
    fn generate_drone_layer(
        &self,
        year: i32,
        turnover: f64,
        confidence: f64,
        richness: usize,
        median_richness: f64,
    ) -> Vec<NoteEvent> {
        if !self.drone_enabled {
            return Vec::new();
        }

        let (start_beat, end_beat) = self.grid.year_to_beat_range(year);
        let duration = end_beat - start_beat;
        let root = self.drone_root(turnover);
        let base_vel = (35.0 + 25.0 * confidence) as u8;

        let mut notes = vec![
            NoteEvent {
                pitch: midi_pitch(root),
                velocity: base_vel,
                start_beat,
                duration_beats: duration,
                channel: Layer::Drone.channel(),
                species_id: None,
                layer: Layer::Drone,
            },
            NoteEvent {
                pitch: midi_pitch(root + 7),
                velocity: base_vel - 5,
                start_beat,
                duration_beats: duration,
                channel: Layer::Drone.channel(),
                species_id: None,
                layer: Layer::Drone,
            },
        ];

        if richness as f64 > median_richness {
            notes.push(NoteEvent {
                pitch: midi_pitch(root + 14),
                velocity: base_vel - 10,
                start_beat,
                duration_beats: duration,
                channel: Layer::Drone.channel(),
                species_id: None,
                layer: Layer::Drone,
            });
        }

        notes
    }

    /// Pads layer: each selected species gets 2-4 notes placed on a 4-beat
    /// grid within the year, plus pan/brightness/reverb CCs at year start.
    fn generate_pads_layer(
        &mut self,
        year: i32,
        selected: &[SelectedSpecies],
        max_obs: f64,
        confidence: f64,
    ) -> Result<(Vec<NoteEvent>, Vec<CcEvent>)> {
        if !self.pads_enabled {
            return Ok((Vec::new(), Vec::new()));
        }

        let mut notes = Vec::new();
        let mut cc_events = Vec::new();
        let (start_beat, end_beat) = self.grid.year_to_beat_range(year);
        let grid_positions: Vec<i64> = ((start_beat as i64)..(end_beat as i64))
            .step_by(4)
            .collect();

        for species in selected {
            let voice = self
                .species_voice(&species.species_id, &species.species_name)?
                .clone();

            let norm_obs = if max_obs > 0.0 {
                species.species_obs / max_obs
            } else {
                0.5
            };

            let vel = ((25.0 + 70.0 * norm_obs) * confidence) as i64;
            let vel = vel.clamp(25, 100) as u8;

            // Note count (2-4) and duration class (8 or 16 beats)
            let note_count =
                2 + stable_int(&format!("{}:{}:nn", year, species.species_id), 3)?;
            let duration: f64 =
                if stable_int(&format!("{}:{}:dur", year, species.species_id), 2)? == 0 {
                    8.0
                } else {
                    16.0
                };

            for i in 0..note_count {
                if grid_positions.is_empty() {
                    break;
                }

                let pos_idx = stable_int(
                    &format!("{}:{}:{}", year, species.species_id, i),
                    grid_positions.len() as u64,
                )? as usize;
                let beat = grid_positions[pos_idx] as f64;

                // Small micro-offset for humanization
                let offset =
                    stable_float01(&format!("{}:{}:{}:off", year, species.species_id, i)) * 0.25;

                notes.push(NoteEvent {
                    pitch: voice.pitch,
                    velocity: vel,
                    start_beat: beat + offset,
                    duration_beats: duration.min(end_beat - beat - offset),
                    channel: Layer::Pads.channel(),
                    species_id: Some(species.species_id.clone()),
                    layer: Layer::Pads,
                });
            }

            // Per-species CCs at the start of the year: pan, brightness
            // scaled up with confidence, reverb scaled down with it
            cc_events.push(CcEvent {
                cc_number: CC_PAN,
                value: voice.pan,
                time_beat: start_beat,
                channel: Layer::Pads.channel(),
            });
            cc_events.push(CcEvent {
                cc_number: CC_BRIGHTNESS,
                value: (40.0 + 60.0 * confidence) as u8,
                time_beat: start_beat,
                channel: Layer::Pads.channel(),
            });
            cc_events.push(CcEvent {
                cc_number: CC_REVERB,
                value: (40.0 + 60.0 * (1.0 - confidence)) as u8,
                time_beat: start_beat,
                channel: Layer::Pads.channel(),
            });
        }

        Ok((notes, cc_events))
    }

    /// Shimmer layer: short high notes cycling through the year's new
    /// species (or the selected species as a fallback), denser with
    /// higher turnover. Skipped entirely when turnover <= 0.2.
    fn generate_shimmer_layer(
        &self,
        year: i32,
        turnover: f64,
        confidence: f64,
        new_species: &[String],
        selected: &[SelectedSpecies],
    ) -> Result<Vec<NoteEvent>> {
        if !self.shimmer_enabled || turnover <= 0.2 {
            return Ok(Vec::new());
        }

        let source_ids: Vec<&str> = if !new_species.is_empty() {
            new_species.iter().take(5).map(String::as_str).collect()
        } else if !selected.is_empty() {
            selected
                .iter()
                .take(5)
                .map(|s| s.species_id.as_str())
                .collect()
        } else {
            return Ok(Vec::new());
        };

        let (start_beat, end_beat) = self.grid.year_to_beat_range(year);

        // Higher turnover = smaller step = denser texture; ties round to even
        let step = ((4.0 - 3.0 * turnover).round_ties_even() as i64).max(1) as f64;

        let vel = ((15.0 + 30.0 * turnover) * confidence) as i64;
        let vel = vel.clamp(15, 50) as u8;

        let mut notes = Vec::new();
        let mut beat = start_beat;
        let mut note_idx = 0usize;

        while beat < end_beat {
            let species_id = source_ids[note_idx % source_ids.len()];

            // Base scale pitch two octaves up; the species may never have
            // been voiced, so derive the degree directly
            let degree = stable_int(species_id, self.scale.len() as u64)? as usize;
            let base_pitch = self.root_midi as i32 + self.scale.intervals()[degree] as i32;

            let offset = stable_float01(&format!("{}:shimmer:{}", year, note_idx)) * 0.25;

            notes.push(NoteEvent {
                pitch: midi_pitch(base_pitch + 24),
                velocity: vel,
                start_beat: beat + offset,
                duration_beats: 2.0,
                channel: Layer::Shimmer.channel(),
                species_id: Some(species_id.to_string()),
                layer: Layer::Shimmer,
            });

            beat += step;
            note_idx += 1;
        }

        Ok(notes)
    }

    /// Generate all musical events for one year.
    ///
    /// A year with no metrics row yields an empty `YearMusic`; silence is
    /// a valid musical outcome, not an error.
    pub fn generate_year(
        &mut self,
        year: i32,
        rows: &[YearSpeciesRow],
        metrics: &[YearMetrics],
    ) -> Result<YearMusic> {
        let Some(metrics_row) = metrics.iter().find(|m| m.year == year) else {
            return Ok(YearMusic::empty(year));
        };

        let richness = metrics_row.richness;
        let turnover = metrics_row.turnover;
        let confidence = metrics_row.confidence;
        let new_species: Vec<String> = metrics_row.new_species.to_vec();

        let median_richness = median_richness(metrics);

        let selected = self.select_year_species(year, rows, Some(metrics_row));

        let max_obs = rows
            .iter()
            .filter(|r| r.year == year)
            .map(|r| r.species_obs)
            .fold(f64::NEG_INFINITY, f64::max);
        let max_obs = if max_obs.is_finite() { max_obs } else { 1.0 };

        let drone_notes =
            self.generate_drone_layer(year, turnover, confidence, richness, median_richness);
        let (pads_notes, pads_cc) =
            self.generate_pads_layer(year, &selected, max_obs, confidence)?;
        let shimmer_notes =
            self.generate_shimmer_layer(year, turnover, confidence, &new_species, &selected)?;

        let mut notes = drone_notes;
        notes.extend(pads_notes);
        notes.extend(shimmer_notes);

        Ok(YearMusic {
            year,
            notes,
            cc_events: pads_cc,
            selected_species: selected.into_iter().map(|s| s.species_id).collect(),
        })
    }

    /// Generate music for every year in the timeline, keyed by year.
    pub fn generate_all(
        &mut self,
        rows: &[YearSpeciesRow],
        metrics: &[YearMetrics],
    ) -> Result<BTreeMap<i32, YearMusic>> {
        let mut results = BTreeMap::new();
        for year in self.grid.years() {
            results.insert(year, self.generate_year(year, rows, metrics)?);
        }
        Ok(results)
    }
}

/// Median of the richness values across all metrics rows.
fn median_richness(metrics: &[YearMetrics]) -> f64 {
    if metrics.is_empty() {
        return 0.0;
    }
    let mut values: Vec<f64> = metrics.iter().map(|m| m.richness as f64).collect();
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayerToggles, MappingConfig, TimeConfig};
    use crate::metrics::compute_year_metrics;

    fn sample_config() -> VerdantConfig {
        VerdantConfig {
            time: TimeConfig {
                start_year: 2020,
                end_year: 2022,
                bars_per_year: 8,
                bpm: 60.0,
            },
            mapping: MappingConfig {
                mode: "d_dorian".to_string(),
                base_root_midi: 62,
                max_voices: 8,
                min_voices: 4,
                top_k_species_pool: 20,
                pad_programs: vec![89, 90, 91],
                layers: LayerToggles::default(),
            },
        }
    }

    fn row(year: i32, id: &str, obs: f64, effort: f64) -> YearSpeciesRow {
        YearSpeciesRow {
            year,
            species_id: id.to_string(),
            species_name: id.to_string(),
            species_obs: obs,
            effort_year: Some(effort),
        }
    }

    fn sample_rows() -> Vec<YearSpeciesRow> {
        vec![
            row(2020, "robin", 10.0, 5.0),
            row(2020, "jay", 8.0, 5.0),
            row(2020, "sparrow", 15.0, 5.0),
            row(2021, "robin", 12.0, 6.0),
            row(2021, "jay", 7.0, 6.0),
            row(2021, "hawk", 5.0, 6.0),
            row(2022, "robin", 15.0, 7.0),
            row(2022, "jay", 9.0, 7.0),
            row(2022, "sparrow", 18.0, 7.0),
            row(2022, "owl", 3.0, 7.0),
        ]
    }

    fn sample_metrics(config: &VerdantConfig, rows: &[YearSpeciesRow]) -> Vec<YearMetrics> {
        let grid = TimeGrid::from_config(&config.time).unwrap();
        compute_year_metrics(rows, &grid, config.mapping.top_k_species_pool)
    }

    #[test]
    fn test_full_generation_determinism() {
        let config = sample_config();
        let rows = sample_rows();
        let metrics = sample_metrics(&config, &rows);

        let mut engine1 = MappingEngine::new(&config).unwrap();
        let result1 = engine1.generate_all(&rows, &metrics).unwrap();

        let mut engine2 = MappingEngine::new(&config).unwrap();
        let result2 = engine2.generate_all(&rows, &metrics).unwrap();

        assert_eq!(result1, result2);
        assert_eq!(engine1.voices(), engine2.voices());
    }

    #[test]
    fn test_voice_count_clamping() {
        let engine = MappingEngine::new(&sample_config()).unwrap();
        // min_voices=4, max_voices=8
        assert_eq!(engine.voice_count(1), 4);
        assert_eq!(engine.voice_count(100), 8);
        assert_eq!(engine.voice_count(4), 4); // round(sqrt(4)*2) = 4
    }

    #[test]
    fn test_selection_is_deterministic() {
        let config = sample_config();
        let rows = sample_rows();
        let metrics = sample_metrics(&config, &rows);
        let engine = MappingEngine::new(&config).unwrap();

        let a = engine.select_year_species(2022, &rows, metrics.iter().find(|m| m.year == 2022));
        let b = engine.select_year_species(2022, &rows, metrics.iter().find(|m| m.year == 2022));
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_selection_empty_year() {
        let config = sample_config();
        let engine = MappingEngine::new(&config).unwrap();
        assert!(engine.select_year_species(1999, &sample_rows(), None).is_empty());
    }

    #[test]
    fn test_layer_channels_in_output() {
        let config = sample_config();
        let rows = sample_rows();
        let metrics = sample_metrics(&config, &rows);
        let mut engine = MappingEngine::new(&config).unwrap();
        let results = engine.generate_all(&rows, &metrics).unwrap();

        for music in results.values() {
            for note in &music.notes {
                match note.layer {
                    Layer::Drone => assert_eq!(note.channel, 0),
                    Layer::Pads => assert_eq!(note.channel, 1),
                    Layer::Shimmer => assert_eq!(note.channel, 2),
                }
                assert!(note.pitch <= 127);
                assert!(note.velocity <= 127);
            }
            for cc in &music.cc_events {
                assert_eq!(cc.channel, 1);
                assert!(cc.value <= 127);
            }
        }
    }

    #[test]
    fn test_drone_ninth_above_median_richness() {
        let config = sample_config();
        let rows = sample_rows();
        let metrics = sample_metrics(&config, &rows);
        let mut engine = MappingEngine::new(&config).unwrap();
        let results = engine.generate_all(&rows, &metrics).unwrap();

        // Richness per year is [3, 3, 4]; median 3. Only 2022 gets a ninth.
        let drone_count = |year: i32| {
            results[&year]
                .notes
                .iter()
                .filter(|n| n.layer == Layer::Drone)
                .count()
        };
        assert_eq!(drone_count(2020), 2);
        assert_eq!(drone_count(2022), 3);
    }

    #[test]
    fn test_shimmer_skipped_at_low_turnover() {
        let config = sample_config();
        let rows = sample_rows();
        let metrics = sample_metrics(&config, &rows);
        let mut engine = MappingEngine::new(&config).unwrap();
        let results = engine.generate_all(&rows, &metrics).unwrap();

        // 2020 is the first year: turnover 0.0, no shimmer
        assert!(results[&2020]
            .notes
            .iter()
            .all(|n| n.layer != Layer::Shimmer));
        // 2021 has turnover 0.5: shimmer present
        assert!(results[&2021]
            .notes
            .iter()
            .any(|n| n.layer == Layer::Shimmer));
    }

    #[test]
    fn test_all_layers_disabled() {
        let mut config = sample_config();
        config.mapping.layers = LayerToggles {
            drone: false,
            pads: false,
            shimmer: false,
        };
        let rows = sample_rows();
        let metrics = sample_metrics(&config, &rows);
        let mut engine = MappingEngine::new(&config).unwrap();
        let results = engine.generate_all(&rows, &metrics).unwrap();

        for music in results.values() {
            assert!(music.notes.is_empty());
            assert!(music.cc_events.is_empty());
        }
        // Selection still runs even with every layer off
        assert!(!results[&2020].selected_species.is_empty());
    }

    #[test]
    fn test_year_without_metrics_is_silent() {
        let config = sample_config();
        let rows = sample_rows();
        let mut engine = MappingEngine::new(&config).unwrap();

        let music = engine.generate_year(2021, &rows, &[]).unwrap();
        assert_eq!(music, YearMusic::empty(2021));
    }

    #[test]
    fn test_pads_cc_events_per_species() {
        let config = sample_config();
        let rows = sample_rows();
        let metrics = sample_metrics(&config, &rows);
        let mut engine = MappingEngine::new(&config).unwrap();
        let results = engine.generate_all(&rows, &metrics).unwrap();

        let music = &results[&2020];
        // Three CCs (pan, brightness, reverb) per selected species
        assert_eq!(music.cc_events.len(), music.selected_species.len() * 3);
        let numbers: Vec<u8> = music.cc_events.iter().map(|c| c.cc_number).collect();
        assert!(numbers.contains(&CC_PAN));
        assert!(numbers.contains(&CC_BRIGHTNESS));
        assert!(numbers.contains(&CC_REVERB));
    }

    #[test]
    fn test_notes_stay_inside_year_range() {
        let config = sample_config();
        let rows = sample_rows();
        let metrics = sample_metrics(&config, &rows);
        let mut engine = MappingEngine::new(&config).unwrap();
        let results = engine.generate_all(&rows, &metrics).unwrap();

        let grid = TimeGrid::from_config(&config.time).unwrap();
        for (year, music) in &results {
            let (start, end) = grid.year_to_beat_range(*year);
            for note in &music.notes {
                assert!(note.start_beat >= start, "note before year start");
                assert!(note.start_beat < end + 0.25, "note after year end");
            }
        }
    }

    #[test]
    fn test_voice_cache_is_stable_across_years() {
        let config = sample_config();
        let rows = sample_rows();
        let metrics = sample_metrics(&config, &rows);
        let mut engine = MappingEngine::new(&config).unwrap();

        engine.generate_all(&rows, &metrics).unwrap();
        let robin_before = engine.voices()["robin"].clone();

        // Re-generating must not reassign any voice
        engine.generate_all(&rows, &metrics).unwrap();
        assert_eq!(engine.voices()["robin"], robin_before);
    }

    #[test]
    fn test_drone_root_rounds_ties_to_even() {
        let engine = MappingEngine::new(&sample_config()).unwrap();
        // Root 62; shift is round(turnover * 6) - 3 with ties to even
        assert_eq!(engine.drone_root(0.0), 59);
        assert_eq!(engine.drone_root(0.25), 61); // 1.5 rounds to 2
        assert_eq!(engine.drone_root(0.5), 62);
        assert_eq!(engine.drone_root(0.75), 63); // 4.5 rounds to 4, not 5
        assert_eq!(engine.drone_root(1.0), 65);
    }

    #[test]
    fn test_shimmer_step_at_half_turnover() {
        let config = sample_config();
        let rows = sample_rows();
        let metrics = sample_metrics(&config, &rows);
        let mut engine = MappingEngine::new(&config).unwrap();
        let results = engine.generate_all(&rows, &metrics).unwrap();

        // 2021 has turnover exactly 0.5, so the step is round(2.5) = 2
        // (ties to even) and the 32-beat year holds 16 shimmer notes.
        let m2021 = metrics.iter().find(|m| m.year == 2021).unwrap();
        assert_eq!(m2021.turnover, 0.5);
        let shimmer = results[&2021]
            .notes
            .iter()
            .filter(|n| n.layer == Layer::Shimmer)
            .count();
        assert_eq!(shimmer, 16);
    }

    #[test]
    fn test_median_richness() {
        let config = sample_config();
        let rows = sample_rows();
        let metrics = sample_metrics(&config, &rows);
        assert_eq!(median_richness(&metrics), 3.0);
        assert_eq!(median_richness(&[]), 0.0);
    }
}
