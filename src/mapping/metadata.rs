//! Mapping metadata sidecar.
//!
//! A JSON document describing one mapping run: the configuration snapshot,
//! summary statistics, per-year results, per-species voice assignments,
//! warnings, and a content hash so two runs can be compared byte-for-byte.

use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::{json, Value};

use super::events::YearMusic;
use super::generator::MappingEngine;
use crate::config::VerdantConfig;
use crate::hashing::content_hash;
use crate::metrics::YearMetrics;

/// Build the metadata document for a completed mapping run.
///
/// The `content_hash` field fingerprints the canonical serialization of
/// everything else in the document; no timestamp is embedded, so the
/// sidecar itself is reproducible.
pub fn mapping_metadata(
    config: &VerdantConfig,
    results: &BTreeMap<i32, YearMusic>,
    engine: &MappingEngine,
    metrics: &[YearMetrics],
) -> Result<Value> {
    let total_notes: usize = results.values().map(|m| m.notes.len()).sum();

    let years: Vec<Value> = results
        .iter()
        .map(|(year, music)| {
            let metrics_info = match metrics.iter().find(|m| m.year == *year) {
                Some(m) => json!({
                    "richness": m.richness,
                    "turnover": m.turnover,
                    "confidence": m.confidence,
                    "total_obs": m.total_obs,
                }),
                None => json!({}),
            };
            json!({
                "year": year,
                "note_count": music.notes.len(),
                "selected_species_count": music.selected_species.len(),
                "selected_species": music.selected_species,
                "metrics": metrics_info,
            })
        })
        .collect();

    // BTreeMap iteration keeps assignments sorted by species id
    let species_assignments: Vec<Value> = engine
        .voices()
        .values()
        .map(|voice| serde_json::to_value(voice))
        .collect::<Result<_, _>>()?;

    let mut warnings: Vec<String> = Vec::new();
    if !metrics.is_empty() && metrics.iter().all(|m| m.effort_year.is_none()) {
        warnings.push("No effort data available - confidence set to 1.0 for all years".to_string());
    }
    for m in metrics {
        if m.richness < 5 {
            warnings.push(format!("Year {} has low richness ({} species)", m.year, m.richness));
        }
    }

    let mut metadata = json!({
        "version": "v0",
        "config": {
            "time": serde_json::to_value(&config.time)?,
            "mapping": serde_json::to_value(&config.mapping)?,
        },
        "summary": {
            "total_years": results.len(),
            "year_range": [engine.grid().start_year(), engine.grid().end_year()],
            "total_notes": total_notes,
            "total_species_voiced": engine.voices().len(),
            "scale": engine.scale().name(),
            "root_midi": engine.root_midi(),
        },
        "years": years,
        "species_assignments": species_assignments,
    });

    if !warnings.is_empty() {
        metadata["warnings"] = json!(warnings);
    }

    // serde_json keeps object keys sorted, so this serialization is canonical
    let fingerprint = content_hash(&serde_json::to_string(&metadata)?);
    metadata["content_hash"] = json!(fingerprint);

    Ok(metadata)
}
