//! Input table types for the mapping core.
//!
//! The upstream adapters (CSV/Parquet standardization and aggregation) are
//! external; this crate consumes their output as plain row tables,
//! deserialized from JSON for the CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// One row of the year-by-species aggregate table.
///
/// Unique on (year, species_id). `effort_year` is the year's total sampling
/// effort and may be missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearSpeciesRow {
    pub year: i32,
    pub species_id: String,
    pub species_name: String,
    pub species_obs: f64,
    #[serde(default)]
    pub effort_year: Option<f64>,
}

/// A list of species ids that tolerates malformed input.
///
/// New/lost species lists sometimes round-trip through columnar storage as
/// a scalar instead of a list; anything that is not a list of strings
/// deserializes as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpeciesList(pub Vec<String>);

impl<'de> Deserialize<'de> for SpeciesList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<String>),
            Other(serde::de::IgnoredAny),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::List(ids) => SpeciesList(ids),
            Raw::Other(_) => SpeciesList::default(),
        })
    }
}

impl SpeciesList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl std::ops::Deref for SpeciesList {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for SpeciesList {
    fn from(ids: Vec<String>) -> Self {
        SpeciesList(ids)
    }
}

/// Load a year-species aggregate table from a JSON array file.
pub fn load_year_species(path: &Path) -> Result<Vec<YearSpeciesRow>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading year-species table {:?}", path))?;
    let rows: Vec<YearSpeciesRow> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing year-species table {:?}", path))?;
    Ok(rows)
}
