//! Per-year biodiversity metrics: richness, turnover, and confidence.
//!
//! Straight aggregation and statistics over the year-species table; no
//! hashing is involved here. One `YearMetrics` row is produced for every
//! year in the configured range, including years absent from the input.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::data::{SpeciesList, YearSpeciesRow};
use crate::timegrid::TimeGrid;

/// Metrics for a single year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearMetrics {
    pub year: i32,
    /// Count of distinct species observed
    pub richness: usize,
    pub total_obs: f64,
    /// 1 - Jaccard similarity against the previous year's species set
    pub turnover: f64,
    pub new_species: SpeciesList,
    pub lost_species: SpeciesList,
    #[serde(default)]
    pub new_species_count: usize,
    #[serde(default)]
    pub lost_species_count: usize,
    #[serde(default)]
    pub effort_year: Option<f64>,
    /// Normalized, log-scaled sampling-effort score in [0, 1]
    pub confidence: f64,
    /// Species ids with the largest observation counts, truncated to the
    /// configured pool size
    #[serde(default)]
    pub top_species: Vec<String>,
}

/// Jaccard similarity between two species sets.
///
/// Defined as 1.0 when both sets are empty.
pub fn jaccard_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union > 0 {
        intersection as f64 / union as f64
    } else {
        0.0
    }
}

/// Turnover between consecutive years: 1 - Jaccard similarity.
///
/// 0.0 means identical species sets, 1.0 completely different ones.
pub fn compute_turnover(current: &BTreeSet<String>, previous: &BTreeSet<String>) -> f64 {
    1.0 - jaccard_similarity(current, previous)
}

/// Confidence score from sampling effort.
///
/// `confidence = clip(log1p(effort_year) / p95(log1p(all_efforts)), 0, 1)`.
/// Missing effort is passed as NaN and yields full confidence, as does an
/// effort population with no non-missing values: with no signal there is
/// no penalty.
pub fn compute_confidence(effort_year: f64, all_efforts: &[f64]) -> f64 {
    if effort_year.is_nan() {
        return 1.0;
    }

    let log_all: Vec<f64> = all_efforts
        .iter()
        .filter(|e| !e.is_nan())
        .map(|e| e.ln_1p())
        .collect();
    if log_all.is_empty() {
        return 1.0;
    }

    let p95 = percentile(&log_all, 95.0);
    if p95 == 0.0 {
        return 1.0;
    }

    (effort_year.ln_1p() / p95).clamp(0.0, 1.0)
}

/// Percentile with linear interpolation between closest ranks.
fn percentile(values: &[f64], pct: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let weight = rank - lo as f64;
    sorted[lo] * (1.0 - weight) + sorted[hi] * weight
}

/// Compute per-year metrics for every year in the grid's range.
///
/// Years missing from the input get a row with richness 0 and empty
/// species sets. The first year in range has turnover 0.0 with its entire
/// species set counted as new.
pub fn compute_year_metrics(
    rows: &[YearSpeciesRow],
    grid: &TimeGrid,
    top_k: usize,
) -> Vec<YearMetrics> {
    // Species sets per grid year
    let mut species_by_year: BTreeMap<i32, BTreeSet<String>> = BTreeMap::new();
    for year in grid.years() {
        let set = rows
            .iter()
            .filter(|r| r.year == year)
            .map(|r| r.species_id.clone())
            .collect();
        species_by_year.insert(year, set);
    }

    // First non-missing effort per year that has input rows
    let mut effort_by_year: BTreeMap<i32, Option<f64>> = BTreeMap::new();
    for row in rows {
        let entry = effort_by_year.entry(row.year).or_insert(None);
        if entry.is_none() {
            *entry = row.effort_year;
        }
    }
    let all_efforts: Vec<f64> = effort_by_year
        .values()
        .map(|e| e.unwrap_or(f64::NAN))
        .collect();

    if !effort_by_year.is_empty() && all_efforts.iter().all(|e| e.is_nan()) {
        log::warn!("no sampling effort data available; confidence defaults to 1.0");
    }

    let mut metrics = Vec::with_capacity(grid.num_years() as usize);

    for year in grid.years() {
        let year_rows: Vec<&YearSpeciesRow> = rows.iter().filter(|r| r.year == year).collect();
        let species_set = &species_by_year[&year];

        let richness = species_set.len();
        let total_obs: f64 = year_rows.iter().map(|r| r.species_obs).sum();

        let (turnover, new_species, lost_species) =
            match species_by_year.get(&(year - 1)) {
                Some(prev_set) => {
                    let turnover = compute_turnover(species_set, prev_set);
                    let new: Vec<String> = species_set.difference(prev_set).cloned().collect();
                    let lost: Vec<String> = prev_set.difference(species_set).cloned().collect();
                    (turnover, new, lost)
                }
                // First year in range: everything present counts as new
                None => (0.0, species_set.iter().cloned().collect(), Vec::new()),
            };

        let effort = effort_by_year.get(&year).copied().flatten();
        let confidence = compute_confidence(effort.unwrap_or(f64::NAN), &all_efforts);

        let top_species = top_species_ids(&year_rows, top_k);

        metrics.push(YearMetrics {
            year,
            richness,
            total_obs,
            turnover,
            new_species_count: new_species.len(),
            lost_species_count: lost_species.len(),
            new_species: new_species.into(),
            lost_species: lost_species.into(),
            effort_year: effort,
            confidence,
            top_species,
        });
    }

    metrics
}

/// Species ids ranked by observation count, ties broken by id, truncated
/// to `top_k`.
fn top_species_ids(year_rows: &[&YearSpeciesRow], top_k: usize) -> Vec<String> {
    let mut ranked: Vec<&&YearSpeciesRow> = year_rows.iter().collect();
    ranked.sort_by(|a, b| {
        b.species_obs
            .total_cmp(&a.species_obs)
            .then_with(|| a.species_id.cmp(&b.species_id))
    });
    ranked
        .iter()
        .take(top_k)
        .map(|r| r.species_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn row(year: i32, id: &str, obs: f64, effort: Option<f64>) -> YearSpeciesRow {
        YearSpeciesRow {
            year,
            species_id: id.to_string(),
            species_name: id.to_string(),
            species_obs: obs,
            effort_year: effort,
        }
    }

    fn sample_rows() -> Vec<YearSpeciesRow> {
        vec![
            row(2020, "robin", 10.0, Some(5.0)),
            row(2020, "jay", 8.0, Some(5.0)),
            row(2020, "sparrow", 15.0, Some(5.0)),
            row(2021, "robin", 12.0, Some(6.0)),
            row(2021, "jay", 7.0, Some(6.0)),
            row(2021, "hawk", 5.0, Some(6.0)),
            row(2022, "robin", 15.0, Some(7.0)),
            row(2022, "jay", 9.0, Some(7.0)),
            row(2022, "sparrow", 18.0, Some(7.0)),
            row(2022, "owl", 3.0, Some(7.0)),
        ]
    }

    #[test]
    fn test_jaccard_identical() {
        let a = set(&["robin", "jay", "sparrow"]);
        assert_eq!(jaccard_similarity(&a, &a.clone()), 1.0);
    }

    #[test]
    fn test_jaccard_disjoint() {
        assert_eq!(jaccard_similarity(&set(&["a", "b"]), &set(&["c", "d"])), 0.0);
    }

    #[test]
    fn test_jaccard_partial() {
        let a = set(&["robin", "jay", "sparrow"]);
        let b = set(&["robin", "jay", "hawk"]);
        // intersection 2, union 4
        assert_eq!(jaccard_similarity(&a, &b), 0.5);
    }

    #[test]
    fn test_jaccard_both_empty() {
        assert_eq!(jaccard_similarity(&set(&[]), &set(&[])), 1.0);
    }

    #[test]
    fn test_jaccard_one_empty() {
        let a = set(&["robin", "jay"]);
        assert_eq!(jaccard_similarity(&a, &set(&[])), 0.0);
        assert_eq!(jaccard_similarity(&set(&[]), &a), 0.0);
    }

    #[test]
    fn test_turnover_extremes() {
        let a = set(&["robin", "jay"]);
        let b = set(&["hawk", "eagle"]);
        assert_eq!(compute_turnover(&a, &a.clone()), 0.0);
        assert_eq!(compute_turnover(&a, &b), 1.0);
    }

    #[test]
    fn test_confidence_high_effort() {
        let efforts = [1.0, 2.0, 3.0, 4.0, 5.0];
        let conf = compute_confidence(5.0, &efforts);
        assert!(conf >= 0.9);
    }

    #[test]
    fn test_confidence_low_effort() {
        let efforts = [10.0, 20.0, 30.0, 40.0, 50.0];
        let conf = compute_confidence(1.0, &efforts);
        assert!(conf < 0.5);
    }

    #[test]
    fn test_confidence_missing_effort() {
        let efforts = [1.0, 2.0, 3.0];
        assert_eq!(compute_confidence(f64::NAN, &efforts), 1.0);
    }

    #[test]
    fn test_confidence_all_missing() {
        let efforts = [f64::NAN, f64::NAN];
        assert_eq!(compute_confidence(5.0, &efforts), 1.0);
    }

    #[test]
    fn test_confidence_clamped() {
        let efforts = [1.0, 1.0, 1.0, 100.0];
        let conf = compute_confidence(1000.0, &efforts);
        assert_eq!(conf, 1.0);
    }

    #[test]
    fn test_percentile() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 4.0);
        assert_eq!(percentile(&values, 50.0), 2.5);
    }

    #[test]
    fn test_richness_per_year() {
        let grid = TimeGrid::new(2020, 2022, 8, 60.0).unwrap();
        let metrics = compute_year_metrics(&sample_rows(), &grid, 40);

        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics[0].richness, 3);
        assert_eq!(metrics[1].richness, 3);
        assert_eq!(metrics[2].richness, 4);
    }

    #[test]
    fn test_turnover_per_year() {
        let grid = TimeGrid::new(2020, 2022, 8, 60.0).unwrap();
        let metrics = compute_year_metrics(&sample_rows(), &grid, 40);

        // First year in range never has turnover
        assert_eq!(metrics[0].turnover, 0.0);
        // 2021 {robin,jay,hawk} vs 2020 {robin,jay,sparrow}: Jaccard 2/4
        assert!((metrics[1].turnover - 0.5).abs() < 1e-9);
        // 2022 {robin,jay,sparrow,owl} vs 2021 {robin,jay,hawk}: Jaccard 2/5
        assert!((metrics[2].turnover - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_first_year_species_all_new() {
        let grid = TimeGrid::new(2020, 2022, 8, 60.0).unwrap();
        let metrics = compute_year_metrics(&sample_rows(), &grid, 40);

        assert_eq!(
            metrics[0].new_species.0,
            vec!["jay".to_string(), "robin".to_string(), "sparrow".to_string()]
        );
        assert!(metrics[0].lost_species.is_empty());
    }

    #[test]
    fn test_new_and_lost_species() {
        let grid = TimeGrid::new(2020, 2022, 8, 60.0).unwrap();
        let metrics = compute_year_metrics(&sample_rows(), &grid, 40);

        assert_eq!(metrics[1].new_species.0, vec!["hawk".to_string()]);
        assert_eq!(metrics[1].lost_species.0, vec!["sparrow".to_string()]);
        assert_eq!(metrics[1].new_species_count, 1);
        assert_eq!(metrics[1].lost_species_count, 1);
    }

    #[test]
    fn test_year_absent_from_input() {
        let grid = TimeGrid::new(2019, 2022, 8, 60.0).unwrap();
        let metrics = compute_year_metrics(&sample_rows(), &grid, 40);

        assert_eq!(metrics.len(), 4);
        assert_eq!(metrics[0].year, 2019);
        assert_eq!(metrics[0].richness, 0);
        assert_eq!(metrics[0].total_obs, 0.0);
        assert!(metrics[0].new_species.is_empty());
        // Missing effort for an absent year means full confidence
        assert_eq!(metrics[0].confidence, 1.0);
    }

    #[test]
    fn test_top_species_ordering() {
        let grid = TimeGrid::new(2022, 2022, 8, 60.0).unwrap();
        let metrics = compute_year_metrics(&sample_rows(), &grid, 2);

        // sparrow (18) then robin (15), truncated to 2
        assert_eq!(
            metrics[0].top_species,
            vec!["sparrow".to_string(), "robin".to_string()]
        );
    }

    #[test]
    fn test_no_effort_data_full_confidence() {
        let rows = vec![
            row(2020, "robin", 10.0, None),
            row(2021, "robin", 12.0, None),
        ];
        let grid = TimeGrid::new(2020, 2021, 8, 60.0).unwrap();
        let metrics = compute_year_metrics(&rows, &grid, 40);
        assert!(metrics.iter().all(|m| m.confidence == 1.0));
        assert!(metrics.iter().all(|m| m.effort_year.is_none()));
    }
}
