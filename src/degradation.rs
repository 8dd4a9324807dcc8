use crate::features::FeatureRow;
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use tracing::info;

/// Lap time against tyre age for one compound: `lap_time = intercept + slope * tyre_life`.
#[derive(Debug, Clone, PartialEq)]
pub struct DegradationFit {
    pub compound: String,
    pub laps: usize,
    /// seconds lost per lap of tyre age
    pub slope: f64,
    pub intercept: f64,
}

impl DegradationFit {
    pub fn slope_ms_per_lap(&self) -> f64 {
        self.slope * 1000.0
    }
}

// compounds in dry-to-wet order so the report reads the same every run
const COMPOUNDS: [&str; 5] = ["SOFT", "MEDIUM", "HARD", "INTERMEDIATE", "WET"];

/// Fit one degradation line per compound over the analyzed laps.
/// Compounds with fewer than `min_laps` usable laps are skipped.
pub fn fit_by_compound(rows: &[FeatureRow], min_laps: usize) -> Vec<DegradationFit> {
    let fits: Vec<DegradationFit> = COMPOUNDS
        .iter()
        .filter_map(|comp| build_fit(rows, comp, min_laps))
        .collect();
    for f in &fits {
        info!(
            "degradation {}: {:+.1} ms/lap over {} laps (intercept {:.3}s)",
            f.compound,
            f.slope_ms_per_lap(),
            f.laps,
            f.intercept
        );
    }
    fits
}

fn build_fit(rows: &[FeatureRow], comp: &str, min_laps: usize) -> Option<DegradationFit> {
    let points: Vec<(f64, f64)> = rows
        .iter()
        .filter(|r| r.record.lap.compound.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(comp)))
        .filter_map(|r| Some((r.record.lap.tyre_life?, r.record.lap.lap_time?)))
        .collect();
    if points.len() < min_laps.max(2) {
        return None;
    }
    // a vertical line has no slope
    let first_age = points[0].0;
    if points.iter().all(|(age, _)| *age == first_age) {
        return None;
    }

    let x = Array2::from_shape_vec((points.len(), 1), points.iter().map(|p| p.0).collect()).ok()?;
    let y = Array1::from_vec(points.iter().map(|p| p.1).collect());
    let ds = Dataset::new(x, y);

    let model = LinearRegression::new().fit(&ds).ok()?;
    Some(DegradationFit {
        compound: comp.to_string(),
        laps: points.len(),
        slope: model.params()[0],
        intercept: model.intercept(),
    })
}
