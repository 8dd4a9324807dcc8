//! Per-lap feature extraction and selection.
//!
//! Two selection modes exist. `Fixed` uses raw sector seconds plus tyre and
//! weather context. `Adaptive` first drops slow laps (pit stops, safety car),
//! then describes pace as the gap to the fastest sector of the remaining
//! population and only keeps weather columns that actually vary.

use ndarray::Array2;
use tracing::{debug, info};

use crate::align::MergedLapRecord;
use crate::config::{AnalysisConfig, Mode};
use crate::error::{AnalysisError, Result};

/// Ordinal code of a tyre compound. Anything outside the five known
/// compounds has no code.
pub fn compound_code(compound: &str) -> Option<f64> {
    match compound.trim().to_ascii_uppercase().as_str() {
        "SOFT" => Some(1.0),
        "MEDIUM" => Some(2.0),
        "HARD" => Some(3.0),
        "INTERMEDIATE" => Some(4.0),
        "WET" => Some(5.0),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    SectorSecs(usize),
    SectorDelta(usize),
    TyreLife,
    TrackTemp,
    SpeedTrap,
    WindSpeed,
    CompoundCode,
}

impl Feature {
    /// Output column name.
    pub fn name(&self) -> &'static str {
        match self {
            Feature::SectorSecs(0) => "Sector1Time_Sec",
            Feature::SectorSecs(1) => "Sector2Time_Sec",
            Feature::SectorSecs(_) => "Sector3Time_Sec",
            Feature::SectorDelta(0) => "Sector1_Delta",
            Feature::SectorDelta(1) => "Sector2_Delta",
            Feature::SectorDelta(_) => "Sector3_Delta",
            Feature::TyreLife => "TyreLife",
            Feature::TrackTemp => "TrackTemp",
            Feature::SpeedTrap => "SpeedST",
            Feature::WindSpeed => "WindSpeed",
            Feature::CompoundCode => "Compound_Num",
        }
    }

    pub fn is_sector_delta(&self) -> bool {
        matches!(self, Feature::SectorDelta(_))
    }

    fn value(&self, rec: &MergedLapRecord, sector_min: &[Option<f64>; 3]) -> Option<f64> {
        let v = match *self {
            Feature::SectorSecs(i) => rec.lap.sector_times[i],
            Feature::SectorDelta(i) => {
                let t = rec.lap.sector_times[i]?;
                Some((t - sector_min[i]?).max(0.0))
            }
            Feature::TyreLife => rec.lap.tyre_life,
            Feature::TrackTemp => rec.track_temp,
            Feature::SpeedTrap => rec.lap.speed_trap,
            Feature::WindSpeed => rec.wind_speed,
            Feature::CompoundCode => rec.lap.compound.as_deref().and_then(compound_code),
        };
        v.filter(|v| v.is_finite())
    }
}

pub const FIXED_FEATURES: [Feature; 7] = [
    Feature::SectorSecs(0),
    Feature::SectorSecs(1),
    Feature::SectorSecs(2),
    Feature::TyreLife,
    Feature::TrackTemp,
    Feature::SpeedTrap,
    Feature::CompoundCode,
];

/// A lap that survived selection, with its feature values in column order.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub record: MergedLapRecord,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub mode: Mode,
    pub features: Vec<Feature>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.features.iter().map(Feature::name).collect()
    }

    /// Rows x features matrix in column order.
    pub fn matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.rows.len(), self.features.len()), |(i, j)| self.rows[i].values[j])
    }

    /// Per-column multipliers applied after standardization. Only the
    /// adaptive sector-delta columns are boosted.
    pub fn column_weights(&self, weight_factor: f64) -> Vec<f64> {
        self.features
            .iter()
            .map(|f| if f.is_sector_delta() { weight_factor } else { 1.0 })
            .collect()
    }
}

/// Median of the finite values, `None` if there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if v.is_empty() {
        return None;
    }
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    Some(if v.len() % 2 == 0 { (v[mid - 1] + v[mid]) / 2.0 } else { v[mid] })
}

/// Sample standard deviation (n - 1), `None` below two observations.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((ss / (n - 1) as f64).sqrt())
}

/// Drop laps slower than `ratio` times the median lap time. Laps without a
/// lap time cannot be judged and are dropped too.
pub fn filter_outliers(records: Vec<MergedLapRecord>, ratio: f64) -> Vec<MergedLapRecord> {
    let times: Vec<f64> = records.iter().filter_map(|r| r.lap.lap_time).collect();
    let Some(med) = median(&times) else {
        return Vec::new();
    };
    let threshold = ratio * med;
    let before = records.len();
    let kept: Vec<MergedLapRecord> = records
        .into_iter()
        .filter(|r| r.lap.lap_time.is_some_and(|t| t <= threshold))
        .collect();
    info!(
        "outlier filter: median {:.3}s, threshold {:.3}s, removed {} of {} laps",
        med,
        threshold,
        before - kept.len(),
        before
    );
    kept
}

fn sector_minimums(records: &[MergedLapRecord]) -> [Option<f64>; 3] {
    let mut mins = [None; 3];
    for (i, slot) in mins.iter_mut().enumerate() {
        *slot = records
            .iter()
            .filter_map(|r| r.lap.sector_times[i])
            .filter(|t| t.is_finite())
            .min_by(f64::total_cmp);
    }
    mins
}

// a candidate column earns its place only if it moves enough across the population
fn passes_variance_gate(values: Vec<f64>, threshold: f64, name: &str) -> bool {
    match sample_std(&values) {
        Some(std) => {
            let keep = std > threshold;
            info!("variance gate {}: std {:.3} vs {:.3} -> {}", name, std, threshold, if keep { "keep" } else { "skip" });
            keep
        }
        None => {
            info!("variance gate {}: not enough values, skipped", name);
            false
        }
    }
}

/// Feature list for the adaptive mode, computed from the filtered population.
pub fn adaptive_features(records: &[MergedLapRecord], config: &AnalysisConfig) -> Vec<Feature> {
    let mut features = vec![
        Feature::SectorDelta(0),
        Feature::SectorDelta(1),
        Feature::SectorDelta(2),
        Feature::TyreLife,
        Feature::SpeedTrap,
    ];
    let track_temps: Vec<f64> = records.iter().filter_map(|r| r.track_temp).collect();
    if passes_variance_gate(track_temps, config.track_temp_std_threshold, Feature::TrackTemp.name()) {
        features.push(Feature::TrackTemp);
    }
    let wind: Vec<f64> = records.iter().filter_map(|r| r.wind_speed).collect();
    if passes_variance_gate(wind, config.wind_speed_std_threshold, Feature::WindSpeed.name()) {
        features.push(Feature::WindSpeed);
    }
    features.push(Feature::CompoundCode);
    features
}

/// Select features for the configured mode and drop incomplete rows.
///
/// In adaptive mode the outlier filter runs first, so sector minimums and
/// the variance gate only see the laps that remain.
pub fn build_features(records: Vec<MergedLapRecord>, config: &AnalysisConfig) -> Result<FeatureTable> {
    let (records, features) = match config.mode {
        Mode::Fixed => (records, FIXED_FEATURES.to_vec()),
        Mode::Adaptive => {
            let filtered = filter_outliers(records, config.outlier_ratio);
            if filtered.is_empty() {
                return Err(AnalysisError::EmptyPopulation { stage: "outlier filter" });
            }
            let features = adaptive_features(&filtered, config);
            (filtered, features)
        }
    };
    let sector_min = sector_minimums(&records);

    let total = records.len();
    let rows: Vec<FeatureRow> = records
        .into_iter()
        .filter_map(|record| {
            let values = features
                .iter()
                .map(|f| f.value(&record, &sector_min))
                .collect::<Option<Vec<f64>>>()?;
            Some(FeatureRow { record, values })
        })
        .collect();

    debug!("selected features: {:?}", features.iter().map(Feature::name).collect::<Vec<_>>());
    info!("dropped {} of {} laps with missing feature values", total - rows.len(), total);
    if rows.is_empty() {
        return Err(AnalysisError::EmptyPopulation { stage: "missing-value row drop" });
    }

    Ok(FeatureTable { mode: config.mode, features, rows })
}
