use tracing::info;

use crate::align::align_laps;
use crate::assemble::{assemble, AnalysisDataset};
use crate::config::{AnalysisConfig, Mode};
use crate::data::{laps_for_event, LapRecord, WeatherSample};
use crate::degradation::{fit_by_compound, DegradationFit};
use crate::engine::{self, EngineParams};
use crate::error::Result;
use crate::features::build_features;
use crate::normalize::standardize;

/// Everything one run produces for one event.
#[derive(Debug, Clone)]
pub struct EventAnalysis {
    pub dataset: AnalysisDataset,
    pub explained_variance_ratio: [f64; 2],
    pub n_clusters: usize,
    pub inertia: f64,
    pub degradation: Vec<DegradationFit>,
}

impl EventAnalysis {
    pub fn explained_variance_total(&self) -> f64 {
        self.explained_variance_ratio[0] + self.explained_variance_ratio[1]
    }
}

/// Run the whole chain for `config.event`:
/// event filter, alignment, features, standardization, weighting,
/// clustering + projection, assembly.
pub fn analyze_event(season: &[LapRecord], weather: &[WeatherSample], config: &AnalysisConfig) -> Result<EventAnalysis> {
    config.validate()?;

    let laps = laps_for_event(season, &config.event)?;
    info!("{}: {} laps, {} weather samples", config.event, laps.len(), weather.len());

    let merged = align_laps(laps, weather, &config.event)?;
    let table = build_features(merged, config)?;
    info!("{} laps with {} features ({:?} mode)", table.len(), table.features.len(), config.mode);

    let standardized = standardize(&table.matrix());
    let weights = match config.mode {
        Mode::Adaptive => table.column_weights(config.weight_factor),
        Mode::Fixed => vec![1.0; table.features.len()],
    };
    let fit = engine::fit(&standardized, &weights, &EngineParams::from(config))?;
    info!("clustered into {} groups, inertia {:.3}", fit.clustering.n_clusters, fit.clustering.inertia);

    let degradation = fit_by_compound(&table.rows, config.min_degradation_laps);
    let dataset = assemble(&table, &fit);

    Ok(EventAnalysis {
        dataset,
        explained_variance_ratio: fit.projection.explained_variance_ratio,
        n_clusters: fit.clustering.n_clusters,
        inertia: fit.clustering.inertia,
        degradation,
    })
}
