//! Clustering and 2-D projection of the standardized feature matrix.
//!
//! Both outputs are fitted on the very same (weighted) matrix, so labels
//! and coordinates always describe one population.

use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::{KMeans, KMeansInit};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, Axis};
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineParams {
    pub n_clusters: usize,
    pub n_runs: usize,
    pub max_iterations: u64,
    pub tolerance: f64,
    pub seed: u64,
}

impl From<&AnalysisConfig> for EngineParams {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            n_clusters: config.n_clusters,
            n_runs: config.n_runs,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            seed: config.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// one label in `[0, n_clusters)` per row
    pub labels: Vec<usize>,
    pub n_clusters: usize,
    /// sum of squared distances to the assigned centroids
    pub inertia: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// per-row (x, y), each axis rescaled to [0, 1]
    pub coords: Vec<[f64; 2]>,
    pub explained_variance_ratio: [f64; 2],
}

impl Projection {
    pub fn explained_variance_total(&self) -> f64 {
        self.explained_variance_ratio[0] + self.explained_variance_ratio[1]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub clustering: Clustering,
    pub projection: Projection,
}

/// Multiply each column by its weight.
pub fn weight_columns(x: &mut Array2<f64>, weights: &[f64]) {
    for (mut col, w) in x.axis_iter_mut(Axis(1)).zip(weights) {
        if *w != 1.0 {
            col.mapv_inplace(|v| v * w);
        }
    }
}

/// Weight the standardized matrix, then fit k-means and PCA on the result.
pub fn fit(standardized: &Array2<f64>, weights: &[f64], params: &EngineParams) -> Result<EngineOutput> {
    if standardized.nrows() == 0 {
        return Err(AnalysisError::EmptyPopulation { stage: "cluster/projection fit" });
    }
    if weights.len() != standardized.ncols() {
        return Err(AnalysisError::InvalidConfig(format!(
            "{} column weights for {} feature columns",
            weights.len(),
            standardized.ncols()
        )));
    }

    let mut x = standardized.clone();
    weight_columns(&mut x, weights);

    let clustering = kmeans(&x, params)?;
    let projection = pca_2d(&x);
    info!(
        "explained variance: pc1 {:.4}, pc2 {:.4}, total {:.4}",
        projection.explained_variance_ratio[0],
        projection.explained_variance_ratio[1],
        projection.explained_variance_total()
    );
    Ok(EngineOutput { clustering, projection })
}

fn distinct_rows(x: &Array2<f64>) -> usize {
    // +0.0 folds -0.0 into 0.0
    let mut rows: Vec<Vec<u64>> = x
        .rows()
        .into_iter()
        .map(|r| r.iter().map(|v| (v + 0.0).to_bits()).collect())
        .collect();
    rows.sort();
    rows.dedup();
    rows.len()
}

/// Seeded k-means++ with restarts; the run with the lowest inertia wins.
///
/// k is capped at the number of distinct rows so tiny populations still
/// get a valid partition.
pub fn kmeans(x: &Array2<f64>, params: &EngineParams) -> Result<Clustering> {
    if x.nrows() == 0 {
        return Err(AnalysisError::EmptyPopulation { stage: "k-means" });
    }
    let distinct = distinct_rows(x);
    let k = params.n_clusters.min(distinct).max(1);
    if k < params.n_clusters {
        warn!("only {} distinct rows, clustering with k={} instead of {}", distinct, k, params.n_clusters);
    }

    let rng = Xoshiro256Plus::seed_from_u64(params.seed);
    let dataset = DatasetBase::from(x.clone());
    let model = KMeans::params_with_rng(k, rng)
        .init_method(KMeansInit::KMeansPlusPlus)
        .n_runs(params.n_runs)
        .max_n_iterations(params.max_iterations)
        .tolerance(params.tolerance)
        .fit(&dataset)?;

    let labels: Array1<usize> = model.predict(x);
    let centroids = model.centroids();
    let inertia: f64 = x
        .rows()
        .into_iter()
        .zip(labels.iter())
        .map(|(row, &c)| row.iter().zip(centroids.row(c).iter()).map(|(a, b)| (a - b).powi(2)).sum::<f64>())
        .sum();
    debug!("k-means fitted: k={}, inertia {:.4}", k, inertia);

    Ok(Clustering { labels: labels.to_vec(), n_clusters: k, inertia })
}

/// Rescale each column independently to [0, 1]. A constant column maps to 0.
pub fn min_max_columns(x: &mut Array2<f64>) {
    for mut col in x.axis_iter_mut(Axis(1)) {
        let (lo, hi) = col.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        let range = hi - lo;
        if range > 0.0 && range.is_finite() {
            col.mapv_inplace(|v| ((v - lo) / range).clamp(0.0, 1.0));
        } else {
            col.fill(0.0);
        }
    }
}

/// Two-component PCA through the eigen-decomposition of the covariance
/// matrix, followed by min-max rescaling of each component.
///
/// Components are ordered by decreasing eigenvalue and each one is signed
/// so that its largest-magnitude loading is positive.
pub fn pca_2d(x: &Array2<f64>) -> Projection {
    let (n, p) = x.dim();
    let mut coords = Array2::<f64>::zeros((n, 2));
    let mut ratio = [0.0; 2];
    if n == 0 || p == 0 {
        return Projection { coords: Vec::new(), explained_variance_ratio: ratio };
    }

    let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
    let centered = x - &mean;
    let cov = if n > 1 {
        centered.t().dot(&centered) / (n - 1) as f64
    } else {
        Array2::zeros((p, p))
    };

    let eig = SymmetricEigen::new(DMatrix::from_fn(p, p, |i, j| cov[[i, j]]));
    let eigenvalues: Vec<f64> = eig.eigenvalues.iter().map(|v| v.max(0.0)).collect();
    let total: f64 = eigenvalues.iter().sum();

    // stable sort, equal eigenvalues keep their index order
    let mut order: Vec<usize> = (0..p).collect();
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));

    for (c, &k) in order.iter().take(2).enumerate() {
        let mut axis: Array1<f64> = eig.eigenvectors.column(k).iter().copied().collect();
        let pivot = axis.iter().copied().fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
        if pivot < 0.0 {
            axis.mapv_inplace(|v| -v);
        }
        coords.column_mut(c).assign(&centered.dot(&axis));
        if total > 0.0 {
            ratio[c] = eigenvalues[k] / total;
        }
    }
    // rounding must not push the pair past the whole
    ratio[1] = ratio[1].min(1.0 - ratio[0]).max(0.0);

    min_max_columns(&mut coords);
    Projection {
        coords: coords.rows().into_iter().map(|r| [r[0], r[1]]).collect(),
        explained_variance_ratio: ratio,
    }
}
