//! Lap telemetry clustering for a single race event.
//!
//! Laps are matched to the nearest weather poll, turned into numeric
//! features, standardized, then clustered (k-means) and projected to two
//! dimensions (PCA). The result is one output row per analyzed lap.
//!
//! ```no_run
//! use lapcluster::{analyze_event, data, AnalysisConfig};
//!
//! let config = AnalysisConfig::default();
//! let season = data::load_laps("f1_2025_full_data.csv").unwrap();
//! let weather = data::load_weather("weather.csv", &config.event).unwrap();
//! let analysis = analyze_event(&season, &weather, &config).unwrap();
//! analysis.dataset.save_csv("out.csv").unwrap();
//! ```

pub mod align;
pub mod assemble;
pub mod config;
pub mod data;
pub mod degradation;
pub mod engine;
pub mod error;
pub mod features;
pub mod normalize;
pub mod pipeline;

pub use config::{AnalysisConfig, Mode};
pub use error::{AnalysisError, Result};
pub use pipeline::{analyze_event, EventAnalysis};
