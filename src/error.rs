//! Error types for the lap analysis pipeline

use thiserror::Error;

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can stop the analysis of an event
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("no weather samples for event '{event}'")]
    MissingWeather { event: String },

    #[error("no laps left to analyze after {stage}")]
    EmptyPopulation { stage: &'static str },

    #[error("no laps found for event '{0}'")]
    UnknownEvent(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("k-means error: {0}")]
    KMeans(#[from] linfa_clustering::KMeansError),
}
