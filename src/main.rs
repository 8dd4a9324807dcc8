use clap::Parser;
use lapcluster::{analyze_event, data, AnalysisConfig, Mode};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Cluster and project the laps of one race weekend.
#[derive(Parser, Debug)]
#[command(name = "lapcluster", version, about)]
struct Args {
    /// Season lap table (CSV)
    #[arg(long)]
    laps: PathBuf,

    /// Weather samples of the analyzed session (CSV)
    #[arg(long)]
    weather: PathBuf,

    /// Where to write the per-lap output table
    #[arg(short, long)]
    output: PathBuf,

    /// YAML file with analysis options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Event to analyze (overrides the config file)
    #[arg(long)]
    event: Option<String>,

    #[arg(long, value_enum)]
    mode: Option<Mode>,

    #[arg(long)]
    seed: Option<u64>,
}

// Returns a Result so loading or analysis failures end the run with a message.
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_yaml(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(event) = args.event {
        config.event = event;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let season = data::load_laps(&args.laps)?;
    let weather = data::load_weather(&args.weather, &config.event)?;

    let analysis = analyze_event(&season, &weather, &config)?;

    let [pc1, pc2] = analysis.explained_variance_ratio;
    println!(
        "{}: {} laps in {} clusters (inertia {:.2})",
        config.event,
        analysis.dataset.len(),
        analysis.n_clusters,
        analysis.inertia
    );
    println!(
        "Explained variance - PC1: {:.1}%, PC2: {:.1}%, total: {:.1}%",
        pc1 * 100.0,
        pc2 * 100.0,
        analysis.explained_variance_total() * 100.0
    );
    for fit in &analysis.degradation {
        println!("- {:12} : {:+7.1} ms/lap ({} laps)", fit.compound, fit.slope_ms_per_lap(), fit.laps);
    }

    analysis.dataset.save_csv(&args.output)?;
    info!("wrote {} rows to {}", analysis.dataset.len(), args.output.display());

    Ok(())
}
