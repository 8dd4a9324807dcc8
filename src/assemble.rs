//! Final per-lap table: label, metadata, features, projection.
//!
//! Column order:
//! `kmeans_labels, Driver, LapNumber, Team, LapTime_Sec, Position,
//! [Compound (adaptive only)], <selected features...>, pca_x, pca_y`

use std::io::Write;
use std::path::Path;

use crate::config::Mode;
use crate::engine::EngineOutput;
use crate::error::Result;
use crate::features::FeatureTable;

#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub cluster: usize,
    pub driver: String,
    pub lap_number: Option<u32>,
    pub team: String,
    pub lap_time: Option<f64>,
    pub position: Option<f64>,
    /// raw compound label, adaptive mode only
    pub compound: Option<String>,
    pub features: Vec<f64>,
    pub pca: [f64; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisDataset {
    pub columns: Vec<String>,
    pub mode: Mode,
    pub rows: Vec<OutputRow>,
}

fn opt<T: ToString>(v: &Option<T>) -> String {
    v.as_ref().map(ToString::to_string).unwrap_or_default()
}

impl OutputRow {
    fn to_record(&self, mode: Mode) -> Vec<String> {
        let mut rec = vec![
            self.cluster.to_string(),
            self.driver.clone(),
            opt(&self.lap_number),
            self.team.clone(),
            opt(&self.lap_time),
            opt(&self.position),
        ];
        if mode == Mode::Adaptive {
            rec.push(self.compound.clone().unwrap_or_default());
        }
        rec.extend(self.features.iter().map(f64::to_string));
        rec.push(self.pca[0].to_string());
        rec.push(self.pca[1].to_string());
        rec
    }
}

/// Zip the surviving laps with their labels and coordinates. Rows keep the
/// post-filter order; row `i` of the output is row `i` of the table.
pub fn assemble(table: &FeatureTable, fit: &EngineOutput) -> AnalysisDataset {
    let mut columns: Vec<String> = ["kmeans_labels", "Driver", "LapNumber", "Team", "LapTime_Sec", "Position"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    if table.mode == Mode::Adaptive {
        columns.push("Compound".to_string());
    }
    columns.extend(table.column_names().into_iter().map(String::from));
    columns.push("pca_x".to_string());
    columns.push("pca_y".to_string());

    let rows = table
        .rows
        .iter()
        .zip(&fit.clustering.labels)
        .zip(&fit.projection.coords)
        .map(|((row, &cluster), coords)| {
            let lap = &row.record.lap;
            OutputRow {
                cluster,
                driver: lap.driver.clone(),
                lap_number: lap.lap_number,
                team: lap.team.clone(),
                lap_time: lap.lap_time,
                position: lap.position,
                compound: match table.mode {
                    Mode::Adaptive => lap.compound.clone(),
                    Mode::Fixed => None,
                },
                features: row.values.clone(),
                pca: *coords,
            }
        })
        .collect();

    AnalysisDataset { columns, mode: table.mode, rows }
}

impl AnalysisDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.to_record(self.mode))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(std::fs::File::create(path)?)
    }
}
