//! Nearest-time join of laps against weather polls.

use tracing::debug;

use crate::data::{LapRecord, WeatherSample};
use crate::error::{AnalysisError, Result};

/// A lap together with the weather sample closest to its start time.
///
/// The weather fields are copies taken from the matched sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedLapRecord {
    pub lap: LapRecord,
    pub weather_time: f64,
    pub air_temp: Option<f64>,
    pub track_temp: Option<f64>,
    pub humidity: Option<f64>,
    pub rainfall: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
}

impl MergedLapRecord {
    fn new(lap: LapRecord, w: &WeatherSample) -> Self {
        Self {
            lap,
            weather_time: w.time,
            air_temp: w.air_temp,
            track_temp: w.track_temp,
            humidity: w.humidity,
            rainfall: w.rainfall,
            wind_speed: w.wind_speed,
            wind_direction: w.wind_direction,
        }
    }
}

/// Index of the sample nearest to `t` in `sorted` (ascending by time).
///
/// Equidistant neighbours resolve to the earlier sample; duplicate
/// timestamps resolve to the first of the run.
pub fn nearest_index(sorted: &[WeatherSample], t: f64) -> Option<usize> {
    if sorted.is_empty() {
        return None;
    }
    // first sample at or after t
    let after = sorted.partition_point(|w| w.time < t);
    if after == 0 {
        return Some(0);
    }
    let before = after - 1;
    let pick_before = after == sorted.len() || t - sorted[before].time <= sorted[after].time - t;
    if !pick_before {
        return Some(after);
    }
    let before_time = sorted[before].time;
    Some(sorted.partition_point(|w| w.time < before_time))
}

/// Merge every lap with its nearest weather sample.
///
/// Laps come back sorted by start time (stable). An empty weather sequence
/// is an error for the event rather than a merge with blanks.
pub fn align_laps(laps: Vec<LapRecord>, weather: &[WeatherSample], event: &str) -> Result<Vec<MergedLapRecord>> {
    if weather.is_empty() {
        return Err(AnalysisError::MissingWeather { event: event.to_string() });
    }
    if let Some(w) = weather.iter().find(|w| !w.time.is_finite()) {
        return Err(AnalysisError::InvalidRecord(format!("weather sample with non-finite time {}", w.time)));
    }
    if let Some(l) = laps.iter().find(|l| !l.lap_start_time.is_finite()) {
        return Err(AnalysisError::InvalidRecord(format!(
            "lap {:?} of {} has non-finite start time",
            l.lap_number, l.driver
        )));
    }

    let mut samples = weather.to_vec();
    samples.sort_by(|a, b| a.time.total_cmp(&b.time));

    let mut laps = laps;
    laps.sort_by(|a, b| a.lap_start_time.total_cmp(&b.lap_start_time));

    let merged: Vec<MergedLapRecord> = laps
        .into_iter()
        .map(|lap| {
            // samples is non-empty, so there is always a match
            let idx = nearest_index(&samples, lap.lap_start_time).unwrap_or(0);
            MergedLapRecord::new(lap, &samples[idx])
        })
        .collect();

    debug!("aligned {} laps against {} weather samples", merged.len(), samples.len());
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: f64, track_temp: f64) -> WeatherSample {
        WeatherSample { time, track_temp: Some(track_temp), ..Default::default() }
    }

    fn lap(driver: &str, start: f64) -> LapRecord {
        LapRecord { driver: driver.to_string(), lap_start_time: start, ..Default::default() }
    }

    #[test]
    fn test_nearest_looks_both_ways() {
        let samples = vec![sample(0.0, 30.0), sample(60.0, 31.0), sample(120.0, 32.0)];
        // closer to the later sample: a backward-only join would pick 60.0
        assert_eq!(nearest_index(&samples, 110.0), Some(2));
        assert_eq!(nearest_index(&samples, 70.0), Some(1));
        assert_eq!(nearest_index(&samples, -5.0), Some(0));
        assert_eq!(nearest_index(&samples, 500.0), Some(2));
    }

    #[test]
    fn test_nearest_tie_prefers_earlier() {
        let samples = vec![sample(0.0, 30.0), sample(60.0, 31.0)];
        assert_eq!(nearest_index(&samples, 30.0), Some(0));

        let dup = vec![sample(0.0, 30.0), sample(10.0, 31.0), sample(10.0, 32.0)];
        assert_eq!(nearest_index(&dup, 10.0), Some(1));
        assert_eq!(nearest_index(&dup, 12.0), Some(1));
    }

    #[test]
    fn test_nearest_is_minimal_distance() {
        let samples: Vec<WeatherSample> =
            [3.0, 7.5, 8.0, 19.0, 40.0, 41.0, 90.0].iter().map(|t| sample(*t, 0.0)).collect();
        let mut t = -10.0;
        while t < 100.0 {
            let idx = nearest_index(&samples, t).unwrap();
            let d = (samples[idx].time - t).abs();
            for (j, other) in samples.iter().enumerate() {
                let od = (other.time - t).abs();
                assert!(od > d || (od == d && j >= idx), "t={t} picked {idx}, {j} is closer or earlier");
            }
            t += 0.25;
        }
    }

    #[test]
    fn test_align_keeps_every_lap() {
        let laps = vec![lap("B", 95.0), lap("A", 10.0), lap("C", 10.0), lap("D", 400.0)];
        let weather = vec![sample(120.0, 33.0), sample(0.0, 30.0), sample(60.0, 31.0)];
        let merged = align_laps(laps, &weather, "Test GP").unwrap();

        assert_eq!(merged.len(), 4);
        let order: Vec<&str> = merged.iter().map(|m| m.lap.driver.as_str()).collect();
        assert_eq!(order, vec!["A", "C", "B", "D"]);
        assert_eq!(merged[0].track_temp, Some(30.0));
        assert_eq!(merged[2].weather_time, 120.0);
        assert_eq!(merged[3].track_temp, Some(33.0));
    }

    #[test]
    fn test_align_without_weather_fails() {
        let err = align_laps(vec![lap("A", 1.0)], &[], "Test GP").unwrap_err();
        assert!(matches!(err, AnalysisError::MissingWeather { .. }));
    }
}
