use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{AnalysisError, Result};

// column names as they come out of the season download
#[derive(Debug, Deserialize)]
struct RawLapRow {
    #[serde(rename = "Driver")] driver: String,
    #[serde(rename = "Team")] team: Option<String>,
    #[serde(rename = "LapNumber")] lap_number: Option<f64>,
    #[serde(rename = "LapTime")] lap_time: Option<String>,
    #[serde(rename = "LapStartTime")] lap_start_time: Option<String>,
    #[serde(rename = "Sector1Time")] sector1_time: Option<String>,
    #[serde(rename = "Sector2Time")] sector2_time: Option<String>,
    #[serde(rename = "Sector3Time")] sector3_time: Option<String>,
    #[serde(rename = "Compound")] compound: Option<String>,
    #[serde(rename = "TyreLife")] tyre_life: Option<f64>,
    #[serde(rename = "FreshTyre")] fresh_tyre: Option<String>,
    #[serde(rename = "Stint")] stint: Option<f64>,
    #[serde(rename = "IsPersonalBest")] is_personal_best: Option<String>,
    #[serde(rename = "SpeedST")] speed_trap: Option<f64>,
    #[serde(rename = "IsAccurate")] is_accurate: Option<String>,
    #[serde(rename = "Position")] position: Option<f64>,
    #[serde(rename = "TrackStatus")] track_status: Option<String>,
    #[serde(rename = "RoundNumber")] round: Option<f64>,
    #[serde(rename = "EventName")] event_name: String,
    #[serde(rename = "Country")] country: Option<String>,
    #[serde(rename = "Year")] year: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawWeatherRow {
    #[serde(rename = "Time")] time: String,
    #[serde(rename = "AirTemp")] air_temp: Option<f64>,
    #[serde(rename = "TrackTemp")] track_temp: Option<f64>,
    #[serde(rename = "Humidity")] humidity: Option<f64>,
    #[serde(rename = "Rainfall")] rainfall: Option<String>,
    #[serde(rename = "WindSpeed")] wind_speed: Option<f64>,
    #[serde(rename = "WindDirection")] wind_direction: Option<f64>,
    #[serde(rename = "EventName", default)] event_name: Option<String>,
}

/// One lap of one driver within a race session.
///
/// Timing fields are already converted to seconds; `None` means the source
/// value was absent or could not be parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LapRecord {
    pub driver: String,
    pub team: String,
    pub lap_number: Option<u32>,
    /// seconds since session start
    pub lap_start_time: f64,
    pub lap_time: Option<f64>,
    pub sector_times: [Option<f64>; 3],
    pub compound: Option<String>,
    pub tyre_life: Option<f64>,
    pub fresh_tyre: Option<bool>,
    pub stint: Option<u32>,
    pub is_personal_best: Option<bool>,
    pub speed_trap: Option<f64>,
    pub is_accurate: Option<bool>,
    pub position: Option<f64>,
    pub track_status: Option<String>,
    pub round: Option<u32>,
    pub event_name: String,
    pub country: String,
    pub year: Option<u32>,
}

/// One weather poll within a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSample {
    /// seconds since session start
    pub time: f64,
    pub air_temp: Option<f64>,
    pub track_temp: Option<f64>,
    pub humidity: Option<f64>,
    pub rainfall: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
}

/// Parse a duration into total seconds.
///
/// Accepts pandas timedelta text (`0 days 00:01:32.123000`), clock text
/// (`01:32.123`, `00:01:32.123`) and plain seconds (`92.123`).
pub fn parse_duration_secs(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nat") || s.eq_ignore_ascii_case("nan") {
        return None;
    }

    let (days, clock) = match s.split_once("day") {
        Some((d, rest)) => {
            let days: f64 = d.trim().parse().ok()?;
            // "days" or "day"
            (days, rest.trim_start_matches('s').trim())
        }
        None => (0.0, s),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let mut secs = 0.0;
    for part in &parts {
        let v: f64 = part.trim().parse().ok()?;
        secs = secs * 60.0 + v;
    }
    let total = days * 86_400.0 + secs;
    total.is_finite().then_some(total)
}

/// `True`/`False` as written by pandas, plus the usual lowercase and 0/1 spellings.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" => Some(true),
        "false" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

// rainfall is a flag in FastF1 but some feeds report an amount
fn parse_rainfall(raw: &str) -> Option<f64> {
    parse_flag(raw)
        .map(|b| if b { 1.0 } else { 0.0 })
        .or_else(|| raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
}

fn to_count(v: Option<f64>) -> Option<u32> {
    v.filter(|v| v.is_finite() && *v >= 0.0).map(|v| v.round() as u32)
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl LapRecord {
    fn from_raw(raw: RawLapRow, line: usize) -> Result<Self> {
        let lap_start_time = raw
            .lap_start_time
            .as_deref()
            .and_then(parse_duration_secs)
            .ok_or_else(|| {
                AnalysisError::InvalidRecord(format!(
                    "lap row {line} ({} lap {:?}) has no usable LapStartTime",
                    raw.driver, raw.lap_number
                ))
            })?;
        let duration = |v: &Option<String>| v.as_deref().and_then(parse_duration_secs);
        let flag = |v: &Option<String>| v.as_deref().and_then(parse_flag);

        Ok(LapRecord {
            lap_number: to_count(raw.lap_number),
            lap_start_time,
            lap_time: duration(&raw.lap_time),
            sector_times: [
                duration(&raw.sector1_time),
                duration(&raw.sector2_time),
                duration(&raw.sector3_time),
            ],
            compound: non_empty(raw.compound),
            tyre_life: raw.tyre_life.filter(|v| v.is_finite()),
            fresh_tyre: flag(&raw.fresh_tyre),
            stint: to_count(raw.stint),
            is_personal_best: flag(&raw.is_personal_best),
            speed_trap: raw.speed_trap.filter(|v| v.is_finite()),
            is_accurate: flag(&raw.is_accurate),
            position: raw.position.filter(|v| v.is_finite()),
            track_status: non_empty(raw.track_status),
            round: to_count(raw.round),
            year: to_count(raw.year),
            driver: raw.driver,
            team: raw.team.unwrap_or_default(),
            event_name: raw.event_name,
            country: raw.country.unwrap_or_default(),
        })
    }
}

impl WeatherSample {
    fn from_raw(raw: RawWeatherRow, line: usize) -> Result<Self> {
        let time = parse_duration_secs(&raw.time).ok_or_else(|| {
            AnalysisError::InvalidRecord(format!("weather row {line} has unusable Time '{}'", raw.time))
        })?;
        Ok(WeatherSample {
            time,
            air_temp: raw.air_temp,
            track_temp: raw.track_temp,
            humidity: raw.humidity,
            rainfall: raw.rainfall.as_deref().and_then(parse_rainfall),
            wind_speed: raw.wind_speed,
            wind_direction: raw.wind_direction,
        })
    }
}

/// Read a season lap table.
pub fn read_laps<R: Read>(reader: R) -> Result<Vec<LapRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut laps = Vec::new();
    for (i, res) in reader.deserialize().enumerate() {
        let raw: RawLapRow = res?;
        laps.push(LapRecord::from_raw(raw, i + 1)?);
    }
    debug!("read {} lap rows", laps.len());
    Ok(laps)
}

pub fn load_laps<P: AsRef<Path>>(path: P) -> Result<Vec<LapRecord>> {
    read_laps(std::fs::File::open(path)?)
}

/// Read a session weather table. When the table carries an `EventName`
/// column, only rows of `event` are kept.
pub fn read_weather<R: Read>(reader: R, event: &str) -> Result<Vec<WeatherSample>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut samples = Vec::new();
    for (i, res) in reader.deserialize().enumerate() {
        let raw: RawWeatherRow = res?;
        if raw.event_name.as_deref().is_some_and(|e| !e.is_empty() && e != event) {
            continue;
        }
        samples.push(WeatherSample::from_raw(raw, i + 1)?);
    }
    debug!("read {} weather rows for '{}'", samples.len(), event);
    Ok(samples)
}

pub fn load_weather<P: AsRef<Path>>(path: P, event: &str) -> Result<Vec<WeatherSample>> {
    read_weather(std::fs::File::open(path)?, event)
}

/// Laps of a single event, in input order.
pub fn laps_for_event(laps: &[LapRecord], event: &str) -> Result<Vec<LapRecord>> {
    let selected: Vec<LapRecord> = laps.iter().filter(|l| l.event_name == event).cloned().collect();
    if selected.is_empty() {
        return Err(AnalysisError::UnknownEvent(event.to_string()));
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_formats() {
        let secs = parse_duration_secs("0 days 00:01:32.123000").unwrap();
        assert!((secs - 92.123).abs() < 1e-9);
        assert_eq!(parse_duration_secs("1 day 00:00:01"), Some(86_401.0));
        assert_eq!(parse_duration_secs("01:32.5"), Some(92.5));
        assert_eq!(parse_duration_secs("00:01:32.5"), Some(92.5));
        assert_eq!(parse_duration_secs("31.25"), Some(31.25));
    }

    #[test]
    fn test_parse_duration_missing() {
        assert_eq!(parse_duration_secs(""), None);
        assert_eq!(parse_duration_secs("NaT"), None);
        assert_eq!(parse_duration_secs("fast"), None);
        assert_eq!(parse_duration_secs("1:2:3:4"), None);
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_rainfall("True"), Some(1.0));
        assert_eq!(parse_rainfall("0.4"), Some(0.4));
    }

    const LAPS_CSV: &str = "\
Driver,Team,LapNumber,LapTime,LapStartTime,Sector1Time,Sector2Time,Sector3Time,Compound,TyreLife,FreshTyre,Stint,IsPersonalBest,SpeedST,IsAccurate,Position,TrackStatus,RoundNumber,EventName,Country,Year
VER,Red Bull Racing,1.0,0 days 00:01:35.000000,0 days 01:02:03.000000,0 days 00:00:30.000000,,0 days 00:00:35.000000,MEDIUM,1.0,True,1.0,False,305.2,True,1.0,1,1,Australian Grand Prix,Australia,2025
NOR,McLaren,1.0,NaT,0 days 01:02:04.500000,0 days 00:00:30.500000,0 days 00:00:29.000000,0 days 00:00:35.500000,SOFT,3.0,False,1.0,False,,False,2.0,1,1,Australian Grand Prix,Australia,2025
";

    #[test]
    fn test_read_laps() {
        let laps = read_laps(LAPS_CSV.as_bytes()).unwrap();
        assert_eq!(laps.len(), 2);

        let ver = &laps[0];
        assert_eq!(ver.driver, "VER");
        assert_eq!(ver.lap_number, Some(1));
        assert_eq!(ver.lap_time, Some(95.0));
        assert_eq!(ver.lap_start_time, 3723.0);
        assert_eq!(ver.sector_times, [Some(30.0), None, Some(35.0)]);
        assert_eq!(ver.fresh_tyre, Some(true));
        assert_eq!(ver.year, Some(2025));

        let nor = &laps[1];
        assert_eq!(nor.lap_time, None);
        assert_eq!(nor.speed_trap, None);
        assert_eq!(nor.compound.as_deref(), Some("SOFT"));
    }

    #[test]
    fn test_read_laps_without_start_time_fails() {
        let csv = LAPS_CSV.replace("0 days 01:02:03.000000", "NaT");
        assert!(matches!(read_laps(csv.as_bytes()), Err(AnalysisError::InvalidRecord(_))));
    }

    #[test]
    fn test_read_weather_filters_event() {
        let csv = "\
Time,AirTemp,TrackTemp,Humidity,Rainfall,WindSpeed,WindDirection,EventName
0 days 00:00:10,20.1,30.5,55.0,False,1.2,180,Australian Grand Prix
0 days 00:01:10,20.2,30.7,55.0,False,1.4,185,Chinese Grand Prix
";
        let samples = read_weather(csv.as_bytes(), "Australian Grand Prix").unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].time, 10.0);
        assert_eq!(samples[0].rainfall, Some(0.0));
    }

    #[test]
    fn test_laps_for_unknown_event() {
        let laps = read_laps(LAPS_CSV.as_bytes()).unwrap();
        assert_eq!(laps_for_event(&laps, "Australian Grand Prix").unwrap().len(), 2);
        assert!(matches!(
            laps_for_event(&laps, "Monaco Grand Prix"),
            Err(AnalysisError::UnknownEvent(_))
        ));
    }
}
