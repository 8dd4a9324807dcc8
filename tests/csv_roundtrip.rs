/// End-to-end run from CSV text to the output table.
///
/// Run with: cargo test --test csv_roundtrip -- --nocapture

use lapcluster::{analyze_event, data, AnalysisConfig, Mode};

const EVENT: &str = "Bahrain Grand Prix";

fn season_csv() -> String {
    let mut csv = String::from(
        "Driver,Team,LapNumber,LapTime,LapStartTime,Sector1Time,Sector2Time,Sector3Time,Compound,TyreLife,FreshTyre,Stint,IsPersonalBest,SpeedST,IsAccurate,Position,TrackStatus,RoundNumber,EventName,Country,Year\n",
    );
    let drivers = [("VER", "Red Bull Racing"), ("NOR", "McLaren"), ("LEC", "Ferrari"), ("RUS", "Mercedes")];
    for (d, (driver, team)) in drivers.iter().enumerate() {
        for lap in 1..=10u32 {
            let s1 = 29.0 + d as f64 * 0.2 + lap as f64 * 0.03;
            let s2 = 38.0 + (lap % 3) as f64 * 0.1;
            let s3 = 27.0 + d as f64 * 0.1;
            // lap 5 is an in-lap with a long final sector
            let s3 = if lap == 5 { s3 + 20.0 } else { s3 };
            let total = s1 + s2 + s3;
            let start = 300.0 + (lap as f64 - 1.0) * 95.0 + d as f64 * 1.5;
            let compound = if lap < 6 { "SOFT" } else { "HARD" };
            let tyre = if lap < 6 { lap } else { lap - 5 };
            csv.push_str(&format!(
                "{driver},{team},{lap}.0,{},{},{},{},{},{compound},{tyre}.0,True,1.0,False,{:.1},True,{}.0,1,1,{EVENT},Bahrain,2025\n",
                secs(total),
                secs(start),
                secs(s1),
                secs(s2),
                secs(s3),
                310.0 - lap as f64 * 0.4 + d as f64,
                d + 1,
            ));
        }
    }
    // another event in the same season file
    csv.push_str(&format!(
        "VER,Red Bull Racing,1.0,{},{},{},{},{},MEDIUM,1.0,True,1.0,False,300.0,True,1.0,1,2,Saudi Arabian Grand Prix,Saudi Arabia,2025\n",
        secs(90.0),
        secs(300.0),
        secs(30.0),
        secs(30.0),
        secs(30.0),
    ));
    csv
}

fn secs(total: f64) -> String {
    let h = (total / 3600.0).floor();
    let m = ((total - h * 3600.0) / 60.0).floor();
    let s = total - h * 3600.0 - m * 60.0;
    format!("0 days {:02}:{:02}:{:09.6}", h as u32, m as u32, s)
}

fn weather_csv() -> String {
    let mut csv = String::from("Time,AirTemp,TrackTemp,Humidity,Rainfall,WindSpeed,WindDirection\n");
    for k in 0..25 {
        let t = k as f64 * 60.0;
        csv.push_str(&format!("{},24.0,{:.1},40.0,False,{:.1},200\n", secs(t), 31.0 + k as f64 * 0.1, 2.0 + (k % 4) as f64));
    }
    csv
}

#[test]
fn test_fixed_mode_end_to_end() {
    let config = AnalysisConfig { event: EVENT.to_string(), ..Default::default() };
    let season = data::read_laps(season_csv().as_bytes()).unwrap();
    let weather = data::read_weather(weather_csv().as_bytes(), EVENT).unwrap();
    assert_eq!(season.len(), 41);
    assert_eq!(weather.len(), 25);

    let analysis = analyze_event(&season, &weather, &config).unwrap();
    assert_eq!(analysis.dataset.len(), 40);
    assert_eq!(analysis.n_clusters, 5);
    assert!(analysis.dataset.rows.iter().all(|r| r.cluster < 5));
    println!("explained variance {:?}", analysis.explained_variance_ratio);

    let mut out = Vec::new();
    analysis.dataset.write_csv(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "kmeans_labels,Driver,LapNumber,Team,LapTime_Sec,Position,Sector1Time_Sec,Sector2Time_Sec,Sector3Time_Sec,TyreLife,TrackTemp,SpeedST,Compound_Num,pca_x,pca_y"
    );
    assert_eq!(lines.count(), 40);
}

#[test]
fn test_adaptive_mode_drops_in_laps() {
    let config = AnalysisConfig { event: EVENT.to_string(), mode: Mode::Adaptive, ..Default::default() };
    let season = data::read_laps(season_csv().as_bytes()).unwrap();
    let weather = data::read_weather(weather_csv().as_bytes(), EVENT).unwrap();

    let analysis = analyze_event(&season, &weather, &config).unwrap();
    // the four in-laps are ~20 s slow, well past 1.10x the median
    assert_eq!(analysis.dataset.len(), 36);
    assert!(analysis.dataset.rows.iter().all(|r| r.lap_number != Some(5)));
    assert!(analysis.dataset.columns.contains(&"Compound".to_string()));
    assert!(analysis.dataset.columns.contains(&"WindSpeed".to_string()));
    assert!(analysis.dataset.rows.iter().all(|r| r.compound.is_some()));

    let hard = analysis.degradation.iter().find(|f| f.compound == "HARD");
    assert!(hard.is_some());
}
