use anyhow::Result;
use chrono::{TimeZone, Utc};
use opensky_agent::app::report::{extract_telemetry, SUMMARY_FILE, TELEMETRY_FILE};
use opensky_agent::core::agent::StopReason;
use opensky_agent::core::landing::Grade;
use opensky_agent::core::tracker::FlightPhase;
use opensky_agent::domain::model::{TelemetrySnapshot, TimedSnapshot};
use opensky_agent::domain::record::TelemetryRecorder;
use opensky_agent::{AgentConfig, LocalStorage, ReplaySource, ReportWriter, TrackingAgent};
use std::io::Read;
use tempfile::TempDir;

/// 一趟完整的起落：滑行、爬升、巡航、下降、落地、停機
fn circuit() -> Vec<TimedSnapshot> {
    let mut snapshot = TelemetrySnapshot {
        latitude: 25.08,
        longitude: 121.23,
        fuel_total_lbs: 10_000.0,
        parking_brake: true,
        engines_running: [true, true, false, false],
        ..Default::default()
    };
    let mut t = 0;
    let mut samples = Vec::new();
    let mut step = |seconds: i64, change: &dyn Fn(&mut TelemetrySnapshot)| {
        t += seconds;
        change(&mut snapshot);
        let at = Utc.timestamp_opt(1_700_000_000 + t, 0).unwrap();
        samples.push(TimedSnapshot::new(at, snapshot.clone()));
    };

    step(1, &|_| {});
    step(60, &|s| {
        s.parking_brake = false;
        s.ground_speed_kts = 12.0;
    });
    step(300, &|s| {
        s.indicated_airspeed_kts = 80.0;
        s.ground_speed_kts = 80.0;
    });
    step(20, &|s| {
        s.on_ground = false;
        s.vertical_speed_fpm = 1_800.0;
        s.altitude_agl_ft = 200.0;
        s.altitude_ft = 300.0;
        s.latitude += 0.01;
        s.fuel_total_lbs -= 300.0;
    });
    step(600, &|s| {
        s.altitude_agl_ft = 20_000.0;
        s.altitude_ft = 20_100.0;
        s.vertical_speed_fpm = 0.0;
        s.latitude += 0.3;
        s.fuel_total_lbs -= 1_000.0;
    });
    step(900, &|s| {
        s.vertical_speed_fpm = -1_500.0;
        s.altitude_agl_ft = 8_000.0;
        s.latitude += 0.3;
    });
    step(600, &|s| {
        s.vertical_speed_fpm = -700.0;
        s.altitude_agl_ft = 1_000.0;
        s.latitude += 0.1;
        s.fuel_total_lbs -= 500.0;
    });
    step(60, &|s| {
        s.vertical_speed_fpm = -140.0;
        s.altitude_agl_ft = 5.0;
        s.ground_speed_kts = 130.0;
    });
    step(1, &|s| {
        s.on_ground = true;
        s.vertical_speed_fpm = -120.0;
        s.g_force = 1.2;
        s.altitude_agl_ft = 0.0;
    });
    step(20, &|s| {
        s.vertical_speed_fpm = 0.0;
        s.g_force = 1.0;
        s.ground_speed_kts = 20.0;
        s.indicated_airspeed_kts = 20.0;
    });
    step(120, &|s| {
        s.ground_speed_kts = 0.0;
        s.parking_brake = true;
        s.engines_running = [false; 4];
    });
    // 抵達後的資料不應被處理
    step(60, &|s| s.engines_running = [true, false, false, false]);
    step(60, &|s| s.parking_brake = false);

    samples
}

fn write_circuit(dir: &TempDir) -> Result<String> {
    let path = dir.path().join("recorded.csv");
    std::fs::write(&path, TelemetryRecorder::encode(&circuit())?)?;
    Ok(path.display().to_string())
}

fn output_config(dir: &TempDir, compression: bool) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.output.path = dir.path().display().to_string();
    config.output.compression = compression;
    config
}

#[tokio::test]
async fn test_replay_stops_on_arrival_and_writes_report() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let recorded = write_circuit(&input)?;

    let source = ReplaySource::from_path(recorded, None);
    let log = TrackingAgent::new(source, true, 3).with_aircraft("B738").run().await?;

    assert_eq!(log.stop_reason, StopReason::Arrived);
    assert_eq!(log.summary.samples, circuit().len() - 2);
    assert_eq!(log.summary.final_phase, FlightPhase::Arrived);
    assert_eq!(log.summary.landings.len(), 1);
    assert_eq!(log.summary.landings[0].grade.grade, Grade::A);
    assert!(log.id.starts_with("replay-20231114-"));

    let config = output_config(&output, false);
    let writer = ReportWriter::new(LocalStorage::new(config.output.path.clone()), config);
    let locations = writer.write(&log).await?;
    assert_eq!(locations.len(), 2);

    let flight_dir = output.path().join(&log.id);
    let summary: serde_json::Value = serde_json::from_slice(&std::fs::read(flight_dir.join(SUMMARY_FILE))?)?;
    assert_eq!(summary["aircraft"], "B738");
    assert_eq!(summary["stop_reason"], "arrived");
    assert_eq!(summary["summary"]["landings"][0]["grade"]["grade"], "A");
    assert_eq!(summary["summary"]["landings"][0]["grade"]["limiting"], serde_json::json!([]));

    // 寫出的 CSV 可再重播，得到相同的落地結果
    let replayed = TrackingAgent::new(ReplaySource::from_path(flight_dir.join(TELEMETRY_FILE), None), false, 3)
        .run()
        .await?;
    assert_eq!(replayed.stop_reason, StopReason::EndOfStream);
    assert_eq!(replayed.summary.samples, log.summary.samples);
    assert_eq!(replayed.telemetry, log.telemetry);
    assert_eq!(replayed.summary.landings, log.summary.landings);
    Ok(())
}

#[tokio::test]
async fn test_zip_flight_log() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let recorded = write_circuit(&input)?;

    let log = TrackingAgent::new(ReplaySource::from_path(recorded, None), true, 3)
        .run()
        .await?;

    let config = output_config(&output, true);
    let writer = ReportWriter::new(LocalStorage::new(config.output.path.clone()), config);
    let locations = writer.write(&log).await?;
    assert_eq!(locations.len(), 1);
    assert!(locations[0].ends_with(".zip"));

    let archive = std::fs::read(output.path().join(format!("{}.zip", log.id)))?;
    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(archive.as_slice()))?;
    assert_eq!(zip.len(), 2);

    let mut json = String::new();
    zip.by_name(SUMMARY_FILE)?.read_to_string(&mut json)?;
    let summary: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(summary["id"], log.id.as_str());

    let csv = extract_telemetry(&archive)?;
    assert_eq!(csv, writer.read_telemetry(&log.id).await?);
    let source = ReplaySource::from_reader(csv.as_slice(), None)?;
    assert_eq!(source.remaining(), log.summary.samples);
    Ok(())
}
