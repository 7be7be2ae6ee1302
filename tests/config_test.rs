use approx::assert_abs_diff_eq;
use opensky_agent::core::loadsheet::{LoadSheet, LoadWarning};
use opensky_agent::core::payload::PayloadRequest;
use opensky_agent::domain::model::Simulator;
use opensky_agent::utils::validation::Validate;
use opensky_agent::{AgentConfig, AgentError};
use std::io::Write;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

const C172: &str = r#"
name = "Cessna 172 Skyhawk"
icao = "C172"
empty_weight_lbs = 1680.0
empty_arm_in = 39.0
max_gross_weight_lbs = 2450.0
cruise_speed_kts = 120.0
fuel_flow_lbs_per_hour = 60.0
taxi_fuel_lbs = 10.0
crew_weight_lbs = 170.0

[fuel_capacity]
left_main = 160.0
right_main = 160.0

[fuel_arm_in]
left_main = 48.0
right_main = 48.0

[[payload_stations]]
name = "Pilot"
max_weight_lbs = 400.0
arm_in = 37.0

[[payload_stations]]
name = "Rear passengers"
max_weight_lbs = 400.0
arm_in = 73.0

[[payload_stations]]
name = "Baggage area 1"
max_weight_lbs = 120.0
arm_in = 95.0
"#;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn config_with_aircraft(aircraft_path: &str) -> AgentConfig {
    let toml = format!(
        r#"
[agent]
simulator = "xplane"
sample_rate_hz = 10
aircraft = "{}"

[xplane]
host = "192.168.1.20"
timeout_seconds = 3

[output]
path = "./flights"
formats = ["json"]
compression = true
"#,
        aircraft_path.replace('\\', "\\\\")
    );
    let file = write_temp(&toml);
    assert_ok!(AgentConfig::from_file(file.path()))
}

#[test]
fn test_config_file_with_aircraft() {
    let aircraft = write_temp(C172);
    let config = config_with_aircraft(&aircraft.path().display().to_string());

    assert_ok!(config.validate());
    assert_eq!(config.agent.simulator, Simulator::Xplane);
    assert!(config.agent.stop_on_arrival);

    let endpoint = config.xplane_endpoint();
    assert_eq!(endpoint.host, "192.168.1.20");
    assert_eq!(endpoint.port, 49000);
    assert_eq!(endpoint.sample_rate_hz, 10);
    assert_eq!(endpoint.timeout.as_secs(), 3);

    let aircraft = assert_ok!(config.load_aircraft()).unwrap();
    assert_eq!(aircraft.icao, "C172");
    assert_eq!(aircraft.payload_stations.len(), 3);
    assert_eq!(aircraft.contingency_percent, 5.0);
}

#[test]
fn test_missing_aircraft_file_is_io_error() {
    let config = config_with_aircraft("/nonexistent/c172.toml");
    let err = assert_err!(config.load_aircraft());
    assert!(matches!(err, AgentError::IoError(_)));
}

#[test]
fn test_invalid_config_is_rejected() {
    let file = write_temp("[agent]\nsimulator = \"replay\"\n");
    let config = assert_ok!(AgentConfig::from_file(file.path()));
    let err = assert_err!(config.validate());
    assert!(matches!(err, AgentError::MissingConfigError { .. }));

    let file = write_temp("[output]\nformats = [\"xml\"]\n");
    let config = assert_ok!(AgentConfig::from_file(file.path()));
    assert_err!(config.validate());

    assert_err!(AgentConfig::from_toml_str("[agent]\nsimulator = \"fsx\"\n"));
}

#[test]
fn test_load_sheet_within_limits() {
    let aircraft = write_temp(C172);
    let config = config_with_aircraft(&aircraft.path().display().to_string());
    let aircraft = assert_ok!(config.load_aircraft()).unwrap();

    let request = PayloadRequest {
        crew_lbs: aircraft.crew_weight_lbs,
        passengers_lbs: 300.0,
        cargo_lbs: 50.0,
    };
    let sheet = assert_ok!(LoadSheet::suggest(&aircraft, 240.0, 0.0, 0.0, &request));

    // 240 nm 於 0.5 lbs/nm：trip 120、contingency 6、reserve 30、taxi 10
    assert_abs_diff_eq!(sheet.fuel_plan.block_fuel(), 166.0, epsilon = 1e-9);
    assert_abs_diff_eq!(sheet.fuel.loaded_lbs(), 166.0, epsilon = 1e-9);
    for (loaded, expected) in sheet.payload.stations.iter().zip([170.0, 300.0, 50.0]) {
        assert_abs_diff_eq!(*loaded, expected, epsilon = 1e-9);
    }
    assert_abs_diff_eq!(sheet.zero_fuel_weight_lbs, 2200.0, epsilon = 1e-9);
    assert_abs_diff_eq!(sheet.ramp_weight_lbs, 2366.0, epsilon = 1e-9);
    assert_abs_diff_eq!(sheet.takeoff_weight_lbs, 2356.0, epsilon = 1e-9);
    assert_abs_diff_eq!(sheet.landing_weight_lbs, 2236.0, epsilon = 1e-9);
    assert!(sheet.cg_in.is_some());
    assert!(sheet.is_within_limits());
}

#[test]
fn test_load_sheet_reports_overload() {
    let aircraft = assert_ok!(opensky_agent::domain::model::AircraftType::from_toml_str(C172));
    let request = PayloadRequest {
        crew_lbs: 170.0,
        passengers_lbs: 400.0,
        cargo_lbs: 200.0,
    };
    let sheet = assert_ok!(LoadSheet::suggest(&aircraft, 240.0, 0.0, 0.0, &request));

    assert_abs_diff_eq!(sheet.payload.unallocated_lbs, 80.0, epsilon = 1e-9);
    assert!(!sheet.is_within_limits());
    assert!(sheet
        .warnings
        .iter()
        .any(|w| matches!(w, LoadWarning::MaxGrossWeightExceeded { .. })));
    assert!(sheet
        .warnings
        .iter()
        .any(|w| matches!(w, LoadWarning::PayloadNotLoaded { .. })));
}

#[test]
fn test_writing_config_to_disk_then_reading_back() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("agent.toml");

    let mut config = AgentConfig::default();
    config.agent.simulator = Simulator::Msfs;
    config.msfs.channel_capacity = 16;
    std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

    let loaded = tokio_test::block_on(async { AgentConfig::from_file(&path) }).unwrap();
    assert_eq!(loaded.agent.simulator, Simulator::Msfs);
    assert_eq!(loaded.msfs.channel_capacity, 16);
    assert_ok!(loaded.validate());
}
