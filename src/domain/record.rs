use crate::domain::model::{
    FuelQuantities, FuelTank, Light, Lights, TelemetrySnapshot, TimedSnapshot, MAX_ENGINES, MAX_PAYLOAD_STATIONS,
};
use crate::utils::error::{AgentError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `telemetry.csv` 的一列。紀錄與重播共用此格式。
///
/// 快照的每個欄位都有對應欄位；油箱各自一欄，引擎與燈光存成位元遮罩，
/// 酬載站位以 `;` 串接成單一欄。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRow {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: f64,
    pub altitude_agl_ft: f64,
    pub heading_true: f64,
    pub heading_magnetic: f64,
    pub indicated_airspeed_kts: f64,
    pub true_airspeed_kts: f64,
    pub ground_speed_kts: f64,
    pub vertical_speed_fpm: f64,
    pub bank_angle_deg: f64,
    pub pitch_angle_deg: f64,
    pub sideslip_deg: f64,
    pub g_force: f64,
    pub on_ground: bool,
    pub wind_direction_deg: f64,
    pub wind_speed_kts: f64,
    pub fuel_total_lbs: f64,
    pub fuel_weight_per_gallon: f64,
    pub fuel_left_main_lbs: f64,
    pub fuel_right_main_lbs: f64,
    pub fuel_left_aux_lbs: f64,
    pub fuel_right_aux_lbs: f64,
    pub fuel_left_tip_lbs: f64,
    pub fuel_right_tip_lbs: f64,
    pub fuel_center_lbs: f64,
    pub fuel_center2_lbs: f64,
    pub fuel_center3_lbs: f64,
    pub fuel_external1_lbs: f64,
    pub fuel_external2_lbs: f64,
    pub payload_total_lbs: f64,
    #[serde(with = "station_list")]
    pub payload_stations_lbs: Vec<f64>,
    pub gross_weight_lbs: f64,
    pub parking_brake: bool,
    pub gear_down: bool,
    pub flaps_percent: f64,
    /// 引擎運轉位元遮罩，bit 0 = 一號引擎
    pub engines_running: u8,
    /// 燈光位元遮罩，順序同 `Light::ALL`
    pub lights: u8,
    pub paused: bool,
    pub sim_rate: f64,
    pub crashed: bool,
}

mod station_list {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(stations: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let joined: Vec<String> = stations.iter().map(|lbs| lbs.to_string()).collect();
        serializer.serialize_str(&joined.join(";"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.split(';')
            .filter(|part| !part.trim().is_empty())
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|e| de::Error::custom(format!("invalid payload station '{}': {}", part, e)))
            })
            .collect()
    }
}

fn to_mask<I: Iterator<Item = bool>>(flags: I) -> u8 {
    flags
        .enumerate()
        .filter(|(_, on)| *on)
        .fold(0u8, |mask, (i, _)| mask | (1 << i))
}

impl From<&TimedSnapshot> for TelemetryRow {
    fn from(sample: &TimedSnapshot) -> Self {
        let s = &sample.snapshot;
        let tanks = &s.fuel_tanks;

        Self {
            timestamp: sample.at,
            latitude: s.latitude,
            longitude: s.longitude,
            altitude_ft: s.altitude_ft,
            altitude_agl_ft: s.altitude_agl_ft,
            heading_true: s.heading_true,
            heading_magnetic: s.heading_magnetic,
            indicated_airspeed_kts: s.indicated_airspeed_kts,
            true_airspeed_kts: s.true_airspeed_kts,
            ground_speed_kts: s.ground_speed_kts,
            vertical_speed_fpm: s.vertical_speed_fpm,
            bank_angle_deg: s.bank_angle_deg,
            pitch_angle_deg: s.pitch_angle_deg,
            sideslip_deg: s.sideslip_deg,
            g_force: s.g_force,
            on_ground: s.on_ground,
            wind_direction_deg: s.wind_direction_deg,
            wind_speed_kts: s.wind_speed_kts,
            fuel_total_lbs: s.fuel_total_lbs,
            fuel_weight_per_gallon: s.fuel_weight_per_gallon,
            fuel_left_main_lbs: tanks.left_main,
            fuel_right_main_lbs: tanks.right_main,
            fuel_left_aux_lbs: tanks.left_aux,
            fuel_right_aux_lbs: tanks.right_aux,
            fuel_left_tip_lbs: tanks.left_tip,
            fuel_right_tip_lbs: tanks.right_tip,
            fuel_center_lbs: tanks.center,
            fuel_center2_lbs: tanks.center2,
            fuel_center3_lbs: tanks.center3,
            fuel_external1_lbs: tanks.external1,
            fuel_external2_lbs: tanks.external2,
            payload_total_lbs: s.payload_total_lbs,
            payload_stations_lbs: s.payload_stations.clone(),
            gross_weight_lbs: s.gross_weight_lbs,
            parking_brake: s.parking_brake,
            gear_down: s.gear_down,
            flaps_percent: s.flaps_percent,
            engines_running: to_mask(s.engines_running.iter().copied()),
            lights: to_mask(Light::ALL.iter().map(|light| s.lights.get(*light))),
            paused: s.paused,
            sim_rate: s.sim_rate,
            crashed: s.crashed,
        }
    }
}

impl From<TelemetryRow> for TimedSnapshot {
    fn from(row: TelemetryRow) -> Self {
        let mut engines_running = [false; MAX_ENGINES];
        for (i, running) in engines_running.iter_mut().enumerate() {
            *running = row.engines_running & (1 << i) != 0;
        }

        let mut lights = Lights::default();
        for (i, light) in Light::ALL.iter().enumerate() {
            lights.set(*light, row.lights & (1 << i) != 0);
        }

        let mut fuel_tanks = FuelQuantities::default();
        for (tank, lbs) in [
            (FuelTank::LeftMain, row.fuel_left_main_lbs),
            (FuelTank::RightMain, row.fuel_right_main_lbs),
            (FuelTank::LeftAux, row.fuel_left_aux_lbs),
            (FuelTank::RightAux, row.fuel_right_aux_lbs),
            (FuelTank::LeftTip, row.fuel_left_tip_lbs),
            (FuelTank::RightTip, row.fuel_right_tip_lbs),
            (FuelTank::Center, row.fuel_center_lbs),
            (FuelTank::Center2, row.fuel_center2_lbs),
            (FuelTank::Center3, row.fuel_center3_lbs),
            (FuelTank::External1, row.fuel_external1_lbs),
            (FuelTank::External2, row.fuel_external2_lbs),
        ] {
            fuel_tanks.set(tank, lbs);
        }

        let mut payload_stations = row.payload_stations_lbs;
        payload_stations.truncate(MAX_PAYLOAD_STATIONS);

        let snapshot = TelemetrySnapshot {
            latitude: row.latitude,
            longitude: row.longitude,
            altitude_ft: row.altitude_ft,
            altitude_agl_ft: row.altitude_agl_ft,
            heading_true: row.heading_true,
            heading_magnetic: row.heading_magnetic,
            indicated_airspeed_kts: row.indicated_airspeed_kts,
            true_airspeed_kts: row.true_airspeed_kts,
            ground_speed_kts: row.ground_speed_kts,
            vertical_speed_fpm: row.vertical_speed_fpm,
            bank_angle_deg: row.bank_angle_deg,
            pitch_angle_deg: row.pitch_angle_deg,
            sideslip_deg: row.sideslip_deg,
            g_force: row.g_force,
            on_ground: row.on_ground,
            wind_direction_deg: row.wind_direction_deg,
            wind_speed_kts: row.wind_speed_kts,
            fuel_total_lbs: row.fuel_total_lbs,
            fuel_weight_per_gallon: row.fuel_weight_per_gallon,
            fuel_tanks,
            payload_total_lbs: row.payload_total_lbs,
            payload_stations,
            gross_weight_lbs: row.gross_weight_lbs,
            parking_brake: row.parking_brake,
            gear_down: row.gear_down,
            flaps_percent: row.flaps_percent,
            engines_running,
            lights,
            paused: row.paused,
            sim_rate: row.sim_rate,
            crashed: row.crashed,
        };

        TimedSnapshot::new(row.timestamp, snapshot)
    }
}

/// 邊追蹤邊編碼 `telemetry.csv`，只保留編碼後的列
pub struct TelemetryRecorder {
    writer: csv::Writer<Vec<u8>>,
    rows: usize,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self {
            writer: csv::Writer::from_writer(Vec::new()),
            rows: 0,
        }
    }

    pub fn push(&mut self, sample: &TimedSnapshot) -> Result<()> {
        self.writer.serialize(TelemetryRow::from(sample))?;
        self.rows += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// 取回完整的 CSV 內容
    pub fn finish(self) -> Result<Vec<u8>> {
        self.writer.into_inner().map_err(|e| AgentError::IoError(e.into_error()))
    }

    /// 一次把多筆快照編碼成 CSV
    pub fn encode<'a, I: IntoIterator<Item = &'a TimedSnapshot>>(samples: I) -> Result<Vec<u8>> {
        let mut recorder = Self::new();
        for sample in samples {
            recorder.push(sample)?;
        }
        recorder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn test_engine_mask() {
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.engines_running = [true, false, true, false];
        let sample = TimedSnapshot::new(at(0), snapshot);

        let row = TelemetryRow::from(&sample);
        assert_eq!(row.engines_running, 0b0101);

        let restored = TimedSnapshot::from(row);
        assert_eq!(restored.snapshot.engines_running, [true, false, true, false]);
        assert_eq!(restored.at, sample.at);
    }

    #[test]
    fn test_recorded_csv_keeps_every_field() {
        let mut snapshot = TelemetrySnapshot {
            heading_magnetic: 52.5,
            true_airspeed_kts: 148.0,
            fuel_weight_per_gallon: 6.0,
            payload_total_lbs: 520.0,
            payload_stations: vec![170.0, 300.0, 50.0],
            ..Default::default()
        };
        snapshot.fuel_tanks.set(FuelTank::LeftMain, 80.5);
        snapshot.fuel_tanks.set(FuelTank::Center2, 12.0);
        snapshot.lights.set(Light::Beacon, true);
        snapshot.lights.set(Light::Taxi, true);
        let samples = vec![TimedSnapshot::new(at(0), snapshot.clone())];

        let csv = TelemetryRecorder::encode(&samples).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_slice());
        let rows: Vec<TelemetryRow> = reader.deserialize().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].lights, 0b10001);

        let restored = TimedSnapshot::from(rows[0].clone());
        assert_eq!(restored.snapshot, snapshot);
    }

    #[test]
    fn test_empty_payload_stations_round_trip() {
        let samples = vec![TimedSnapshot::new(at(0), TelemetrySnapshot::default())];
        let csv = TelemetryRecorder::encode(&samples).unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_slice());
        let row: TelemetryRow = reader.deserialize().next().unwrap().unwrap();
        assert!(row.payload_stations_lbs.is_empty());
    }

    #[test]
    fn test_malformed_payload_station_is_rejected() {
        let samples = vec![TimedSnapshot::new(
            at(0),
            TelemetrySnapshot {
                payload_stations: vec![1.0],
                ..Default::default()
            },
        )];
        let csv = String::from_utf8(TelemetryRecorder::encode(&samples).unwrap()).unwrap();
        let broken = csv.replacen(",1,", ",abc,", 1);
        assert_ne!(csv, broken);

        let mut reader = csv::Reader::from_reader(broken.as_bytes());
        let row: std::result::Result<TelemetryRow, _> = reader.deserialize().next().unwrap();
        assert!(row.is_err());
    }

    #[test]
    fn test_recorder_counts_rows() {
        let mut recorder = TelemetryRecorder::new();
        assert!(recorder.is_empty());
        recorder.push(&TimedSnapshot::new(at(0), TelemetrySnapshot::default())).unwrap();
        recorder.push(&TimedSnapshot::new(at(1), TelemetrySnapshot::default())).unwrap();
        assert_eq!(recorder.len(), 2);

        let csv = String::from_utf8(recorder.finish().unwrap()).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }
}
