use crate::domain::conversion::Conversion;
use crate::domain::model::{FuelTank, Light, TelemetrySnapshot, MAX_ENGINES, MAX_PAYLOAD_STATIONS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 遙測模型中的目標欄位
///
/// 文字形式為 `altitude_ft`、`fuel_tank.left_main`、`payload_station.2`、
/// `engine_running.0`、`light.beacon` 等，設定檔中直接使用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TelemetryField {
    Latitude,
    Longitude,
    AltitudeFt,
    AltitudeAglFt,
    HeadingTrue,
    HeadingMagnetic,
    IndicatedAirspeed,
    TrueAirspeed,
    GroundSpeed,
    VerticalSpeed,
    BankAngle,
    PitchAngle,
    Sideslip,
    GForce,
    OnGround,
    WindDirection,
    WindSpeed,
    FuelTotal,
    FuelWeightPerGallon,
    FuelTank(FuelTank),
    PayloadTotal,
    PayloadStation(usize),
    GrossWeight,
    ParkingBrake,
    GearDown,
    FlapsPercent,
    EngineRunning(usize),
    Light(Light),
    Paused,
    SimRate,
    Crashed,
}

const SCALAR_FIELDS: [(&str, TelemetryField); 27] = [
    ("latitude", TelemetryField::Latitude),
    ("longitude", TelemetryField::Longitude),
    ("altitude_ft", TelemetryField::AltitudeFt),
    ("altitude_agl_ft", TelemetryField::AltitudeAglFt),
    ("heading_true", TelemetryField::HeadingTrue),
    ("heading_magnetic", TelemetryField::HeadingMagnetic),
    ("indicated_airspeed", TelemetryField::IndicatedAirspeed),
    ("true_airspeed", TelemetryField::TrueAirspeed),
    ("ground_speed", TelemetryField::GroundSpeed),
    ("vertical_speed", TelemetryField::VerticalSpeed),
    ("bank_angle", TelemetryField::BankAngle),
    ("pitch_angle", TelemetryField::PitchAngle),
    ("sideslip", TelemetryField::Sideslip),
    ("g_force", TelemetryField::GForce),
    ("on_ground", TelemetryField::OnGround),
    ("wind_direction", TelemetryField::WindDirection),
    ("wind_speed", TelemetryField::WindSpeed),
    ("fuel_total", TelemetryField::FuelTotal),
    ("fuel_weight_per_gallon", TelemetryField::FuelWeightPerGallon),
    ("payload_total", TelemetryField::PayloadTotal),
    ("gross_weight", TelemetryField::GrossWeight),
    ("parking_brake", TelemetryField::ParkingBrake),
    ("gear_down", TelemetryField::GearDown),
    ("flaps_percent", TelemetryField::FlapsPercent),
    ("paused", TelemetryField::Paused),
    ("sim_rate", TelemetryField::SimRate),
    ("crashed", TelemetryField::Crashed),
];

impl TelemetryField {
    /// 套用轉換後寫入快照
    pub fn store(&self, snapshot: &mut TelemetrySnapshot, raw: f64, conversion: Conversion) {
        let value = conversion.apply(raw, snapshot.fuel_weight_per_gallon);
        let flag = value > 0.5;

        match *self {
            TelemetryField::Latitude => snapshot.latitude = value,
            TelemetryField::Longitude => snapshot.longitude = value,
            TelemetryField::AltitudeFt => snapshot.altitude_ft = value,
            TelemetryField::AltitudeAglFt => snapshot.altitude_agl_ft = value,
            TelemetryField::HeadingTrue => snapshot.heading_true = value,
            TelemetryField::HeadingMagnetic => snapshot.heading_magnetic = value,
            TelemetryField::IndicatedAirspeed => snapshot.indicated_airspeed_kts = value,
            TelemetryField::TrueAirspeed => snapshot.true_airspeed_kts = value,
            TelemetryField::GroundSpeed => snapshot.ground_speed_kts = value,
            TelemetryField::VerticalSpeed => snapshot.vertical_speed_fpm = value,
            TelemetryField::BankAngle => snapshot.bank_angle_deg = value,
            TelemetryField::PitchAngle => snapshot.pitch_angle_deg = value,
            TelemetryField::Sideslip => snapshot.sideslip_deg = value,
            TelemetryField::GForce => snapshot.g_force = value,
            TelemetryField::OnGround => snapshot.on_ground = flag,
            TelemetryField::WindDirection => snapshot.wind_direction_deg = value,
            TelemetryField::WindSpeed => snapshot.wind_speed_kts = value,
            TelemetryField::FuelTotal => snapshot.fuel_total_lbs = value,
            TelemetryField::FuelWeightPerGallon => {
                // 模擬器尚未載入時可能回傳 0
                if value > 0.0 {
                    snapshot.fuel_weight_per_gallon = value;
                }
            }
            TelemetryField::FuelTank(tank) => snapshot.fuel_tanks.set(tank, value),
            TelemetryField::PayloadTotal => snapshot.payload_total_lbs = value,
            TelemetryField::PayloadStation(index) => snapshot.set_payload_station(index, value),
            TelemetryField::GrossWeight => snapshot.gross_weight_lbs = value,
            TelemetryField::ParkingBrake => snapshot.parking_brake = flag,
            TelemetryField::GearDown => snapshot.gear_down = flag,
            TelemetryField::FlapsPercent => snapshot.flaps_percent = value,
            TelemetryField::EngineRunning(index) => {
                if index < MAX_ENGINES {
                    snapshot.engines_running[index] = flag;
                }
            }
            TelemetryField::Light(light) => snapshot.lights.set(light, flag),
            TelemetryField::Paused => snapshot.paused = flag,
            TelemetryField::SimRate => snapshot.sim_rate = value,
            TelemetryField::Crashed => snapshot.crashed = flag,
        }
    }
}

impl fmt::Display for TelemetryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryField::FuelTank(tank) => write!(f, "fuel_tank.{}", tank),
            TelemetryField::PayloadStation(index) => write!(f, "payload_station.{}", index),
            TelemetryField::EngineRunning(index) => write!(f, "engine_running.{}", index),
            TelemetryField::Light(light) => write!(f, "light.{}", light.as_str()),
            scalar => {
                let name = SCALAR_FIELDS
                    .iter()
                    .find(|(_, field)| field == scalar)
                    .map(|(name, _)| *name)
                    .unwrap_or("unknown");
                f.write_str(name)
            }
        }
    }
}

impl FromStr for TelemetryField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((prefix, arg)) = s.split_once('.') {
            return match prefix {
                "fuel_tank" => arg.parse().map(TelemetryField::FuelTank),
                "light" => arg.parse().map(TelemetryField::Light),
                "payload_station" => {
                    let index: usize = arg
                        .parse()
                        .map_err(|_| format!("invalid payload station index '{}'", arg))?;
                    if index >= MAX_PAYLOAD_STATIONS {
                        return Err(format!("payload station index {} out of range", index));
                    }
                    Ok(TelemetryField::PayloadStation(index))
                }
                "engine_running" => {
                    let index: usize = arg
                        .parse()
                        .map_err(|_| format!("invalid engine index '{}'", arg))?;
                    if index >= MAX_ENGINES {
                        return Err(format!("engine index {} out of range", index));
                    }
                    Ok(TelemetryField::EngineRunning(index))
                }
                other => Err(format!("unknown telemetry field group '{}'", other)),
            };
        }

        SCALAR_FIELDS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, field)| *field)
            .ok_or_else(|| format!("unknown telemetry field '{}'", s))
    }
}

impl TryFrom<String> for TelemetryField {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TelemetryField> for String {
    fn from(field: TelemetryField) -> Self {
        field.to_string()
    }
}
