use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 支援的模擬器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Simulator {
    Xplane,
    Msfs,
    Replay,
}

impl fmt::Display for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Simulator::Xplane => "xplane",
            Simulator::Msfs => "msfs",
            Simulator::Replay => "replay",
        };
        f.write_str(name)
    }
}

impl FromStr for Simulator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xplane" | "xplane11" | "x-plane" => Ok(Simulator::Xplane),
            "msfs" | "msfs2020" => Ok(Simulator::Msfs),
            "replay" => Ok(Simulator::Replay),
            other => Err(format!("unknown simulator '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelTank {
    LeftMain,
    RightMain,
    LeftAux,
    RightAux,
    LeftTip,
    RightTip,
    Center,
    Center2,
    Center3,
    External1,
    External2,
}

impl FuelTank {
    pub const ALL: [FuelTank; 11] = [
        FuelTank::LeftMain,
        FuelTank::RightMain,
        FuelTank::LeftAux,
        FuelTank::RightAux,
        FuelTank::LeftTip,
        FuelTank::RightTip,
        FuelTank::Center,
        FuelTank::Center2,
        FuelTank::Center3,
        FuelTank::External1,
        FuelTank::External2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FuelTank::LeftMain => "left_main",
            FuelTank::RightMain => "right_main",
            FuelTank::LeftAux => "left_aux",
            FuelTank::RightAux => "right_aux",
            FuelTank::LeftTip => "left_tip",
            FuelTank::RightTip => "right_tip",
            FuelTank::Center => "center",
            FuelTank::Center2 => "center2",
            FuelTank::Center3 => "center3",
            FuelTank::External1 => "external1",
            FuelTank::External2 => "external2",
        }
    }
}

impl fmt::Display for FuelTank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FuelTank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FuelTank::ALL
            .iter()
            .find(|tank| tank.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown fuel tank '{}'", s))
    }
}

/// 每個油箱一個數值 (lbs)。容量、建議分配與實際油量共用此結構。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelQuantities {
    pub left_main: f64,
    pub right_main: f64,
    pub left_aux: f64,
    pub right_aux: f64,
    pub left_tip: f64,
    pub right_tip: f64,
    pub center: f64,
    pub center2: f64,
    pub center3: f64,
    pub external1: f64,
    pub external2: f64,
}

impl FuelQuantities {
    pub fn get(&self, tank: FuelTank) -> f64 {
        match tank {
            FuelTank::LeftMain => self.left_main,
            FuelTank::RightMain => self.right_main,
            FuelTank::LeftAux => self.left_aux,
            FuelTank::RightAux => self.right_aux,
            FuelTank::LeftTip => self.left_tip,
            FuelTank::RightTip => self.right_tip,
            FuelTank::Center => self.center,
            FuelTank::Center2 => self.center2,
            FuelTank::Center3 => self.center3,
            FuelTank::External1 => self.external1,
            FuelTank::External2 => self.external2,
        }
    }

    pub fn set(&mut self, tank: FuelTank, value: f64) {
        let slot = match tank {
            FuelTank::LeftMain => &mut self.left_main,
            FuelTank::RightMain => &mut self.right_main,
            FuelTank::LeftAux => &mut self.left_aux,
            FuelTank::RightAux => &mut self.right_aux,
            FuelTank::LeftTip => &mut self.left_tip,
            FuelTank::RightTip => &mut self.right_tip,
            FuelTank::Center => &mut self.center,
            FuelTank::Center2 => &mut self.center2,
            FuelTank::Center3 => &mut self.center3,
            FuelTank::External1 => &mut self.external1,
            FuelTank::External2 => &mut self.external2,
        };
        *slot = value;
    }

    pub fn total(&self) -> f64 {
        FuelTank::ALL.iter().map(|tank| self.get(*tank)).sum()
    }

    /// 只列出非零的油箱
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (FuelTank, f64)> + '_ {
        FuelTank::ALL
            .iter()
            .map(move |tank| (*tank, self.get(*tank)))
            .filter(|(_, value)| *value != 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Light {
    Beacon,
    Landing,
    Nav,
    Strobe,
    Taxi,
}

impl Light {
    pub const ALL: [Light; 5] = [Light::Beacon, Light::Landing, Light::Nav, Light::Strobe, Light::Taxi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Light::Beacon => "beacon",
            Light::Landing => "landing",
            Light::Nav => "nav",
            Light::Strobe => "strobe",
            Light::Taxi => "taxi",
        }
    }
}

impl FromStr for Light {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Light::ALL
            .iter()
            .find(|light| light.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown light '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lights {
    pub beacon: bool,
    pub landing: bool,
    pub nav: bool,
    pub strobe: bool,
    pub taxi: bool,
}

impl Lights {
    pub fn get(&self, light: Light) -> bool {
        match light {
            Light::Beacon => self.beacon,
            Light::Landing => self.landing,
            Light::Nav => self.nav,
            Light::Strobe => self.strobe,
            Light::Taxi => self.taxi,
        }
    }

    pub fn set(&mut self, light: Light, on: bool) {
        match light {
            Light::Beacon => self.beacon = on,
            Light::Landing => self.landing = on,
            Light::Nav => self.nav = on,
            Light::Strobe => self.strobe = on,
            Light::Taxi => self.taxi = on,
        }
    }
}

pub const MAX_ENGINES: usize = 4;
pub const MAX_PAYLOAD_STATIONS: usize = 20;

/// 共享的遙測模型。欄位單位固定，由各模擬器 adapter 轉換後寫入。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
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
    pub fuel_tanks: FuelQuantities,
    pub payload_total_lbs: f64,
    pub payload_stations: Vec<f64>,
    pub gross_weight_lbs: f64,
    pub parking_brake: bool,
    pub gear_down: bool,
    pub flaps_percent: f64,
    pub engines_running: [bool; MAX_ENGINES],
    pub lights: Lights,
    pub paused: bool,
    pub sim_rate: f64,
    pub crashed: bool,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            altitude_ft: 0.0,
            altitude_agl_ft: 0.0,
            heading_true: 0.0,
            heading_magnetic: 0.0,
            indicated_airspeed_kts: 0.0,
            true_airspeed_kts: 0.0,
            ground_speed_kts: 0.0,
            vertical_speed_fpm: 0.0,
            bank_angle_deg: 0.0,
            pitch_angle_deg: 0.0,
            sideslip_deg: 0.0,
            g_force: 1.0,
            on_ground: true,
            wind_direction_deg: 0.0,
            wind_speed_kts: 0.0,
            fuel_total_lbs: 0.0,
            // Jet-A 密度
            fuel_weight_per_gallon: 6.7,
            fuel_tanks: FuelQuantities::default(),
            payload_total_lbs: 0.0,
            payload_stations: Vec::new(),
            gross_weight_lbs: 0.0,
            parking_brake: false,
            gear_down: true,
            flaps_percent: 0.0,
            engines_running: [false; MAX_ENGINES],
            lights: Lights::default(),
            paused: false,
            sim_rate: 1.0,
            crashed: false,
        }
    }
}

impl TelemetrySnapshot {
    /// 側風分量 (kts)，正值代表風從右側吹來
    pub fn crosswind_kts(&self) -> f64 {
        let relative = (self.wind_direction_deg - self.heading_true).to_radians();
        self.wind_speed_kts * relative.sin()
    }

    /// 逆風分量 (kts)，負值為順風
    pub fn headwind_kts(&self) -> f64 {
        let relative = (self.wind_direction_deg - self.heading_true).to_radians();
        self.wind_speed_kts * relative.cos()
    }

    pub fn any_engine_running(&self) -> bool {
        self.engines_running.iter().any(|running| *running)
    }

    pub fn set_payload_station(&mut self, index: usize, lbs: f64) {
        if index >= MAX_PAYLOAD_STATIONS {
            return;
        }
        if self.payload_stations.len() <= index {
            self.payload_stations.resize(index + 1, 0.0);
        }
        self.payload_stations[index] = lbs;
    }
}

/// 附接收時間的遙測快照
#[derive(Debug, Clone, PartialEq)]
pub struct TimedSnapshot {
    pub at: DateTime<Utc>,
    pub snapshot: TelemetrySnapshot,
}

impl TimedSnapshot {
    pub fn new(at: DateTime<Utc>, snapshot: TelemetrySnapshot) -> Self {
        Self { at, snapshot }
    }

    pub fn now(snapshot: TelemetrySnapshot) -> Self {
        Self::new(Utc::now(), snapshot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationKind {
    Crew,
    Passenger,
    Cargo,
}

impl StationKind {
    /// 由站位名稱推斷種類
    pub fn classify(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        const CREW: [&str; 5] = ["pilot", "crew", "captain", "first officer", "attendant"];
        const CARGO: [&str; 5] = ["cargo", "baggage", "luggage", "hold", "freight"];

        if CREW.iter().any(|word| lower.contains(word)) {
            StationKind::Crew
        } else if CARGO.iter().any(|word| lower.contains(word)) {
            StationKind::Cargo
        } else {
            StationKind::Passenger
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadStation {
    pub name: String,
    pub max_weight_lbs: f64,
    /// 力臂 (inches from datum)
    pub arm_in: Option<f64>,
    pub kind: Option<StationKind>,
}

impl PayloadStation {
    pub fn kind(&self) -> StationKind {
        self.kind.unwrap_or_else(|| StationKind::classify(&self.name))
    }
}

fn default_contingency_percent() -> f64 {
    5.0
}

/// 機型資料，從 TOML 檔載入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftType {
    pub name: String,
    pub icao: String,
    pub empty_weight_lbs: f64,
    pub empty_arm_in: Option<f64>,
    pub max_gross_weight_lbs: f64,
    pub max_zero_fuel_weight_lbs: Option<f64>,
    pub cruise_speed_kts: f64,
    pub fuel_flow_lbs_per_hour: f64,
    #[serde(default)]
    pub taxi_fuel_lbs: f64,
    #[serde(default = "default_contingency_percent")]
    pub contingency_percent: f64,
    #[serde(default)]
    pub fuel_capacity: FuelQuantities,
    /// 油箱力臂，用於重心計算
    #[serde(default)]
    pub fuel_arm_in: Option<FuelQuantities>,
    #[serde(default)]
    pub crew_weight_lbs: f64,
    #[serde(default)]
    pub payload_stations: Vec<PayloadStation>,
}

impl AircraftType {
    pub fn from_toml_str(content: &str) -> crate::utils::error::Result<Self> {
        toml::from_str(content).map_err(|e| crate::utils::error::AgentError::ConfigValidationError {
            field: "aircraft".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> crate::utils::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn fuel_capacity_lbs(&self) -> f64 {
        self.fuel_capacity.total()
    }

    pub fn payload_capacity_lbs(&self) -> f64 {
        self.payload_stations.iter().map(|s| s.max_weight_lbs).sum()
    }
}
