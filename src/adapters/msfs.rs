//! MSFS SimVar adapter
//!
//! SimConnect 本身是 Windows 專用 SDK，這裡不重新實作。任何 SimConnect
//! 綁定只要把具名數值 (frame) 推入 channel，即可由 [`MsfsSource`] 轉換成
//! 共享遙測模型；寫回模擬器的請求則由 [`MsfsControl`] 送出。

use crate::adapters::mapping::{Binding, MappingTable};
use crate::domain::conversion::Conversion;
use crate::domain::fields::TelemetryField as F;
use crate::domain::model::{FuelQuantities, FuelTank, Light, Simulator, TelemetrySnapshot, TimedSnapshot};
use crate::domain::ports::{SimulatorControl, TelemetrySource};
use crate::utils::error::{AgentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// 一次 SimConnect 回呼中收到的具名數值，依請求順序排列
pub type SimVarFrame = Vec<(String, f64)>;

pub const DEFAULT_PAYLOAD_STATIONS: usize = 10;

/// 寫回 SimVar 的請求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimVarWrite {
    pub name: String,
    pub unit: String,
    pub value: f64,
}

/// MSFS 預設 SimVar 對應表
pub fn default_table() -> MappingTable {
    use Conversion::*;

    let tanks = [
        ("FUEL TANK LEFT MAIN QUANTITY", FuelTank::LeftMain),
        ("FUEL TANK RIGHT MAIN QUANTITY", FuelTank::RightMain),
        ("FUEL TANK LEFT AUX QUANTITY", FuelTank::LeftAux),
        ("FUEL TANK RIGHT AUX QUANTITY", FuelTank::RightAux),
        ("FUEL TANK LEFT TIP QUANTITY", FuelTank::LeftTip),
        ("FUEL TANK RIGHT TIP QUANTITY", FuelTank::RightTip),
        ("FUEL TANK CENTER QUANTITY", FuelTank::Center),
        ("FUEL TANK CENTER2 QUANTITY", FuelTank::Center2),
        ("FUEL TANK CENTER3 QUANTITY", FuelTank::Center3),
        ("FUEL TANK EXTERNAL1 QUANTITY", FuelTank::External1),
        ("FUEL TANK EXTERNAL2 QUANTITY", FuelTank::External2),
    ];

    // 燃油密度必須排在油箱之前
    let mut bindings = vec![
        Binding::new("FUEL WEIGHT PER GALLON", F::FuelWeightPerGallon, Identity).with_unit("pounds"),
        Binding::new("PLANE LATITUDE", F::Latitude, Identity).with_unit("degrees"),
        Binding::new("PLANE LONGITUDE", F::Longitude, Identity).with_unit("degrees"),
        Binding::new("PLANE ALTITUDE", F::AltitudeFt, Identity).with_unit("feet"),
        Binding::new("PLANE ALT ABOVE GROUND", F::AltitudeAglFt, Identity).with_unit("feet"),
        Binding::new("PLANE HEADING DEGREES TRUE", F::HeadingTrue, RadiansToDegrees).with_unit("radians"),
        Binding::new("PLANE HEADING DEGREES MAGNETIC", F::HeadingMagnetic, RadiansToDegrees).with_unit("radians"),
        Binding::new("AIRSPEED INDICATED", F::IndicatedAirspeed, Identity).with_unit("knots"),
        Binding::new("AIRSPEED TRUE", F::TrueAirspeed, Identity).with_unit("knots"),
        Binding::new("GROUND VELOCITY", F::GroundSpeed, Identity).with_unit("knots"),
        Binding::new("VERTICAL SPEED", F::VerticalSpeed, FpsToFpm).with_unit("feet per second"),
        Binding::new("PLANE BANK DEGREES", F::BankAngle, RadiansToDegrees).with_unit("radians"),
        Binding::new("PLANE PITCH DEGREES", F::PitchAngle, RadiansToDegrees).with_unit("radians"),
        Binding::new("INCIDENCE BETA", F::Sideslip, RadiansToDegrees).with_unit("radians"),
        Binding::new("G FORCE", F::GForce, Identity).with_unit("gforce"),
        Binding::new("SIM ON GROUND", F::OnGround, Bool).with_unit("bool"),
        Binding::new("AMBIENT WIND DIRECTION", F::WindDirection, Identity).with_unit("degrees"),
        Binding::new("AMBIENT WIND VELOCITY", F::WindSpeed, Identity).with_unit("knots"),
        Binding::new("FUEL TOTAL QUANTITY WEIGHT", F::FuelTotal, Identity).with_unit("pounds"),
    ];

    for (name, tank) in tanks {
        bindings.push(Binding::new(name, F::FuelTank(tank), GallonsToLbs).with_unit("gallons"));
    }

    bindings.extend([
        Binding::new("TOTAL WEIGHT", F::GrossWeight, Identity).with_unit("pounds"),
        Binding::new("BRAKE PARKING POSITION", F::ParkingBrake, Bool).with_unit("bool"),
        Binding::new("GEAR HANDLE POSITION", F::GearDown, Bool).with_unit("bool"),
        Binding::new("FLAPS HANDLE PERCENT", F::FlapsPercent, Identity).with_unit("percent"),
        Binding::new("LIGHT BEACON", F::Light(Light::Beacon), Bool).with_unit("bool"),
        Binding::new("LIGHT LANDING", F::Light(Light::Landing), Bool).with_unit("bool"),
        Binding::new("LIGHT NAV", F::Light(Light::Nav), Bool).with_unit("bool"),
        Binding::new("LIGHT STROBE", F::Light(Light::Strobe), Bool).with_unit("bool"),
        Binding::new("LIGHT TAXI", F::Light(Light::Taxi), Bool).with_unit("bool"),
        Binding::new("SIMULATION RATE", F::SimRate, Identity).with_unit("number"),
        Binding::new("CRASH FLAG", F::Crashed, Bool).with_unit("enum"),
    ]);

    for engine in 0..crate::domain::model::MAX_ENGINES {
        bindings.push(
            Binding::new(&format!("GENERAL ENG COMBUSTION:{}", engine + 1), F::EngineRunning(engine), Bool)
                .with_unit("bool"),
        );
    }

    // SimConnect 站位編號從 1 開始
    for station in 0..DEFAULT_PAYLOAD_STATIONS {
        bindings.push(
            Binding::new(&format!("PAYLOAD STATION WEIGHT:{}", station + 1), F::PayloadStation(station), Identity)
                .with_unit("pounds"),
        );
    }

    MappingTable::new(bindings)
}

/// 由 channel 推入 SimVar frame 的遙測來源
pub struct MsfsSource {
    frames: mpsc::Receiver<SimVarFrame>,
    table: MappingTable,
    snapshot: TelemetrySnapshot,
    timeout: Duration,
}

impl MsfsSource {
    pub fn new(frames: mpsc::Receiver<SimVarFrame>, table: MappingTable, timeout: Duration) -> Self {
        Self {
            frames,
            table,
            snapshot: TelemetrySnapshot::default(),
            timeout,
        }
    }

    /// 建立 (frame 發送端, 來源)，發送端交給 SimConnect 綁定
    pub fn channel(capacity: usize, table: MappingTable, timeout: Duration) -> (mpsc::Sender<SimVarFrame>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx, table, timeout))
    }

    /// 請求定義：(名稱, 單位)，依對應表順序
    pub fn data_definition(&self) -> Vec<(String, String)> {
        self.table
            .bindings()
            .iter()
            .map(|b| (b.source.clone(), b.unit.clone().unwrap_or_else(|| "number".to_string())))
            .collect()
    }

    pub fn fold_frame(&mut self, frame: &SimVarFrame) -> usize {
        self.table.apply_frame(frame, &mut self.snapshot)
    }
}

#[async_trait]
impl TelemetrySource for MsfsSource {
    fn simulator(&self) -> Simulator {
        Simulator::Msfs
    }

    async fn connect(&mut self) -> Result<()> {
        tracing::info!("🛫 Waiting for SimConnect frames ({} SimVars)", self.table.len());
        Ok(())
    }

    async fn next_sample(&mut self) -> Result<Option<TimedSnapshot>> {
        match tokio::time::timeout(self.timeout, self.frames.recv()).await {
            Ok(Some(frame)) => {
                let applied = self.fold_frame(&frame);
                tracing::trace!("Applied {} SimVars", applied);
                Ok(Some(TimedSnapshot::now(self.snapshot.clone())))
            }
            Ok(None) => {
                tracing::info!("🛬 SimConnect feed closed");
                Ok(None)
            }
            Err(_) => Err(AgentError::SimulatorTimeout {
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.frames.close();
        Ok(())
    }
}

/// 透過 channel 送出 SimVar 寫入請求
pub struct MsfsControl {
    writes: mpsc::Sender<SimVarWrite>,
    table: MappingTable,
    fuel_weight_per_gallon: f64,
}

impl MsfsControl {
    pub fn new(writes: mpsc::Sender<SimVarWrite>, table: MappingTable, fuel_weight_per_gallon: f64) -> Self {
        Self {
            writes,
            table,
            fuel_weight_per_gallon,
        }
    }

    async fn write_target(&self, target: F, value: f64) -> Result<bool> {
        let Some(binding) = self.table.source_for(target) else {
            return Ok(false);
        };

        let request = SimVarWrite {
            name: binding.source.clone(),
            unit: binding.unit.clone().unwrap_or_else(|| "number".to_string()),
            value: binding.conversion.invert(value, self.fuel_weight_per_gallon),
        };
        self.writes
            .send(request)
            .await
            .map_err(|_| AgentError::ConnectionError {
                message: "SimConnect write channel closed".to_string(),
            })?;
        Ok(true)
    }
}

#[async_trait]
impl SimulatorControl for MsfsControl {
    async fn apply_fuel(&mut self, fuel: &FuelQuantities) -> Result<()> {
        for tank in FuelTank::ALL {
            let lbs = fuel.get(tank);
            if !self.write_target(F::FuelTank(tank), lbs).await? && lbs > 0.0 {
                tracing::warn!("⚠️ No SimVar mapped for tank {}, {:.0} lbs not loaded", tank, lbs);
            }
        }
        Ok(())
    }

    async fn apply_payload(&mut self, stations: &[f64]) -> Result<()> {
        for (index, lbs) in stations.iter().enumerate() {
            if !self.write_target(F::PayloadStation(index), *lbs).await? {
                return Err(AgentError::ConfigError {
                    message: format!("no SimVar mapped for payload station {}", index),
                });
            }
        }
        Ok(())
    }
}

/// 從 JSON Lines 讀取 frame，每行形如 `[["PLANE ALTITUDE", 1200.0], ...]`。
/// 外部的 SimConnect 橋接程式可把輸出接到這裡。
pub async fn pump_json_lines<R>(reader: R, frames: mpsc::Sender<SimVarFrame>) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<SimVarFrame>(line) {
            Ok(frame) => {
                if frames.send(frame).await.is_err() {
                    break;
                }
                forwarded += 1;
            }
            Err(e) => tracing::warn!("⚠️ Skipping malformed SimVar frame: {}", e),
        }
    }

    Ok(forwarded)
}

/// 把寫入請求逐行輸出成 JSON，例如 `{"name":"FUEL TANK CENTER QUANTITY","unit":"gallons","value":120.0}`。
/// 與 [`pump_json_lines`] 相對，由外部的 SimConnect 橋接程式讀取後寫入模擬器。
pub async fn drain_json_lines<W>(mut writes: mpsc::Receiver<SimVarWrite>, mut writer: W) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(request) = writes.recv().await {
        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        written += 1;
    }
    writer.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn frame(values: &[(&str, f64)]) -> SimVarFrame {
        values.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[tokio::test]
    async fn test_source_converts_frames() {
        let (tx, mut source) = MsfsSource::channel(4, default_table(), Duration::from_secs(1));
        source.connect().await.unwrap();

        tx.send(frame(&[
            ("PLANE HEADING DEGREES TRUE", std::f64::consts::FRAC_PI_2),
            ("VERTICAL SPEED", -10.0),
            ("FUEL TANK LEFT MAIN QUANTITY", 100.0),
            ("FUEL WEIGHT PER GALLON", 6.0),
            ("SIM ON GROUND", 1.0),
            ("PAYLOAD STATION WEIGHT:2", 180.0),
        ]))
        .await
        .unwrap();

        let sample = source.next_sample().await.unwrap().unwrap();
        let s = &sample.snapshot;
        assert_abs_diff_eq!(s.heading_true, 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.vertical_speed_fpm, -600.0);
        assert_abs_diff_eq!(s.fuel_tanks.left_main, 600.0);
        assert!(s.on_ground);
        assert_eq!(s.payload_stations, vec![0.0, 180.0]);

        drop(tx);
        assert!(source.next_sample().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_source_times_out() {
        let (_tx, mut source) = MsfsSource::channel(1, default_table(), Duration::from_millis(20));
        let err = source.next_sample().await.unwrap_err();
        assert!(matches!(err, AgentError::SimulatorTimeout { .. }));
    }

    #[tokio::test]
    async fn test_control_writes_gallons_and_pounds() {
        let (tx, mut rx) = mpsc::channel(32);
        let mut control = MsfsControl::new(tx, default_table(), 6.0);

        let mut fuel = FuelQuantities::default();
        fuel.set(FuelTank::LeftMain, 300.0);
        control.apply_fuel(&fuel).await.unwrap();
        control.apply_payload(&[170.0]).await.unwrap();

        let mut writes = Vec::new();
        while let Ok(write) = rx.try_recv() {
            writes.push(write);
        }

        // 每個油箱都會寫入 (包含 0)，再加一個站位
        assert_eq!(writes.len(), FuelTank::ALL.len() + 1);
        let left = writes.iter().find(|w| w.name == "FUEL TANK LEFT MAIN QUANTITY").unwrap();
        assert_eq!(left.unit, "gallons");
        assert_abs_diff_eq!(left.value, 50.0);
        let station = writes.last().unwrap();
        assert_eq!(station.name, "PAYLOAD STATION WEIGHT:1");
        assert_abs_diff_eq!(station.value, 170.0);
    }

    #[test]
    fn test_data_definition_order() {
        let (_tx, source) = MsfsSource::channel(1, default_table(), Duration::from_secs(1));
        let definition = source.data_definition();
        assert_eq!(definition[0], ("FUEL WEIGHT PER GALLON".to_string(), "pounds".to_string()));
        assert!(definition.iter().all(|(_, unit)| !unit.is_empty()));
    }

    #[tokio::test]
    async fn test_writes_are_drained_as_json_lines() {
        let (tx, rx) = mpsc::channel(32);
        let drain = tokio::spawn(drain_json_lines(rx, Vec::new()));

        let mut control = MsfsControl::new(tx, default_table(), 6.0);
        control.apply_payload(&[170.0, 0.0]).await.unwrap();
        drop(control);

        let written = drain.await.unwrap().unwrap();
        assert_eq!(written, 2);
    }

    #[tokio::test]
    async fn test_drained_lines_parse_back() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(SimVarWrite {
            name: "FUEL TANK CENTER QUANTITY".to_string(),
            unit: "gallons".to_string(),
            value: 120.0,
        })
        .await
        .unwrap();
        drop(tx);

        let mut output = Vec::new();
        assert_eq!(drain_json_lines(rx, &mut output).await.unwrap(), 1);

        let text = String::from_utf8(output).unwrap();
        assert!(text.ends_with('\n'));
        let parsed: SimVarWrite = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed.name, "FUEL TANK CENTER QUANTITY");
        assert_abs_diff_eq!(parsed.value, 120.0);
    }

    #[tokio::test]
    async fn test_json_lines_bridge() {
        let (tx, mut source) = MsfsSource::channel(8, default_table(), Duration::from_secs(1));
        let input = b"[[\"PLANE ALTITUDE\", 3500.0]]\n\nnot json\n[[\"SIM ON GROUND\", 0.0]]\n";

        let forwarded = pump_json_lines(&input[..], tx).await.unwrap();
        assert_eq!(forwarded, 2);

        let first = source.next_sample().await.unwrap().unwrap();
        assert_abs_diff_eq!(first.snapshot.altitude_ft, 3500.0);
        let second = source.next_sample().await.unwrap().unwrap();
        assert!(!second.snapshot.on_ground);
        assert!(source.next_sample().await.unwrap().is_none());
    }
}
