use crate::adapters::msfs::{drain_json_lines, MsfsControl};
use crate::adapters::xplane::XPlaneConnection;
use crate::config::AgentConfig;
use crate::domain::model::{FuelQuantities, Simulator};
use crate::domain::ports::{SimulatorControl, TelemetrySource};
use crate::utils::error::{AgentError, Result};
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;

/// 要寫入模擬器的油量或酬載
#[derive(Debug, Clone, Copy)]
pub enum Loadout<'a> {
    Fuel(&'a FuelQuantities),
    Payload(&'a [f64]),
}

impl Loadout<'_> {
    pub async fn write_to<C: SimulatorControl>(self, control: &mut C) -> Result<()> {
        match self {
            Loadout::Fuel(fuel) => control.apply_fuel(fuel).await,
            Loadout::Payload(stations) => control.apply_payload(stations).await,
        }
    }
}

/// 依設定的模擬器寫入 loadout。
///
/// X-Plane 直接透過 UDP 寫 DREF；MSFS 的寫入請求以 JSON Lines 輸出到 `msfs_out`，
/// 由外部的 SimConnect 橋接程式接手。重播沒有可寫入的對象。
pub async fn apply_loadout<W>(config: &AgentConfig, loadout: Loadout<'_>, msfs_out: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match config.agent.simulator {
        Simulator::Xplane => {
            let mut connection = XPlaneConnection::new(config.xplane_endpoint(), config.xplane_table());
            connection.connect().await?;
            let applied = loadout.write_to(&mut connection).await;
            connection.disconnect().await?;
            applied?;
        }
        Simulator::Msfs => {
            let (writes, requests) = mpsc::channel(config.msfs.channel_capacity);
            let mut control = MsfsControl::new(writes, config.msfs_table(), config.msfs.fuel_weight_per_gallon);
            // control 離開 async 區塊時關閉 channel，drain 才會結束
            let apply = async move { loadout.write_to(&mut control).await };
            let (applied, drained) = tokio::join!(apply, drain_json_lines(requests, msfs_out));
            applied?;
            let written = drained?;
            tracing::info!("📤 Sent {} SimVar writes to the SimConnect bridge", written);
        }
        Simulator::Replay => {
            return Err(AgentError::InvalidConfigValueError {
                field: "agent.simulator".to_string(),
                value: "replay".to_string(),
                reason: "--apply needs a live simulator".to_string(),
            });
        }
    }
    Ok(())
}
