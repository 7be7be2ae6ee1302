use crate::adapters::mapping::MappingTable;
use crate::adapters::xplane::protocol;
use crate::domain::fields::TelemetryField;
use crate::domain::model::{FuelQuantities, FuelTank, Simulator, TelemetrySnapshot, TimedSnapshot};
use crate::domain::ports::{SimulatorControl, TelemetrySource};
use crate::utils::error::{AgentError, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;

const RECV_BUFFER_LEN: usize = 4096;

/// X-Plane 連線參數
#[derive(Debug, Clone)]
pub struct XPlaneEndpoint {
    pub host: String,
    pub port: u16,
    /// 0 代表由系統分配
    pub local_port: u16,
    pub timeout: Duration,
    pub sample_rate_hz: u32,
}

impl Default for XPlaneEndpoint {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 49000,
            local_port: 0,
            timeout: Duration::from_secs(5),
            sample_rate_hz: 5,
        }
    }
}

/// 透過 UDP RREF/DREF 與 X-Plane 11 溝通
pub struct XPlaneConnection {
    endpoint: XPlaneEndpoint,
    table: MappingTable,
    socket: Option<UdpSocket>,
    remote: Option<SocketAddr>,
    snapshot: TelemetrySnapshot,
    buffer: Vec<u8>,
}

impl XPlaneConnection {
    pub fn new(endpoint: XPlaneEndpoint, table: MappingTable) -> Self {
        Self {
            endpoint,
            table,
            socket: None,
            remote: None,
            snapshot: TelemetrySnapshot::default(),
            buffer: vec![0; RECV_BUFFER_LEN],
        }
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// 目前累積的快照 (最後寫入者為準)
    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket()?.local_addr()?)
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket.as_ref().ok_or_else(|| AgentError::ConnectionError {
            message: "not connected to X-Plane".to_string(),
        })
    }

    fn remote(&self) -> Result<SocketAddr> {
        self.remote.ok_or_else(|| AgentError::ConnectionError {
            message: "X-Plane address not resolved".to_string(),
        })
    }

    async fn resolve(&self) -> Result<SocketAddr> {
        let target = format!("{}:{}", self.endpoint.host, self.endpoint.port);
        let mut addrs = tokio::net::lookup_host(&target).await?;
        addrs.next().ok_or_else(|| AgentError::ConnectionError {
            message: format!("could not resolve {}", target),
        })
    }

    /// 以指定頻率訂閱對應表中所有 dataref；頻率 0 取消訂閱
    pub async fn subscribe(&self, frequency: i32) -> Result<()> {
        let socket = self.socket()?;
        let remote = self.remote()?;

        for (index, binding) in self.table.bindings().iter().enumerate() {
            let packet = protocol::encode_rref_request(frequency, index as i32, &binding.source)?;
            socket.send_to(&packet, remote).await?;
        }

        tracing::debug!(
            "📡 Sent {} RREF requests at {} Hz to {}",
            self.table.len(),
            frequency,
            remote
        );
        Ok(())
    }

    pub async fn write_dataref(&self, path: &str, value: f32) -> Result<()> {
        let packet = protocol::encode_dref(value, path)?;
        self.socket()?.send_to(&packet, self.remote()?).await?;
        tracing::debug!("✏️ DREF {} = {}", path, value);
        Ok(())
    }

    /// 把一個 RREF 回覆併入快照，回傳套用的數值數量
    pub fn fold_reply(&mut self, packet: &[u8]) -> Result<usize> {
        let values = protocol::decode_rref_reply(packet)?;
        let mut applied = 0;
        for (index, value) in values {
            if index >= 0 && self.table.apply_index(index as usize, f64::from(value), &mut self.snapshot) {
                applied += 1;
            } else {
                tracing::debug!("Ignoring RREF value for unknown index {}", index);
            }
        }
        Ok(applied)
    }

    async fn write_target(&self, target: TelemetryField, value: f64) -> Result<bool> {
        match self.table.source_for(target) {
            Some(binding) => {
                let raw = binding
                    .conversion
                    .invert(value, self.snapshot.fuel_weight_per_gallon);
                self.write_dataref(&binding.source, raw as f32).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl TelemetrySource for XPlaneConnection {
    fn simulator(&self) -> Simulator {
        Simulator::Xplane
    }

    async fn connect(&mut self) -> Result<()> {
        let remote = self.resolve().await?;
        let bind_addr: SocketAddr = if remote.is_ipv6() {
            SocketAddr::from(([0u16; 8], self.endpoint.local_port))
        } else {
            SocketAddr::from(([0u8; 4], self.endpoint.local_port))
        };

        let socket = UdpSocket::bind(bind_addr).await.map_err(|e| AgentError::ConnectionError {
            message: format!("could not bind {}: {}", bind_addr, e),
        })?;

        tracing::info!("🛫 Connecting to X-Plane at {} (local {})", remote, socket.local_addr()?);
        self.socket = Some(socket);
        self.remote = Some(remote);
        self.subscribe(self.endpoint.sample_rate_hz as i32).await
    }

    async fn next_sample(&mut self) -> Result<Option<TimedSnapshot>> {
        let deadline = Instant::now() + self.endpoint.timeout;

        loop {
            let received = {
                let socket = self.socket.as_ref().ok_or_else(|| AgentError::ConnectionError {
                    message: "not connected to X-Plane".to_string(),
                })?;
                tokio::time::timeout_at(deadline, socket.recv_from(&mut self.buffer)).await
            };

            let (len, from) = match received {
                Ok(result) => result?,
                Err(_) => {
                    // X-Plane 重新啟動後會遺失訂閱，逾時後重送
                    tracing::warn!(
                        "⏳ No telemetry from X-Plane for {:?}, re-subscribing",
                        self.endpoint.timeout
                    );
                    self.subscribe(self.endpoint.sample_rate_hz as i32).await?;
                    return Err(AgentError::SimulatorTimeout {
                        seconds: self.endpoint.timeout.as_secs(),
                    });
                }
            };

            let packet = self.buffer[..len].to_vec();
            match self.fold_reply(&packet) {
                Ok(_) => return Ok(Some(TimedSnapshot::now(self.snapshot.clone()))),
                Err(e) => tracing::warn!("⚠️ Dropping packet from {}: {}", from, e),
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.socket.is_some() {
            self.subscribe(0).await?;
            tracing::info!("🛬 Disconnected from X-Plane");
        }
        self.socket = None;
        self.remote = None;
        Ok(())
    }
}

#[async_trait]
impl SimulatorControl for XPlaneConnection {
    async fn apply_fuel(&mut self, fuel: &FuelQuantities) -> Result<()> {
        for tank in FuelTank::ALL {
            let lbs = fuel.get(tank);
            let written = self.write_target(TelemetryField::FuelTank(tank), lbs).await?;
            if !written && lbs > 0.0 {
                tracing::warn!("⚠️ No dataref mapped for tank {}, {:.0} lbs not loaded", tank, lbs);
            }
        }
        Ok(())
    }

    async fn apply_payload(&mut self, stations: &[f64]) -> Result<()> {
        let mut per_station = 0;
        for (index, lbs) in stations.iter().enumerate() {
            if self.write_target(TelemetryField::PayloadStation(index), *lbs).await? {
                per_station += 1;
            }
        }

        // X-Plane 預設只有單一酬載重量
        if per_station == 0 {
            let total: f64 = stations.iter().sum();
            if !self.write_target(TelemetryField::PayloadTotal, total).await? {
                return Err(AgentError::ConfigError {
                    message: "no payload dataref mapped for X-Plane".to_string(),
                });
            }
        }
        Ok(())
    }
}
