use crate::core::tracker::{FlightPhase, FlightSummary, FlightTracker, TrackingEvent};
use crate::domain::model::{Simulator, TelemetrySnapshot, TimedSnapshot};
use crate::domain::ports::{ConfigProvider, TelemetrySource};
use crate::domain::record::TelemetryRecorder;
use crate::utils::error::{AgentError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndOfStream,
    Arrived,
    Shutdown,
    SimulatorLost,
}

/// 透過 watch channel 發布給觀察者的最新狀態
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStatus {
    pub connected: bool,
    pub phase: FlightPhase,
    pub at: Option<DateTime<Utc>>,
    pub snapshot: Option<TelemetrySnapshot>,
    pub samples: usize,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self {
            connected: false,
            phase: FlightPhase::Preflight,
            at: None,
            snapshot: None,
            samples: 0,
        }
    }
}

/// 一次追蹤的完整結果，交由 `ReportWriter` 輸出
#[derive(Debug, Clone, Serialize)]
pub struct FlightLog {
    pub id: String,
    pub simulator: Simulator,
    pub aircraft: Option<String>,
    pub stop_reason: StopReason,
    pub summary: FlightSummary,
    pub events: Vec<TrackingEvent>,
    /// 已編碼的 `telemetry.csv`
    #[serde(skip)]
    pub telemetry: Vec<u8>,
}

pub struct TrackingAgent<S: TelemetrySource> {
    source: S,
    tracker: FlightTracker,
    recorder: TelemetryRecorder,
    aircraft: Option<String>,
    stop_on_arrival: bool,
    max_consecutive_timeouts: u32,
    status: watch::Sender<AgentStatus>,
}

impl<S: TelemetrySource> TrackingAgent<S> {
    pub fn new(source: S, stop_on_arrival: bool, max_consecutive_timeouts: u32) -> Self {
        let (status, _) = watch::channel(AgentStatus::default());
        Self {
            source,
            tracker: FlightTracker::new(),
            recorder: TelemetryRecorder::new(),
            aircraft: None,
            stop_on_arrival,
            max_consecutive_timeouts,
            status,
        }
    }

    pub fn from_config<C: ConfigProvider>(source: S, config: &C) -> Self {
        Self::new(source, config.stop_on_arrival(), config.reconnect_attempts())
    }

    pub fn with_aircraft(mut self, aircraft: impl Into<String>) -> Self {
        self.aircraft = Some(aircraft.into());
        self
    }

    /// 訂閱狀態更新；只保留最新值
    pub fn subscribe(&self) -> watch::Receiver<AgentStatus> {
        self.status.subscribe()
    }

    pub async fn run(self) -> Result<FlightLog> {
        self.run_until(std::future::pending()).await
    }

    /// 持續追蹤直到資料流結束、抵達、收到 `shutdown` 或模擬器連續逾時
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<FlightLog>
    where
        F: Future<Output = ()>,
    {
        let simulator = self.source.simulator();
        tracing::info!("🚀 Starting flight tracking ({})", simulator);

        self.source.connect().await?;
        self.status.send_modify(|status| status.connected = true);

        tokio::pin!(shutdown);
        let mut timeouts = 0u32;

        let reason = loop {
            let next = tokio::select! {
                _ = &mut shutdown => None,
                next = self.source.next_sample() => Some(next),
            };

            match next {
                None => break StopReason::Shutdown,
                Some(Ok(None)) => break StopReason::EndOfStream,
                Some(Ok(Some(sample))) => {
                    timeouts = 0;
                    self.record(sample);
                    if self.stop_on_arrival && self.tracker.has_arrived() {
                        break StopReason::Arrived;
                    }
                }
                Some(Err(AgentError::SimulatorTimeout { seconds })) => {
                    timeouts += 1;
                    tracing::warn!(
                        "⏳ No telemetry for {}s ({}/{})",
                        seconds,
                        timeouts,
                        self.max_consecutive_timeouts
                    );
                    if timeouts >= self.max_consecutive_timeouts {
                        tracing::error!("❌ Simulator stopped responding");
                        break StopReason::SimulatorLost;
                    }
                }
                // 模擬器關閉後 socket 會回報錯誤，保留已收集的資料
                Some(Err(e @ (AgentError::IoError(_) | AgentError::ConnectionError { .. }))) => {
                    tracing::error!("❌ Lost simulator connection: {}", e);
                    break StopReason::SimulatorLost;
                }
                Some(Err(e)) => {
                    if let Err(disconnect_err) = self.source.disconnect().await {
                        tracing::warn!("Failed to disconnect after error: {}", disconnect_err);
                    }
                    return Err(e);
                }
            }
        };

        if let Err(e) = self.source.disconnect().await {
            tracing::warn!("Failed to disconnect cleanly: {}", e);
        }
        self.status.send_modify(|status| status.connected = false);

        let log = self.into_log(simulator, reason)?;
        tracing::info!(
            "✅ Flight {} finished ({:?}): {} samples, {:.1} nm",
            log.id,
            log.stop_reason,
            log.summary.samples,
            log.summary.distance_nm
        );
        Ok(log)
    }

    fn record(&mut self, sample: TimedSnapshot) {
        for event in self.tracker.update(&sample) {
            tracing::debug!("📌 {:?}", event.kind);
        }

        if let Err(e) = self.recorder.push(&sample) {
            tracing::warn!("Failed to record sample at {}: {}", sample.at, e);
        }

        let phase = self.tracker.phase();
        let samples = self.recorder.len();
        self.status.send_modify(|status| {
            status.phase = phase;
            status.at = Some(sample.at);
            status.snapshot = Some(sample.snapshot);
            status.samples = samples;
        });
    }

    fn into_log(mut self, simulator: Simulator, stop_reason: StopReason) -> Result<FlightLog> {
        let summary = self.tracker.finish();
        let started = summary.started_at.unwrap_or_else(Utc::now);
        let id = format!("{}-{}", simulator, started.format("%Y%m%d-%H%M%S"));

        Ok(FlightLog {
            id,
            simulator,
            aircraft: self.aircraft,
            stop_reason,
            summary,
            events: self.tracker.events().to_vec(),
            telemetry: self.recorder.finish()?,
        })
    }
}
