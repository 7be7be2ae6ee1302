use crate::domain::model::{Simulator, TimedSnapshot};
use crate::domain::ports::TelemetrySource;
use crate::domain::record::TelemetryRow;
use crate::utils::error::{AgentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

/// 重播已紀錄的 `telemetry.csv`
pub struct ReplaySource {
    path: Option<PathBuf>,
    rows: VecDeque<TelemetryRow>,
    /// 重播倍速；`None` 代表不等待，盡快送出
    speed: Option<f64>,
    last_at: Option<DateTime<Utc>>,
}

impl ReplaySource {
    pub fn from_path<P: Into<PathBuf>>(path: P, speed: Option<f64>) -> Self {
        Self {
            path: Some(path.into()),
            rows: VecDeque::new(),
            speed,
            last_at: None,
        }
    }

    /// 直接從記憶體中的 CSV 建立
    pub fn from_reader<R: Read>(reader: R, speed: Option<f64>) -> Result<Self> {
        let rows = read_rows(reader)?;
        Ok(Self {
            path: None,
            rows,
            speed,
            last_at: None,
        })
    }

    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

fn read_rows<R: Read>(reader: R) -> Result<VecDeque<TelemetryRow>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = VecDeque::new();
    for row in csv_reader.deserialize() {
        rows.push_back(row?);
    }
    Ok(rows)
}

#[async_trait]
impl TelemetrySource for ReplaySource {
    fn simulator(&self) -> Simulator {
        Simulator::Replay
    }

    async fn connect(&mut self) -> Result<()> {
        if let Some(path) = &self.path {
            let file = std::fs::File::open(path).map_err(|e| AgentError::ConnectionError {
                message: format!("cannot open replay file {}: {}", path.display(), e),
            })?;
            self.rows = read_rows(file)?;
            tracing::info!("📼 Loaded {} samples from {}", self.rows.len(), path.display());
        }
        Ok(())
    }

    async fn next_sample(&mut self) -> Result<Option<TimedSnapshot>> {
        let Some(row) = self.rows.pop_front() else {
            return Ok(None);
        };

        if let (Some(speed), Some(last_at)) = (self.speed, self.last_at) {
            if speed > 0.0 {
                let delta = (row.timestamp - last_at).num_milliseconds().max(0) as f64 / speed;
                tokio::time::sleep(Duration::from_millis(delta as u64)).await;
            }
        }
        self.last_at = Some(row.timestamp);

        Ok(Some(TimedSnapshot::from(row)))
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.rows.clear();
        Ok(())
    }
}
