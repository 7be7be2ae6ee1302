use crate::domain::model::{FuelQuantities, Simulator, TimedSnapshot};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 寫入後檔案的完整位置，用於回報給使用者
    fn location(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn output_formats(&self) -> &[String];
    fn compression_enabled(&self) -> bool;
    fn stop_on_arrival(&self) -> bool;
    fn reconnect_attempts(&self) -> u32;
}

/// 遙測來源。每個模擬器 adapter 各自實作。
#[async_trait]
pub trait TelemetrySource: Send {
    fn simulator(&self) -> Simulator;

    async fn connect(&mut self) -> Result<()>;

    /// 取得下一筆快照；`None` 表示資料流結束
    async fn next_sample(&mut self) -> Result<Option<TimedSnapshot>>;

    async fn disconnect(&mut self) -> Result<()>;
}

/// 將建議的燃油與酬載寫回模擬器
#[async_trait]
pub trait SimulatorControl: Send {
    async fn apply_fuel(&mut self, fuel: &FuelQuantities) -> Result<()>;

    async fn apply_payload(&mut self, stations: &[f64]) -> Result<()>;
}
