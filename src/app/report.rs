use crate::core::agent::FlightLog;
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::{AgentError, Result};
use std::borrow::Cow;
use std::io::{Read, Write};
use zip::write::{FileOptions, ZipWriter};

pub const TELEMETRY_FILE: &str = "telemetry.csv";
pub const SUMMARY_FILE: &str = "flight.json";

/// 支援的輸出格式
pub const OUTPUT_FORMATS: [&str; 2] = ["csv", "json"];

/// 把 `FlightLog` 寫成 CSV/JSON，可選擇打包成單一 ZIP
pub struct ReportWriter<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> ReportWriter<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    /// 寫出紀錄，回傳實際寫入的位置
    pub async fn write(&self, log: &FlightLog) -> Result<Vec<String>> {
        let files = self.render(log)?;
        if files.is_empty() {
            tracing::warn!("No output formats configured, nothing written for {}", log.id);
            return Ok(Vec::new());
        }

        if self.config.compression_enabled() {
            let archive = format!("{}.zip", log.id);
            tracing::debug!("Creating ZIP file with {} files", files.len());

            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, data) in &files {
                    zip.start_file::<_, ()>(*name, FileOptions::default())?;
                    zip.write_all(data)?;
                }
                let cursor = zip.finish()?;
                cursor.into_inner()
            };

            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(&archive, &zip_data).await?;
            let location = self.storage.location(&archive);
            tracing::info!("📦 Flight log saved to {}", location);
            return Ok(vec![location]);
        }

        let mut locations = Vec::with_capacity(files.len());
        for (name, data) in &files {
            let path = format!("{}/{}", log.id, name);
            self.storage.write_file(&path, data).await?;
            locations.push(self.storage.location(&path));
        }
        tracing::info!("📁 Flight log saved to {}", locations.join(", "));
        Ok(locations)
    }

    /// 讀回先前寫出的遙測 CSV，壓縮與否皆可
    pub async fn read_telemetry(&self, flight_id: &str) -> Result<Vec<u8>> {
        if self.config.compression_enabled() {
            let archive = self.storage.read_file(&format!("{}.zip", flight_id)).await?;
            extract_telemetry(&archive)
        } else {
            self.storage.read_file(&format!("{}/{}", flight_id, TELEMETRY_FILE)).await
        }
    }

    fn render<'a>(&self, log: &'a FlightLog) -> Result<Vec<(&'static str, Cow<'a, [u8]>)>> {
        let mut files = Vec::new();
        for format in self.config.output_formats() {
            match format.as_str() {
                "csv" => files.push((TELEMETRY_FILE, Cow::Borrowed(log.telemetry.as_slice()))),
                "json" => files.push((SUMMARY_FILE, Cow::Owned(render_json(log)?))),
                other => {
                    return Err(AgentError::InvalidConfigValueError {
                        field: "output.formats".to_string(),
                        value: other.to_string(),
                        reason: format!("Unsupported format. Valid formats: {}", OUTPUT_FORMATS.join(", ")),
                    })
                }
            }
        }
        Ok(files)
    }
}

pub fn render_json(log: &FlightLog) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(log)?)
}

/// 從 ZIP 中取出 `telemetry.csv`
pub fn extract_telemetry(archive: &[u8]) -> Result<Vec<u8>> {
    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(archive))?;
    let mut file = zip.by_name(TELEMETRY_FILE)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}
