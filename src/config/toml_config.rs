use crate::adapters::mapping::{Binding, MappingTable};
use crate::adapters::{msfs, xplane};
use crate::app::report::OUTPUT_FORMATS;
use crate::domain::model::{AircraftType, Simulator};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AgentError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const LOG_FORMATS: [&str; 2] = ["compact", "json"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub agent: AgentSection,
    pub xplane: XPlaneSection,
    pub msfs: MsfsSection,
    pub replay: ReplaySection,
    pub output: OutputSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub name: String,
    pub simulator: Simulator,
    pub sample_rate_hz: u32,
    pub stop_on_arrival: bool,
    /// 連續逾時幾次後放棄
    pub reconnect_attempts: u32,
    /// 機型 TOML 檔
    pub aircraft: Option<String>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: "opensky-agent".to_string(),
            simulator: Simulator::Xplane,
            sample_rate_hz: 5,
            stop_on_arrival: true,
            reconnect_attempts: 6,
            aircraft: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XPlaneSection {
    pub host: String,
    pub port: u16,
    pub local_port: u16,
    pub timeout_seconds: u64,
    /// 覆寫或追加的 dataref 對應
    pub bindings: Vec<Binding>,
}

impl Default for XPlaneSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 49000,
            local_port: 0,
            timeout_seconds: 5,
            bindings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MsfsSection {
    pub channel_capacity: usize,
    pub timeout_seconds: u64,
    /// 寫入油量時 lbs → gallons 的換算密度
    pub fuel_weight_per_gallon: f64,
    pub bindings: Vec<Binding>,
}

impl Default for MsfsSection {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            timeout_seconds: 5,
            fuel_weight_per_gallon: 6.7,
            bindings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySection {
    pub path: Option<String>,
    /// 重播倍速；未設定時不等待
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub path: String,
    pub formats: Vec<String>,
    pub compression: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            path: "./flights".to_string(),
            formats: vec!["csv".to_string(), "json".to_string()],
            compression: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            format: "compact".to_string(),
        }
    }
}

impl AgentConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AgentError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AgentError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${XPLANE_HOST})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AgentError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn xplane_endpoint(&self) -> xplane::XPlaneEndpoint {
        xplane::XPlaneEndpoint {
            host: self.xplane.host.clone(),
            port: self.xplane.port,
            local_port: self.xplane.local_port,
            timeout: Duration::from_secs(self.xplane.timeout_seconds),
            sample_rate_hz: self.agent.sample_rate_hz,
        }
    }

    /// 預設 dataref 表加上設定檔中的覆寫
    pub fn xplane_table(&self) -> MappingTable {
        xplane::datarefs::default_table().with_overrides(&self.xplane.bindings)
    }

    pub fn msfs_table(&self) -> MappingTable {
        msfs::default_table().with_overrides(&self.msfs.bindings)
    }

    pub fn msfs_timeout(&self) -> Duration {
        Duration::from_secs(self.msfs.timeout_seconds)
    }

    /// 載入 `[agent] aircraft` 指定的機型檔
    pub fn load_aircraft(&self) -> Result<Option<AircraftType>> {
        self.agent.aircraft.as_deref().map(AircraftType::from_file).transpose()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("agent.name", &self.agent.name)?;
        validation::validate_range("agent.sample_rate_hz", self.agent.sample_rate_hz, 1, 50)?;
        validation::validate_positive_number("agent.reconnect_attempts", self.agent.reconnect_attempts as usize, 1)?;
        if let Some(aircraft) = &self.agent.aircraft {
            validation::validate_path("agent.aircraft", aircraft)?;
        }

        match self.agent.simulator {
            Simulator::Xplane => {
                validation::validate_host("xplane.host", &self.xplane.host)?;
                validation::validate_port("xplane.port", self.xplane.port)?;
                validation::validate_positive_number("xplane.timeout_seconds", self.xplane.timeout_seconds as usize, 1)?;
            }
            Simulator::Msfs => {
                validation::validate_positive_number("msfs.channel_capacity", self.msfs.channel_capacity, 1)?;
                validation::validate_positive_number("msfs.timeout_seconds", self.msfs.timeout_seconds as usize, 1)?;
                if !(self.msfs.fuel_weight_per_gallon.is_finite() && self.msfs.fuel_weight_per_gallon > 0.0) {
                    return Err(AgentError::InvalidConfigValueError {
                        field: "msfs.fuel_weight_per_gallon".to_string(),
                        value: self.msfs.fuel_weight_per_gallon.to_string(),
                        reason: "Fuel density must be a positive number".to_string(),
                    });
                }
            }
            Simulator::Replay => {
                let path = validation::validate_required_field("replay.path", &self.replay.path)?;
                validation::validate_path("replay.path", path)?;
            }
        }
        if let Some(speed) = self.replay.speed {
            if !(speed.is_finite() && speed > 0.0) {
                return Err(AgentError::InvalidConfigValueError {
                    field: "replay.speed".to_string(),
                    value: speed.to_string(),
                    reason: "Speed must be a positive number".to_string(),
                });
            }
        }

        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_one_of("output.formats", &self.output.formats, &OUTPUT_FORMATS)?;
        validation::validate_one_of(
            "logging.format",
            std::slice::from_ref(&self.logging.format),
            &LOG_FORMATS,
        )?;

        Ok(())
    }
}

impl ConfigProvider for AgentConfig {
    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn compression_enabled(&self) -> bool {
        self.output.compression
    }

    fn stop_on_arrival(&self) -> bool {
        self.agent.stop_on_arrival
    }

    fn reconnect_attempts(&self) -> u32 {
        self.agent.reconnect_attempts
    }
}

impl Validate for AgentConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
